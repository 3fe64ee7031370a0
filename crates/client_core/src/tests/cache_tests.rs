use shared::protocol::QueryChannelsRequest;

use super::*;
use crate::test_support::{at, channel_info, cid, message};

fn record(id: &str) -> ChannelRecord {
    let mut snapshot = ChannelSnapshot::empty(channel_info(id));
    snapshot.messages = Some(vec![message("m1", "u2", 10)]);
    ChannelRecord {
        fingerprint: snapshot_fingerprint(&snapshot).expect("fingerprint"),
        snapshot,
        last_known_active_watcher: None,
        stored_at: at(100),
    }
}

#[test]
fn fingerprint_tracks_snapshot_content() {
    let a = record("general");
    let b = record("general");
    assert_eq!(a.fingerprint, b.fingerprint);

    let mut changed = a.snapshot.clone();
    changed.watcher_count = Some(4);
    assert_ne!(snapshot_fingerprint(&changed).expect("fingerprint"), a.fingerprint);
    assert!(!a.fingerprint.contains('='));
}

#[test]
fn query_signature_depends_on_the_request() {
    let all = QueryChannelsRequest::for_cids(&[cid("a"), cid("b")]);
    let same = QueryChannelsRequest::for_cids(&[cid("a"), cid("b")]);
    let mut smaller = all.clone();
    smaller.limit = 5;

    let signature = query_signature(&all).expect("signature");
    assert_eq!(signature, query_signature(&same).expect("signature"));
    assert_ne!(signature, query_signature(&smaller).expect("signature"));
}

#[tokio::test]
async fn in_memory_cache_stores_channels_and_queries() {
    let cache = InMemoryChannelCache::new();
    assert!(cache.load_channel(&cid("general")).await.expect("load").is_none());
    assert!(cache.load_query("sig").await.expect("load").is_none());

    cache.store_channel(&record("general")).await.expect("store");
    cache
        .store_query("sig", &[cid("general"), cid("random")])
        .await
        .expect("store query");

    let loaded = cache
        .load_channel(&cid("general"))
        .await
        .expect("load")
        .expect("record");
    assert_eq!(loaded, record("general"));
    assert_eq!(
        cache.load_query("sig").await.expect("load"),
        Some(vec![cid("general"), cid("random")])
    );

    cache.remove_channel(&cid("general")).await.expect("remove");
    assert!(cache.load_channel(&cid("general")).await.expect("load").is_none());
}
