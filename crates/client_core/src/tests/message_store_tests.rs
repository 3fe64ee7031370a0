use shared::domain::{MessageId, SyncStatus};

use super::*;
use crate::test_support::{at, message};

fn ids(store: &MessageStore) -> Vec<&str> {
    store.all().iter().map(|m| m.id.as_str()).collect()
}

#[test]
fn inserts_keep_ascending_creation_order() {
    let mut store = MessageStore::new();
    store.insert_or_update(message("m3", "u1", 30));
    store.insert_or_update(message("m1", "u1", 10));
    store.insert_or_update(message("m2", "u2", 20));
    store.insert_or_update(message("m4", "u2", 40));

    assert_eq!(ids(&store), ["m1", "m2", "m3", "m4"]);
}

#[test]
fn equal_timestamps_keep_insertion_order() {
    let mut store = MessageStore::new();
    store.insert_or_update(message("a", "u1", 10));
    store.insert_or_update(message("b", "u1", 10));
    store.insert_or_update(message("c", "u1", 5));
    store.insert_or_update(message("d", "u1", 10));

    assert_eq!(ids(&store), ["c", "a", "b", "d"]);
}

#[test]
fn update_replaces_in_place() {
    let mut store = MessageStore::new();
    store.insert_or_update(message("m1", "u1", 10));
    store.insert_or_update(message("m2", "u1", 10));
    store.insert_or_update(message("m3", "u1", 20));

    let mut edited = message("m2", "u1", 10);
    edited.text = "edited".into();
    store.insert_or_update(edited);

    assert_eq!(ids(&store), ["m1", "m2", "m3"]);
    assert_eq!(store.get(&MessageId::from("m2")).unwrap().text, "edited");
}

#[test]
fn reapplying_the_same_message_is_a_no_op() {
    let mut store = MessageStore::new();
    store.insert_or_update(message("m1", "u1", 10));
    store.insert_or_update(message("m2", "u2", 20));
    let before = store.clone();

    store.insert_or_update(message("m2", "u2", 20));
    store.insert_or_update_batch(vec![message("m1", "u1", 10), message("m2", "u2", 20)]);

    assert_eq!(store, before);
}

#[test]
fn moved_timestamp_is_reslotted() {
    let mut store = MessageStore::new();
    store.insert_or_update(message("m1", "u1", 10));
    store.insert_or_update(message("m2", "u1", 20));
    store.insert_or_update(message("m3", "u1", 30));

    store.insert_or_update(message("m1", "u1", 25));

    assert_eq!(ids(&store), ["m2", "m1", "m3"]);
    assert_eq!(store.len(), 3);
}

#[test]
fn batch_skips_and_returns_thread_replies() {
    let mut store = MessageStore::new();
    let mut reply = message("r1", "u2", 15);
    reply.parent_id = Some(MessageId::from("m1"));

    let replies =
        store.insert_or_update_batch(vec![message("m1", "u1", 10), reply, message("m2", "u1", 20)]);

    assert_eq!(ids(&store), ["m1", "m2"]);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].id.as_str(), "r1");
}

#[test]
fn mark_deleted_keeps_the_entry() {
    let mut store = MessageStore::new();
    store.insert_or_update(message("m1", "u1", 10));

    assert!(store.mark_deleted(&MessageId::from("m1"), at(50)));
    assert!(!store.mark_deleted(&MessageId::from("m1"), at(60)));
    assert!(!store.mark_deleted(&MessageId::from("missing"), at(60)));

    let stored = store.get(&MessageId::from("m1")).unwrap();
    assert_eq!(stored.deleted_at, Some(at(50)));
    assert_eq!(store.len(), 1);
}

#[test]
fn oldest_skips_unsynced_messages() {
    let mut store = MessageStore::new();
    assert!(store.oldest().is_none());

    let mut pending = message("local", "u1", 5);
    pending.sync_status = SyncStatus::SyncNeeded;
    store.insert_or_update(pending);
    store.insert_or_update(message("m1", "u1", 10));

    assert_eq!(store.oldest_id().map(MessageId::as_str), Some("m1"));
    assert_eq!(store.all()[0].id.as_str(), "local");
}
