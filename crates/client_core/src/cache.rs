use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use shared::{
    domain::Cid,
    protocol::{ChannelSnapshot, QueryChannelsRequest},
};
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelRecord {
    pub snapshot: ChannelSnapshot,
    pub fingerprint: String,
    /// Not part of any snapshot; kept so presence survives a restart.
    pub last_known_active_watcher: Option<DateTime<Utc>>,
    pub stored_at: DateTime<Utc>,
}

#[async_trait]
pub trait ChannelCache: Send + Sync {
    async fn load_channel(&self, cid: &Cid) -> Result<Option<ChannelRecord>>;
    async fn store_channel(&self, record: &ChannelRecord) -> Result<()>;
    async fn remove_channel(&self, cid: &Cid) -> Result<()>;
    async fn load_query(&self, signature: &str) -> Result<Option<Vec<Cid>>>;
    async fn store_query(&self, signature: &str, cids: &[Cid]) -> Result<()>;
}

fn digest_json(value: &impl Serialize) -> Result<String> {
    let canonical = serde_json::to_vec(value).context("failed to encode value for hashing")?;
    Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(&canonical)))
}

pub fn query_signature(request: &QueryChannelsRequest) -> Result<String> {
    digest_json(request)
}

pub fn snapshot_fingerprint(snapshot: &ChannelSnapshot) -> Result<String> {
    digest_json(snapshot)
}

#[derive(Default)]
pub struct InMemoryChannelCache {
    channels: RwLock<HashMap<Cid, ChannelRecord>>,
    queries: RwLock<HashMap<String, Vec<Cid>>>,
}

impl InMemoryChannelCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChannelCache for InMemoryChannelCache {
    async fn load_channel(&self, cid: &Cid) -> Result<Option<ChannelRecord>> {
        Ok(self.channels.read().await.get(cid).cloned())
    }

    async fn store_channel(&self, record: &ChannelRecord) -> Result<()> {
        self.channels
            .write()
            .await
            .insert(record.snapshot.cid().clone(), record.clone());
        Ok(())
    }

    async fn remove_channel(&self, cid: &Cid) -> Result<()> {
        self.channels.write().await.remove(cid);
        Ok(())
    }

    async fn load_query(&self, signature: &str) -> Result<Option<Vec<Cid>>> {
        Ok(self.queries.read().await.get(signature).cloned())
    }

    async fn store_query(&self, signature: &str, cids: &[Cid]) -> Result<()> {
        self.queries
            .write()
            .await
            .insert(signature.to_string(), cids.to_vec());
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
