use anyhow::Result;
use async_trait::async_trait;
use shared::domain::Cid;
use storage::Storage;

use crate::cache::{ChannelCache, ChannelRecord};

#[derive(Clone)]
pub struct DurableChannelCache {
    store: Storage,
}

impl DurableChannelCache {
    pub fn new(store: Storage) -> Self {
        Self { store }
    }

    pub async fn initialize(database_url: &str) -> Result<Self> {
        Ok(Self::new(Storage::new(database_url).await?))
    }

    pub fn storage(&self) -> &Storage {
        &self.store
    }
}

#[async_trait]
impl ChannelCache for DurableChannelCache {
    async fn load_channel(&self, cid: &Cid) -> Result<Option<ChannelRecord>> {
        let stored = self.store.load_channel(cid).await?;
        Ok(stored.map(|stored| ChannelRecord {
            snapshot: stored.snapshot,
            fingerprint: stored.fingerprint,
            last_known_active_watcher: stored.last_known_active_watcher,
            stored_at: stored.stored_at,
        }))
    }

    async fn store_channel(&self, record: &ChannelRecord) -> Result<()> {
        self.store
            .upsert_channel(
                &record.snapshot,
                &record.fingerprint,
                record.last_known_active_watcher,
                record.stored_at,
            )
            .await
    }

    async fn remove_channel(&self, cid: &Cid) -> Result<()> {
        self.store.delete_channel(cid).await?;
        Ok(())
    }

    async fn load_query(&self, signature: &str) -> Result<Option<Vec<Cid>>> {
        self.store.load_query(signature).await
    }

    async fn store_query(&self, signature: &str, cids: &[Cid]) -> Result<()> {
        self.store.upsert_query(signature, cids).await
    }
}

#[cfg(test)]
#[path = "tests/durable_cache_tests.rs"]
mod tests;
