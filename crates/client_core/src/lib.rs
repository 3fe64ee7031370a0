use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use shared::{
    domain::{Cid, User, UserId},
    protocol::{ChannelEvent, ChannelSnapshot, QueryChannelsRequest, ServerEvent},
};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

pub mod cache;
pub mod channel;
pub mod durable_cache;
pub mod error;
pub mod last_message;
mod merger;
pub mod message_store;
pub mod presence;
pub mod read_state;
pub mod state;
pub mod transport;
pub mod unread;
pub mod view;

#[cfg(test)]
mod test_support;

pub use cache::{ChannelCache, ChannelRecord, InMemoryChannelCache};
pub use channel::Channel;
pub use durable_cache::DurableChannelCache;
pub use error::{ClientError, ClientResult};
pub use state::{ChannelState, SyncState};
pub use transport::{ChannelTransport, MissingChannelTransport};
pub use view::ChannelView;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    ChannelUpdated(Arc<ChannelView>),
    ChannelRemoved(Cid),
    Error(String),
}

/// One active channel. The mutex is the channel's single writer; `view` is
/// republished while the writer still holds it, so readers see merges in order.
struct ChannelSlot {
    inner: Mutex<SlotState>,
    view: RwLock<Arc<ChannelView>>,
}

struct SlotState {
    channel: Channel,
    /// Fingerprint of the last snapshot merged as-is. Cleared by events.
    fingerprint: Option<String>,
}

pub struct ChatClient {
    current_user: UserId,
    transport: Arc<dyn ChannelTransport>,
    cache: Arc<dyn ChannelCache>,
    clock: Arc<dyn Clock>,
    channels: RwLock<HashMap<Cid, Arc<ChannelSlot>>>,
    events: broadcast::Sender<ClientEvent>,
}

impl ChatClient {
    pub fn new(current_user: UserId) -> Arc<Self> {
        Self::new_with_dependencies(
            current_user,
            Arc::new(MissingChannelTransport),
            Arc::new(InMemoryChannelCache::new()),
            Arc::new(SystemClock),
        )
    }

    pub fn new_with_dependencies(
        current_user: UserId,
        transport: Arc<dyn ChannelTransport>,
        cache: Arc<dyn ChannelCache>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            current_user,
            transport,
            cache,
            clock,
            channels: RwLock::new(HashMap::new()),
            events,
        })
    }

    pub fn current_user(&self) -> &UserId {
        &self.current_user
    }

    pub fn parse_cid(raw: &str) -> ClientResult<Cid> {
        raw.parse()
            .map_err(|_| ClientError::InvalidCid(raw.to_string()))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Same feed as `subscribe_events`; lagged receivers yield an error item
    /// instead of silently skipping.
    pub fn event_stream(&self) -> BroadcastStream<ClientEvent> {
        BroadcastStream::new(self.events.subscribe())
    }

    pub async fn channel_view(&self, cid: &Cid) -> Option<Arc<ChannelView>> {
        let slot = self.slot(cid).await?;
        let view = slot.view.read().await.clone();
        Some(view)
    }

    pub async fn active_cids(&self) -> Vec<Cid> {
        let mut cids: Vec<Cid> = self.channels.read().await.keys().cloned().collect();
        cids.sort();
        cids
    }

    pub async fn ingest_snapshot(&self, snapshot: ChannelSnapshot) -> ClientResult<Arc<ChannelView>> {
        let fingerprint = cache::snapshot_fingerprint(&snapshot).map_err(ClientError::Cache)?;
        self.merge_snapshot(snapshot, fingerprint, None, true).await
    }

    pub async fn watch_channel(&self, cid: &Cid) -> ClientResult<Arc<ChannelView>> {
        let snapshot = self
            .transport
            .query_channel(cid)
            .await
            .map_err(ClientError::from_transport)?;
        if snapshot.cid() != cid {
            warn!(
                requested = %cid,
                received = %snapshot.cid(),
                "client: transport answered with a different channel"
            );
        }
        self.ingest_snapshot(snapshot).await
    }

    pub async fn query_channels(
        &self,
        request: &QueryChannelsRequest,
    ) -> ClientResult<Vec<Arc<ChannelView>>> {
        let snapshots = self
            .transport
            .query_channels(request)
            .await
            .map_err(ClientError::from_transport)?;

        let mut views = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            views.push(self.ingest_snapshot(snapshot).await?);
        }

        let cids: Vec<Cid> = views.iter().map(|view| view.cid.clone()).collect();
        match cache::query_signature(request) {
            Ok(signature) => {
                if let Err(err) = self.cache.store_query(&signature, &cids).await {
                    self.report_cache_failure("store query", err);
                }
            }
            Err(err) => self.report_cache_failure("sign query", err),
        }
        info!(channels = views.len(), "client: channel query merged");
        Ok(views)
    }

    pub async fn cached_query_channels(
        &self,
        request: &QueryChannelsRequest,
    ) -> ClientResult<Vec<Arc<ChannelView>>> {
        let signature = cache::query_signature(request).map_err(ClientError::Cache)?;
        let Some(cids) = self
            .cache
            .load_query(&signature)
            .await
            .map_err(ClientError::Cache)?
        else {
            debug!(%signature, "client: no cached result for query");
            return Ok(Vec::new());
        };

        let mut views = Vec::with_capacity(cids.len());
        for cid in cids {
            let record = self
                .cache
                .load_channel(&cid)
                .await
                .map_err(ClientError::Cache)?;
            let Some(record) = record else {
                debug!(%cid, "client: cached query references a missing channel");
                continue;
            };
            views.push(
                self.merge_snapshot(
                    record.snapshot,
                    record.fingerprint,
                    record.last_known_active_watcher,
                    false,
                )
                .await?,
            );
        }
        Ok(views)
    }

    pub async fn handle_server_event(&self, event: ServerEvent) -> ClientResult<()> {
        match event {
            ServerEvent::ChannelEvent {
                cid,
                event,
                watcher_count,
            } => {
                self.apply_channel_event(&cid, event, watcher_count).await?;
            }
            ServerEvent::ChannelDeleted { cid } => {
                let removed = self.channels.write().await.remove(&cid);
                if removed.is_none() {
                    return Err(ClientError::UnknownChannel(cid));
                }
                if let Err(err) = self.cache.remove_channel(&cid).await {
                    self.report_cache_failure("remove channel", err);
                }
                info!(%cid, "client: channel deleted");
                let _ = self.events.send(ClientEvent::ChannelRemoved(cid));
            }
            ServerEvent::ConnectionRecovered => {
                let cids = self.active_cids().await;
                if cids.is_empty() {
                    return Ok(());
                }
                info!(channels = cids.len(), "client: connection recovered, re-querying");
                let snapshots = self
                    .transport
                    .query_channels(&QueryChannelsRequest::for_cids(&cids))
                    .await
                    .map_err(ClientError::from_transport)?;
                for snapshot in snapshots {
                    self.ingest_snapshot(snapshot).await?;
                }
            }
            ServerEvent::Error(error) => {
                warn!(code = ?error.code, message = %error.message, "client: server error");
                let _ = self
                    .events
                    .send(ClientEvent::Error(format!("{:?}: {}", error.code, error.message)));
            }
        }
        Ok(())
    }

    /// Drives `handle_server_event` until the stream ends. Failures are
    /// reported on the event feed and do not stop the loop.
    pub async fn run_event_stream<S>(&self, events: S)
    where
        S: Stream<Item = ServerEvent> + Send,
    {
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            if let Err(err) = self.handle_server_event(event).await {
                warn!(error = %err, "client: server event rejected");
                let _ = self.events.send(ClientEvent::Error(err.to_string()));
            }
        }
        debug!("client: server event stream ended");
    }

    pub async fn mark_read(&self, cid: &Cid) -> ClientResult<Arc<ChannelView>> {
        if self.slot(cid).await.is_none() {
            return Err(ClientError::UnknownChannel(cid.clone()));
        }
        self.transport
            .mark_read(cid)
            .await
            .map_err(ClientError::from_transport)?;

        let user = self.current_user_profile(cid).await;
        let last_read = self.clock.now();
        self.apply_channel_event(cid, ChannelEvent::ReadMarked { user, last_read }, None)
            .await
    }

    async fn slot(&self, cid: &Cid) -> Option<Arc<ChannelSlot>> {
        self.channels.read().await.get(cid).cloned()
    }

    async fn slot_or_insert(&self, snapshot: &ChannelSnapshot) -> Arc<ChannelSlot> {
        if let Some(slot) = self.slot(snapshot.cid()).await {
            return slot;
        }
        let mut channels = self.channels.write().await;
        let slot = channels.entry(snapshot.cid().clone()).or_insert_with(|| {
            let channel = Channel::new(snapshot.channel.clone());
            let view = Arc::new(channel.view(&self.current_user, self.clock.now()));
            Arc::new(ChannelSlot {
                inner: Mutex::new(SlotState {
                    channel,
                    fingerprint: None,
                }),
                view: RwLock::new(view),
            })
        });
        Arc::clone(slot)
    }

    async fn merge_snapshot(
        &self,
        snapshot: ChannelSnapshot,
        fingerprint: String,
        last_known_active_watcher: Option<DateTime<Utc>>,
        persist: bool,
    ) -> ClientResult<Arc<ChannelView>> {
        let cid = snapshot.cid().clone();
        let slot = self.slot_or_insert(&snapshot).await;
        let mut inner = slot.inner.lock().await;

        if inner.fingerprint.as_deref() == Some(fingerprint.as_str()) {
            debug!(%cid, "sync: snapshot unchanged, skipping merge");
            let view = slot.view.read().await.clone();
            return Ok(view);
        }

        let now = self.clock.now();
        inner
            .channel
            .restore(snapshot, last_known_active_watcher, now);
        inner.fingerprint = Some(fingerprint.clone());
        let view = self.publish(&slot, &inner.channel, now).await;
        debug!(
            %cid,
            messages = view.message_count,
            unread = view.unread_count,
            "client: published channel view"
        );

        if persist {
            self.persist(&inner.channel, fingerprint, now).await;
        }
        Ok(view)
    }

    async fn apply_channel_event(
        &self,
        cid: &Cid,
        event: ChannelEvent,
        watcher_count: Option<u32>,
    ) -> ClientResult<Arc<ChannelView>> {
        let slot = self
            .slot(cid)
            .await
            .ok_or_else(|| ClientError::UnknownChannel(cid.clone()))?;
        let mut inner = slot.inner.lock().await;

        let now = self.clock.now();
        inner.channel.apply_event(event, watcher_count, now);
        inner.fingerprint = None;
        let view = self.publish(&slot, &inner.channel, now).await;

        match cache::snapshot_fingerprint(&inner.channel.state().snapshot(inner.channel.info())) {
            Ok(fingerprint) => self.persist(&inner.channel, fingerprint, now).await,
            Err(err) => self.report_cache_failure("fingerprint channel", err),
        }
        Ok(view)
    }

    async fn publish(
        &self,
        slot: &ChannelSlot,
        channel: &Channel,
        now: DateTime<Utc>,
    ) -> Arc<ChannelView> {
        let view = Arc::new(channel.view(&self.current_user, now));
        *slot.view.write().await = Arc::clone(&view);
        let _ = self.events.send(ClientEvent::ChannelUpdated(Arc::clone(&view)));
        view
    }

    /// Best effort: a cache failure never undoes a merge.
    async fn persist(&self, channel: &Channel, fingerprint: String, stored_at: DateTime<Utc>) {
        let record = ChannelRecord {
            snapshot: channel.state().snapshot(channel.info()),
            fingerprint,
            last_known_active_watcher: channel.state().last_known_active_watcher(),
            stored_at,
        };
        if let Err(err) = self.cache.store_channel(&record).await {
            self.report_cache_failure("store channel", err);
        }
    }

    fn report_cache_failure(&self, action: &str, err: anyhow::Error) {
        warn!(action, error = %err, "cache: operation failed");
        let _ = self
            .events
            .send(ClientEvent::Error(format!("cache {action} failed: {err}")));
    }

    async fn current_user_profile(&self, cid: &Cid) -> User {
        if let Some(slot) = self.slot(cid).await {
            let inner = slot.inner.lock().await;
            let state = inner.channel.state();
            let known = state
                .members()
                .iter()
                .map(|member| &member.user)
                .chain(state.watchers().iter().map(|watcher| &watcher.user))
                .find(|user| user.id == self.current_user);
            if let Some(user) = known {
                return user.clone();
            }
        }
        User::new(self.current_user.as_str())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
