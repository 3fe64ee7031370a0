use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{MessageId, User, UserId},
    protocol::{ChannelInfo, ChannelSnapshot, Member, Message, Watcher},
};

use crate::{last_message, message_store::MessageStore, read_state::ReadStateTracker};

pub const TYPING_TIMEOUT_SECONDS: i64 = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct TypingUser {
    pub user: User,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    #[default]
    Empty,
    Synced,
}

/// Mutated only through the merger; `last_message` is always re-derivable
/// from `messages`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelState {
    pub(crate) messages: MessageStore,
    pub(crate) threads: BTreeMap<MessageId, MessageStore>,
    pub(crate) reads: ReadStateTracker,
    pub(crate) members: Vec<Member>,
    pub(crate) watchers: Vec<Watcher>,
    pub(crate) watcher_count: u32,
    pub(crate) last_message: Option<Message>,
    pub(crate) last_known_active_watcher: Option<DateTime<Utc>>,
    pub(crate) typing: Vec<TypingUser>,
    pub(crate) sync_state: SyncState,
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn thread(&self, parent_id: &MessageId) -> Option<&MessageStore> {
        self.threads.get(parent_id)
    }

    pub fn reads(&self) -> &ReadStateTracker {
        &self.reads
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn watchers(&self) -> &[Watcher] {
        &self.watchers
    }

    pub fn watcher_count(&self) -> u32 {
        self.watcher_count
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.last_message.as_ref()
    }

    pub fn last_known_active_watcher(&self) -> Option<DateTime<Utc>> {
        self.last_known_active_watcher
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    pub fn typing_users(&self, now: DateTime<Utc>, excluding: &UserId) -> Vec<User> {
        let cutoff = now - TimeDelta::seconds(TYPING_TIMEOUT_SECONDS);
        let mut typing: Vec<&TypingUser> = self
            .typing
            .iter()
            .filter(|entry| entry.received_at >= cutoff && &entry.user.id != excluding)
            .collect();
        typing.sort_by_key(|entry| entry.received_at);
        typing.into_iter().map(|entry| entry.user.clone()).collect()
    }

    /// Routes top-level messages into the channel sequence and replies into
    /// their parent's thread. A message is held by one store only.
    pub(crate) fn upsert_messages(&mut self, messages: impl IntoIterator<Item = Message>) {
        let messages: Vec<Message> = messages.into_iter().collect();
        for message in &messages {
            self.evict_from_other_stores(message);
        }
        let replies = self.messages.insert_or_update_batch(messages);
        for reply in replies {
            if let Some(parent_id) = reply.parent_id.clone() {
                self.threads.entry(parent_id).or_default().insert_or_update(reply);
            }
        }
    }

    fn evict_from_other_stores(&mut self, message: &Message) {
        if message.is_thread_reply() {
            self.messages.remove(&message.id);
        }
        for (parent_id, thread) in self.threads.iter_mut() {
            if message.parent_id.as_ref() != Some(parent_id) {
                thread.remove(&message.id);
            }
        }
        self.threads.retain(|_, thread| !thread.is_empty());
    }

    pub(crate) fn mark_message_deleted(&mut self, id: &MessageId, deleted_at: DateTime<Utc>) -> bool {
        if self.messages.mark_deleted(id, deleted_at) {
            return true;
        }
        self.threads
            .values_mut()
            .any(|thread| thread.mark_deleted(id, deleted_at))
    }

    pub(crate) fn recompute_last_message(&mut self) {
        self.last_message = last_message::resolve(self.messages.all()).cloned();
    }

    pub(crate) fn set_watcher_count(&mut self, watcher_count: u32, now: DateTime<Utc>) {
        self.watcher_count = watcher_count;
        if watcher_count > 1 {
            self.last_known_active_watcher = Some(now);
        }
    }

    pub(crate) fn note_active_watcher(&mut self, last_active: DateTime<Utc>) {
        if self
            .last_known_active_watcher
            .map_or(true, |known| last_active > known)
        {
            self.last_known_active_watcher = Some(last_active);
        }
    }

    pub(crate) fn set_typing(&mut self, user: User, received_at: DateTime<Utc>) {
        self.typing.retain(|entry| entry.user.id != user.id);
        self.typing.push(TypingUser { user, received_at });
    }

    pub(crate) fn clear_typing(&mut self, user_id: &UserId) {
        self.typing.retain(|entry| &entry.user.id != user_id);
    }

    pub(crate) fn expire_typing(&mut self, now: DateTime<Utc>) {
        let cutoff = now - TimeDelta::seconds(TYPING_TIMEOUT_SECONDS);
        self.typing.retain(|entry| entry.received_at >= cutoff);
    }

    pub(crate) fn add_watcher(&mut self, watcher: Watcher) {
        self.watchers.retain(|w| w.user.id != watcher.user.id);
        self.watchers.push(watcher);
    }

    pub(crate) fn remove_watcher(&mut self, watcher: &Watcher) {
        if let Some(last_active) = watcher.user.last_active {
            self.note_active_watcher(last_active);
        }
        self.watchers.retain(|w| w.user.id != watcher.user.id);
    }

    pub(crate) fn add_or_update_member(&mut self, member: Member) {
        match self.members.iter_mut().find(|m| m.user.id == member.user.id) {
            Some(existing) => *existing = member,
            None => self.members.push(member),
        }
    }

    pub(crate) fn remove_member(&mut self, user_id: &UserId) {
        self.members.retain(|m| &m.user.id != user_id);
    }

    pub(crate) fn replace_members(&mut self, members: Vec<Member>) {
        self.members.clear();
        for member in members {
            self.add_or_update_member(member);
        }
    }

    pub fn snapshot(&self, channel: &ChannelInfo) -> ChannelSnapshot {
        let mut messages = self.messages.all().to_vec();
        messages.extend(
            self.threads
                .values()
                .flat_map(|thread| thread.all().iter().cloned()),
        );
        ChannelSnapshot {
            channel: channel.clone(),
            messages: Some(messages),
            reads: Some(self.reads.all().to_vec()),
            members: Some(self.members.clone()),
            watchers: Some(self.watchers.clone()),
            watcher_count: Some(self.watcher_count),
        }
    }
}
