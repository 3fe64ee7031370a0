use chrono::{DateTime, Utc};
use shared::{
    domain::{MessageId, SyncStatus},
    protocol::Message,
};

/// A channel's message sequence, unique by id and ascending by `created_at`.
/// Messages with equal timestamps keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_or_update(&mut self, message: Message) {
        if let Some(index) = self.position(&message.id) {
            if self.messages[index].created_at == message.created_at {
                self.messages[index] = message;
                return;
            }
            // Timestamp moved; re-slot it so the ordering still holds.
            self.messages.remove(index);
        }

        let at = self
            .messages
            .partition_point(|existing| existing.created_at <= message.created_at);
        self.messages.insert(at, message);
    }

    /// Applies `insert_or_update` in input order. Thread replies are skipped
    /// and returned so the caller can route them to their thread.
    pub fn insert_or_update_batch(
        &mut self,
        messages: impl IntoIterator<Item = Message>,
    ) -> Vec<Message> {
        let mut replies = Vec::new();
        for message in messages {
            if message.is_thread_reply() {
                replies.push(message);
            } else {
                self.insert_or_update(message);
            }
        }
        replies
    }

    pub fn mark_deleted(&mut self, id: &MessageId, deleted_at: DateTime<Utc>) -> bool {
        let Some(message) = self.messages.iter_mut().find(|m| &m.id == id) else {
            return false;
        };
        if message.deleted_at.is_some() {
            return false;
        }
        message.deleted_at = Some(deleted_at);
        true
    }

    /// Oldest message acknowledged by the server; pending local sends are
    /// never used as a pagination anchor.
    pub fn oldest(&self) -> Option<&Message> {
        self.messages
            .iter()
            .find(|m| m.sync_status == SyncStatus::Synced)
    }

    pub fn oldest_id(&self) -> Option<&MessageId> {
        self.oldest().map(|m| &m.id)
    }

    pub fn remove(&mut self, id: &MessageId) -> Option<Message> {
        let index = self.position(id)?;
        Some(self.messages.remove(index))
    }

    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().rposition(|m| &m.id == id)
    }
}

#[cfg(test)]
#[path = "tests/message_store_tests.rs"]
mod tests;
