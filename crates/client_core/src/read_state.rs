use chrono::{DateTime, Utc};
use shared::{
    domain::{User, UserId},
    protocol::{ChannelUserRead, Message},
};

/// Per-user read markers for one channel. Entries are kept in upsert order,
/// so the most recently updated marker is always last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadStateTracker {
    reads: Vec<ChannelUserRead>,
}

impl ReadStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_reads(reads: impl IntoIterator<Item = ChannelUserRead>) -> Self {
        let mut tracker = Self::new();
        tracker.replace_all(reads);
        tracker
    }

    pub fn upsert(&mut self, user: User, last_read: DateTime<Utc>) {
        if let Some(index) = self.reads.iter().position(|r| r.user.id == user.id) {
            self.reads.remove(index);
        }
        self.reads.push(ChannelUserRead::new(user, last_read));
    }

    pub fn replace_all(&mut self, reads: impl IntoIterator<Item = ChannelUserRead>) {
        self.reads.clear();
        for read in reads {
            self.upsert(read.user, read.last_read);
        }
    }

    pub fn last_read_for(&self, user_id: &UserId) -> Option<DateTime<Utc>> {
        self.reads
            .iter()
            .find(|r| &r.user.id == user_id)
            .map(|r| r.last_read)
    }

    pub fn sorted_ascending(&self) -> Vec<ChannelUserRead> {
        let mut sorted = self.reads.clone();
        sorted.sort_by_key(|r| r.last_read);
        sorted
    }

    /// User with the latest marker other than `user_id`; on a tie the more
    /// recently updated marker wins.
    pub fn last_reader_excluding(&self, user_id: &UserId) -> Option<&User> {
        self.reads
            .iter()
            .filter(|r| &r.user.id != user_id)
            .max_by_key(|r| r.last_read)
            .map(|r| &r.user)
    }

    pub fn last_message_reads(
        &self,
        last_message: Option<&Message>,
        current_user: &UserId,
    ) -> Vec<ChannelUserRead> {
        let Some(last_message) = last_message else {
            return Vec::new();
        };
        let mut covering: Vec<ChannelUserRead> = self
            .reads
            .iter()
            .filter(|r| &r.user.id != current_user && r.last_read >= last_message.created_at)
            .cloned()
            .collect();
        covering.sort_by_key(|r| r.last_read);
        covering
    }

    /// Whether `user_id` has read past `message`. Without a marker nothing
    /// counts as read; without a message everything does.
    pub fn has_read(&self, user_id: &UserId, message: Option<&Message>) -> bool {
        match (self.last_read_for(user_id), message) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(last_read), Some(message)) => last_read > message.created_at,
        }
    }

    pub fn all(&self) -> &[ChannelUserRead] {
        &self.reads
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }
}

#[cfg(test)]
#[path = "tests/read_state_tests.rs"]
mod tests;
