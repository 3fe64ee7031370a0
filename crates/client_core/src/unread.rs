use shared::{domain::UserId, protocol::Message};

use crate::read_state::ReadStateTracker;

/// Messages from other users, not deleted, created after `user_id`'s read
/// marker. A user without a marker has no unread messages.
pub fn unread_message_count(messages: &[Message], reads: &ReadStateTracker, user_id: &UserId) -> usize {
    let Some(last_read) = reads.last_read_for(user_id) else {
        return 0;
    };
    messages
        .iter()
        .filter(|m| m.author_id() != user_id && !m.is_deleted() && m.created_at > last_read)
        .count()
}

/// Mentions of `current_user` in unread messages from other users. Without a
/// read marker every message counts.
pub fn unread_mention_count(
    messages: &[Message],
    reads: &ReadStateTracker,
    current_user: &UserId,
) -> usize {
    let last_read = reads.last_read_for(current_user);
    messages
        .iter()
        .filter(|m| m.author_id() != current_user && !m.is_deleted())
        .filter(|m| last_read.map_or(true, |last_read| m.created_at > last_read))
        .map(|m| {
            m.mentioned_users
                .iter()
                .filter(|mentioned| &mentioned.id == current_user)
                .count()
        })
        .sum()
}

#[cfg(test)]
#[path = "tests/unread_tests.rs"]
mod tests;
