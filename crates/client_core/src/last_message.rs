use shared::{
    domain::{MessageType, UserId},
    protocol::Message,
};

fn is_candidate(message: &Message) -> bool {
    message.deleted_at.is_none() && message.message_type == MessageType::Regular
}

/// Newest non-deleted regular message. Soft-deleted entries stay in the
/// sequence and are skipped here.
pub fn resolve(messages: &[Message]) -> Option<&Message> {
    messages.iter().rev().find(|m| is_candidate(m))
}

pub fn resolve_excluding_user<'a>(messages: &'a [Message], user_id: &UserId) -> Option<&'a Message> {
    messages
        .iter()
        .rev()
        .find(|m| is_candidate(m) && m.author_id() != user_id)
}

#[cfg(test)]
#[path = "tests/last_message_tests.rs"]
mod tests;
