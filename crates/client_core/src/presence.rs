use std::collections::HashSet;

use chrono::{DateTime, Utc};
use shared::{
    domain::{User, UserId},
    protocol::{ChannelInfo, Member, Message, Watcher},
};

use crate::last_message;

const DISPLAY_NAME_USERS: usize = 3;

pub fn other_users(members: &[Member], watchers: &[Watcher], current_user: &UserId) -> Vec<User> {
    let mut seen = HashSet::new();
    members
        .iter()
        .map(|m| &m.user)
        .chain(watchers.iter().map(|w| &w.user))
        .filter(|user| &user.id != current_user)
        .filter(|user| seen.insert(user.id.clone()))
        .cloned()
        .collect()
}

/// Latest sign of life in the channel from anyone but `current_user`.
/// Missing terms fall back to the channel creation time, then the epoch.
pub fn last_active(
    channel: &ChannelInfo,
    messages: &[Message],
    last_known_active_watcher: Option<DateTime<Utc>>,
    other_users: &[User],
    current_user: &UserId,
) -> DateTime<Utc> {
    let created = channel.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
    let from_other = last_message::resolve_excluding_user(messages, current_user).map(|m| m.created_at);
    let user_activity = other_users.iter().filter_map(|u| u.last_active);

    [last_known_active_watcher, from_other]
        .into_iter()
        .flatten()
        .chain(user_activity)
        .fold(created, std::cmp::max)
}

/// Explicit channel name, or up to three other users joined with ", " and a
/// trailing "..." when more exist.
pub fn channel_display_name(channel: &ChannelInfo, other_users: &[User]) -> String {
    if let Some(name) = channel.explicit_name() {
        return name.to_string();
    }

    let mut display = other_users
        .iter()
        .take(DISPLAY_NAME_USERS)
        .map(User::display_name)
        .collect::<Vec<_>>()
        .join(", ");
    if other_users.len() > DISPLAY_NAME_USERS {
        display.push_str("...");
    }
    display
}

#[cfg(test)]
#[path = "tests/presence_tests.rs"]
mod tests;
