use chrono::{DateTime, TimeZone, Utc};
use shared::{
    domain::{Cid, User},
    protocol::{ChannelInfo, ChannelUserRead, Member, Message, Watcher},
};

pub fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

pub fn user(id: &str) -> User {
    User::new(id)
}

pub fn message(id: &str, author: &str, seconds: i64) -> Message {
    Message::new(id, user(author), at(seconds), format!("text of {id}"))
}

pub fn mentioning(mut message: Message, mentioned: &[&str]) -> Message {
    message.mentioned_users = mentioned.iter().map(|id| user(id)).collect();
    message
}

pub fn deleted(mut message: Message, seconds: i64) -> Message {
    message.deleted_at = Some(at(seconds));
    message
}

pub fn read(user_id: &str, seconds: i64) -> ChannelUserRead {
    ChannelUserRead::new(user(user_id), at(seconds))
}

pub fn member(user_id: &str) -> Member {
    Member::new(user(user_id))
}

pub fn watcher(user_id: &str) -> Watcher {
    Watcher::new(user(user_id))
}

pub fn cid(id: &str) -> Cid {
    Cid::new("messaging", id)
}

pub fn channel_info(id: &str) -> ChannelInfo {
    let mut info = ChannelInfo::new(cid(id));
    info.created_at = Some(at(0));
    info
}
