use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{Cid, User},
    protocol::{ChannelUserRead, Message},
};

use crate::state::SyncState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelView {
    pub cid: Cid,
    pub name: Option<String>,
    pub display_name: String,
    pub image: Option<String>,
    pub frozen: bool,
    pub last_message: Option<Message>,
    pub unread_count: usize,
    pub unread_mention_count: usize,
    pub other_users: Vec<User>,
    pub typing_users: Vec<User>,
    pub last_active: DateTime<Utc>,
    pub last_reader: Option<User>,
    pub last_message_reads: Vec<ChannelUserRead>,
    pub read_last_message: bool,
    pub watcher_count: u32,
    pub member_count: usize,
    pub message_count: usize,
    pub sync_state: SyncState,
}
