use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    domain::{Cid, MemberRole, MessageId, MessageType, SyncStatus, User, UserId},
    error::ApiError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    pub user: User,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mentioned_users: Vec<User>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reaction_counts: BTreeMap<String, u32>,
    #[serde(default)]
    pub sync_status: SyncStatus,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        user: User,
        created_at: DateTime<Utc>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(id),
            text: text.into(),
            message_type: MessageType::Regular,
            user,
            created_at,
            updated_at: None,
            deleted_at: None,
            mentioned_users: Vec::new(),
            attachments: Vec::new(),
            parent_id: None,
            reaction_counts: BTreeMap::new(),
            sync_status: SyncStatus::Synced,
        }
    }

    pub fn author_id(&self) -> &UserId {
        &self.user.id
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_thread_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelUserRead {
    pub user: User,
    pub last_read: DateTime<Utc>,
}

impl ChannelUserRead {
    pub fn new(user: User, last_read: DateTime<Utc>) -> Self {
        Self { user, last_read }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    #[serde(default)]
    pub role: MemberRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Member {
    pub fn new(user: User) -> Self {
        Self {
            user,
            role: MemberRole::Member,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watcher {
    pub user: User,
}

impl Watcher {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub cid: Cid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub frozen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<User>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_data: BTreeMap<String, Value>,
}

impl ChannelInfo {
    pub fn new(cid: Cid) -> Self {
        Self {
            cid,
            name: None,
            image: None,
            frozen: false,
            created_at: None,
            created_by: None,
            extra_data: BTreeMap::new(),
        }
    }

    /// Explicit channel name, treating blank strings as absent.
    pub fn explicit_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.trim().is_empty())
    }
}

/// Full channel state as returned by a channel query. Absent collections mean
/// "no update for that field".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub channel: ChannelInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reads: Option<Vec<ChannelUserRead>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Member>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchers: Option<Vec<Watcher>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watcher_count: Option<u32>,
}

impl ChannelSnapshot {
    pub fn empty(channel: ChannelInfo) -> Self {
        Self {
            channel,
            messages: None,
            reads: None,
            members: None,
            watchers: None,
            watcher_count: None,
        }
    }

    pub fn cid(&self) -> &Cid {
        &self.channel.cid
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ChannelEvent {
    NewMessage {
        message: Message,
    },
    MessageUpdated {
        message: Message,
    },
    MessageDeleted {
        message_id: MessageId,
        deleted_at: DateTime<Utc>,
    },
    ReactionChanged {
        message: Message,
    },
    ReadMarked {
        user: User,
        last_read: DateTime<Utc>,
    },
    MemberAdded {
        member: Member,
    },
    MemberUpdated {
        member: Member,
    },
    MemberRemoved {
        member: Member,
    },
    WatcherAdded {
        watcher: Watcher,
    },
    WatcherRemoved {
        watcher: Watcher,
    },
    ChannelUpdated {
        channel: ChannelInfo,
    },
    TypingStarted {
        user: User,
    },
    TypingStopped {
        user: User,
    },
}

impl ChannelEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewMessage { .. } => "new_message",
            Self::MessageUpdated { .. } => "message_updated",
            Self::MessageDeleted { .. } => "message_deleted",
            Self::ReactionChanged { .. } => "reaction_changed",
            Self::ReadMarked { .. } => "read_marked",
            Self::MemberAdded { .. } => "member_added",
            Self::MemberUpdated { .. } => "member_updated",
            Self::MemberRemoved { .. } => "member_removed",
            Self::WatcherAdded { .. } => "watcher_added",
            Self::WatcherRemoved { .. } => "watcher_removed",
            Self::ChannelUpdated { .. } => "channel_updated",
            Self::TypingStarted { .. } => "typing_started",
            Self::TypingStopped { .. } => "typing_stopped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    ChannelEvent {
        cid: Cid,
        event: ChannelEvent,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        watcher_count: Option<u32>,
    },
    ChannelDeleted {
        cid: Cid,
    },
    ConnectionRecovered,
    Error(ApiError),
}

impl ServerEvent {
    pub fn cid(&self) -> Option<&Cid> {
        match self {
            Self::ChannelEvent { cid, .. } | Self::ChannelDeleted { cid } => Some(cid),
            Self::ConnectionRecovered | Self::Error(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryChannelsRequest {
    pub filter: Value,
    #[serde(default)]
    pub sort: Vec<SortField>,
    pub limit: u32,
    pub message_limit: u32,
    #[serde(default)]
    pub watch: bool,
}

impl QueryChannelsRequest {
    pub const DEFAULT_LIMIT: u32 = 30;

    pub fn new(filter: Value) -> Self {
        Self {
            filter,
            sort: vec![SortField {
                field: "last_message_at".into(),
                direction: SortDirection::Desc,
            }],
            limit: Self::DEFAULT_LIMIT,
            message_limit: Self::DEFAULT_LIMIT,
            watch: true,
        }
    }

    /// Query that re-fetches exactly the given channels.
    pub fn for_cids(cids: &[Cid]) -> Self {
        let cids: Vec<String> = cids.iter().map(ToString::to_string).collect();
        Self::new(json!({ "cid": { "$in": cids } }))
    }
}
