use chrono::{DateTime, Utc};
use shared::protocol::{ChannelEvent, ChannelSnapshot};
use tracing::{debug, warn};

use crate::{channel::Channel, state::SyncState};

impl Channel {
    /// Folds a full channel snapshot into the current state. Reads, watcher
    /// count and members are taken from the snapshot when present; messages
    /// and watchers are merged. Absent fields leave the state untouched.
    pub fn init(&mut self, incoming: ChannelSnapshot, now: DateTime<Utc>) {
        let ChannelSnapshot {
            channel,
            messages,
            reads,
            members,
            watchers,
            watcher_count,
        } = incoming;

        if channel.cid == self.info.cid {
            self.info = channel;
        } else {
            warn!(
                cid = %self.info.cid,
                incoming = %channel.cid,
                "sync: ignoring channel metadata for a different cid"
            );
        }

        let state = &mut self.state;
        if let Some(reads) = reads {
            state.reads.replace_all(reads);
        }
        if let Some(watcher_count) = watcher_count {
            state.set_watcher_count(watcher_count, now);
        }
        if let Some(messages) = messages {
            state.upsert_messages(messages);
        }
        if let Some(watchers) = watchers {
            for watcher in watchers {
                state.add_watcher(watcher);
            }
        }
        if let Some(members) = members {
            state.replace_members(members);
        }

        state.recompute_last_message();
        state.sync_state = SyncState::Synced;

        debug!(
            cid = %self.info.cid,
            messages = state.messages.len(),
            reads = state.reads.len(),
            members = state.members.len(),
            watchers = state.watchers.len(),
            "sync: merged channel snapshot"
        );
    }

    pub fn apply_event(
        &mut self,
        event: ChannelEvent,
        watcher_count: Option<u32>,
        now: DateTime<Utc>,
    ) {
        let kind = event.kind();
        let state = &mut self.state;

        if let Some(watcher_count) = watcher_count {
            state.set_watcher_count(watcher_count, now);
        }
        state.expire_typing(now);

        match event {
            ChannelEvent::NewMessage { message }
            | ChannelEvent::MessageUpdated { message }
            | ChannelEvent::ReactionChanged { message } => {
                state.upsert_messages([message]);
            }
            ChannelEvent::MessageDeleted {
                message_id,
                deleted_at,
            } => {
                if !state.mark_message_deleted(&message_id, deleted_at) {
                    debug!(
                        cid = %self.info.cid,
                        message_id = %message_id,
                        "sync: delete for unknown or already deleted message"
                    );
                }
            }
            ChannelEvent::ReadMarked { user, last_read } => {
                state.reads.upsert(user, last_read);
            }
            ChannelEvent::MemberAdded { member } | ChannelEvent::MemberUpdated { member } => {
                state.add_or_update_member(member);
            }
            ChannelEvent::MemberRemoved { member } => {
                state.remove_member(member.user_id());
            }
            ChannelEvent::WatcherAdded { watcher } => {
                state.add_watcher(watcher);
            }
            ChannelEvent::WatcherRemoved { watcher } => {
                state.remove_watcher(&watcher);
            }
            ChannelEvent::TypingStarted { user } => {
                state.set_typing(user, now);
            }
            ChannelEvent::TypingStopped { user } => {
                state.clear_typing(&user.id);
            }
            ChannelEvent::ChannelUpdated { channel } => {
                if channel.cid == self.info.cid {
                    self.info = channel;
                } else {
                    warn!(
                        cid = %self.info.cid,
                        incoming = %channel.cid,
                        "sync: ignoring channel update for a different cid"
                    );
                }
            }
        }

        self.state.recompute_last_message();
        debug!(cid = %self.info.cid, kind, "sync: applied channel event");
    }

    /// `init` for a snapshot read back from the cache, which also carries the
    /// last activity of watchers that had already left.
    pub fn restore(
        &mut self,
        incoming: ChannelSnapshot,
        last_known_active_watcher: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) {
        self.init(incoming, now);
        if let Some(last_active) = last_known_active_watcher {
            self.state.note_active_watcher(last_active);
        }
    }
}
