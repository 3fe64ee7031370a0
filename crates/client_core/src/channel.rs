use chrono::{DateTime, Utc};
use shared::{
    domain::{Cid, User, UserId},
    protocol::ChannelInfo,
};

use crate::{
    presence,
    state::ChannelState,
    unread,
    view::ChannelView,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub(crate) info: ChannelInfo,
    pub(crate) state: ChannelState,
}

impl Channel {
    pub fn new(info: ChannelInfo) -> Self {
        Self {
            info,
            state: ChannelState::new(),
        }
    }

    pub fn cid(&self) -> &Cid {
        &self.info.cid
    }

    pub fn info(&self) -> &ChannelInfo {
        &self.info
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn unread_count(&self, user_id: &UserId) -> usize {
        unread::unread_message_count(self.state.messages.all(), &self.state.reads, user_id)
    }

    pub fn unread_mention_count(&self, user_id: &UserId) -> usize {
        unread::unread_mention_count(self.state.messages.all(), &self.state.reads, user_id)
    }

    pub fn other_users(&self, current_user: &UserId) -> Vec<User> {
        presence::other_users(&self.state.members, &self.state.watchers, current_user)
    }

    pub fn last_active(&self, current_user: &UserId) -> DateTime<Utc> {
        let others = self.other_users(current_user);
        self.last_active_with(&others, current_user)
    }

    pub fn display_name(&self, current_user: &UserId) -> String {
        presence::channel_display_name(&self.info, &self.other_users(current_user))
    }

    fn last_active_with(&self, others: &[User], current_user: &UserId) -> DateTime<Utc> {
        presence::last_active(
            &self.info,
            self.state.messages.all(),
            self.state.last_known_active_watcher,
            others,
            current_user,
        )
    }

    pub fn view(&self, current_user: &UserId, now: DateTime<Utc>) -> ChannelView {
        let state = &self.state;
        let others = self.other_users(current_user);
        let last_message = state.last_message.clone();

        ChannelView {
            cid: self.info.cid.clone(),
            name: self.info.explicit_name().map(str::to_string),
            display_name: presence::channel_display_name(&self.info, &others),
            image: self.info.image.clone(),
            frozen: self.info.frozen,
            unread_count: self.unread_count(current_user),
            unread_mention_count: self.unread_mention_count(current_user),
            last_active: self.last_active_with(&others, current_user),
            last_reader: state.reads.last_reader_excluding(current_user).cloned(),
            last_message_reads: state
                .reads
                .last_message_reads(last_message.as_ref(), current_user),
            read_last_message: state.reads.has_read(current_user, last_message.as_ref()),
            last_message,
            other_users: others,
            typing_users: state.typing_users(now, current_user),
            watcher_count: state.watcher_count,
            member_count: state.members.len(),
            message_count: state.messages.len(),
            sync_state: state.sync_state,
        }
    }
}

#[cfg(test)]
#[path = "tests/channel_tests.rs"]
mod tests;
