//! Chat state reducer
//!
//! [`ChatState`] is the single owned model behind every chat screen. It only
//! changes through [`ChatState::apply`], which runs one [`ChatAction`] to
//! completion and reports what happened as [`StoreSignal`]s for the
//! controllers that keep their own working copies (the open conversation
//! view). Actions naming an unknown room are no-ops.

use crate::store::conversation::Conversation;
use crate::store::history::{self, SeenIds};
use crate::store::message::Message;
use crate::store::notifications::NotificationQueue;
use crate::store::route::Route;
use crate::store::windows::WindowManager;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// A named, atomic mutation of the chat state
#[derive(Debug, Clone, PartialEq)]
pub enum ChatAction {
    /// Flag the conversation matching the route as the open one
    UpdateIsActive(Route),
    /// Upsert a page of the conversation list
    AddChatUserList(Vec<Conversation>),
    /// Upsert a page of the online-users list
    AddChatOnlineUserList(Vec<Conversation>),
    /// Insert a conversation by recency if it is not known yet
    AddChatUser(Conversation),
    /// Live `friend.online` / `friend.offline` snapshot
    PresenceChanged(Conversation),
    /// Drop a room from the online list
    RemoveChatOnlineUser(String),
    /// Move (or insert) a conversation to the head of the list
    UpdateChatPosition(Conversation),
    /// Explicit read: reset the unread count of a room
    MarkMessagesRead(String),
    /// Peer started typing in a room
    TypingStarted(String),
    /// Peer stopped typing in a room
    TypingStopped(String),
    /// Live inbound message
    NewMessage {
        /// The message
        message: Message,
        /// Unix milliseconds of arrival, used for toast expiry
        received_at: i64,
    },
    /// Server copy of an optimistic send
    ConfirmSent {
        /// Correlation id of the optimistic copy
        client_id: String,
        /// Server copy
        message: Message,
    },
    /// Peer read the room (`chat.read`)
    MarkRoomRead(String),
    /// Drop a room's buffered messages and reset its unread count
    EmptyRoomMessages(String),
    /// Manually close a toast
    CloseNotification(String),
    /// Clear all toasts
    EmptyNotifications,
    /// Dismiss toasts whose ttl has passed
    ExpireNotifications {
        /// Current Unix milliseconds
        now: i64,
    },
    /// Open a chat window
    OpenChat(Conversation),
    /// Expand/collapse an active chat window
    ToggleChat(String),
    /// Minimize an active chat window
    MinimizeChat(String),
    /// Restore a minimized chat window
    RestoreChat(String),
    /// Close a chat window
    CloseChat(String),
}

/// What an action did, for controllers outside the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSignal {
    /// The peer read every message in the room
    MessagesRead {
        /// Room id
        room: String,
    },
    /// Live messages were buffered for the room
    RoomMessagesArrived {
        /// Room id
        room: String,
    },
    /// A conversation was synthesized from an inbound message
    ConversationCreated {
        /// Room id
        room: String,
    },
    /// Toasts dismissed by expiry
    NotificationsExpired {
        /// Message ids of the dismissed toasts
        ids: Vec<String>,
    },
}

/// The chat state shared by every chat screen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatState {
    /// All conversations, most recent activity first
    pub chat_users: Vec<Conversation>,
    /// Conversations whose peer is online, most recently online first
    pub online_users: Vec<Conversation>,
    /// Toast queue
    pub notifications: NotificationQueue,
    /// Chat window sets
    pub windows: WindowManager,
    /// Server ids already delivered, per room
    #[serde(default)]
    pub seen: SeenIds,
}

impl ChatState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty state with a custom toast ttl
    pub fn with_notification_ttl(ttl_ms: i64) -> Self {
        Self {
            notifications: NotificationQueue::with_ttl(ttl_ms),
            ..Self::default()
        }
    }

    /// Apply one action
    pub fn apply(&mut self, action: ChatAction) -> Vec<StoreSignal> {
        trace!("Applying chat action {:?}", action);
        let mut signals = Vec::new();
        match action {
            ChatAction::UpdateIsActive(route) => {
                let open = route.room();
                for conv in self.both_lists_mut() {
                    conv.is_active = open == Some(conv.id.as_str());
                }
            }
            ChatAction::AddChatUserList(page) => {
                for conv in page {
                    if conv.is_online() && find(&self.online_users, &conv.id).is_none() {
                        self.online_users.push(conv.clone());
                    }
                    upsert(&mut self.chat_users, conv);
                }
            }
            ChatAction::AddChatOnlineUserList(page) => {
                for conv in page {
                    upsert(&mut self.online_users, conv);
                }
            }
            ChatAction::AddChatUser(mut conv) => {
                if find(&self.chat_users, &conv.id).is_some()
                    || find(&self.online_users, &conv.id).is_some()
                {
                    return signals;
                }
                conv.typing = false;
                let index = self
                    .chat_users
                    .iter()
                    .position(|c| c.last_message_at < conv.last_message_at)
                    .unwrap_or(0);
                self.chat_users.insert(index, conv);
            }
            ChatAction::PresenceChanged(snapshot) => self.presence_changed(snapshot),
            ChatAction::RemoveChatOnlineUser(room) => {
                self.online_users.retain(|c| c.id != room);
            }
            ChatAction::UpdateChatPosition(conv) => {
                self.chat_users.retain(|c| c.id != conv.id);
                self.chat_users.insert(0, conv);
            }
            ChatAction::MarkMessagesRead(room) => {
                for conv in self.room_mut(&room) {
                    conv.mark_read();
                }
            }
            ChatAction::TypingStarted(room) => {
                for conv in self.room_mut(&room) {
                    conv.typing = true;
                }
            }
            ChatAction::TypingStopped(room) => {
                for conv in self.room_mut(&room) {
                    conv.typing = false;
                }
            }
            ChatAction::NewMessage {
                message,
                received_at,
            } => self.new_message(message, received_at, &mut signals),
            ChatAction::ConfirmSent { client_id, message } => {
                self.seen.record(&message.room, &message.id);
                for conv in self.room_mut(&message.room) {
                    history::confirm_pending(&mut conv.messages, &client_id, &message);
                }
                self.windows.confirm_message(&client_id, &message);
            }
            ChatAction::MarkRoomRead(room) => {
                debug!("Room {} read by peer", room);
                signals.push(StoreSignal::MessagesRead { room });
            }
            ChatAction::EmptyRoomMessages(room) => {
                self.take_room_messages(&room);
            }
            ChatAction::CloseNotification(id) => {
                self.notifications.close(&id);
            }
            ChatAction::EmptyNotifications => self.notifications.clear(),
            ChatAction::ExpireNotifications { now } => {
                let ids = self.notifications.expire(now);
                if !ids.is_empty() {
                    signals.push(StoreSignal::NotificationsExpired { ids });
                }
            }
            ChatAction::OpenChat(conv) => self.windows.open(conv),
            ChatAction::ToggleChat(room) => self.windows.toggle(&room),
            ChatAction::MinimizeChat(room) => self.windows.minimize(&room),
            ChatAction::RestoreChat(room) => self.windows.restore(&room),
            ChatAction::CloseChat(room) => self.windows.close(&room),
        }
        signals
    }

    /// Drain a room's buffered messages, resetting its unread count
    ///
    /// Both lists hold a copy of the buffer; the general list's copy is
    /// returned, falling back to the online list's.
    pub fn take_room_messages(&mut self, room: &str) -> Vec<Message> {
        let from_chats = self
            .chat_users
            .iter_mut()
            .find(|c| c.id == room)
            .map(Conversation::take_messages);
        let from_online = self
            .online_users
            .iter_mut()
            .find(|c| c.id == room)
            .map(Conversation::take_messages);
        from_chats.or(from_online).unwrap_or_default()
    }

    /// Conversation of a room from the general list, else the online list
    pub fn conversation(&self, room: &str) -> Option<&Conversation> {
        find(&self.chat_users, room).or_else(|| find(&self.online_users, room))
    }

    /// Whether the peer of a room is typing, in either list
    pub fn is_typing(&self, room: &str) -> bool {
        find(&self.chat_users, room).is_some_and(|c| c.typing)
            || find(&self.online_users, room).is_some_and(|c| c.typing)
    }

    /// Number of online peers
    pub fn online_count(&self) -> usize {
        self.online_users.iter().filter(|c| c.is_online()).count()
    }

    /// Sum of unread counts over the general list
    pub fn total_unread(&self) -> u32 {
        self.chat_users.iter().map(|c| c.unread_count).sum()
    }

    fn presence_changed(&mut self, mut snapshot: Conversation) {
        snapshot.typing = false;
        snapshot.messages.clear();
        let room = snapshot.id.clone();

        if snapshot.is_online() {
            debug!("Peer {} is online", snapshot.friend.id);
            let previous = self
                .online_users
                .iter()
                .position(|c| c.id == room)
                .map(|i| self.online_users.remove(i));
            let mut entry = snapshot.clone();
            if let Some(previous) = previous {
                entry.messages = previous.messages;
                entry.unread_count = previous.unread_count;
                entry.last_message = previous.last_message;
                entry.last_message_at = previous.last_message_at;
            }
            self.online_users.insert(0, entry);
        } else {
            debug!("Peer {} is offline", snapshot.friend.id);
            self.online_users.retain(|c| c.id != room);
        }

        // Presence never reorders the general list.
        if let Some(conv) = self.chat_users.iter_mut().find(|c| c.id == room) {
            conv.refresh_from(&snapshot);
        }
    }

    fn new_message(&mut self, message: Message, received_at: i64, signals: &mut Vec<StoreSignal>) {
        let room = message.room.clone();
        let redelivered = !message.has_temp_id()
            && (self.seen.contains(&room, &message.id)
                || self
                    .conversation(&room)
                    .is_some_and(|c| history::contains(&c.messages, &message)));
        if redelivered {
            debug!("Dropping redelivered message {} for room {}", message.id, room);
            return;
        }
        if !message.has_temp_id() {
            self.seen.record(&room, &message.id);
        }

        for conv in self.room_mut(&room) {
            conv.push_message(message.clone());
        }

        match self.chat_users.iter().position(|c| c.id == room) {
            None => {
                debug!("Creating conversation for room {} from inbound message", room);
                self.chat_users.insert(0, Conversation::from_message(&message));
                signals.push(StoreSignal::ConversationCreated { room: room.clone() });
            }
            Some(0) => {}
            Some(index) => {
                let conv = self.chat_users.remove(index);
                self.chat_users.insert(0, conv);
            }
        }

        self.windows.add_message(message.clone());
        self.notifications.offer(message, received_at);
        signals.push(StoreSignal::RoomMessagesArrived { room });
    }

    fn both_lists_mut(&mut self) -> impl Iterator<Item = &mut Conversation> {
        self.chat_users.iter_mut().chain(self.online_users.iter_mut())
    }

    fn room_mut<'a>(&'a mut self, room: &'a str) -> impl Iterator<Item = &'a mut Conversation> + 'a {
        self.both_lists_mut().filter(move |c| c.id == room)
    }
}

fn find<'a>(list: &'a [Conversation], room: &str) -> Option<&'a Conversation> {
    list.iter().find(|c| c.id == room)
}

fn upsert(list: &mut Vec<Conversation>, conv: Conversation) {
    match list.iter_mut().find(|c| c.id == conv.id) {
        Some(slot) => *slot = conv,
        None => list.push(conv),
    }
}
