//! Conversation (room) management

use crate::store::message::Message;
use crate::store::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A one-to-one conversation with a friend
///
/// The room id is the peer's user id. Records arrive from the REST
/// conversation lists and from presence events, so every field except the id
/// and the friend defaults when missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Room id
    pub id: String,
    /// The peer
    pub friend: User,
    /// Preview of the most recent message
    #[serde(default)]
    pub last_message: Option<String>,
    /// Time of the most recent message
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    /// Messages received since the room was last read
    #[serde(default)]
    pub unread_count: u32,
    /// Whether the peer is typing
    #[serde(default)]
    pub typing: bool,
    /// Whether this room is the currently open route
    #[serde(default)]
    pub is_active: bool,
    /// Live messages not yet taken by the conversation view
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation with a friend
    pub fn new(friend: User) -> Self {
        Self {
            id: friend.id.clone(),
            friend,
            last_message: None,
            last_message_at: None,
            unread_count: 0,
            typing: false,
            is_active: false,
            messages: Vec::new(),
        }
    }

    /// Synthesize a conversation from the first message seen for a room
    pub fn from_message(message: &Message) -> Self {
        Self {
            id: message.room.clone(),
            friend: message.user.clone(),
            last_message: Some(message.content.clone()),
            last_message_at: Some(message.created_at),
            unread_count: 1,
            typing: false,
            is_active: false,
            messages: vec![message.clone()],
        }
    }

    /// Append a live message, updating the preview and the unread count
    pub fn push_message(&mut self, message: Message) {
        self.last_message = Some(message.content.clone());
        self.last_message_at = Some(message.created_at);
        self.unread_count += 1;
        self.messages.push(message);
    }

    /// Reset the unread count
    pub fn mark_read(&mut self) {
        self.unread_count = 0;
    }

    /// Drop the buffered messages and reset the unread count
    pub fn take_messages(&mut self) -> Vec<Message> {
        self.unread_count = 0;
        std::mem::take(&mut self.messages)
    }

    /// Refresh fields carried by a newer snapshot of the same room
    ///
    /// Only the friend (presence) changes; local message state survives.
    pub fn refresh_from(&mut self, snapshot: &Conversation) {
        self.friend = snapshot.friend.clone();
    }

    /// Whether the peer is online
    pub fn is_online(&self) -> bool {
        self.friend.is_online
    }
}
