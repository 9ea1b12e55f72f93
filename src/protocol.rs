//! Protocol module
//!
//! This module defines the live stream wire format:
//! - The `{type, data}` JSON envelope
//! - Typed inbound events (presence, typing, messages, read receipts)
//! - Typed outbound commands
//!
//! Unknown event types are not errors; newer servers may send events this
//! client does not understand yet.

use crate::store::{Conversation, Message};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A peer came online
pub const FRIEND_ONLINE: &str = "friend.online";
/// A peer went offline
pub const FRIEND_OFFLINE: &str = "friend.offline";
/// A peer started typing
pub const FRIEND_TYPING_START: &str = "friend.typing.start";
/// A peer stopped typing
pub const FRIEND_TYPING_STOP: &str = "friend.typing.stop";
/// A chat message
pub const CHAT_MESSAGE: &str = "chat.message";
/// A read receipt for a room
pub const CHAT_READ: &str = "chat.read";

/// Raw envelope of every stream message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Event type
    #[serde(rename = "type")]
    pub kind: String,
    /// Event-specific payload
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Payload of the room-only events
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomPayload {
    /// Room id
    pub room: String,
}

/// A typed event received over the stream
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// `friend.online` with the conversation snapshot
    FriendOnline(Conversation),
    /// `friend.offline` with the conversation snapshot
    FriendOffline(Conversation),
    /// `friend.typing.start`
    TypingStarted {
        /// Room id
        room: String,
    },
    /// `friend.typing.stop`
    TypingStopped {
        /// Room id
        room: String,
    },
    /// `chat.message` with the full server record
    ChatMessage(Message),
    /// `chat.read`
    ChatRead {
        /// Room id
        room: String,
    },
}

impl InboundEvent {
    /// Wire name of the event type
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::FriendOnline(_) => FRIEND_ONLINE,
            InboundEvent::FriendOffline(_) => FRIEND_OFFLINE,
            InboundEvent::TypingStarted { .. } => FRIEND_TYPING_START,
            InboundEvent::TypingStopped { .. } => FRIEND_TYPING_STOP,
            InboundEvent::ChatMessage(_) => CHAT_MESSAGE,
            InboundEvent::ChatRead { .. } => CHAT_READ,
        }
    }
}

/// A typed command sent over the stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum OutboundCommand {
    /// Send a chat message
    #[serde(rename = "chat.message")]
    ChatMessage {
        /// Room id
        room: String,
        /// Sender (local user) id
        user: String,
        /// Text content
        content: String,
        /// Correlation id of the optimistic copy
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
    /// Tell the peer the room has been read
    #[serde(rename = "chat.read")]
    ChatRead {
        /// Room id
        room: String,
    },
    /// Local user started typing
    #[serde(rename = "friend.typing.start")]
    TypingStart {
        /// Room id
        room: String,
    },
    /// Local user stopped typing
    #[serde(rename = "friend.typing.stop")]
    TypingStop {
        /// Room id
        room: String,
    },
}

impl OutboundCommand {
    /// `chat.message` command carrying an optimistic message
    pub fn chat_message(message: &Message) -> Self {
        OutboundCommand::ChatMessage {
            room: message.room.clone(),
            user: message.user.id.clone(),
            content: message.content.clone(),
            client_id: message.client_id.clone(),
        }
    }

    /// Room the command targets
    pub fn room(&self) -> &str {
        match self {
            OutboundCommand::ChatMessage { room, .. }
            | OutboundCommand::ChatRead { room }
            | OutboundCommand::TypingStart { room }
            | OutboundCommand::TypingStop { room } => room,
        }
    }

    /// Encode the command as a JSON text frame
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::JsonSerialization)
    }
}

/// Decode a text frame into a typed event
///
/// Returns `Ok(None)` for well-formed envelopes of an unknown type and an
/// error for anything that is not a valid envelope or payload.
pub fn parse_inbound(text: &str) -> Result<Option<InboundEvent>> {
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| Error::Protocol(format!("Invalid envelope: {}", e)))?;

    let event = match envelope.kind.as_str() {
        FRIEND_ONLINE => InboundEvent::FriendOnline(payload(&envelope)?),
        FRIEND_OFFLINE => InboundEvent::FriendOffline(payload(&envelope)?),
        FRIEND_TYPING_START => InboundEvent::TypingStarted {
            room: payload::<RoomPayload>(&envelope)?.room,
        },
        FRIEND_TYPING_STOP => InboundEvent::TypingStopped {
            room: payload::<RoomPayload>(&envelope)?.room,
        },
        CHAT_MESSAGE => InboundEvent::ChatMessage(payload(&envelope)?),
        CHAT_READ => InboundEvent::ChatRead {
            room: payload::<RoomPayload>(&envelope)?.room,
        },
        _ => return Ok(None),
    };
    Ok(Some(event))
}

fn payload<T: serde::de::DeserializeOwned>(envelope: &Envelope) -> Result<T> {
    T::deserialize(&envelope.data)
        .map_err(|e| Error::Protocol(format!("Invalid {} payload: {}", envelope.kind, e)))
}
