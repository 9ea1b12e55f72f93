//! Merging paginated history with live-delivered messages
//!
//! The same message can reach a buffer twice: once over the live stream and
//! once in a REST history page, in either order. Merging is idempotent:
//! applying a page that is already (partly) buffered changes nothing for the
//! items already present.

use crate::store::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Server ids remembered per room for redelivery checks
pub const SEEN_IDS_PER_ROOM: usize = 256;

/// Identity used to recognize the same message across the stream and REST
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKey<'a> {
    /// Server-assigned id
    Id(&'a str),
    /// Sender, creation time and content, used when an id is only local
    Composite {
        /// Sender user id
        sender: &'a str,
        /// Creation time
        created_at: DateTime<Utc>,
        /// Content
        content: &'a str,
    },
}

impl<'a> MessageKey<'a> {
    /// Key of a message: its id when server-assigned, else the composite
    pub fn of(message: &'a Message) -> Self {
        if message.has_temp_id() {
            Self::composite(message)
        } else {
            MessageKey::Id(&message.id)
        }
    }

    /// Composite key regardless of the id
    pub fn composite(message: &'a Message) -> Self {
        MessageKey::Composite {
            sender: &message.user.id,
            created_at: message.created_at,
            content: &message.content,
        }
    }
}

/// Whether two messages denote the same logical message
///
/// Ids decide when both are server-assigned; otherwise the composite key
/// does. Equal content alone never makes two messages the same.
pub fn is_same_message(a: &Message, b: &Message) -> bool {
    if !a.has_temp_id() && !b.has_temp_id() {
        return a.id == b.id;
    }
    if let (Some(x), Some(y)) = (&a.client_id, &b.client_id) {
        return x == y;
    }
    MessageKey::composite(a) == MessageKey::composite(b)
}

/// Whether the buffer already holds a message
pub fn contains(buffer: &[Message], message: &Message) -> bool {
    buffer.iter().any(|m| is_same_message(m, message))
}

/// Prepend an older history page to a buffer
///
/// Pages arrive newest first, the buffer is oldest first. Items already in
/// the buffer are skipped, the rest go in front, and the result is stably
/// sorted by creation time so the seam between backfill and live arrivals is
/// chronological. Returns the number of messages added.
pub fn merge_backfill(buffer: &mut Vec<Message>, page: Vec<Message>) -> usize {
    let mut older: Vec<Message> = Vec::with_capacity(page.len());
    for message in page.into_iter().rev() {
        if !contains(buffer, &message) && !contains(&older, &message) {
            older.push(message);
        }
    }
    let added = older.len();
    if added == 0 {
        return 0;
    }
    older.append(buffer);
    *buffer = older;
    sort_chronologically(buffer);
    added
}

/// Append live messages to a buffer, skipping ones already present
///
/// Arrival order is kept; live appends are not re-sorted.
pub fn append_live(buffer: &mut Vec<Message>, live: Vec<Message>) -> usize {
    let mut added = 0;
    for message in live {
        if !contains(buffer, &message) {
            buffer.push(message);
            added += 1;
        }
    }
    added
}

/// Stable sort by creation time
pub fn sort_chronologically(buffer: &mut [Message]) {
    buffer.sort_by_key(|m| m.created_at);
}

/// Replace the optimistic copy tagged `client_id` with its server copy
///
/// If the buffer already holds the server copy (a history page got there
/// first), the optimistic copy is dropped instead, so the server id appears
/// once. Returns false if no optimistic copy was found.
pub fn confirm_pending(buffer: &mut Vec<Message>, client_id: &str, server: &Message) -> bool {
    let Some(index) = buffer
        .iter()
        .position(|m| m.has_temp_id() && m.client_id.as_deref() == Some(client_id))
    else {
        return false;
    };
    if buffer.iter().any(|m| m.id == server.id) {
        buffer.remove(index);
    } else {
        let mut confirmed = server.clone();
        confirmed.client_id = Some(client_id.to_string());
        buffer[index] = confirmed;
    }
    true
}

/// Recently delivered server ids per room
///
/// Outlives the room buffers, which are drained whenever a view takes them,
/// so a redelivery after a reconnect is still recognized. Each room keeps the
/// last [`SEEN_IDS_PER_ROOM`] ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeenIds {
    rooms: HashMap<String, VecDeque<String>>,
}

impl SeenIds {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` was already delivered to `room`
    pub fn contains(&self, room: &str, id: &str) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|ids| ids.iter().any(|seen| seen == id))
    }

    /// Remember `id` for `room`; returns false if it was already known
    pub fn record(&mut self, room: &str, id: &str) -> bool {
        if self.contains(room, id) {
            return false;
        }
        let ids = self.rooms.entry(room.to_string()).or_default();
        ids.push_back(id.to_string());
        if ids.len() > SEEN_IDS_PER_ROOM {
            ids.pop_front();
        }
        true
    }
}
