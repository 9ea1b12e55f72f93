//! Chat messages and local delivery status tracking

use crate::store::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of locally generated ids for optimistic sends
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Whether the local user sent or received a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sent by the local user
    Sent,
    /// Received from the peer
    Received,
}

/// Local delivery status of a message
///
/// Never part of the wire format: server copies are always `Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// Applied optimistically, not yet written to the stream
    Pending,
    /// Written to the stream, waiting for the server echo
    Sent,
    /// Server copy with a server-assigned id
    Confirmed,
    /// Gave up after the outbox exhausted its retries
    Failed,
}

impl Default for DeliveryStatus {
    fn default() -> Self {
        Self::Confirmed
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Server id, or a `tmp-` id for optimistic sends
    pub id: String,
    /// Sender
    pub user: User,
    /// Text content
    pub content: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Read receipt flag
    #[serde(default)]
    pub is_read: bool,
    /// Sent or received, from the local user's point of view
    pub direction: Direction,
    /// Owning room id
    pub room: String,
    /// Correlation id of an optimistic send, echoed back by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Local delivery status
    #[serde(default, skip_serializing)]
    pub delivery_status: DeliveryStatus,
}

impl Message {
    /// Create an optimistic outgoing message with a temporary id
    ///
    /// The returned message is `Pending` and carries a fresh correlation id.
    pub fn outgoing(room: &str, sender: &User, content: &str, created_at: DateTime<Utc>) -> Self {
        let client_id = uuid::Uuid::new_v4().to_string();
        Self {
            id: format!("{}{}", TEMP_ID_PREFIX, client_id),
            user: sender.clone(),
            content: content.trim().to_string(),
            created_at,
            is_read: false,
            direction: Direction::Sent,
            room: room.to_string(),
            client_id: Some(client_id),
            delivery_status: DeliveryStatus::Pending,
        }
    }

    /// Whether the id was generated locally
    pub fn has_temp_id(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    /// Whether this is an optimistic send still waiting for its server copy
    pub fn is_unconfirmed(&self) -> bool {
        matches!(
            self.delivery_status,
            DeliveryStatus::Pending | DeliveryStatus::Sent
        )
    }

    /// Mark message as written to the stream
    pub fn mark_sent(&mut self) {
        if self.delivery_status == DeliveryStatus::Pending {
            self.delivery_status = DeliveryStatus::Sent;
        }
    }

    /// Whether the send was written to the stream but not yet confirmed
    pub fn is_transmitted(&self) -> bool {
        self.delivery_status == DeliveryStatus::Sent
    }

    /// Return an unconfirmed send to `Pending` after a lost connection
    pub fn mark_pending(&mut self) {
        if self.delivery_status == DeliveryStatus::Sent {
            self.delivery_status = DeliveryStatus::Pending;
        }
    }

    /// Mark message as failed
    pub fn mark_failed(&mut self) {
        self.delivery_status = DeliveryStatus::Failed;
    }

    /// Mark message as read by the peer
    pub fn mark_read(&mut self) {
        self.is_read = true;
    }

    /// Get human-readable delivery status indicator
    ///
    /// Received messages carry no indicator.
    pub fn status_indicator(&self) -> &str {
        if self.direction == Direction::Received {
            return "";
        }
        match self.delivery_status {
            DeliveryStatus::Pending => "↻",
            DeliveryStatus::Sent => "✓",
            DeliveryStatus::Confirmed if self.is_read => "✓✓",
            DeliveryStatus::Confirmed => "✓",
            DeliveryStatus::Failed => "✗",
        }
    }

    /// Local clock time ("HH:MM") shown next to the bubble
    pub fn time_label(&self) -> String {
        self.created_at
            .with_timezone(&chrono::Local)
            .format("%H:%M")
            .to_string()
    }
}
