//! Toast notifications for incoming messages

use crate::store::message::Message;
use crate::store::route::Route;
use serde::{Deserialize, Serialize};

/// Maximum number of queued notifications
pub const NOTIFICATION_CAPACITY: usize = 5;

/// Default lifetime of a notification in milliseconds
pub const DEFAULT_NOTIFICATION_TTL_MS: i64 = 10_000;

/// A queued toast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Snapshot of the message
    pub message: Message,
    /// Unix milliseconds when the toast was queued
    pub queued_at: i64,
    /// Unix milliseconds after which the toast dismisses itself
    pub expires_at: i64,
}

impl Notification {
    /// Id of the underlying message
    pub fn id(&self) -> &str {
        &self.message.id
    }

    /// Whether the toast has outlived its ttl
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Bounded newest-first queue of notifications
///
/// Independent of conversation unread counts: closing or expiring a toast
/// never touches a room, and reading a room never clears its toasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationQueue {
    items: Vec<Notification>,
    ttl_ms: i64,
}

impl NotificationQueue {
    /// Create an empty queue with the default ttl
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_NOTIFICATION_TTL_MS)
    }

    /// Create an empty queue with a custom ttl
    pub fn with_ttl(ttl_ms: i64) -> Self {
        Self {
            items: Vec::with_capacity(NOTIFICATION_CAPACITY + 1),
            ttl_ms,
        }
    }

    /// Offer a message; returns false if it was already queued
    pub fn offer(&mut self, message: Message, now: i64) -> bool {
        if self.items.iter().any(|n| n.message.id == message.id) {
            return false;
        }
        self.items.insert(
            0,
            Notification {
                message,
                queued_at: now,
                expires_at: now + self.ttl_ms,
            },
        );
        self.items.truncate(NOTIFICATION_CAPACITY);
        true
    }

    /// Manual close
    pub fn close(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.message.id != id);
        self.items.len() != before
    }

    /// Drop everything (navigating into the messenger section)
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Dismiss expired toasts, returning their ids
    pub fn expire(&mut self, now: i64) -> Vec<String> {
        let mut expired = Vec::new();
        self.items.retain(|n| {
            if n.is_expired(now) {
                expired.push(n.message.id.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    /// All queued toasts, newest first
    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    /// Toasts to render for a route; none inside the messenger section
    pub fn visible(&self, route: &Route) -> &[Notification] {
        if route.is_messenger() {
            &[]
        } else {
            &self.items
        }
    }

    /// Number of queued toasts
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}
