//! Outbox module
//!
//! This module tracks optimistic sends until the server confirms them:
//! - Outgoing messages awaiting their server copy
//! - Retry logic for sends made while disconnected
//! - Requeueing of unconfirmed sends after a lost connection
//!
//! Entries are keyed by the message's client correlation id.

use crate::store::Message;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An optimistic send awaiting confirmation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingSend {
    /// The optimistic copy
    pub message: Message,
    /// Number of failed delivery attempts
    pub attempts: u32,
    /// Next retry timestamp (Unix milliseconds)
    pub next_retry: i64,
}

impl PendingSend {
    fn client_id(&self) -> Option<&str> {
        self.message.client_id.as_deref()
    }

    /// Whether a server copy answers this send
    ///
    /// Echoes carrying the correlation id match on it; others match on room,
    /// sender and content.
    fn answered_by(&self, server: &Message) -> bool {
        match (self.client_id(), server.client_id.as_deref()) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => {
                self.message.room == server.room
                    && self.message.user.id == server.user.id
                    && self.message.content == server.content
            }
        }
    }
}

/// Outcome of a failed delivery attempt
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome {
    /// Another attempt is scheduled
    Scheduled {
        /// Failed attempts so far
        attempts: u32,
        /// Next retry timestamp (Unix milliseconds)
        next_retry: i64,
    },
    /// Retries exhausted; the message was removed and marked failed
    GaveUp(Message),
}

/// Unconfirmed outgoing messages
#[derive(Debug, Clone)]
pub struct Outbox {
    entries: Vec<PendingSend>,
    /// Maximum retry attempts
    max_retries: u32,
    /// Base delay for exponential backoff (milliseconds)
    base_delay_ms: i64,
}

impl Outbox {
    /// Create an empty outbox
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            max_retries: 5,
            base_delay_ms: 1000,
        }
    }

    /// Create an empty outbox with a custom retry policy
    pub fn with_policy(max_retries: u32, base_delay_ms: i64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            ..Self::new()
        }
    }

    /// Track an optimistic send
    ///
    /// The message must carry a client correlation id that is not tracked yet.
    pub fn enqueue(&mut self, message: Message, now: i64) -> Result<()> {
        let Some(client_id) = message.client_id.as_deref() else {
            return Err(Error::Queue(format!(
                "Message {} has no client id",
                message.id
            )));
        };
        if self.position(client_id).is_some() {
            return Err(Error::Queue(format!(
                "Message already queued: {}",
                client_id
            )));
        }
        debug!("Queued {} for room {}", client_id, message.room);
        self.entries.push(PendingSend {
            message,
            attempts: 0,
            next_retry: now,
        });
        Ok(())
    }

    /// Record that a send was handed to the connection
    pub fn mark_transmitted(&mut self, client_id: &str) -> Result<()> {
        let entry = self.entry_mut(client_id)?;
        entry.message.mark_sent();
        Ok(())
    }

    /// Record a failed attempt and schedule a retry with exponential backoff
    pub fn mark_failed(&mut self, client_id: &str, now: i64) -> Result<RetryOutcome> {
        let index = self
            .position(client_id)
            .ok_or_else(|| Error::Queue(format!("Message not found in queue: {}", client_id)))?;

        let new_attempts = self.entries[index].attempts + 1;
        if new_attempts >= self.max_retries {
            let mut entry = self.entries.remove(index);
            warn!("Giving up on {} after {} attempts", client_id, new_attempts);
            entry.message.mark_failed();
            return Ok(RetryOutcome::GaveUp(entry.message));
        }

        let delay = self.base_delay_ms * 2_i64.pow(new_attempts);
        let entry = &mut self.entries[index];
        entry.attempts = new_attempts;
        entry.next_retry = now + delay;
        Ok(RetryOutcome::Scheduled {
            attempts: new_attempts,
            next_retry: entry.next_retry,
        })
    }

    /// Remove the send a server copy answers
    pub fn confirm(&mut self, server: &Message) -> Option<PendingSend> {
        let index = self.entries.iter().position(|p| p.answered_by(server))?;
        let entry = self.entries.remove(index);
        debug!(
            "Confirmed {} as {}",
            entry.client_id().unwrap_or_default(),
            server.id
        );
        Some(entry)
    }

    /// Whether a server copy answers one of the tracked sends
    pub fn answers(&self, server: &Message) -> bool {
        self.entries.iter().any(|p| p.answered_by(server))
    }

    /// Untransmitted sends whose retry time has come
    pub fn due(&self, now: i64) -> Vec<Message> {
        self.entries
            .iter()
            .filter(|p| p.message.is_unconfirmed() && !p.message.is_transmitted())
            .filter(|p| p.next_retry <= now)
            .map(|p| p.message.clone())
            .collect()
    }

    /// Return transmitted but unconfirmed sends to pending
    ///
    /// Called when the connection drops before the server copies arrived.
    pub fn requeue_transmitted(&mut self, now: i64) -> usize {
        let mut requeued = 0;
        for entry in self.entries.iter_mut().filter(|p| p.message.is_transmitted()) {
            entry.message.mark_pending();
            entry.next_retry = now;
            requeued += 1;
        }
        if requeued > 0 {
            debug!("Requeued {} unconfirmed sends", requeued);
        }
        requeued
    }

    /// Get the current outbox size
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is awaiting confirmation
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All tracked sends, oldest first
    pub fn list(&self) -> &[PendingSend] {
        &self.entries
    }

    /// Clear all tracked sends
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Set base delay for exponential backoff (in milliseconds)
    pub fn set_base_delay_ms(&mut self, base_delay_ms: i64) {
        self.base_delay_ms = base_delay_ms;
    }

    fn position(&self, client_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|p| p.client_id() == Some(client_id))
    }

    fn entry_mut(&mut self, client_id: &str) -> Result<&mut PendingSend> {
        self.entries
            .iter_mut()
            .find(|p| p.client_id() == Some(client_id))
            .ok_or_else(|| Error::Queue(format!("Message not found in queue: {}", client_id)))
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new()
    }
}
