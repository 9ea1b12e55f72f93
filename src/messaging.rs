//! High-level messaging module
//!
//! This module provides user-facing messaging functions that combine the
//! session, the stream handle and the outbox for reliable delivery.

use crate::{
    protocol::OutboundCommand,
    queue::RetryOutcome,
    session::ChatSession,
    transport::StreamHandle,
    Result,
};
use chrono::Utc;
use tracing::{error, info, warn};

/// What happened to an outgoing message
#[derive(Debug, Clone, PartialEq)]
pub enum SendState {
    /// Handed to the open connection, awaiting the server copy
    Transmitted,
    /// Not connected; kept pending in the outbox
    Queued,
    /// Delivery failed, will retry
    Retry {
        /// Current attempt number
        attempt: u32,
        /// Next retry timestamp in milliseconds
        next_retry_ms: i64,
    },
    /// Retries exhausted
    Failed,
}

/// Send a chat message from the open conversation view
///
/// The message is applied optimistically and tracked by the outbox before
/// anything touches the wire. If the stream is down it stays pending and
/// [`flush_outbox`] sends it once the connection is back.
///
/// # Arguments
/// * `session` - The chat session with the conversation open
/// * `handle` - Stream handle for sending
/// * `content` - Message text
///
/// # Returns
/// * `Ok(Some(SendState::Transmitted))` - Written to the stream
/// * `Ok(Some(SendState::Queued))` - Kept pending until reconnect
/// * `Ok(None)` - No conversation open, or blank input
/// * `Err(Error)` - Failed to encode or track the message
///
/// # Example
/// ```rust,no_run
/// use socialchat::config::Settings;
/// use socialchat::messaging::send_message;
/// use socialchat::session::ChatSession;
/// use socialchat::store::{Route, User};
/// use socialchat::transport::StreamHandle;
///
/// # async fn example() -> socialchat::Result<()> {
/// let mut session = ChatSession::new(User::new("me", "Me"), &Settings::default());
/// session.navigate(Route::conversation("alice"));
///
/// let handle = StreamHandle::detached();
/// if let Some(state) = send_message(&mut session, &handle, "Hello, Alice!").await? {
///     println!("Message is {:?}", state);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn send_message(
    session: &mut ChatSession,
    handle: &StreamHandle,
    content: &str,
) -> Result<Option<SendState>> {
    let Some((message, commands)) = session.compose(content, Utc::now())? else {
        return Ok(None);
    };

    let mut transmitted = false;
    for command in &commands {
        transmitted = handle.send(command).await?;
    }

    let state = if transmitted {
        if let Some(client_id) = message.client_id.as_deref() {
            session.send_transmitted(client_id)?;
        }
        SendState::Transmitted
    } else {
        SendState::Queued
    };
    log_send_state(&message.room, &state);
    Ok(Some(state))
}

/// Send pending outbox entries whose retry time has come
///
/// Called after reconnecting and on a timer. Entries that cannot be sent
/// count a failed attempt and back off exponentially; exhausted entries are
/// shown as failed.
pub async fn flush_outbox(
    session: &mut ChatSession,
    handle: &StreamHandle,
    now: i64,
) -> Result<Vec<SendState>> {
    let due = session.outbox().due(now);
    if due.is_empty() {
        return Ok(Vec::new());
    }
    info!("Flushing {} pending messages", due.len());

    let mut states = Vec::with_capacity(due.len());
    for message in due {
        let Some(client_id) = message.client_id.clone() else {
            continue;
        };
        let state = if handle.send(&OutboundCommand::chat_message(&message)).await? {
            session.send_transmitted(&client_id)?;
            SendState::Transmitted
        } else {
            match session.outbox_mut().mark_failed(&client_id, now)? {
                RetryOutcome::Scheduled {
                    attempts,
                    next_retry,
                } => SendState::Retry {
                    attempt: attempts,
                    next_retry_ms: next_retry,
                },
                RetryOutcome::GaveUp(failed) => {
                    session.send_failed(&failed);
                    SendState::Failed
                }
            }
        };
        log_send_state(&message.room, &state);
        states.push(state);
    }
    Ok(states)
}

/// Send commands in order
///
/// # Returns
/// Number of commands handed to the connection; the rest were dropped
/// because the stream is not connected.
pub async fn dispatch_commands(handle: &StreamHandle, commands: Vec<OutboundCommand>) -> Result<usize> {
    let mut sent = 0;
    for command in commands {
        if handle.send(&command).await? {
            sent += 1;
        } else {
            warn!("Dropped {:?} while disconnected", command);
        }
    }
    Ok(sent)
}

/// Log send state
pub fn log_send_state(room: &str, state: &SendState) {
    match state {
        SendState::Transmitted => {
            info!("✓ Message sent to room {}", room);
        }
        SendState::Queued => {
            info!("⊙ Message queued for room {}", room);
        }
        SendState::Retry {
            attempt,
            next_retry_ms,
        } => {
            warn!(
                "⟲ Message to room {} not sent (attempt {}), will retry at timestamp {}",
                room, attempt, next_retry_ms
            );
        }
        SendState::Failed => {
            error!("✗ Message to room {} failed permanently", room);
        }
    }
}
