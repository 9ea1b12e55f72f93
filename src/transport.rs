//! Live event stream transport
//!
//! This module owns the persistent connection to the chat stream:
//! - WebSocket connect with the access token as `?token=` query
//! - Typed decoding of inbound frames
//! - Outbound command delivery while connected
//! - Reconnection with exponential backoff and credential refresh
//!
//! The connection runs on its own task. The owner reads [`StreamEvent`]s from
//! [`EventStream::recv`] and sends commands through a cloneable
//! [`StreamHandle`]. Dropping the [`EventStream`] shuts the task down.

use crate::api::SharedCredentials;
use crate::protocol::{InboundEvent, OutboundCommand, parse_inbound};
use crate::Result;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, watch};
use tokio_tungstenite::tungstenite::Message as Frame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;

/// Capacity of the inbound event channel
const EVENT_BUFFER: usize = 256;

/// Connection lifecycle as seen by the owner of the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// First connect in progress
    Connecting,
    /// Connected; commands are delivered
    Open,
    /// Waiting to reconnect after a lost or failed connection
    Reconnecting {
        /// Consecutive failed attempts so far
        attempt: u32,
    },
    /// Shut down, or gave up after too many failed attempts
    Closed,
}

/// Reconnect backoff
///
/// The delay before attempt `n` (counted from 1) is
/// `min(base * 2^(n-1), max)` plus up to 10% jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// First delay in milliseconds
    pub base_delay_ms: u64,
    /// Delay cap in milliseconds
    pub max_delay_ms: u64,
    /// Reconnect attempts after a failed or lost connection before giving
    /// up (0 = never); the first connect is not counted
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Backoff delay before `attempt`, without jitter
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1).min(32);
        self.base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms)
    }

    /// Backoff delay before `attempt`, with jitter
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff = self.backoff_ms(attempt);
        let jitter = rand::thread_rng().gen_range(0..=backoff / 10);
        Duration::from_millis(backoff + jitter)
    }

    /// Whether reconnect `attempt` (counted from 1) may still be made
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts == 0 || attempt <= self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            max_attempts: 10,
        }
    }
}

/// Something that happened on the stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The connection changed state
    State(ConnectionState),
    /// A decoded inbound event
    Event(InboundEvent),
}

/// Cloneable sender of outbound commands
#[derive(Debug, Clone, Default)]
pub struct StreamHandle {
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
}

impl StreamHandle {
    /// A handle with no connection behind it
    pub fn detached() -> Self {
        Self::default()
    }

    /// A handle delivering frames into `sender`
    pub fn with_sender(sender: mpsc::UnboundedSender<String>) -> Self {
        Self {
            outbound: Arc::new(Mutex::new(Some(sender))),
        }
    }

    /// Send a command
    ///
    /// # Returns
    /// * `Ok(true)` - Handed to the open connection
    /// * `Ok(false)` - Not connected; nothing was sent
    /// * `Err` - The command could not be encoded
    pub async fn send(&self, command: &OutboundCommand) -> Result<bool> {
        let frame = command.to_json()?;
        let outbound = self.outbound.lock().await;
        match outbound.as_ref() {
            Some(sender) if sender.send(frame).is_ok() => {
                debug!("Sent {:?} for room {}", command, command.room());
                Ok(true)
            }
            _ => {
                debug!("Stream not connected, {} not sent", command.room());
                Ok(false)
            }
        }
    }

    /// Whether a connection is currently attached
    pub async fn is_connected(&self) -> bool {
        self.outbound
            .lock()
            .await
            .as_ref()
            .is_some_and(|s| !s.is_closed())
    }

    async fn attach(&self, sender: mpsc::UnboundedSender<String>) {
        *self.outbound.lock().await = Some(sender);
    }

    async fn detach(&self) {
        *self.outbound.lock().await = None;
    }
}

/// Build the stream URL carrying the access token
pub fn build_stream_url(ws_url: &Url, token: &str) -> Url {
    let mut url = ws_url.clone();
    url.query_pairs_mut().append_pair("token", token);
    url
}

/// A live, self-reconnecting chat stream
#[derive(Debug)]
pub struct EventStream {
    events: mpsc::Receiver<StreamEvent>,
    handle: StreamHandle,
    shutdown: watch::Sender<bool>,
}

impl EventStream {
    /// Start connecting to `ws_url`
    ///
    /// Returns immediately; progress is reported as
    /// [`StreamEvent::State`] events.
    pub fn connect(
        ws_url: &str,
        policy: ReconnectPolicy,
        credentials: SharedCredentials,
    ) -> Result<Self> {
        let ws_url = Url::parse(ws_url)?;
        let (events_tx, events) = mpsc::channel(EVENT_BUFFER);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = StreamHandle::detached();

        info!("Starting chat stream to {}", ws_url);
        tokio::spawn(run(
            ws_url,
            policy,
            credentials,
            handle.clone(),
            events_tx,
            shutdown_rx,
        ));

        Ok(Self {
            events,
            handle,
            shutdown,
        })
    }

    /// Next stream event, or `None` once the stream is closed for good
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Handle for sending commands
    pub fn handle(&self) -> StreamHandle {
        self.handle.clone()
    }

    /// Close the connection and stop reconnecting
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// How a connected session ended
enum SessionEnd {
    /// Connection lost; reconnect
    Disconnected,
    /// Shutdown requested or nobody is listening; stop
    Shutdown,
}

async fn run(
    ws_url: Url,
    policy: ReconnectPolicy,
    credentials: SharedCredentials,
    handle: StreamHandle,
    events: mpsc::Sender<StreamEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let state = if attempt == 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting { attempt }
        };
        if events.send(StreamEvent::State(state)).await.is_err() {
            break;
        }

        let token = {
            let mut credentials = credentials.lock().await;
            match credentials.fresh_access_token().await {
                Ok(token) => token,
                Err(e) => {
                    warn!("Credential refresh failed, connecting with current token: {}", e);
                    credentials.access().to_string()
                }
            }
        };

        let url = build_stream_url(&ws_url, &token);
        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                info!("Chat stream connected");
                attempt = 0;

                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                handle.attach(outbound_tx).await;
                if events
                    .send(StreamEvent::State(ConnectionState::Open))
                    .await
                    .is_err()
                {
                    break;
                }

                let end = pump(ws, outbound_rx, &events, &mut shutdown).await;
                handle.detach().await;
                match end {
                    SessionEnd::Shutdown => break,
                    SessionEnd::Disconnected => warn!("Chat stream disconnected"),
                }
            }
            Err(e) => warn!("Chat stream connect failed: {}", e),
        }

        attempt += 1;
        if !policy.allows(attempt) {
            warn!("Giving up on chat stream after {} attempts", attempt - 1);
            break;
        }

        let delay = policy.delay_for(attempt);
        debug!("Reconnecting in {:?} (attempt {})", delay, attempt);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }
    }

    handle.detach().await;
    let _ = events.send(StreamEvent::State(ConnectionState::Closed)).await;
    info!("Chat stream closed");
}

async fn pump(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: &mpsc::Sender<StreamEvent>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Frame::Text(text))) => match parse_inbound(&text) {
                    Ok(Some(event)) => {
                        debug!("Received {}", event.kind());
                        if events.send(StreamEvent::Event(event)).await.is_err() {
                            return SessionEnd::Shutdown;
                        }
                    }
                    Ok(None) => debug!("Ignoring unknown stream event: {}", text),
                    Err(e) => warn!("Dropping malformed frame: {}", e),
                },
                Some(Ok(Frame::Close(_))) | None => return SessionEnd::Disconnected,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Chat stream read error: {}", e);
                    return SessionEnd::Disconnected;
                }
            },
            Some(text) = outbound.recv() => {
                if let Err(e) = sink.send(Frame::Text(text)).await {
                    warn!("Chat stream write error: {}", e);
                    return SessionEnd::Disconnected;
                }
            }
            _ = shutdown.changed() => {
                let _ = sink.send(Frame::Close(None)).await;
                return SessionEnd::Shutdown;
            }
        }
    }
}
