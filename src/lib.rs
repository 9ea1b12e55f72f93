//! Socialchat - real-time chat and presence client core
//!
//! This library holds the client-side chat engine of a social networking
//! frontend: the live event stream, the chat state store with its window and
//! notification policies, REST pagination with history merging, and the
//! screen controllers that consume the store.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod messaging;
pub mod pagination;
pub mod protocol;
pub mod queue;
pub mod session;
pub mod store;
pub mod transport;

#[cfg(test)]
mod tests;

/// Result type alias for Socialchat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Socialchat operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or unexpected stream payload
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// REST endpoint answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Access credential missing, malformed or not refreshable
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Configuration loading/saving error
    #[error("Config error: {0}")]
    Config(String),

    /// Page request refused or failed
    #[error("Pagination error: {0}")]
    Pagination(String),

    /// Outbox error
    #[error("Queue error: {0}")]
    Queue(String),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Initialize the Socialchat library with logging
///
/// Honors `RUST_LOG` and falls back to `info`. Calling it more than once is
/// harmless.
pub fn init() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
