//! Client settings and configuration

use crate::transport::ReconnectPolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding [`Settings::api_base_url`]
pub const ENV_API_URL: &str = "SOCIALCHAT_API_URL";
/// Environment variable overriding [`Settings::ws_url`]
pub const ENV_WS_URL: &str = "SOCIALCHAT_WS_URL";

/// Client settings
///
/// Stored as JSON. Missing fields take their defaults, so older files keep
/// loading after new tunables are added.
///
/// # Example
/// ```rust,no_run
/// use socialchat::config::Settings;
///
/// let mut settings = Settings::load("settings.json").expect("Failed to load");
/// settings.update_reconnect_max_attempts(20, "settings.json").expect("Failed to update");
/// println!("Chat stream: {}", settings.ws_url);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the chat REST service (with trailing slash)
    pub api_base_url: String,
    /// URL of the live chat stream, without the token query
    pub ws_url: String,
    /// Endpoint exchanging a refresh token for a new access token
    pub refresh_url: String,
    /// First reconnect delay in milliseconds
    pub reconnect_base_delay_ms: u64,
    /// Upper bound of the reconnect delay in milliseconds
    pub reconnect_max_delay_ms: u64,
    /// Reconnect attempts after a failed or lost connection before giving up
    /// (0 = never give up); the first connect is not counted
    pub reconnect_max_attempts: u32,
    /// Lifetime of a message toast in milliseconds
    pub notification_ttl_ms: i64,
    /// Keystroke inactivity before a typing-stop is sent, in milliseconds
    pub typing_timeout_ms: i64,
    /// Resend attempts for an unconfirmed message before it is failed
    pub max_send_retries: u32,
    /// Base delay of the resend backoff in milliseconds
    pub send_retry_base_delay_ms: i64,
}

impl Settings {
    /// Load settings from a JSON file
    ///
    /// # Returns
    /// The loaded settings, or default settings if the file doesn't exist or
    /// is empty
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read settings: {}", e)))?;

        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Save settings to a JSON file, creating parent directories
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create settings directory: {}", e)))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, json)
            .map_err(|e| Error::Config(format!("Failed to write settings: {}", e)))?;

        Ok(())
    }

    /// Apply `SOCIALCHAT_API_URL` / `SOCIALCHAT_WS_URL` if set
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply URL overrides looked up by variable name
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(url) = lookup(ENV_WS_URL) {
            self.ws_url = url;
        }
        self
    }

    /// Load settings from a JSON file and apply the environment overrides
    pub fn load_effective<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Ok(Self::load(path)?.with_env_overrides())
    }

    /// Update the reconnect attempt limit and auto-save
    pub fn update_reconnect_max_attempts<P: AsRef<std::path::Path>>(
        &mut self,
        attempts: u32,
        save_path: P,
    ) -> Result<()> {
        self.reconnect_max_attempts = attempts;
        self.save(save_path)
    }

    /// Reconnect policy described by these settings
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay_ms: self.reconnect_base_delay_ms,
            max_delay_ms: self.reconnect_max_delay_ms.max(self.reconnect_base_delay_ms),
            max_attempts: self.reconnect_max_attempts,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:888/api/chat/".to_string(),
            ws_url: "ws://localhost:888/api/chat/ws/chat/".to_string(),
            refresh_url: "http://localhost:8010/api/users/refresh/".to_string(),
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 30_000,
            reconnect_max_attempts: 10,
            notification_ttl_ms: 10_000,
            typing_timeout_ms: 3000,
            max_send_retries: 5,
            send_retry_base_delay_ms: 1000,
        }
    }
}
