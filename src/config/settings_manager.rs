//! Thread-safe settings manager for concurrent access

use crate::{Result, config::settings::Settings};

/// Shared settings with automatic persistence
///
/// # Example
/// ```rust,no_run
/// use socialchat::config::SettingsManager;
///
/// # async fn example() -> socialchat::Result<()> {
/// let manager = SettingsManager::new("settings.json").await?;
///
/// let ttl = manager.get_notification_ttl_ms().await;
/// println!("Toasts live for {} ms", ttl);
///
/// manager.update(|s| s.reconnect_max_attempts = 0).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SettingsManager {
    /// Shared settings state
    settings: std::sync::Arc<tokio::sync::RwLock<Settings>>,
    /// Path to settings file for auto-save
    settings_path: std::sync::Arc<String>,
}

impl SettingsManager {
    /// Create a new settings manager
    ///
    /// Loads settings from the path (defaults if the file doesn't exist) and
    /// applies environment overrides.
    pub async fn new<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let settings = Settings::load_effective(&path)?;

        Ok(Self {
            settings: std::sync::Arc::new(tokio::sync::RwLock::new(settings)),
            settings_path: std::sync::Arc::new(path_str),
        })
    }

    /// Get the chat stream URL
    pub async fn get_ws_url(&self) -> String {
        let settings = self.settings.read().await;
        settings.ws_url.clone()
    }

    /// Get the REST base URL
    pub async fn get_api_base_url(&self) -> String {
        let settings = self.settings.read().await;
        settings.api_base_url.clone()
    }

    /// Get the toast lifetime in milliseconds
    pub async fn get_notification_ttl_ms(&self) -> i64 {
        let settings = self.settings.read().await;
        settings.notification_ttl_ms
    }

    /// Get a clone of all settings (for reading multiple values at once)
    pub async fn get_all(&self) -> Settings {
        let settings = self.settings.read().await;
        settings.clone()
    }

    /// Update multiple settings at once and auto-save
    pub async fn update<F>(&self, update_fn: F) -> Result<()>
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.settings.write().await;
        update_fn(&mut settings);
        settings.save(self.settings_path.as_str())
    }

    /// Reload settings from disk, applying the environment overrides again
    pub async fn reload(&self) -> Result<()> {
        let loaded = Settings::load_effective(self.settings_path.as_str())?;
        let mut settings = self.settings.write().await;
        *settings = loaded;
        Ok(())
    }

    /// Save current settings to disk
    pub async fn save(&self) -> Result<()> {
        let settings = self.settings.read().await;
        settings.save(self.settings_path.as_str())
    }
}
