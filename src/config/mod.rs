//! Configuration module
//!
//! - `settings` - Endpoints and tunables, persisted as JSON
//! - `settings_manager` - Shared, auto-saving access to the settings

pub mod settings;
pub mod settings_manager;

pub use settings::Settings;
pub use settings_manager::SettingsManager;
