//! Friend/peer references as seen by the chat subsystem

use serde::{Deserialize, Serialize};

/// A user referenced by conversations and messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque user identifier
    pub id: String,
    /// Display name
    pub full_name: String,
    /// Presence flag, the only field chat ever changes
    #[serde(default)]
    pub is_online: bool,
    /// Avatar background colour (hex without `#`), may be empty
    #[serde(default)]
    pub bg_color: String,
}

impl User {
    /// Create a new user reference
    pub fn new(id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: full_name.into(),
            is_online: false,
            bg_color: String::new(),
        }
    }

    /// Mark this user online
    pub fn go_online(&mut self) {
        self.is_online = true;
    }

    /// Mark this user offline
    pub fn go_offline(&mut self) {
        self.is_online = false;
    }

    /// Upper-cased initials for avatar bubbles ("ada lovelace" -> "AL")
    pub fn initials(&self) -> String {
        self.full_name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}
