//! Client routes the chat subsystem cares about

use std::fmt;

/// Path of the messenger section
pub const MESSENGER_PATH: &str = "/messenger";

/// Where the user currently is
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    /// Anywhere outside the messenger section
    #[default]
    Elsewhere,
    /// The messenger section without an open room
    Messenger,
    /// `/messenger/<room>`
    Conversation(String),
}

impl Route {
    /// Parse a pathname; query strings are ignored
    pub fn parse(path: &str) -> Self {
        let path = path.split('?').next().unwrap_or_default();
        let mut parts = path.trim_end_matches('/').split('/').skip(1);
        match (parts.next(), parts.next()) {
            (Some("messenger"), Some(room)) if !room.is_empty() => {
                Route::Conversation(room.to_string())
            }
            (Some("messenger"), None) => Route::Messenger,
            _ => Route::Elsewhere,
        }
    }

    /// Route of an open conversation
    pub fn conversation(room: &str) -> Self {
        Route::Conversation(room.to_string())
    }

    /// Whether the route is inside the messenger section
    pub fn is_messenger(&self) -> bool {
        !matches!(self, Route::Elsewhere)
    }

    /// The open room, if any
    pub fn room(&self) -> Option<&str> {
        match self {
            Route::Conversation(room) => Some(room),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Elsewhere => write!(f, "/"),
            Route::Messenger => write!(f, "{}", MESSENGER_PATH),
            Route::Conversation(room) => write!(f, "{}/{}", MESSENGER_PATH, room),
        }
    }
}
