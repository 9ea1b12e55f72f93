//! Screen controllers
//!
//! This module holds the controllers that consume the chat state:
//! - The conversation list (messenger sidebar and online panel)
//! - The open conversation view with its history and typing indicator
//! - The session dispatcher routing stream events and navigation

pub mod app;
pub mod chat_list;
pub mod conversation_view;

pub use app::ChatSession;
pub use chat_list::ChatList;
pub use conversation_view::{ConversationView, DEFAULT_TYPING_TIMEOUT_MS, TypingDebouncer};
