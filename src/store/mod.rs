//! Chat state store
//!
//! This module holds the in-memory model the UI derives its presentation from:
//! - Users and conversations (rooms)
//! - Message buffers and delivery status
//! - The chat state reducer
//! - Conversation window policy (active/minimized)
//! - The toast notification queue
//! - History merging for paginated backfill
//!
//! Everything here is synchronous and free of I/O. Mutation of the shared
//! state goes through [`ChatState::apply`].

pub mod chat_state;
pub mod conversation;
pub mod history;
pub mod message;
pub mod notifications;
pub mod route;
pub mod user;
pub mod windows;

pub use chat_state::{ChatAction, ChatState, StoreSignal};
pub use conversation::Conversation;
pub use history::SeenIds;
pub use message::{DeliveryStatus, Direction, Message};
pub use notifications::{Notification, NotificationQueue};
pub use route::Route;
pub use user::User;
pub use windows::{ChatWindow, WindowManager};
