//! Conversation window policy
//!
//! Every window created during a session stays in the chats history. At most
//! [`ACTIVE_CAPACITY`] windows are open as panes and at most
//! [`MINIMIZED_CAPACITY`] are collapsed to bubbles; a room is never in both.

use crate::store::conversation::Conversation;
use crate::store::history;
use crate::store::message::Message;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Maximum number of open chat panes
pub const ACTIVE_CAPACITY: usize = 3;

/// Maximum number of minimized chat bubbles
pub const MINIMIZED_CAPACITY: usize = 3;

/// A chat window and its message buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatWindow {
    /// Conversation snapshot the window was opened with
    pub conversation: Conversation,
    /// Expanded (true) or collapsed to its title bar (false) while active
    pub opened: bool,
    /// Messages shown in the pane
    pub messages: Vec<Message>,
    /// Messages that arrived while the pane was collapsed or minimized
    pub new_messages: u32,
}

impl ChatWindow {
    /// Create an expanded window for a conversation
    pub fn new(conversation: Conversation) -> Self {
        Self {
            conversation,
            opened: true,
            messages: Vec::new(),
            new_messages: 0,
        }
    }

    /// Room id of the window
    pub fn room(&self) -> &str {
        &self.conversation.id
    }

    fn expand(&mut self) {
        self.opened = true;
        self.new_messages = 0;
    }
}

/// Active/minimized window sets over the chats history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowManager {
    chats: Vec<ChatWindow>,
    active: VecDeque<String>,
    minimized: VecDeque<String>,
}

impl WindowManager {
    /// Create an empty window manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a conversation as an active pane
    ///
    /// Already active: expand it. Known from history: move it to the head of
    /// the active set, leaving the minimized set. Unknown: create it.
    pub fn open(&mut self, conversation: Conversation) {
        let room = conversation.id.clone();
        if self.is_active(&room) {
            if let Some(window) = self.window_mut(&room) {
                window.expand();
            }
            return;
        }

        match self.window_mut(&room) {
            Some(window) => {
                window.conversation.refresh_from(&conversation);
                window.expand();
            }
            None => {
                debug!("Creating chat window for room {}", room);
                self.chats.push(ChatWindow::new(conversation));
            }
        }
        self.minimized.retain(|r| r != &room);
        self.push_active(room);
    }

    /// Expand or collapse an active pane
    pub fn toggle(&mut self, room: &str) {
        if !self.is_active(room) {
            return;
        }
        if let Some(window) = self.window_mut(room) {
            if window.opened {
                window.opened = false;
            } else {
                window.expand();
            }
        }
    }

    /// Move an active pane to the head of the minimized set
    pub fn minimize(&mut self, room: &str) {
        if !self.is_active(room) {
            return;
        }
        self.active.retain(|r| r != room);
        self.push_minimized(room.to_string());
    }

    /// Move a minimized bubble back to the head of the active set
    pub fn restore(&mut self, room: &str) {
        if !self.is_minimized(room) {
            return;
        }
        self.minimized.retain(|r| r != room);
        if let Some(window) = self.window_mut(room) {
            window.expand();
        }
        self.push_active(room.to_string());
    }

    /// Close a pane or bubble; the chats history keeps the window
    pub fn close(&mut self, room: &str) {
        self.active.retain(|r| r != room);
        self.minimized.retain(|r| r != room);
    }

    /// Append a message to the window of its room, if one exists
    ///
    /// Counts as new unless the pane is active and expanded. A message the
    /// window already shows is skipped and returns false.
    pub fn add_message(&mut self, message: Message) -> bool {
        let visible = self.is_active(&message.room)
            && self.window(&message.room).is_some_and(|w| w.opened);
        match self.window_mut(&message.room) {
            Some(window) if history::contains(&window.messages, &message) => false,
            Some(window) => {
                if !visible {
                    window.new_messages += 1;
                }
                window.messages.push(message);
                true
            }
            None => false,
        }
    }

    /// Replace an optimistic copy in a window buffer with the server copy
    pub fn confirm_message(&mut self, client_id: &str, confirmed: &Message) -> bool {
        match self.window_mut(&confirmed.room) {
            Some(window) => history::confirm_pending(&mut window.messages, client_id, confirmed),
            None => false,
        }
    }

    /// Active panes, most recently inserted first
    pub fn active(&self) -> Vec<&ChatWindow> {
        self.active.iter().filter_map(|r| self.window(r)).collect()
    }

    /// Minimized bubbles, most recently inserted first
    pub fn minimized(&self) -> Vec<&ChatWindow> {
        self.minimized.iter().filter_map(|r| self.window(r)).collect()
    }

    /// Every window created this session
    pub fn chats(&self) -> &[ChatWindow] {
        &self.chats
    }

    /// Window of a room
    pub fn window(&self, room: &str) -> Option<&ChatWindow> {
        self.chats.iter().find(|w| w.room() == room)
    }

    fn window_mut(&mut self, room: &str) -> Option<&mut ChatWindow> {
        self.chats.iter_mut().find(|w| w.room() == room)
    }

    /// Whether a room is an active pane
    pub fn is_active(&self, room: &str) -> bool {
        self.active.iter().any(|r| r == room)
    }

    /// Whether a room is a minimized bubble
    pub fn is_minimized(&self, room: &str) -> bool {
        self.minimized.iter().any(|r| r == room)
    }

    fn push_active(&mut self, room: String) {
        self.active.retain(|r| r != &room);
        self.active.push_front(room);
        if self.active.len() <= ACTIVE_CAPACITY {
            return;
        }
        // Evicts the oldest inserted pane, not the least recently used one.
        if let Some(evicted) = self.active.pop_back() {
            if self.is_minimized(&evicted) {
                // The pane is already gone from the active set at this point.
                warn!("Evicted room {} is already minimized, dropping it from view", evicted);
                return;
            }
            debug!("Active windows full, minimizing room {}", evicted);
            self.push_minimized(evicted);
        }
    }

    fn push_minimized(&mut self, room: String) {
        self.minimized.retain(|r| r != &room);
        self.minimized.push_front(room);
        if self.minimized.len() > MINIMIZED_CAPACITY {
            if let Some(dropped) = self.minimized.pop_back() {
                debug!("Minimized windows full, dropping room {}", dropped);
            }
        }
    }
}
