//! Conversation list controller (the messenger sidebar)

use crate::api::{CONVERSATIONS_PATH, ONLINE_USERS_PATH};
use crate::pagination::{PageSource, Paginator};
use crate::store::{ChatAction, ChatState, Conversation};
use crate::Result;
use tracing::debug;

/// Pagination state of the conversation and online-users lists
#[derive(Debug, Clone)]
pub struct ChatList {
    conversations: Paginator,
    online: Paginator,
}

impl ChatList {
    /// Create the controller with both lists unloaded
    pub fn new() -> Self {
        Self {
            conversations: Paginator::new(CONVERSATIONS_PATH),
            online: Paginator::new(ONLINE_USERS_PATH),
        }
    }

    /// Cursor of the conversation list
    pub fn conversations(&self) -> &Paginator {
        &self.conversations
    }

    /// Cursor of the online-users list
    pub fn online(&self) -> &Paginator {
        &self.online
    }

    /// Load the next page of conversations into the store
    ///
    /// # Returns
    /// Number of conversations received (0 once the list is complete)
    pub async fn load_conversations<S>(&mut self, source: &S, state: &mut ChatState) -> Result<usize>
    where
        S: PageSource<Conversation> + ?Sized,
    {
        let page = self.conversations.fetch_next(source).await?;
        let loaded = page.len();
        if loaded > 0 {
            state.apply(ChatAction::AddChatUserList(page));
        }
        debug!("Loaded {} conversations", loaded);
        Ok(loaded)
    }

    /// Load the next page of online users into the store
    pub async fn load_online<S>(&mut self, source: &S, state: &mut ChatState) -> Result<usize>
    where
        S: PageSource<Conversation> + ?Sized,
    {
        let page = self.online.fetch_next(source).await?;
        let loaded = page.len();
        if loaded > 0 {
            state.apply(ChatAction::AddChatOnlineUserList(page));
        }
        debug!("Loaded {} online users", loaded);
        Ok(loaded)
    }

    /// Open a list entry as a chat window
    pub fn open_window(&self, room: &str, state: &mut ChatState) -> bool {
        match state.conversation(room).cloned() {
            Some(conversation) => {
                state.apply(ChatAction::OpenChat(conversation));
                true
            }
            None => false,
        }
    }
}

impl Default for ChatList {
    fn default() -> Self {
        Self::new()
    }
}
