//! Open conversation controller
//!
//! Owns the working buffer of the conversation on screen: history pages
//! merged from REST, live messages taken from the store, and optimistic sends
//! awaiting confirmation. It also debounces the local typing indicator.

use crate::api;
use crate::pagination::{Page, PageSource, Paginator};
use crate::protocol::OutboundCommand;
use crate::store::{ChatAction, ChatState, Conversation, Direction, Message, Route, User, history};
use crate::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Default keystroke inactivity before a typing-stop, in milliseconds
pub const DEFAULT_TYPING_TIMEOUT_MS: i64 = 3000;

/// Local typing indicator for one room
///
/// The first keystroke sends a typing-start; inactivity for `timeout_ms` or
/// an explicit stop sends the matching typing-stop.
#[derive(Debug, Clone)]
pub struct TypingDebouncer {
    room: String,
    timeout_ms: i64,
    last_keystroke: Option<i64>,
}

impl TypingDebouncer {
    /// Create an idle debouncer
    pub fn new(room: &str, timeout_ms: i64) -> Self {
        Self {
            room: room.to_string(),
            timeout_ms,
            last_keystroke: None,
        }
    }

    /// Whether a typing-start has been sent without its stop
    pub fn is_typing(&self) -> bool {
        self.last_keystroke.is_some()
    }

    /// Record a keystroke at `now` (Unix milliseconds)
    pub fn keystroke(&mut self, now: i64) -> Option<OutboundCommand> {
        let started = self.last_keystroke.replace(now).is_none();
        started.then(|| OutboundCommand::TypingStart {
            room: self.room.clone(),
        })
    }

    /// Stop typing if the timeout has passed
    pub fn tick(&mut self, now: i64) -> Option<OutboundCommand> {
        match self.last_keystroke {
            Some(last) if now - last >= self.timeout_ms => self.stop(),
            _ => None,
        }
    }

    /// Stop typing now
    pub fn stop(&mut self) -> Option<OutboundCommand> {
        self.last_keystroke.take().map(|_| OutboundCommand::TypingStop {
            room: self.room.clone(),
        })
    }
}

/// The conversation currently on screen
#[derive(Debug, Clone)]
pub struct ConversationView {
    room: String,
    local_user: User,
    messages: Vec<Message>,
    history: Paginator,
    typing: TypingDebouncer,
}

impl ConversationView {
    /// Create the view of a room
    pub fn new(room: &str, local_user: User, typing_timeout_ms: i64) -> Self {
        Self {
            room: room.to_string(),
            local_user,
            messages: Vec::new(),
            history: Paginator::new(api::messages_path(room)),
            typing: TypingDebouncer::new(room, typing_timeout_ms),
        }
    }

    /// Room id
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Messages on screen, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// History cursor
    pub fn history(&self) -> &Paginator {
        &self.history
    }

    /// Mutable history cursor, for driving page loads by hand
    pub fn history_mut(&mut self) -> &mut Paginator {
        &mut self.history
    }

    /// Whether the local user is marked as typing
    pub fn is_typing(&self) -> bool {
        self.typing.is_typing()
    }

    /// Mount the view: flag the route, read the room and take its buffer
    ///
    /// Returns a read receipt if anything was unread.
    pub fn open(&mut self, state: &mut ChatState) -> Option<OutboundCommand> {
        let unread = state
            .conversation(&self.room)
            .map(|c| c.unread_count)
            .unwrap_or(0);
        state.apply(ChatAction::UpdateIsActive(Route::conversation(&self.room)));
        state.apply(ChatAction::MarkMessagesRead(self.room.clone()));
        let absorbed = self.take_buffered(state);
        debug!(
            "Opened room {} ({} unread, {} buffered)",
            self.room, unread, absorbed
        );
        (unread > 0 || absorbed > 0).then(|| self.read_receipt())
    }

    /// Unmount the view
    pub fn close(&mut self, state: &mut ChatState) -> Option<OutboundCommand> {
        state.apply(ChatAction::UpdateIsActive(Route::Messenger));
        self.typing.stop()
    }

    /// Take the conversation record fetched for this room
    ///
    /// Returns a read receipt if the record shows unread messages.
    pub fn on_room_user(
        &mut self,
        mut conversation: Conversation,
        state: &mut ChatState,
    ) -> Option<OutboundCommand> {
        conversation.is_active = true;
        let unread = conversation.unread_count;
        state.apply(ChatAction::AddChatUser(conversation));
        if unread == 0 {
            return None;
        }
        state.apply(ChatAction::MarkMessagesRead(self.room.clone()));
        Some(self.read_receipt())
    }

    /// Move live messages buffered in the store into the view
    ///
    /// Returns a read receipt if any of them came from the peer.
    pub fn absorb_live(&mut self, state: &mut ChatState) -> Option<OutboundCommand> {
        let before = self.messages.len();
        self.take_buffered(state);
        let received = self.messages[before..]
            .iter()
            .any(|m| m.direction == Direction::Received);
        received.then(|| self.read_receipt())
    }

    /// The peer read the room
    pub fn on_peer_read(&mut self) {
        for message in self.messages.iter_mut().filter(|m| !m.is_read) {
            message.mark_read();
        }
    }

    /// Merge an older history page (newest first, as served)
    pub fn apply_history_page(&mut self, page: Vec<Message>) -> usize {
        history::merge_backfill(&mut self.messages, page)
    }

    /// Finish a history request started through [`ConversationView::history_mut`]
    pub fn complete_history(&mut self, result: Result<Page<Message>>) -> usize {
        match self.history.complete(result) {
            Some(page) => self.apply_history_page(page),
            None => 0,
        }
    }

    /// Load the next older history page
    pub async fn load_history<S>(&mut self, source: &S) -> Result<usize>
    where
        S: PageSource<Message> + ?Sized,
    {
        let page = self.history.fetch_next(source).await?;
        Ok(self.apply_history_page(page))
    }

    /// Append an optimistic message
    ///
    /// Blank input is ignored. Sending also ends the typing indicator, so the
    /// returned commands hold an optional typing-stop followed by the message.
    pub fn compose(
        &mut self,
        content: &str,
        now: DateTime<Utc>,
    ) -> Option<(Message, Vec<OutboundCommand>)> {
        if content.trim().is_empty() {
            return None;
        }
        let message = Message::outgoing(&self.room, &self.local_user, content, now);
        self.messages.push(message.clone());

        let mut commands: Vec<OutboundCommand> = self.typing.stop().into_iter().collect();
        commands.push(OutboundCommand::chat_message(&message));
        Some((message, commands))
    }

    /// Replace an optimistic message with its server copy
    ///
    /// Drops the optimistic copy instead when a history page already
    /// delivered the server copy.
    pub fn confirm(&mut self, client_id: &str, server: &Message) -> bool {
        history::confirm_pending(&mut self.messages, client_id, server)
    }

    /// Update the local copy of a send the outbox is tracking
    pub fn update_send(&mut self, pending: &Message) {
        if let Some(slot) = self
            .messages
            .iter_mut()
            .find(|m| m.client_id.is_some() && m.client_id == pending.client_id)
        {
            slot.delivery_status = pending.delivery_status;
        }
    }

    /// Record a keystroke in the composer
    pub fn keystroke(&mut self, now: i64) -> Option<OutboundCommand> {
        self.typing.keystroke(now)
    }

    /// Advance the typing timeout
    pub fn tick(&mut self, now: i64) -> Option<OutboundCommand> {
        self.typing.tick(now)
    }

    fn take_buffered(&mut self, state: &mut ChatState) -> usize {
        let live = state.take_room_messages(&self.room);
        history::append_live(&mut self.messages, live)
    }

    fn read_receipt(&self) -> OutboundCommand {
        OutboundCommand::ChatRead {
            room: self.room.clone(),
        }
    }
}
