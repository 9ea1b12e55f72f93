//! Chat session dispatcher
//!
//! [`ChatSession`] is the single owner of the chat state. It turns stream
//! events, navigation and composer input into store actions, routes the
//! resulting signals to the open conversation view, and hands back the
//! commands to send over the stream.

use crate::config::Settings;
use crate::pagination::{Page, PageSource};
use crate::protocol::{InboundEvent, OutboundCommand};
use crate::queue::Outbox;
use crate::session::chat_list::ChatList;
use crate::session::conversation_view::ConversationView;
use crate::store::{
    ChatAction, ChatState, Conversation, Direction, Message, Notification, Route, StoreSignal, User,
};
use crate::transport::ConnectionState;
use crate::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// One user's chat session
#[derive(Debug)]
pub struct ChatSession {
    local_user: User,
    state: ChatState,
    route: Route,
    view: Option<ConversationView>,
    chat_list: ChatList,
    outbox: Outbox,
    connection: ConnectionState,
    typing_timeout_ms: i64,
}

impl ChatSession {
    /// Create a session for the signed-in user
    pub fn new(local_user: User, settings: &Settings) -> Self {
        Self {
            local_user,
            state: ChatState::with_notification_ttl(settings.notification_ttl_ms),
            route: Route::default(),
            view: None,
            chat_list: ChatList::new(),
            outbox: Outbox::with_policy(settings.max_send_retries, settings.send_retry_base_delay_ms),
            connection: ConnectionState::Closed,
            typing_timeout_ms: settings.typing_timeout_ms,
        }
    }

    /// The signed-in user
    pub fn local_user(&self) -> &User {
        &self.local_user
    }

    /// The chat state
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Current route
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// The open conversation view, if any
    pub fn view(&self) -> Option<&ConversationView> {
        self.view.as_ref()
    }

    /// Conversation list controller
    pub fn chat_list(&self) -> &ChatList {
        &self.chat_list
    }

    /// Unconfirmed sends
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Mutable outbox, for the delivery loop
    pub fn outbox_mut(&mut self) -> &mut Outbox {
        &mut self.outbox
    }

    /// Last reported stream state
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Toasts to render on the current route
    pub fn visible_notifications(&self) -> &[Notification] {
        self.state.notifications.visible(&self.route)
    }

    /// Apply a store action and route its signals
    pub fn dispatch(&mut self, action: ChatAction) -> Vec<OutboundCommand> {
        let signals = self.state.apply(action);
        self.route_signals(signals)
    }

    /// Handle one decoded stream event
    pub fn handle_event(&mut self, event: InboundEvent, now: i64) -> Vec<OutboundCommand> {
        match event {
            InboundEvent::FriendOnline(conversation) | InboundEvent::FriendOffline(conversation) => {
                self.dispatch(ChatAction::PresenceChanged(conversation))
            }
            InboundEvent::TypingStarted { room } => self.dispatch(ChatAction::TypingStarted(room)),
            InboundEvent::TypingStopped { room } => self.dispatch(ChatAction::TypingStopped(room)),
            InboundEvent::ChatMessage(message) => {
                if message.direction == Direction::Sent && self.outbox.answers(&message) {
                    self.confirm_sent(message);
                    return Vec::new();
                }
                self.dispatch(ChatAction::NewMessage {
                    message,
                    received_at: now,
                })
            }
            InboundEvent::ChatRead { room } => self.dispatch(ChatAction::MarkRoomRead(room)),
        }
    }

    /// Move to another route
    ///
    /// Entering the messenger section clears the toasts. Entering a
    /// conversation mounts its view; leaving one unmounts it.
    pub fn navigate(&mut self, route: Route) -> Vec<OutboundCommand> {
        if route == self.route {
            return Vec::new();
        }
        info!("Navigating from {} to {}", self.route, route);
        let mut commands = Vec::new();

        if route.is_messenger() && !self.route.is_messenger() {
            self.state.apply(ChatAction::EmptyNotifications);
        }

        let keep_view = self
            .view
            .as_ref()
            .is_some_and(|v| route.room() == Some(v.room()));
        if !keep_view {
            if let Some(mut view) = self.view.take() {
                commands.extend(view.close(&mut self.state));
            }
        }

        self.route = route;
        self.state.apply(ChatAction::UpdateIsActive(self.route.clone()));

        if let Some(room) = self.route.room().map(str::to_string) {
            if self.view.is_none() {
                let mut view =
                    ConversationView::new(&room, self.local_user.clone(), self.typing_timeout_ms);
                commands.extend(view.open(&mut self.state));
                self.view = Some(view);
            }
        }
        commands
    }

    /// Take the conversation record fetched for `room`
    ///
    /// Records for a room that is no longer open are discarded.
    pub fn on_room_user(&mut self, room: &str, result: Result<Conversation>) -> Vec<OutboundCommand> {
        let Some(view) = self.view.as_mut().filter(|v| v.room() == room) else {
            debug!("Discarding room user for closed room {}", room);
            return Vec::new();
        };
        match result {
            Ok(conversation) => view.on_room_user(conversation, &mut self.state).into_iter().collect(),
            Err(e) => {
                warn!("Failed to load room {}: {}", room, e);
                Vec::new()
            }
        }
    }

    /// Start the next history request of the open view
    ///
    /// Returns the room and link to fetch.
    pub fn begin_history(&mut self) -> Option<(String, String)> {
        let view = self.view.as_mut()?;
        let link = view.history_mut().begin_next()?;
        Some((view.room().to_string(), link))
    }

    /// Finish a history request for `room`
    ///
    /// Pages for a room that is no longer open are discarded.
    pub fn on_history_page(&mut self, room: &str, result: Result<Page<Message>>) -> usize {
        match self.view.as_mut().filter(|v| v.room() == room) {
            Some(view) => view.complete_history(result),
            None => {
                debug!("Discarding history page for closed room {}", room);
                0
            }
        }
    }

    /// Load the next older history page of the open view
    pub async fn load_history<S>(&mut self, source: &S) -> Result<usize>
    where
        S: PageSource<Message> + ?Sized,
    {
        match self.view.as_mut() {
            Some(view) => view.load_history(source).await,
            None => Ok(0),
        }
    }

    /// Load the next conversation list page
    pub async fn load_conversations<S>(&mut self, source: &S) -> Result<usize>
    where
        S: PageSource<Conversation> + ?Sized,
    {
        self.chat_list.load_conversations(source, &mut self.state).await
    }

    /// Load the next online-users page
    pub async fn load_online<S>(&mut self, source: &S) -> Result<usize>
    where
        S: PageSource<Conversation> + ?Sized,
    {
        self.chat_list.load_online(source, &mut self.state).await
    }

    /// Open a list entry as a chat window
    pub fn open_window(&mut self, room: &str) -> bool {
        self.chat_list.open_window(room, &mut self.state)
    }

    /// Compose a message in the open view
    ///
    /// The message is shown immediately, tracked by the outbox and its
    /// conversation moves to the head of the list. Returns the optimistic copy
    /// and the commands to send; `None` if no view is open or the input is
    /// blank.
    pub fn compose(
        &mut self,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<(Message, Vec<OutboundCommand>)>> {
        let Some(view) = self.view.as_mut() else {
            return Ok(None);
        };
        let Some((message, commands)) = view.compose(content, now) else {
            return Ok(None);
        };
        self.outbox.enqueue(message.clone(), now.timestamp_millis())?;

        if let Some(mut conversation) = self.state.conversation(&message.room).cloned() {
            conversation.messages.clear();
            conversation.last_message = Some(message.content.clone());
            conversation.last_message_at = Some(message.created_at);
            self.state.apply(ChatAction::UpdateChatPosition(conversation));
        }
        Ok(Some((message, commands)))
    }

    /// Record a keystroke in the open view's composer
    pub fn keystroke(&mut self, now: i64) -> Option<OutboundCommand> {
        self.view.as_mut()?.keystroke(now)
    }

    /// Advance timers: toast expiry and the typing timeout
    pub fn tick(&mut self, now: i64) -> Vec<OutboundCommand> {
        let mut commands = self.dispatch(ChatAction::ExpireNotifications { now });
        if let Some(view) = self.view.as_mut() {
            commands.extend(view.tick(now));
        }
        commands
    }

    /// Open a toast: clear all toasts and return the route of its room
    pub fn open_notification(&mut self, id: &str) -> Option<Route> {
        let room = self
            .state
            .notifications
            .items()
            .iter()
            .find(|n| n.id() == id)
            .map(|n| n.message.room.clone())?;
        self.state.apply(ChatAction::EmptyNotifications);
        Some(Route::conversation(&room))
    }

    /// Track the stream state
    ///
    /// Losing the connection returns transmitted but unconfirmed sends to
    /// pending so they go out again after reconnecting.
    pub fn connection_changed(&mut self, state: ConnectionState, now: i64) {
        debug!("Connection state {:?}", state);
        if matches!(
            state,
            ConnectionState::Reconnecting { .. } | ConnectionState::Closed
        ) {
            if self.outbox.requeue_transmitted(now) > 0 {
                if let Some(view) = self.view.as_mut() {
                    for entry in self.outbox.list() {
                        view.update_send(&entry.message);
                    }
                }
            }
        }
        self.connection = state;
    }

    /// Record that a send was handed to the stream
    pub fn send_transmitted(&mut self, client_id: &str) -> Result<()> {
        self.outbox.mark_transmitted(client_id)?;
        if let Some(pending) = self
            .outbox
            .list()
            .iter()
            .find(|p| p.message.client_id.as_deref() == Some(client_id))
        {
            if let Some(view) = self.view.as_mut() {
                view.update_send(&pending.message);
            }
        }
        Ok(())
    }

    /// Show a send the outbox gave up on as failed
    pub fn send_failed(&mut self, message: &Message) {
        warn!("Message to room {} failed", message.room);
        if let Some(view) = self.view.as_mut() {
            view.update_send(message);
        }
    }

    fn confirm_sent(&mut self, message: Message) {
        let Some(pending) = self.outbox.confirm(&message) else {
            return;
        };
        let Some(client_id) = pending.message.client_id else {
            return;
        };
        if let Some(view) = self.view.as_mut() {
            view.confirm(&client_id, &message);
        }
        self.state.apply(ChatAction::ConfirmSent { client_id, message });
    }

    fn route_signals(&mut self, signals: Vec<StoreSignal>) -> Vec<OutboundCommand> {
        let mut commands = Vec::new();
        for signal in signals {
            match signal {
                StoreSignal::RoomMessagesArrived { room } => {
                    if let Some(view) = self.view.as_mut().filter(|v| v.room() == room) {
                        commands.extend(view.absorb_live(&mut self.state));
                    }
                }
                StoreSignal::MessagesRead { room } => {
                    if let Some(view) = self.view.as_mut().filter(|v| v.room() == room) {
                        view.on_peer_read();
                    }
                }
                StoreSignal::ConversationCreated { room } => {
                    debug!("New conversation {}", room);
                }
                StoreSignal::NotificationsExpired { ids } => {
                    debug!("{} notifications expired", ids.len());
                }
            }
        }
        commands
    }
}
