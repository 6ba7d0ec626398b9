//! Client-side state machine for the live support chat widget.
//!
//! The controller owns the connection, the session and the transcript, and
//! keeps the view in step with them. It is driven entirely by events pulled
//! off the [`EventBus`]: user commands, server-pushed chat events, transport
//! notices and its own timer expiries. Nothing it does blocks or returns a
//! value; outbound emits are fire-and-forget and answers come back later as
//! inbound events.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::timer::SingleShotTimer;
use super::view::ChatView;
use crate::bus::{Event, EventBus, EventReceiver, TransportEvent, WidgetCommand};
use crate::chat::{ChatMessage, ConnectionState, Session, Transcript};
use crate::config::Config;
use crate::entity::{Identity, Role};
use crate::error::ValidationError;
use crate::transport::protocol::{
    AgentAssigned, AgentOffline, ChatEnded, ChatStarted, InboundEvent, NewMessage, OutboundEvent,
    UserTyping,
};
use crate::transport::{Connection, Connector};

const CHAT_STARTED_TEXT: &str = "Chat started. Please wait while we connect you to an agent.";
const AGENT_OFFLINE_TEXT: &str = "Sorry, no agents are available right now.";
const CHAT_ENDED_TEXT: &str = "This chat has ended.";
const CHAT_CLOSING_NOTICE: &str = "Your previous chat is still closing. Please try again in a moment.";
const UNAVAILABLE_NOTICE: &str = "Chat is unavailable right now. Please try again later.";

pub struct ChatController<C: Connector, V: ChatView> {
    connector: C,
    connection: Option<C::Conn>,
    view: V,
    bus: EventBus,
    config: Config,
    session: Session,
    transcript: Transcript,
    visible: bool,
    local_typing: bool,
    typing_timer: SingleShotTimer,
    reset_timer: SingleShotTimer,
}

impl<C: Connector, V: ChatView> ChatController<C, V> {
    pub fn new(connector: C, view: V, bus: EventBus, config: Config) -> Self {
        Self {
            connector,
            connection: None,
            view,
            bus,
            config,
            session: Session::default(),
            transcript: Transcript::new(),
            visible: false,
            local_typing: false,
            typing_timer: SingleShotTimer::new(),
            reset_timer: SingleShotTimer::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Handle events until the front end asks to quit.
    pub async fn run(mut self, mut events: EventReceiver) {
        while let Some(event) = events.recv().await {
            if event == Event::Command(WidgetCommand::Quit) {
                break;
            }
            self.handle(event);
        }
        self.dispose();
    }

    /// Tear down timers and the connection. No further emits happen.
    pub fn dispose(mut self) {
        self.typing_timer.cancel();
        self.reset_timer.cancel();
        if let Some(conn) = self.connection.take() {
            info!(connection = conn.id(), "Chat widget disposed");
        }
        if self.visible {
            self.view.set_visible(false);
        }
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Command(command) => self.apply(command),
            Event::Inbound(inbound) => self.on_inbound_event(inbound),
            Event::Transport(notice) => self.on_transport(notice),
            Event::TypingIdle { generation } => self.on_typing_idle(generation),
            Event::ResetDue { generation } => self.on_reset_due(generation),
        }
    }

    pub fn apply(&mut self, command: WidgetCommand) {
        match command {
            WidgetCommand::Open => self.open(),
            WidgetCommand::Close => self.close(),
            WidgetCommand::StartSession { name, email } => self.start_session(&name, &email),
            WidgetCommand::JoinAsAgent { name } => self.join_as_agent(&name),
            WidgetCommand::SendMessage(text) => self.send_message(&text),
            WidgetCommand::Typing => self.notify_typing(),
            WidgetCommand::EndChat => self.end_chat(),
            // Handled by `run`
            WidgetCommand::Quit => {}
        }
    }

    // -------------------------------------------------------------------------
    // User actions
    // -------------------------------------------------------------------------

    pub fn open(&mut self) {
        if self.connection.is_none() {
            self.connect();
        }
        if !self.visible {
            self.visible = true;
            self.view.set_visible(true);
        }
    }

    pub fn close(&mut self) {
        if self.visible {
            self.visible = false;
            self.view.set_visible(false);
        }

        if self.session.accepts_messages() {
            self.end_chat();
        } else if self.session.state == ConnectionState::Offline {
            self.reset();
        }
    }

    pub fn start_session(&mut self, name: &str, email: &str) {
        let identity = match Identity::new(name, email) {
            Ok(identity) => identity,
            Err(e) => {
                debug!("Not starting chat: {}", e);
                self.view.notify(&e.to_string());
                return;
            }
        };

        if self.session.state != ConnectionState::Connected || self.session.chat_id.is_some() {
            debug!(state = ?self.session.state, "Start request ignored");
            if matches!(
                self.session.state,
                ConnectionState::Ended | ConnectionState::Offline
            ) {
                self.view.notify(CHAT_CLOSING_NOTICE);
            }
            return;
        }

        info!("Requesting chat for {}", identity);
        self.session.role = Role::User;
        let Identity { name, email } = identity;
        if self.emit(OutboundEvent::StartChat { name, email }) {
            self.view.set_status("Connecting you to support...");
        }
    }

    pub fn join_as_agent(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            self.view.notify(&ValidationError::MissingAgentName.to_string());
            return;
        }
        if self.session.state != ConnectionState::Connected || self.session.chat_id.is_some() {
            debug!(state = ?self.session.state, "Agent join ignored");
            return;
        }

        self.session.role = Role::Agent;
        if self.emit(OutboundEvent::AgentJoin {
            name: name.to_string(),
        }) {
            self.view
                .set_status(&format!("Signed in as {}. Waiting for chats...", name));
        }
    }

    pub fn send_message(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let Some(chat_id) = self.session.live_chat_id().map(str::to_string) else {
            debug!("No active chat; message not sent");
            return;
        };
        if self.connection.is_none() {
            debug!("No connection; message not sent");
            return;
        }

        self.emit(OutboundEvent::SendMessage {
            chat_id: chat_id.clone(),
            message: text.to_string(),
            sender: self.session.role,
        });
        self.view.clear_input();

        self.typing_timer.cancel();
        self.local_typing = false;
        self.emit(OutboundEvent::Typing {
            chat_id,
            is_typing: false,
        });
    }

    /// Call on every local input change. Sends typing-started once per burst
    /// and typing-stopped only when the debounce timer expires.
    pub fn notify_typing(&mut self) {
        let Some(chat_id) = self.session.live_chat_id().map(str::to_string) else {
            return;
        };
        if self.connection.is_none() {
            return;
        }

        if !self.local_typing {
            self.local_typing = true;
            self.emit(OutboundEvent::Typing {
                chat_id,
                is_typing: true,
            });
        }
        self.typing_timer
            .reset(self.config.typing_idle, &self.bus, |generation| {
                Event::TypingIdle { generation }
            });
    }

    pub fn end_chat(&mut self) {
        let Some(chat_id) = self.session.live_chat_id().map(str::to_string) else {
            return;
        };

        self.typing_timer.cancel();
        self.local_typing = false;

        info!(chat_id = %chat_id, "Ending chat");
        self.emit(OutboundEvent::EndChat { chat_id });
        self.set_state(ConnectionState::Ended);
        self.view.set_input_enabled(false);

        // chat_ended re-arms this; it only matters if the server never answers
        self.reset_timer
            .reset(self.config.reset_delay, &self.bus, |generation| {
                Event::ResetDue { generation }
            });
    }

    // -------------------------------------------------------------------------
    // Inbound events
    // -------------------------------------------------------------------------

    pub fn on_inbound_event(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::ChatStarted(payload) => self.on_chat_started(payload),
            InboundEvent::AgentOffline(payload) => self.on_agent_offline(payload),
            InboundEvent::AgentAssigned(payload) => self.on_agent_assigned(payload),
            InboundEvent::NewMessage(payload) => self.on_new_message(payload),
            InboundEvent::UserTyping(payload) => self.on_user_typing(payload),
            InboundEvent::ChatEnded(payload) => self.on_chat_ended(payload),
            InboundEvent::Unknown { kind } => debug!("Ignoring unknown chat event {}", kind),
        }
    }

    fn on_chat_started(&mut self, payload: ChatStarted) {
        if self.session.state != ConnectionState::Connected || self.session.chat_id.is_some() {
            debug!(state = ?self.session.state, "Ignoring chat_started");
            return;
        }
        let Some(chat_id) = payload.chat_id else {
            warn!("chat_started without a chat id; ignoring");
            return;
        };

        info!(chat_id = %chat_id, "Chat accepted");
        self.session.chat_id = Some(chat_id);
        self.set_state(ConnectionState::AwaitingAgent);
        self.push_system(payload.message.unwrap_or_else(|| CHAT_STARTED_TEXT.into()));
        self.view.set_input_enabled(true);
    }

    fn on_agent_offline(&mut self, payload: AgentOffline) {
        if self.session.state != ConnectionState::AwaitingAgent {
            debug!(state = ?self.session.state, "Ignoring agent_offline");
            return;
        }

        let message = payload.message.unwrap_or_else(|| AGENT_OFFLINE_TEXT.into());
        let email = payload
            .email
            .unwrap_or_else(|| self.config.support_email.clone());

        self.push_system(message.clone());
        self.typing_timer.cancel();
        self.local_typing = false;
        self.set_state(ConnectionState::Offline);
        self.view.set_input_enabled(false);
        self.view.show_offline(&message, &email);
    }

    fn on_agent_assigned(&mut self, payload: AgentAssigned) {
        if self.session.chat_id.is_none() && self.session.state == ConnectionState::Connected {
            // Agent consoles learn their chat here rather than from chat_started
            self.session.chat_id = payload.chat_id;
        }
        let waiting = matches!(
            self.session.state,
            ConnectionState::Connected | ConnectionState::AwaitingAgent
        );
        if !waiting || self.session.chat_id.is_none() {
            debug!(state = ?self.session.state, "Ignoring agent_assigned");
            return;
        }

        let agent = payload
            .agent_name
            .unwrap_or_else(|| Role::Agent.default_display_name().to_string());
        self.set_state(ConnectionState::Active);
        self.push_system(
            payload
                .message
                .unwrap_or_else(|| format!("{} has joined the chat.", agent)),
        );
        self.view.set_status(&format!("Chatting with {}", agent));
        self.view.set_input_enabled(true);
    }

    fn on_new_message(&mut self, payload: NewMessage) {
        if !self.session.accepts_messages() {
            debug!(state = ?self.session.state, "Ignoring new_message outside a live chat");
            return;
        }

        let sender = Role::from_wire(payload.sender.as_deref());
        let sender_name = payload
            .sender_name
            .unwrap_or_else(|| sender.default_display_name().to_string());
        let message = ChatMessage::new(
            self.session.chat_id.clone(),
            sender,
            sender_name,
            payload.message.unwrap_or_default(),
            parse_timestamp(payload.timestamp.as_ref()),
        );
        let message = self.transcript.push(message);
        self.view.append_message(message);
    }

    fn on_user_typing(&mut self, payload: UserTyping) {
        if !self.session.accepts_messages() {
            return;
        }
        self.view.set_peer_typing(payload.is_typing.unwrap_or(false));
    }

    fn on_chat_ended(&mut self, payload: ChatEnded) {
        if self.session.chat_id.is_none() {
            debug!("Ignoring chat_ended without a chat");
            return;
        }

        self.typing_timer.cancel();
        self.local_typing = false;
        self.set_state(ConnectionState::Ended);
        self.push_system(payload.message.unwrap_or_else(|| CHAT_ENDED_TEXT.into()));
        self.view.set_input_enabled(false);
        self.view.set_peer_typing(false);

        self.reset_timer
            .reset(self.config.reset_delay, &self.bus, |generation| {
                Event::ResetDue { generation }
            });
    }

    // -------------------------------------------------------------------------
    // Transport and timers
    // -------------------------------------------------------------------------

    fn on_transport(&mut self, notice: TransportEvent) {
        let current = self.connection.as_ref().map(|c| c.id());
        match notice {
            TransportEvent::Opened { connection } if Some(connection) == current => {
                if self.session.state == ConnectionState::Connected {
                    self.view.set_status(ConnectionState::Connected.label());
                }
            }
            TransportEvent::Closed { connection } if Some(connection) == current => {
                warn!(connection, "Lost connection to chat server");
                self.clear_session();
            }
            stale => debug!(?stale, "Ignoring notice for an old connection"),
        }
    }

    fn on_typing_idle(&mut self, generation: u64) {
        if !self.typing_timer.fire(generation) || !self.local_typing {
            return;
        }
        self.local_typing = false;
        if let Some(chat_id) = self.session.live_chat_id().map(str::to_string) {
            self.emit(OutboundEvent::Typing {
                chat_id,
                is_typing: false,
            });
        }
    }

    fn on_reset_due(&mut self, generation: u64) {
        if self.reset_timer.fire(generation) {
            self.reset();
        }
    }

    /// Back to an empty, disconnected widget, reconnecting if it is on
    /// screen. Safe to call repeatedly.
    fn reset(&mut self) {
        debug!("Resetting chat widget");
        self.clear_session();
        if self.visible {
            self.connect();
        }
    }

    fn clear_session(&mut self) {
        self.typing_timer.cancel();
        self.reset_timer.cancel();
        self.local_typing = false;
        self.session = Session::default();
        self.transcript.clear();
        self.connection = None;

        self.view.clear_transcript();
        self.view.set_input_enabled(false);
        self.view.set_peer_typing(false);
        self.set_state(ConnectionState::Disconnected);
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn connect(&mut self) {
        match self.connector.connect() {
            Ok(conn) => {
                info!(connection = conn.id(), "Opening chat connection");
                self.connection = Some(conn);
                if self.session.state == ConnectionState::Disconnected {
                    self.set_state(ConnectionState::Connected);
                }
            }
            Err(e) => {
                warn!("Failed to open chat connection: {:#}", e);
                self.view.notify(UNAVAILABLE_NOTICE);
            }
        }
    }

    /// Returns false when there was no connection to emit on.
    fn emit(&self, event: OutboundEvent) -> bool {
        let Some(conn) = &self.connection else {
            debug!("No chat connection; dropping {}", event.kind());
            return false;
        };
        let kind = event.kind();
        if let Err(e) = conn.emit(event) {
            warn!("Failed to emit {}: {:#}", kind, e);
            return false;
        }
        true
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.session.state != state {
            debug!(from = ?self.session.state, to = ?state, "Chat state change");
        }
        self.session.state = state;
        self.view.set_status(state.label());
    }

    /// System narration needs a chat to belong to, nothing more.
    fn push_system(&mut self, text: String) {
        if self.session.chat_id.is_none() {
            return;
        }
        let message = self
            .transcript
            .push(ChatMessage::system(self.session.chat_id.clone(), text));
        self.view.append_message(message);
    }
}

/// RFC 3339 strings or epoch milliseconds; anything else is stamped locally.
fn parse_timestamp(value: Option<&Value>) -> DateTime<Utc> {
    match value {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(Utc::now),
        _ => Utc::now(),
    }
}
