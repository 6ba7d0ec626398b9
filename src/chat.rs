use crate::entity::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: Option<String>,
    pub sender: Role,
    pub sender_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(
        chat_id: Option<String>,
        sender: Role,
        sender_name: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            chat_id,
            sender,
            sender_name: sender_name.into(),
            text: text.into(),
            timestamp,
        }
    }

    /// Status narration, attributed to neither party.
    pub fn system(chat_id: Option<String>, text: impl Into<String>) -> Self {
        Self::new(
            chat_id,
            Role::System,
            Role::System.default_display_name(),
            text,
            Utc::now(),
        )
    }

    pub fn is_system(&self) -> bool {
        self.sender == Role::System
    }
}

/// Append-only, arrival-ordered list of messages for the current session.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        // just pushed
        &self.messages[self.messages.len() - 1]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    AwaitingAgent,
    Active,
    /// Terminal: the server had no agent to offer. Only a reset leaves it.
    Offline,
    Ended,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connected => "Online",
            ConnectionState::AwaitingAgent => "Waiting for an agent...",
            ConnectionState::Active => "Connected to support",
            ConnectionState::Offline => "No agents available",
            ConnectionState::Ended => "Chat ended",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One support conversation as seen from this widget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub chat_id: Option<String>,
    pub role: Role,
    pub state: ConnectionState,
}

impl Session {
    /// Chat messages may only be appended while a chat is live.
    pub fn accepts_messages(&self) -> bool {
        self.chat_id.is_some()
            && matches!(
                self.state,
                ConnectionState::AwaitingAgent | ConnectionState::Active
            )
    }

    /// The chat id, but only while the conversation can still carry messages.
    pub fn live_chat_id(&self) -> Option<&str> {
        if self.accepts_messages() {
            self.chat_id.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_chat_id_requires_live_state() {
        let mut session = Session {
            chat_id: Some("c1".into()),
            ..Default::default()
        };
        assert_eq!(session.live_chat_id(), None);

        session.state = ConnectionState::AwaitingAgent;
        assert_eq!(session.live_chat_id(), Some("c1"));

        session.state = ConnectionState::Active;
        assert!(session.accepts_messages());

        session.state = ConnectionState::Ended;
        assert_eq!(session.live_chat_id(), None);
    }

    #[test]
    fn transcript_keeps_arrival_order() {
        let mut transcript = Transcript::new();
        transcript.push(ChatMessage::system(None, "first"));
        transcript.push(ChatMessage::new(
            Some("c1".into()),
            Role::User,
            "You",
            "second",
            Utc::now(),
        ));

        let texts: Vec<_> = transcript.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(transcript.iter().next().unwrap().is_system());

        transcript.clear();
        assert!(transcript.is_empty());
    }
}
