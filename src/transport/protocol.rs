//! Chat wire events.
//!
//! Every frame is a JSON object `{"event": "<kind>", "data": {...}}`.
//! Outbound frames are produced by the widget; inbound frames are pushed by
//! the support server and decoded leniently so a sloppy payload degrades to
//! defaults instead of being dropped.

use anyhow::{Context, Result};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::entity::Role;

// -----------------------------------------------------------------------------
// Outbound
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    AgentJoin {
        name: String,
    },
    StartChat {
        name: String,
        email: String,
    },
    SendMessage {
        chat_id: String,
        message: String,
        sender: Role,
    },
    Typing {
        chat_id: String,
        is_typing: bool,
    },
    EndChat {
        chat_id: String,
    },
}

impl OutboundEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEvent::AgentJoin { .. } => "agent_join",
            OutboundEvent::StartChat { .. } => "start_chat",
            OutboundEvent::SendMessage { .. } => "send_message",
            OutboundEvent::Typing { .. } => "typing",
            OutboundEvent::EndChat { .. } => "end_chat",
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).with_context(|| format!("Failed to encode {}", self.kind()))
    }
}

// -----------------------------------------------------------------------------
// Inbound
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatStarted {
    #[serde(deserialize_with = "lenient_string")]
    pub chat_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AgentOffline {
    #[serde(deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AgentAssigned {
    #[serde(deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub agent_name: Option<String>,
    /// Sent to agent consoles so they learn which chat they were given.
    #[serde(deserialize_with = "lenient_string")]
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NewMessage {
    #[serde(deserialize_with = "lenient_string")]
    pub sender: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub sender_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub message: Option<String>,
    pub timestamp: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UserTyping {
    #[serde(deserialize_with = "lenient_bool")]
    pub is_typing: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatEnded {
    #[serde(deserialize_with = "lenient_string")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    ChatStarted(ChatStarted),
    AgentOffline(AgentOffline),
    AgentAssigned(AgentAssigned),
    NewMessage(NewMessage),
    UserTyping(UserTyping),
    ChatEnded(ChatEnded),
    Unknown { kind: String },
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl InboundEvent {
    /// Decode a text frame. Only a frame without a readable `event` name is
    /// an error; payload problems fall back to defaults.
    pub fn decode(text: &str) -> Result<Self> {
        let envelope: Envelope =
            serde_json::from_str(text).context("Frame is not a chat event envelope")?;
        Ok(Self::from_parts(&envelope.event, envelope.data))
    }

    pub fn from_parts(kind: &str, data: Value) -> Self {
        match kind {
            "chat_started" => InboundEvent::ChatStarted(payload(kind, data)),
            "agent_offline" => InboundEvent::AgentOffline(payload(kind, data)),
            "agent_assigned" => InboundEvent::AgentAssigned(payload(kind, data)),
            "new_message" => InboundEvent::NewMessage(payload(kind, data)),
            "user_typing" => InboundEvent::UserTyping(payload(kind, data)),
            "chat_ended" => InboundEvent::ChatEnded(payload(kind, data)),
            other => InboundEvent::Unknown {
                kind: other.to_string(),
            },
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            InboundEvent::ChatStarted(_) => "chat_started",
            InboundEvent::AgentOffline(_) => "agent_offline",
            InboundEvent::AgentAssigned(_) => "agent_assigned",
            InboundEvent::NewMessage(_) => "new_message",
            InboundEvent::UserTyping(_) => "user_typing",
            InboundEvent::ChatEnded(_) => "chat_ended",
            InboundEvent::Unknown { kind } => kind,
        }
    }
}

fn payload<T: DeserializeOwned + Default>(kind: &str, data: Value) -> T {
    if data.is_null() {
        return T::default();
    }
    serde_json::from_value(data).unwrap_or_else(|e| {
        debug!("Unreadable {} payload, using defaults: {}", kind, e);
        T::default()
    })
}

/// Strings pass through, numbers are stringified, anything else is absent.
/// Blank strings count as absent too.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}
