//! In-memory doubles for the transport and view seams.

use anyhow::Result;
use std::sync::{Arc, Mutex};

use crate::chat::ChatMessage;
use crate::transport::protocol::OutboundEvent;
use crate::transport::{Connection, Connector};
use crate::widget::ChatView;

/// Shared record of every frame emitted on any mock connection.
#[derive(Clone, Default)]
pub struct Wire {
    sent: Arc<Mutex<Vec<OutboundEvent>>>,
    connects: Arc<Mutex<u64>>,
}

impl Wire {
    pub fn sent(&self) -> Vec<OutboundEvent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.sent().iter().map(|e| e.kind()).collect()
    }

    /// `is_typing` values of all typing frames, in order.
    pub fn typing(&self) -> Vec<bool> {
        self.sent()
            .into_iter()
            .filter_map(|e| match e {
                OutboundEvent::Typing { is_typing, .. } => Some(is_typing),
                _ => None,
            })
            .collect()
    }

    pub fn connects(&self) -> u64 {
        *self.connects.lock().unwrap()
    }
}

pub struct MockConnector {
    wire: Wire,
    pub fail: bool,
}

impl MockConnector {
    pub fn new(wire: Wire) -> Self {
        Self { wire, fail: false }
    }

    pub fn failing(wire: Wire) -> Self {
        Self { wire, fail: true }
    }
}

impl Connector for MockConnector {
    type Conn = MockConnection;

    fn connect(&mut self) -> Result<MockConnection> {
        if self.fail {
            anyhow::bail!("connection refused");
        }
        let mut connects = self.wire.connects.lock().unwrap();
        *connects += 1;
        Ok(MockConnection {
            id: *connects,
            wire: self.wire.clone(),
        })
    }
}

pub struct MockConnection {
    id: u64,
    wire: Wire,
}

impl Connection for MockConnection {
    fn id(&self) -> u64 {
        self.id
    }

    fn emit(&self, event: OutboundEvent) -> Result<()> {
        self.wire.sent.lock().unwrap().push(event);
        Ok(())
    }
}

/// Mirrors what a real view would show.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub visible: bool,
    pub status: String,
    pub messages: Vec<ChatMessage>,
    pub transcript_clears: usize,
    pub input_enabled: bool,
    pub input_clears: usize,
    pub peer_typing: bool,
    pub notices: Vec<String>,
    pub offline: Option<(String, String)>,
}

impl ChatView for RecordingView {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }

    fn append_message(&mut self, message: &ChatMessage) {
        self.messages.push(message.clone());
    }

    fn clear_transcript(&mut self) {
        self.messages.clear();
        self.offline = None;
        self.transcript_clears += 1;
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    fn clear_input(&mut self) {
        self.input_clears += 1;
    }

    fn set_peer_typing(&mut self, typing: bool) {
        self.peer_typing = typing;
    }

    fn notify(&mut self, notice: &str) {
        self.notices.push(notice.to_string());
    }

    fn show_offline(&mut self, message: &str, email: &str) {
        self.offline = Some((message.to_string(), email.to_string()));
    }
}
