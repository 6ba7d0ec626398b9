use crate::transport::protocol::InboundEvent;
use tokio::sync::mpsc;

/// Everything that can wake the chat widget. The bus is the widget's only
/// input queue, so events are handled strictly one at a time in the order
/// they were published.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A user action from whatever front end drives the widget
    Command(WidgetCommand),

    /// A server-pushed chat event
    Inbound(InboundEvent),

    /// Connection lifecycle, tagged with the connection it concerns
    Transport(TransportEvent),

    /// The typing debounce timer expired
    TypingIdle { generation: u64 },

    /// The post-chat reset delay elapsed
    ResetDue { generation: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetCommand {
    Open,
    Close,
    StartSession { name: String, email: String },
    JoinAsAgent { name: String },
    SendMessage(String),
    Typing,
    EndChat,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Opened { connection: u64 },
    Closed { connection: u64 },
}

pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventBus {
    pub fn new() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn publish(&self, event: Event) {
        // We ignore the error if the widget has already shut down
        let _ = self.tx.send(event);
    }
}
