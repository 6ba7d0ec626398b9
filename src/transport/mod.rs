pub mod protocol;
pub mod ws;

use anyhow::Result;

use protocol::OutboundEvent;

/// A live, bidirectional link to the support server. Emits are
/// fire-and-forget: they are queued and any reply arrives later on the
/// event bus.
pub trait Connection {
    fn id(&self) -> u64;

    fn emit(&self, event: OutboundEvent) -> Result<()>;
}

/// Opens connections. Opening must not block; inbound traffic and the
/// eventual open/close notices are delivered through the event bus.
pub trait Connector {
    type Conn: Connection;

    fn connect(&mut self) -> Result<Self::Conn>;
}
