use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::protocol::{InboundEvent, OutboundEvent};
use super::{Connection, Connector};
use crate::bus::{Event, EventBus, TransportEvent};

pub struct WsConnector {
    url: String,
    bus: EventBus,
    next_id: u64,
}

impl WsConnector {
    pub fn new(url: impl Into<String>, bus: EventBus) -> Self {
        Self {
            url: url.into(),
            bus,
            next_id: 0,
        }
    }
}

impl Connector for WsConnector {
    type Conn = WsConnection;

    fn connect(&mut self) -> Result<WsConnection> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            anyhow::bail!("Chat URL must be ws:// or wss://, got {}", self.url);
        }

        self.next_id += 1;
        let id = self.next_id;
        let (tx, rx) = mpsc::unbounded_channel::<OutboundEvent>();

        // Frames emitted before the handshake completes wait in the channel.
        tokio::spawn(run_socket(self.url.clone(), id, rx, self.bus.clone()));

        Ok(WsConnection { id, tx })
    }
}

/// Handle to one socket task. Dropping it closes the socket.
pub struct WsConnection {
    id: u64,
    tx: mpsc::UnboundedSender<OutboundEvent>,
}

impl Connection for WsConnection {
    fn id(&self) -> u64 {
        self.id
    }

    fn emit(&self, event: OutboundEvent) -> Result<()> {
        self.tx
            .send(event)
            .ok()
            .context("Chat connection task has stopped")
    }
}

async fn run_socket(
    url: String,
    id: u64,
    mut outbound: mpsc::UnboundedReceiver<OutboundEvent>,
    bus: EventBus,
) {
    let ws = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((ws, _)) => ws,
        Err(e) => {
            warn!("Failed to connect to chat server {}: {}", url, e);
            bus.publish(Event::Transport(TransportEvent::Closed { connection: id }));
            return;
        }
    };

    info!(connection = id, "Connected to chat server {}", url);
    bus.publish(Event::Transport(TransportEvent::Opened { connection: id }));

    let (mut write, mut read) = ws.split();

    loop {
        tokio::select! {
            next = outbound.recv() => match next {
                Some(event) => {
                    let json = match event.to_json() {
                        Ok(s) => s,
                        Err(e) => {
                            error!("{:#}", e);
                            continue;
                        }
                    };
                    debug!("-> {}", json);
                    if let Err(e) = write.send(Message::Text(json.into())).await {
                        warn!("Failed to write to chat socket: {}", e);
                        break;
                    }
                }
                None => {
                    // Handle dropped by the widget
                    debug!(connection = id, "Closing chat socket");
                    let _ = write.close().await;
                    break;
                }
            },
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    debug!("<- {}", text.as_str());
                    match InboundEvent::decode(text.as_str()) {
                        Ok(event) => bus.publish(Event::Inbound(event)),
                        Err(e) => warn!("Dropping unreadable chat frame: {:#}", e),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!(connection = id, "Chat server closed the connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Chat socket error: {}", e);
                    break;
                }
            },
        }
    }

    bus.publish(Event::Transport(TransportEvent::Closed { connection: id }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::net::TcpListener;

    async fn next_event(rx: &mut crate::bus::EventReceiver) -> Event {
        tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for bus event")
            .expect("bus closed")
    }

    #[tokio::test]
    async fn relays_frames_both_ways() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let frame = ws.next().await.unwrap().unwrap();
            let received: Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();

            ws.send(Message::Text(
                r#"{"event":"chat_started","data":{"chat_id":"c1","message":"Hi"}}"#
                    .to_string()
                    .into(),
            ))
            .await
            .unwrap();
            ws.close(None).await.unwrap();
            received
        });

        let (bus, mut rx) = EventBus::new();
        let mut connector = WsConnector::new(format!("ws://{}", addr), bus);
        let conn = connector.connect().unwrap();

        // Queued before the handshake finishes
        conn.emit(OutboundEvent::StartChat {
            name: "Ann".into(),
            email: "ann@example.com".into(),
        })
        .unwrap();

        assert_eq!(
            next_event(&mut rx).await,
            Event::Transport(TransportEvent::Opened { connection: 1 })
        );
        match next_event(&mut rx).await {
            Event::Inbound(InboundEvent::ChatStarted(started)) => {
                assert_eq!(started.chat_id.as_deref(), Some("c1"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(
            next_event(&mut rx).await,
            Event::Transport(TransportEvent::Closed { connection: 1 })
        );

        let received = server.await.unwrap();
        assert_eq!(received["event"], "start_chat");
        assert_eq!(received["data"]["email"], "ann@example.com");
    }

    #[tokio::test]
    async fn unreachable_server_reports_closed() {
        // Bind then drop to get a port nothing listens on
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let (bus, mut rx) = EventBus::new();
        let mut connector = WsConnector::new(format!("ws://{}", addr), bus);
        let conn = connector.connect().unwrap();
        assert_eq!(conn.id(), 1);

        assert_eq!(
            next_event(&mut rx).await,
            Event::Transport(TransportEvent::Closed { connection: 1 })
        );
    }

    #[test]
    fn rejects_non_websocket_urls() {
        let (bus, _rx) = EventBus::new();
        let mut connector = WsConnector::new("http://localhost/chat", bus);
        assert!(connector.connect().is_err());
    }
}
