use anyhow::Context;
use tracing::{error, info};

use shopdesk::bus::EventBus;
use shopdesk::config::Config;
use shopdesk::interface::terminal::{TerminalInterface, TerminalView};
use shopdesk::storefront::StorefrontClient;
use shopdesk::transport::ws::WsConnector;
use shopdesk::widget::ChatController;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file; the environment may already be set
    let dotenv = dotenvy::dotenv();

    // Logs go to stderr so they don't interleave with the chat transcript
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenv {
        info!("No .env file loaded: {}", e);
    }

    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        chat = %config.chat_url,
        store = %config.store_url,
        "Shopdesk client starting..."
    );

    let (bus, events) = EventBus::new();
    let connector = WsConnector::new(config.chat_url.clone(), bus.clone());
    let store = StorefrontClient::new(config.store_url.clone())?;

    let controller = ChatController::new(connector, TerminalView::new(), bus.clone(), config);
    let widget_handle = tokio::spawn(controller.run(events));

    let terminal = TerminalInterface::new(bus, store);
    let terminal_handle = tokio::spawn(async move {
        if let Err(e) = terminal.run().await {
            error!("Terminal input stopped with error: {:#}", e);
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        res = widget_handle => {
            if let Err(e) = res {
                error!("Chat widget stopped unexpectedly: {}", e);
            }
        }
    }

    terminal_handle.abort();
    Ok(())
}
