use anyhow::Result;
use std::collections::HashMap;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::bus::{Event, EventBus, WidgetCommand};
use crate::chat::ChatMessage;
use crate::storefront::{
    CheckoutRequest, PlaceOrderButton, StorefrontClient, WishlistButton, WishlistOutcome,
};
use crate::widget::ChatView;

pub const HELP: &str = "\
These commands are supported:
  /open                       Open the support chat
  /close                      Close the chat window (ends a live chat)
  /start <name> <email>       Ask for a support agent
  /agent <name>               Sign in as a support agent
  /end                        End the current chat
  /product <id>               Quick-view a product
  /wish <id>                  Add or remove a product from your wishlist
  /checkout key=value ...     Place an order (phone, address, city, state, pincode, payment)
  /help                       Display this text
  /quit                       Exit
Anything else is sent as a chat message.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat(WidgetCommand),
    Product(u64),
    Wishlist(u64),
    Checkout(CheckoutRequest),
    Help,
    Usage(&'static str),
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if !line.starts_with('/') {
            return Some(Command::Chat(WidgetCommand::SendMessage(line.to_string())));
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name {
            "/open" => Command::Chat(WidgetCommand::Open),
            "/close" => Command::Chat(WidgetCommand::Close),
            "/end" => Command::Chat(WidgetCommand::EndChat),
            "/quit" | "/exit" => Command::Chat(WidgetCommand::Quit),
            "/help" => Command::Help,
            "/agent" => Command::Chat(WidgetCommand::JoinAsAgent {
                name: rest.to_string(),
            }),
            "/start" => {
                // The email is the last word; everything before it is the name.
                let (name, email) = rest.rsplit_once(char::is_whitespace).unwrap_or(("", rest));
                Command::Chat(WidgetCommand::StartSession {
                    name: name.trim().to_string(),
                    email: email.trim().to_string(),
                })
            }
            "/product" => match rest.parse() {
                Ok(id) => Command::Product(id),
                Err(_) => Command::Usage("Usage: /product <id>"),
            },
            "/wish" => match rest.parse() {
                Ok(id) => Command::Wishlist(id),
                Err(_) => Command::Usage("Usage: /wish <id>"),
            },
            "/checkout" => Command::Checkout(parse_checkout(rest)),
            _ => Command::Usage("Unknown command. Use /help to see what I can do."),
        };
        Some(command)
    }
}

fn parse_checkout(rest: &str) -> CheckoutRequest {
    let mut request = CheckoutRequest::default();
    for pair in rest.split_whitespace() {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = value.replace('_', " ");
        match key {
            "phone" => request.phone = value,
            "address" => request.address = value,
            "city" => request.city = value,
            "state" => request.state = value,
            "pincode" => request.pincode = value,
            "payment" | "payment_method" => request.payment_method = value,
            _ => {}
        }
    }
    request
}

/// Prints the widget to stdout. Logs go to stderr.
#[derive(Debug, Default)]
pub struct TerminalView {
    visible: bool,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }
}

impl ChatView for TerminalView {
    fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.line(if visible {
                "── Support chat opened ──"
            } else {
                "── Support chat closed ──"
            });
        }
    }

    fn set_status(&mut self, status: &str) {
        self.line(&format!("[status] {}", status));
    }

    fn append_message(&mut self, message: &ChatMessage) {
        let time = message.timestamp.format("%H:%M");
        if message.is_system() {
            self.line(&format!("{} * {}", time, message.text));
        } else {
            self.line(&format!("{} {}: {}", time, message.sender_name, message.text));
        }
    }

    fn clear_transcript(&mut self) {
        self.line("Welcome! Start a chat with /start <name> <email>.");
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        if enabled {
            self.line("(you can type messages now)");
        }
    }

    fn clear_input(&mut self) {}

    fn set_peer_typing(&mut self, typing: bool) {
        if typing {
            self.line("(typing...)");
        }
    }

    fn notify(&mut self, notice: &str) {
        self.line(&format!("! {}", notice));
    }

    fn show_offline(&mut self, message: &str, email: &str) {
        self.line(&format!("! {}", message));
        self.line(&format!("  You can reach us at {}", email));
    }
}

pub struct TerminalInterface {
    bus: EventBus,
    store: StorefrontClient,
    wishlist: HashMap<u64, WishlistButton>,
    place_order: PlaceOrderButton,
}

impl TerminalInterface {
    pub fn new(bus: EventBus, store: StorefrontClient) -> Self {
        Self {
            bus,
            store,
            wishlist: HashMap::new(),
            place_order: PlaceOrderButton::new(),
        }
    }

    /// Read stdin until EOF or /quit.
    pub async fn run(mut self) -> Result<()> {
        println!("{}", HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        while let Some(line) = lines.next_line().await? {
            let Some(command) = Command::parse(&line) else {
                continue;
            };
            if command == Command::Chat(WidgetCommand::Quit) {
                break;
            }
            self.dispatch(command).await;
        }

        info!("Input closed, shutting down");
        self.bus.publish(Event::Command(WidgetCommand::Quit));
        Ok(())
    }

    async fn dispatch(&mut self, command: Command) {
        match command {
            Command::Chat(WidgetCommand::SendMessage(text)) => {
                // Line input has no keystrokes; one typing signal per line
                self.bus.publish(Event::Command(WidgetCommand::Typing));
                self.bus
                    .publish(Event::Command(WidgetCommand::SendMessage(text)));
            }
            Command::Chat(widget) => self.bus.publish(Event::Command(widget)),
            Command::Help => println!("{}", HELP),
            Command::Usage(usage) => println!("{}", usage),
            Command::Product(id) => match self.store.product(id).await {
                Ok(product) => {
                    println!("{} (#{})  ${:.2}", product.name, product.id, product.price);
                    if let (Some(rating), Some(reviews)) = (product.rating, product.reviews) {
                        println!("  {:.1}/5 from {} reviews", rating, reviews);
                    }
                    if let Some(description) = product.description {
                        println!("  {}", description);
                    }
                }
                Err(e) => {
                    error!("Quick view failed: {:#}", e);
                    println!("! Could not load product {}.", id);
                }
            },
            Command::Wishlist(id) => {
                let button = self
                    .wishlist
                    .entry(id)
                    .or_insert_with(|| WishlistButton::new(id, false));
                let Some(action) = button.press() else {
                    return;
                };
                let result = self.store.wishlist(action, id).await;
                match button.settle(result) {
                    WishlistOutcome::Saved {
                        in_wishlist,
                        count,
                        message,
                    } => {
                        let icon = if in_wishlist { "♥" } else { "♡" };
                        let note = message.unwrap_or_default();
                        match count {
                            Some(count) => println!("{} {} (wishlist: {})", icon, note, count),
                            None => println!("{} {}", icon, note),
                        }
                    }
                    WishlistOutcome::Reverted { notice } => println!("! {}", notice),
                }
            }
            Command::Checkout(request) => {
                if !self.place_order.begin() {
                    return;
                }
                println!("[{}]", self.place_order.label());
                let result = self.store.checkout(&request).await;
                match self.place_order.settle(&result) {
                    Some(notice) => {
                        println!("! {}", notice);
                        if let Ok(outcome) = &result {
                            if let Some(location) = outcome.next_location() {
                                println!("  see {}", location);
                            }
                        }
                    }
                    None => {
                        if let Ok(outcome) = &result {
                            if let Some(location) = outcome.next_location() {
                                println!("Order placed: {}", location);
                            }
                        }
                        // Ready for another order in this terminal session
                        self.place_order = PlaceOrderButton::new();
                    }
                }
            }
        }
    }
}
