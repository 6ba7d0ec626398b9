use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_CHAT_URL: &str = "ws://127.0.0.1:5000/chat";
pub const DEFAULT_STORE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_SUPPORT_EMAIL: &str = "support@shopdesk.example";
pub const DEFAULT_TYPING_IDLE_MS: u64 = 1000;
pub const DEFAULT_RESET_DELAY_MS: u64 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub chat_url: String,
    pub store_url: String,
    pub support_email: String,
    /// Quiet period after the last keystroke before typing-stopped is sent
    pub typing_idle: Duration,
    /// How long an ended chat stays on screen before the widget resets
    pub reset_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chat_url: DEFAULT_CHAT_URL.to_string(),
            store_url: DEFAULT_STORE_URL.to_string(),
            support_email: DEFAULT_SUPPORT_EMAIL.to_string(),
            typing_idle: Duration::from_millis(DEFAULT_TYPING_IDLE_MS),
            reset_delay: Duration::from_millis(DEFAULT_RESET_DELAY_MS),
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let millis = |key: &str, default: u64| -> Result<Duration> {
            match get(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .with_context(|| format!("{} must be a number of milliseconds, got {:?}", key, raw)),
                None => Ok(Duration::from_millis(default)),
            }
        };

        Ok(Self {
            chat_url: get("SHOPDESK_CHAT_URL").unwrap_or_else(|| DEFAULT_CHAT_URL.into()),
            store_url: get("SHOPDESK_STORE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_STORE_URL.into()),
            support_email: get("SHOPDESK_SUPPORT_EMAIL")
                .unwrap_or_else(|| DEFAULT_SUPPORT_EMAIL.into()),
            typing_idle: millis("SHOPDESK_TYPING_IDLE_MS", DEFAULT_TYPING_IDLE_MS)?,
            reset_delay: millis("SHOPDESK_RESET_DELAY_MS", DEFAULT_RESET_DELAY_MS)?,
        })
    }
}
