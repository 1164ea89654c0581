// src/config/notify.rs
use crate::error::NotifyError;

pub const ENV_BOT_TOKEN: &str = "BOT_TOKEN";
pub const ENV_CHAT_ID: &str = "CHAT_ID";
pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

/// Telegram Bot API credentials, checked once at startup.
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // token stays out of logs
        f.debug_struct("TelegramConfig")
            .field("bot_token_len", &self.bot_token.len())
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl TelegramConfig {
    /// Both values must be present and non-blank.
    pub fn new(bot_token: Option<String>, chat_id: Option<String>) -> Result<Self, NotifyError> {
        let bot_token = bot_token.unwrap_or_default().trim().to_string();
        let chat_id = chat_id.unwrap_or_default().trim().to_string();
        if bot_token.is_empty() || chat_id.is_empty() {
            return Err(NotifyError::NotConfigured(format!(
                "{ENV_BOT_TOKEN} / {ENV_CHAT_ID} are empty"
            )));
        }
        Ok(Self {
            bot_token,
            chat_id,
            api_base: DEFAULT_TELEGRAM_API.to_string(),
            timeout_secs: 20,
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }
}
