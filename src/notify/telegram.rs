// src/notify/telegram.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::Notifier;
use crate::config::notify::TelegramConfig;
use crate::error::NotifyError;

/// Telegram Bot API `sendMessage` sender. No retries: a failed message is
/// left unmarked and goes out again on the next run.
#[derive(Clone)]
pub struct TelegramNotifier {
    cfg: TelegramConfig,
    client: Client,
    timeout: Duration,
}

impl TelegramNotifier {
    pub fn new(cfg: TelegramConfig) -> Self {
        let timeout = Duration::from_secs(cfg.timeout_secs.max(1));
        Self {
            cfg,
            client: Client::new(),
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize, Default)]
struct ApiReply {
    #[serde(default)]
    description: Option<String>,
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let payload = SendMessage {
            chat_id: &self.cfg.chat_id,
            text,
            disable_web_page_preview: true,
        };

        let rsp = self
            .client
            .post(self.cfg.send_message_url())
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            // the request URL carries the bot token
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        let status = rsp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = rsp.text().await.unwrap_or_default();
        let description = serde_json::from_str::<ApiReply>(&body)
            .ok()
            .and_then(|r| r.description)
            .unwrap_or(body);
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            description,
        })
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
