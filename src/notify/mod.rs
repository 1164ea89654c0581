// src/notify/mod.rs
pub mod telegram;

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::extract::Item;

pub use telegram::TelegramNotifier;

/// Delivers plain-text messages to one preconfigured recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
    fn name(&self) -> &'static str;
}

/// Dry-run sink: logs messages instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        tracing::info!(target: "notify", message = %text, "dry-run: not sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// One message per new post.
pub fn new_item_message(target: &str, item: &Item) -> String {
    format!("🆕 New post ({target})\n- {}\n- {}", item.title, item.url)
}

/// Digest of failed targets, sent once after the run when enabled.
pub fn failure_digest(failures: &[(String, String)], total: usize) -> String {
    let mut out = format!(
        "⚠️ board-watch: {} of {} target(s) failed",
        failures.len(),
        total
    );
    for (name, err) in failures {
        out.push_str(&format!("\n- {name}: {err}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_layout() {
        let it = Item {
            item_id: "11".into(),
            title: "Notice B".into(),
            url: "https://b.example/list".into(),
        };
        assert_eq!(
            new_item_message("dept", &it),
            "🆕 New post (dept)\n- Notice B\n- https://b.example/list"
        );
    }

    #[test]
    fn digest_lists_each_failure() {
        let d = failure_digest(
            &[("a".into(), "timed out fetching https://a".into())],
            3,
        );
        assert!(d.starts_with("⚠️ board-watch: 1 of 3"));
        assert!(d.ends_with("- a: timed out fetching https://a"));
    }
}
