// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use board_watch::config::TransportProfile;
use board_watch::{FetchError, FetchedPage, NotifyError, Notifier, PageFetcher};
use std::collections::HashMap;
use std::sync::Mutex;

pub enum Canned {
    Page { final_url: String, body: String },
    Timeout,
    Status(u16),
}

/// Serves canned pages by URL. Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeFetcher {
    pages: Mutex<HashMap<String, Canned>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, body: &str) -> Self {
        self.set(url, Canned::Page {
            final_url: url.to_string(),
            body: body.to_string(),
        });
        self
    }

    pub fn redirected(self, url: &str, final_url: &str, body: &str) -> Self {
        self.set(url, Canned::Page {
            final_url: final_url.to_string(),
            body: body.to_string(),
        });
        self
    }

    pub fn timeout(self, url: &str) -> Self {
        self.set(url, Canned::Timeout);
        self
    }

    pub fn set(&self, url: &str, c: Canned) {
        self.pages.lock().unwrap().insert(url.to_string(), c);
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, _profile: &TransportProfile) -> Result<FetchedPage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.pages.lock().unwrap().get(url) {
            Some(Canned::Page { final_url, body }) => Ok(FetchedPage {
                final_url: final_url.clone(),
                body: body.clone(),
                encoding: "utf-8".into(),
            }),
            Some(Canned::Timeout) => Err(FetchError::Timeout { url: url.into() }),
            Some(Canned::Status(s)) => Err(FetchError::Status {
                url: url.into(),
                status: *s,
            }),
            None => Err(FetchError::Status {
                url: url.into(),
                status: 404,
            }),
        }
    }
}

/// Records every message; rejects messages containing any of `fail_on`.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
    pub fail_on: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(self, needle: &str) -> Self {
        self.fail_on.lock().unwrap().push(needle.to_string());
        self
    }

    pub fn clear_failures(&self) {
        self.fail_on.lock().unwrap().clear();
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        if self.fail_on.lock().unwrap().iter().any(|n| text.contains(n.as_str())) {
            return Err(NotifyError::Rejected {
                status: 502,
                description: "bad gateway".into(),
            });
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// A generic numbered table with the given `(id, title, href)` rows.
pub fn table_page(rows: &[(&str, &str, &str)]) -> String {
    let mut html = String::from(
        "<html><body><table class=\"board\"><tr><th>No</th><th>Title</th><th>Date</th></tr>",
    );
    for (id, title, href) in rows {
        html.push_str(&format!(
            "<tr><td>{id}</td><td class=\"subject\"><a href=\"{href}\">{title}</a></td><td>2026-10-01</td></tr>"
        ));
    }
    html.push_str("</table></body></html>");
    html
}
