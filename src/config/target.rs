// src/config/target.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::TargetError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (board-watch; +https://github.com/)";
pub const TYPE_HTML_LIST_NUMBER_ID: &str = "html_list_number_id";

fn default_type() -> String {
    TYPE_HTML_LIST_NUMBER_ID.to_string()
}
fn default_latest_n() -> usize {
    30
}

/// Extraction procedures a target may ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionType {
    /// Numbered list page; the registry picks a site rule or the generic table extractor.
    HtmlListNumberId,
}

/// One monitored board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub url: String,
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
    #[serde(default = "default_latest_n")]
    pub latest_n: usize,
    #[serde(default)]
    pub transport: TransportOverrides,
}

impl Target {
    pub fn new(name: impl Into<String>, url: impl Into<String>, latest_n: usize) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind: default_type(),
            latest_n,
            transport: TransportOverrides::default(),
        }
    }

    /// Unknown tags load fine but fail the target when it runs.
    pub fn extraction_type(&self) -> Result<ExtractionType, TargetError> {
        match self.kind.trim() {
            TYPE_HTML_LIST_NUMBER_ID => Ok(ExtractionType::HtmlListNumberId),
            other => Err(TargetError::UnsupportedType(other.to_string())),
        }
    }
}

/// Transport settings for fetching a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportProfile {
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Extra attempts after the first one (timeouts, connect errors, 5xx).
    pub retries: u8,
    /// Decoding fallback when the server sends no charset (e.g. "euc-kr").
    pub charset: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl Default for TransportProfile {
    fn default() -> Self {
        Self {
            timeout_secs: 25,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retries: 1,
            charset: None,
            headers: BTreeMap::new(),
        }
    }
}

impl TransportProfile {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Apply a target's overrides field by field. Headers are merged, target wins.
    pub fn merged(&self, o: &TransportOverrides) -> TransportProfile {
        let mut out = self.clone();
        if let Some(t) = o.timeout_secs {
            out.timeout_secs = t;
        }
        if let Some(ua) = &o.user_agent {
            out.user_agent = ua.clone();
        }
        if let Some(r) = o.retries {
            out.retries = r;
        }
        if o.charset.is_some() {
            out.charset = o.charset.clone();
        }
        for (k, v) in &o.headers {
            out.headers.insert(k.clone(), v.clone());
        }
        out
    }
}

/// Per-target transport overrides; every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportOverrides {
    pub timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub retries: Option<u8>,
    pub charset: Option<String>,
    pub headers: BTreeMap<String, String>,
}

/// A site-specific extraction rule: ids live in a query parameter of the
/// detail-view link rather than in the table layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRuleConfig {
    pub name: String,
    /// Substring of the target URL that routes to this rule.
    pub url_contains: String,
    /// Literal marking the detail-view endpoint inside an href.
    pub href_contains: String,
    /// Numeric query parameter carrying the post id ("no", "seq", ...).
    pub id_param: String,
    #[serde(default)]
    pub strip_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Pause between two notifications.
    pub send_interval_ms: u64,
    /// Targets fetched + extracted at once.
    pub concurrency: usize,
    /// Consecutive empty extractions before a target with history is reported broken.
    pub empty_escalation_after: u32,
    /// Send one digest message listing failed targets.
    pub report_failures: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            send_interval_ms: 700,
            concurrency: 1,
            empty_escalation_after: 1,
            report_failures: false,
        }
    }
}
