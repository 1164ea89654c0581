// src/error.rs
//! Typed errors at the collaborator seams. Configuration and state I/O use
//! `anyhow` with context; everything scoped to a single target or a single
//! message goes through these enums so the run can classify failures.

use thiserror::Error;

/// Page fetch failed after the transport's own retries.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("reading body of {url} failed: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// Worth another attempt inside the fetcher's retry loop.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout { .. } => true,
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::Request { .. } => true,
            FetchError::Body { .. } => false,
        }
    }
}

/// Notification channel errors.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("channel rejected message (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },
}

/// Everything that can go wrong for one target. Never aborts the run.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("page structure changed: `{strategy}` found no items ({streak} empty run(s) in a row)")]
    StructureChanged { strategy: String, streak: u32 },

    #[error("unsupported extraction type: {0}")]
    UnsupportedType(String),

    #[error("invalid page URL `{0}`")]
    InvalidUrl(String),
}

impl TargetError {
    /// Short label used for metrics and the failure digest.
    pub fn kind(&self) -> &'static str {
        match self {
            TargetError::Fetch(_) => "transport",
            TargetError::StructureChanged { .. } => "extraction",
            TargetError::UnsupportedType(_) => "config",
            TargetError::InvalidUrl(_) => "config",
        }
    }
}
