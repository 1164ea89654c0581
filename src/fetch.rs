// src/fetch.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::OnceCell;
use regex::bytes::Regex as BytesRegex;
use reqwest::header::{HeaderMap, CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect, Client};
use std::time::Duration;

use crate::config::TransportProfile;
use crate::error::FetchError;

/// A list page as delivered by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL after redirects; relative links resolve against this.
    pub final_url: String,
    pub body: String,
    /// Charset label used to decode `body`.
    pub encoding: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page. Retries, if any, happen inside.
    async fn fetch(&self, url: &str, profile: &TransportProfile) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed fetcher. One shared client; timeout, headers and retries per request.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    backoff_base: Duration,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::limited(10))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            backoff_base: Duration::from_millis(500),
        })
    }

    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    async fn fetch_once(
        &self,
        url: &str,
        profile: &TransportProfile,
    ) -> Result<FetchedPage, FetchError> {
        let mut req = self
            .client
            .get(url)
            .timeout(profile.timeout())
            .header(USER_AGENT, profile.user_agent.as_str());
        for (k, v) in &profile.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let resp = req.send().await.map_err(|e| request_error(url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = resp.url().to_string();
        let declared = charset_of(resp.headers());
        let bytes = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout { url: url.to_string() }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;
        let (body, encoding) = decode_body(&bytes, declared.as_deref(), profile.charset.as_deref());

        Ok(FetchedPage {
            final_url,
            body,
            encoding,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, profile: &TransportProfile) -> Result<FetchedPage, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url, profile).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt <= u32::from(profile.retries) => {
                    let wait = self.backoff_base * (1u32 << (attempt - 1).min(6));
                    tracing::warn!(%url, attempt, error = %e, "fetch failed, retrying");
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn request_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            source: e,
        }
    }
}

/// Labels servers send by default when they do not know better. Legacy
/// EUC-KR / CP949 boards are the usual offenders, so these are not trusted.
const UNTRUSTED_CHARSETS: [&str; 4] = ["iso-8859-1", "iso8859-1", "latin-1", "latin1"];

/// Pick the charset and decode: a trusted header charset, then the profile's
/// charset, then a `<meta charset>` in the page head, then UTF-8.
/// Returns the text and the label of the encoding actually used.
pub fn decode_body(bytes: &[u8], declared: Option<&str>, profile: Option<&str>) -> (String, String) {
    let trusted = declared.filter(|c| !UNTRUSTED_CHARSETS.contains(c));
    let meta = sniff_meta_charset(bytes);
    let encoding = [trusted, profile, meta.as_deref()]
        .into_iter()
        .flatten()
        .find_map(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or_else(|| {
            // an untrusted latin-1 label only wins over bytes that are not UTF-8
            if std::str::from_utf8(bytes).is_ok() {
                UTF_8
            } else {
                declared
                    .and_then(|l| Encoding::for_label(l.as_bytes()))
                    .unwrap_or(UTF_8)
            }
        });
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = encoding.name(), "body contained undecodable bytes");
    }
    (text.into_owned(), encoding.name().to_ascii_lowercase())
}

/// `charset` from a `<meta charset=..>` or `<meta http-equiv content="..; charset=..">`
/// within the first 2 KiB.
fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    static RE: OnceCell<BytesRegex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        BytesRegex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([a-z0-9_\-:.]+)"#).unwrap()
    });
    let head = &bytes[..bytes.len().min(2048)];
    re.captures(head)
        .and_then(|c| c.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).to_ascii_lowercase())
}

/// `charset` parameter of the Content-Type header, lowercased.
fn charset_of(headers: &HeaderMap) -> Option<String> {
    let ct = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    ct.split(';')
        .skip(1)
        .filter_map(|p| p.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, v)| v.trim().trim_matches('"').to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}
