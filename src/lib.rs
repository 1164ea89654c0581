// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod metrics;
pub mod notify;
pub mod reconcile;
pub mod run;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::config::{Target, WatchConfig};
pub use crate::error::{FetchError, NotifyError, TargetError};
pub use crate::extract::{Item, StrategyRegistry};
pub use crate::fetch::{FetchedPage, HttpFetcher, PageFetcher};
pub use crate::notify::{LogNotifier, Notifier, TelegramNotifier};
pub use crate::reconcile::{new_items, SeenSet, SEEN_CAP};
pub use crate::run::{RunOptions, RunReport, Watcher};
pub use crate::store::{StateSnapshot, StateStore};
