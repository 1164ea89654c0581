// src/run.rs
//! One run over all configured targets.
//!
//! Fetch + extract may run with bounded concurrency; reconciliation and
//! notifications run target by target in config order. Every target is
//! attempted, failures stay scoped to their target, and the state snapshot is
//! saved exactly once at the end.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use metrics::{counter, gauge};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{RunSettings, Target, WatchConfig};
use crate::error::TargetError;
use crate::extract::{Extraction, PageContext, StrategyRegistry};
use crate::fetch::PageFetcher;
use crate::notify::{failure_digest, new_item_message, Notifier};
use crate::reconcile::new_items;
use crate::store::{StateSnapshot, StateStore, TargetState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub send_interval: Duration,
    pub concurrency: usize,
    pub empty_escalation_after: u32,
    pub report_failures: bool,
}

impl From<&RunSettings> for RunOptions {
    fn from(s: &RunSettings) -> Self {
        Self {
            send_interval: Duration::from_millis(s.send_interval_ms),
            concurrency: s.concurrency.max(1),
            empty_escalation_after: s.empty_escalation_after.max(1),
            report_failures: s.report_failures,
        }
    }
}

/// What happened to one target that was processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSummary {
    pub strategy: String,
    pub extracted: usize,
    pub new: usize,
    pub notified: usize,
    pub notify_failures: usize,
}

#[derive(Debug)]
pub struct TargetOutcome {
    pub name: String,
    pub result: Result<TargetSummary, TargetError>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<TargetOutcome>,
}

impl RunReport {
    pub fn outcome(&self, name: &str) -> Option<&TargetOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// `(target, reason)` for failed targets and targets with undelivered messages.
    pub fn failures(&self) -> Vec<(String, String)> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.result {
                Err(e) => Some((o.name.clone(), e.to_string())),
                Ok(s) if s.notify_failures > 0 => Some((
                    o.name.clone(),
                    format!("{} notification(s) not delivered", s.notify_failures),
                )),
                Ok(_) => None,
            })
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures().is_empty()
    }

    pub fn notified_total(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|s| s.notified)
            .sum()
    }
}

pub struct Watcher {
    cfg: WatchConfig,
    registry: StrategyRegistry,
    fetcher: Arc<dyn PageFetcher>,
    notifier: Arc<dyn Notifier>,
    options: RunOptions,
}

impl Watcher {
    pub fn new(
        cfg: WatchConfig,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let registry = StrategyRegistry::from_config(&cfg)?;
        let options = RunOptions::from(&cfg.run);
        Ok(Self {
            cfg,
            registry,
            fetcher,
            notifier,
            options,
        })
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &WatchConfig {
        &self.cfg
    }

    /// Load state, process every target, save once.
    pub async fn run(&self, store: &StateStore) -> Result<RunReport> {
        let mut state = store.load().await;
        let report = self.run_once(&mut state).await;
        store.save(&state).await?;
        Ok(report)
    }

    /// Process every configured target against `state` (no I/O on the store).
    pub async fn run_once(&self, state: &mut StateSnapshot) -> RunReport {
        crate::metrics::ensure_described();
        let targets = &self.cfg.targets;

        let extracted: Vec<Result<Extraction, TargetError>> = stream::iter(targets.iter())
            .map(|t| self.extract_target(t))
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut report = RunReport::default();
        for (target, ext) in targets.iter().zip(extracted) {
            counter!("watch_targets_total").increment(1);
            let result = match ext {
                Ok(ex) => self.reconcile(target, ex, state.entry_mut(&target.name)).await,
                Err(e) => Err(e),
            };
            match &result {
                Ok(s) => info!(
                    target = %target.name,
                    strategy = %s.strategy,
                    extracted = s.extracted,
                    new = s.new,
                    notified = s.notified,
                    "target done"
                ),
                Err(e) => {
                    warn!(target = %target.name, kind = e.kind(), error = %e, "target failed");
                    counter!("watch_target_failures_total", "kind" => e.kind()).increment(1);
                }
            }
            report.outcomes.push(TargetOutcome {
                name: target.name.clone(),
                result,
            });
        }

        if self.options.report_failures {
            let failures = report.failures();
            if !failures.is_empty() {
                let digest = failure_digest(&failures, targets.len());
                if let Err(e) = self.notifier.send(&digest).await {
                    warn!(error = %e, "failure digest not delivered");
                }
            }
        }

        gauge!("watch_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        report
    }

    /// Fetch one target's page and run its extraction strategy.
    pub async fn extract_target(&self, target: &Target) -> Result<Extraction, TargetError> {
        target.extraction_type()?;
        let profile = self.cfg.transport_for(target);
        let page = self.fetcher.fetch(&target.url, &profile).await?;
        debug!(
            target = %target.name,
            final_url = %page.final_url,
            encoding = %page.encoding,
            bytes = page.body.len(),
            "fetched"
        );
        let ctx = PageContext::new(&target.url, &page.final_url)?;
        Ok(self.registry.extract(&page.body, &ctx, target.latest_n))
    }

    /// Diff against history, notify oldest first, mark each delivered id.
    async fn reconcile(
        &self,
        target: &Target,
        ex: Extraction,
        state: &mut TargetState,
    ) -> Result<TargetSummary, TargetError> {
        let mut summary = TargetSummary {
            strategy: ex.strategy.clone(),
            extracted: ex.items.len(),
            ..Default::default()
        };
        counter!("watch_items_extracted_total").increment(ex.items.len() as u64);

        if ex.items.is_empty() {
            counter!("watch_empty_extractions_total").increment(1);
            state.empty_streak = state.empty_streak.saturating_add(1);
            if !state.seen.is_empty() && state.empty_streak >= self.options.empty_escalation_after {
                return Err(TargetError::StructureChanged {
                    strategy: ex.strategy,
                    streak: state.empty_streak,
                });
            }
            info!(
                target = %target.name,
                streak = state.empty_streak,
                history = state.seen.len(),
                "no items extracted"
            );
            return Ok(summary);
        }
        state.empty_streak = 0;

        let preview: Vec<(&str, &str)> = ex
            .items
            .iter()
            .take(5)
            .map(|it| (it.item_id.as_str(), it.title.as_str()))
            .collect();
        debug!(target = %target.name, first5 = ?preview, "extracted items");

        let fresh = new_items(&ex.items, &state.seen);
        summary.new = fresh.len();
        counter!("watch_new_items_total").increment(fresh.len() as u64);
        if fresh.is_empty() {
            info!(target = %target.name, "no new items");
            return Ok(summary);
        }

        for (i, it) in fresh.iter().enumerate() {
            if i > 0 && !self.options.send_interval.is_zero() {
                tokio::time::sleep(self.options.send_interval).await;
            }
            match self.notifier.send(&new_item_message(&target.name, it)).await {
                Ok(()) => {
                    state.seen.insert(it.item_id.clone());
                    summary.notified += 1;
                    info!(target = %target.name, id = %it.item_id, title = %it.title, "sent");
                }
                Err(e) => {
                    summary.notify_failures += 1;
                    counter!("watch_notify_errors_total").increment(1);
                    warn!(
                        target = %target.name,
                        id = %it.item_id,
                        notifier = self.notifier.name(),
                        error = %e,
                        "send failed; will retry next run"
                    );
                }
            }
        }
        Ok(summary)
    }
}
