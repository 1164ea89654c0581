// src/metrics.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::path::Path;

/// One-time metric descriptions (so series carry help text).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watch_targets_total", "Targets attempted.");
        describe_counter!(
            "watch_target_failures_total",
            "Targets that failed, by kind (transport/extraction/config)."
        );
        describe_counter!("watch_items_extracted_total", "Items extracted from list pages.");
        describe_counter!("watch_new_items_total", "Items not seen before.");
        describe_counter!("watch_notify_errors_total", "Messages the channel did not accept.");
        describe_counter!(
            "watch_empty_extractions_total",
            "Pages where no strategy found any item."
        );
        describe_histogram!("watch_extract_ms", "Parse + extract time in milliseconds.");
        describe_gauge!("watch_last_run_ts", "Unix ts when the last run finished.");
    });
}

/// Prometheus recorder whose output is written to a file after the run,
/// for node_exporter's textfile collector.
pub struct TextfileMetrics {
    handle: PrometheusHandle,
}

impl TextfileMetrics {
    pub fn install() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_described();
        Ok(Self { handle })
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, self.render())
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}
