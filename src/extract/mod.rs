// src/extract/mod.rs
//! Turning a fetched list page into items.
//!
//! A [`StrategyRegistry`] routes a target URL to the first matching site rule
//! (in configuration order) or to the generic table extractor. Every strategy
//! returns at most `cap` items, unique by id, numerically descending.

pub mod diagnose;
pub mod links;
pub mod site_rule;
pub mod table;
pub mod text;

use anyhow::Result;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::config::WatchConfig;
use crate::error::TargetError;
use crate::reconcile::cmp_ids;

pub use diagnose::StructureReport;
pub use site_rule::QueryParamRule;
pub use table::GenericTableExtractor;

pub(crate) static SEL_TR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("tr selector"));
pub(crate) static SEL_TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("td selector"));
pub(crate) static SEL_A: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("a selector"));
pub(crate) static SEL_A_HREF: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("a[href] selector"));

/// One notice found on a list page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// The board's own sequential post number, as digits.
    pub item_id: String,
    pub title: String,
    /// Deep link when discoverable, otherwise the list page URL.
    pub url: String,
}

/// Where a parsed page came from.
#[derive(Debug, Clone)]
pub struct PageContext {
    /// Configured list URL; the fallback item URL.
    pub target_url: String,
    /// URL after redirects; base for relative links.
    pub final_url: Url,
}

impl PageContext {
    pub fn new(target_url: &str, final_url: &str) -> Result<Self, TargetError> {
        let base = Url::parse(final_url)
            .or_else(|_| Url::parse(target_url))
            .map_err(|_| TargetError::InvalidUrl(final_url.to_string()))?;
        Ok(Self {
            target_url: target_url.to_string(),
            final_url: base,
        })
    }
}

/// One extraction procedure.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this strategy handles pages of `target_url`.
    fn matches(&self, target_url: &str) -> bool;

    /// At most `cap` items, unique ids, numerically descending.
    fn extract(&self, doc: &Html, page: &PageContext, cap: usize) -> Vec<Item>;
}

/// Accumulates items keyed by id; a later row with the same id replaces the earlier one.
#[derive(Debug, Default)]
pub struct ItemCollector {
    by_id: HashMap<String, Item>,
}

impl ItemCollector {
    pub fn push(&mut self, item: Item) {
        self.by_id.insert(item.item_id.clone(), item);
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Newest first, truncated to `cap`.
    pub fn finish(self, cap: usize) -> Vec<Item> {
        let mut items: Vec<Item> = self.by_id.into_values().collect();
        items.sort_by(|a, b| cmp_ids(&b.item_id, &a.item_id));
        items.truncate(cap);
        items
    }
}

/// Result of running the registry over one page.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Strategy the target was routed to.
    pub strategy: String,
    pub items: Vec<Item>,
    /// Present when the routed strategy came back empty.
    pub report: Option<StructureReport>,
    /// Items came from the generic extractor after a site rule found nothing.
    pub recovered_by_fallback: bool,
}

/// Ordered site rules plus one default fallback.
pub struct StrategyRegistry {
    rules: Vec<Box<dyn ExtractionStrategy>>,
    fallback: Box<dyn ExtractionStrategy>,
}

impl StrategyRegistry {
    pub fn new(fallback: Box<dyn ExtractionStrategy>) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    pub fn with_rule(mut self, rule: Box<dyn ExtractionStrategy>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Site rules in file order, generic table extractor last.
    pub fn from_config(cfg: &WatchConfig) -> Result<Self> {
        let mut reg = Self::new(Box::new(GenericTableExtractor::new(&cfg.strip_tags)));
        for rc in &cfg.site_rules {
            reg = reg.with_rule(Box::new(QueryParamRule::from_config(rc)?));
        }
        Ok(reg)
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// First matching site rule, if any.
    fn site_rule(&self, target_url: &str) -> Option<&dyn ExtractionStrategy> {
        self.rules
            .iter()
            .find(|r| r.matches(target_url))
            .map(|r| r.as_ref())
    }

    pub fn select(&self, target_url: &str) -> &dyn ExtractionStrategy {
        self.site_rule(target_url)
            .unwrap_or_else(|| self.fallback.as_ref())
    }

    /// Parse `html` and run the routed strategy. An empty result triggers one
    /// diagnostic pass: the page structure is inspected and, for site rules,
    /// the generic extractor gets a try on the same document.
    pub fn extract(&self, html: &str, page: &PageContext, cap: usize) -> Extraction {
        let t0 = Instant::now();
        let doc = Html::parse_document(html);
        let rule = self.site_rule(&page.target_url);
        let strategy = rule.unwrap_or_else(|| self.fallback.as_ref());

        let items = strategy.extract(&doc, page, cap);
        metrics::histogram!("watch_extract_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        debug!(strategy = strategy.name(), found = items.len(), "extracted");

        if !items.is_empty() {
            return Extraction {
                strategy: strategy.name().to_string(),
                items,
                report: None,
                recovered_by_fallback: false,
            };
        }

        let report = StructureReport::inspect(&doc);
        warn!(
            strategy = strategy.name(),
            url = %page.final_url,
            report = %report.summary(),
            "no items extracted, inspecting page structure"
        );

        let mut recovered = Vec::new();
        if rule.is_some() {
            recovered = self.fallback.extract(&doc, page, cap);
            if !recovered.is_empty() {
                warn!(
                    rule = strategy.name(),
                    recovered = recovered.len(),
                    "site rule found nothing; generic extractor recovered items"
                );
            }
        }

        Extraction {
            strategy: strategy.name().to_string(),
            recovered_by_fallback: !recovered.is_empty(),
            items: recovered,
            report: Some(report),
        }
    }
}
