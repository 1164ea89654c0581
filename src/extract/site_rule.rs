// src/extract/site_rule.rs
use anyhow::{Context, Result};
use regex::Regex;
use scraper::Html;

use super::links::resolve;
use super::text::{spaced_text, TagStripper};
use super::{ExtractionStrategy, Item, ItemCollector, PageContext, SEL_A_HREF};
use crate::config::SiteRuleConfig;

/// Site rule for boards whose detail links carry the post number in a
/// query parameter, e.g. `board_view.do?no=1234` or `view?seq=88`.
#[derive(Debug, Clone)]
pub struct QueryParamRule {
    name: String,
    url_contains: String,
    href_contains: String,
    id_re: Regex,
    stripper: TagStripper,
}

impl QueryParamRule {
    pub fn new(
        name: impl Into<String>,
        url_contains: impl Into<String>,
        href_contains: impl Into<String>,
        id_param: &str,
        strip_tags: &[String],
    ) -> Result<Self> {
        let name = name.into();
        let id_re = Regex::new(&format!(r"[?&;]{}=(\d+)", regex::escape(id_param)))
            .with_context(|| format!("site rule `{name}`: id pattern"))?;
        Ok(Self {
            name,
            url_contains: url_contains.into(),
            href_contains: href_contains.into(),
            id_re,
            stripper: TagStripper::new(strip_tags),
        })
    }

    pub fn from_config(c: &SiteRuleConfig) -> Result<Self> {
        Self::new(
            c.name.clone(),
            c.url_contains.clone(),
            c.href_contains.clone(),
            &c.id_param,
            &c.strip_tags,
        )
    }

    fn id_of(&self, href: &str) -> Option<String> {
        self.id_re
            .captures(href)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

impl ExtractionStrategy for QueryParamRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, target_url: &str) -> bool {
        target_url.contains(&self.url_contains)
    }

    fn extract(&self, doc: &Html, page: &PageContext, cap: usize) -> Vec<Item> {
        let mut out = ItemCollector::default();
        for a in doc.select(&SEL_A_HREF) {
            let href = a.value().attr("href").unwrap_or_default().trim();
            if !href.contains(&self.href_contains) {
                continue;
            }
            let Some(id) = self.id_of(href) else {
                continue;
            };
            let title = self.stripper.clean(&spaced_text(a));
            if title.is_empty() {
                continue;
            }
            let url = resolve(&page.final_url, href).unwrap_or_else(|| page.target_url.clone());
            out.push(Item {
                item_id: id,
                title,
                url,
            });
        }
        out.finish(cap)
    }
}
