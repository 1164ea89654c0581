// src/extract/table.rs
//! Default extractor for numbered list tables:
//!
//! ```text
//! <tr>
//!   <td>376</td>
//!   <td><a href="view.php?no=376">Title</a></td>
//! </tr>
//! ```
//!
//! Pass 1 walks rows whose first cell is a number. Pass 2 runs only when
//! pass 1 found nothing and walks anchors up to their enclosing row instead.

use scraper::{ElementRef, Html};

use super::links::item_url;
use super::text::{compact_text, spaced_text, TagStripper};
use super::{ExtractionStrategy, Item, ItemCollector, PageContext, SEL_A, SEL_TD, SEL_TR};

pub const GENERIC_TABLE: &str = "generic-table";

#[derive(Debug, Clone, Default)]
pub struct GenericTableExtractor {
    stripper: TagStripper,
}

impl GenericTableExtractor {
    pub fn new(strip_tags: &[String]) -> Self {
        Self {
            stripper: TagStripper::new(strip_tags),
        }
    }

    fn rows_pass(&self, doc: &Html, page: &PageContext, out: &mut ItemCollector) {
        for row in doc.select(&SEL_TR) {
            let Some(id) = first_cell_id(row) else {
                continue;
            };
            let Some(anchor) = row.select(&SEL_A).next() else {
                continue;
            };
            if let Some(item) = self.item_from(id, anchor, page) {
                out.push(item);
            }
        }
    }

    fn anchors_pass(&self, doc: &Html, page: &PageContext, out: &mut ItemCollector) {
        for anchor in doc.select(&SEL_A) {
            let Some(row) = enclosing_row(anchor) else {
                continue;
            };
            let Some(id) = first_cell_id(row) else {
                continue;
            };
            if let Some(item) = self.item_from(id, anchor, page) {
                out.push(item);
            }
        }
    }

    /// None when the anchor carries no usable title.
    fn item_from(&self, id: String, anchor: ElementRef<'_>, page: &PageContext) -> Option<Item> {
        let title = self.stripper.clean(&spaced_text(anchor));
        if title.is_empty() {
            return None;
        }
        Some(Item {
            item_id: id,
            title,
            url: item_url(anchor, page),
        })
    }
}

impl ExtractionStrategy for GenericTableExtractor {
    fn name(&self) -> &str {
        GENERIC_TABLE
    }

    fn matches(&self, _target_url: &str) -> bool {
        true
    }

    fn extract(&self, doc: &Html, page: &PageContext, cap: usize) -> Vec<Item> {
        let mut out = ItemCollector::default();
        self.rows_pass(doc, page, &mut out);
        if out.is_empty() {
            self.anchors_pass(doc, page, &mut out);
        }
        out.finish(cap)
    }
}

/// Trimmed text of the row's first `<td>` when it is all digits.
fn first_cell_id(row: ElementRef<'_>) -> Option<String> {
    let cell = row.select(&SEL_TD).next()?;
    let t = compact_text(cell);
    (!t.is_empty() && t.bytes().all(|b| b.is_ascii_digit())).then_some(t)
}

fn enclosing_row(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "tr")
}
