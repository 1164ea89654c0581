// src/extract/diagnose.rs
use scraper::{ElementRef, Html};
use serde::Serialize;

use super::text::compact_text;
use super::{SEL_A, SEL_TD, SEL_TR};

const SAMPLE_CELLS: usize = 5;

/// Structural counts of a list page, logged when extraction comes back empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructureReport {
    pub rows: usize,
    pub rows_with_cells: usize,
    pub numeric_first_cells: usize,
    pub anchors: usize,
    pub anchors_with_text: usize,
    pub anchors_in_rows: usize,
    /// First-cell texts of the first few rows that have cells.
    pub first_cell_samples: Vec<String>,
}

impl StructureReport {
    pub fn inspect(doc: &Html) -> Self {
        let mut r = StructureReport::default();
        for row in doc.select(&SEL_TR) {
            r.rows += 1;
            let Some(cell) = row.select(&SEL_TD).next() else {
                continue;
            };
            r.rows_with_cells += 1;
            let t = compact_text(cell);
            if !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()) {
                r.numeric_first_cells += 1;
            }
            if r.first_cell_samples.len() < SAMPLE_CELLS {
                r.first_cell_samples.push(t.chars().take(40).collect());
            }
        }
        for a in doc.select(&SEL_A) {
            r.anchors += 1;
            if !compact_text(a).is_empty() {
                r.anchors_with_text += 1;
            }
            let in_row = a
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|e| e.value().name() == "tr");
            if in_row {
                r.anchors_in_rows += 1;
            }
        }
        r
    }

    /// One-line form for logs.
    pub fn summary(&self) -> String {
        format!(
            "rows={} rows_with_cells={} numeric_first_cells={} anchors={} anchors_with_text={} anchors_in_rows={} samples={:?}",
            self.rows,
            self.rows_with_cells,
            self.numeric_first_cells,
            self.anchors,
            self.anchors_with_text,
            self.anchors_in_rows,
            self.first_cell_samples
        )
    }
}
