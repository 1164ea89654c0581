// src/reconcile.rs
//! Novelty detection: which freshly extracted items were never notified,
//! and in which order to report them.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::extract::Item;

/// Max ids kept per target between runs.
pub const SEEN_CAP: usize = 3000;

/// Compare two post ids by numeric value. Works on digit strings of any
/// length; non-numeric ids sort below every numeric one.
pub fn cmp_ids(a: &str, b: &str) -> Ordering {
    match (digits(a), digits(b)) {
        (Some(x), Some(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.cmp(b))
}

/// Significant digits of a numeric id, or None when not all ASCII digits.
fn digits(s: &str) -> Option<&str> {
    let t = s.trim();
    if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let stripped = t.trim_start_matches('0');
    Some(if stripped.is_empty() { "0" } else { stripped })
}

/// Ids already notified for one target. Order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenSet(HashSet<String>);

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// Returns true when the id was not present before.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ids sorted numerically, largest first.
    pub fn sorted_desc(&self) -> Vec<String> {
        let mut v: Vec<String> = self.0.iter().cloned().collect();
        v.sort_by(|a, b| cmp_ids(b, a));
        v
    }

    /// Keep only the `cap` numerically largest ids.
    pub fn retain_largest(&mut self, cap: usize) {
        if self.0.len() <= cap {
            return;
        }
        let keep: HashSet<String> = self.sorted_desc().into_iter().take(cap).collect();
        self.0 = keep;
    }
}

impl<S: Into<String>> FromIterator<S> for SeenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Items whose id is not in `seen`, oldest first.
pub fn new_items(items: &[Item], seen: &SeenSet) -> Vec<Item> {
    let mut out: Vec<Item> = items
        .iter()
        .filter(|it| !seen.contains(&it.item_id))
        .cloned()
        .collect();
    out.sort_by(|a, b| cmp_ids(&a.item_id, &b.item_id));
    out
}
