// src/store.rs
//! Seen-id snapshot persisted between runs, one JSON file for all targets.
//!
//! Loading never fails the run: a missing or unreadable file is a cold start.
//! Saving writes the whole snapshot once, via a temp file and a rename.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::reconcile::{SeenSet, SEEN_CAP};

pub const ENV_STATE_PATH: &str = "WATCH_STATE_PATH";
pub const DEFAULT_STATE_PATH: &str = "state/seen.json";

/// What is remembered about one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetState {
    pub seen: SeenSet,
    /// Consecutive runs that extracted nothing.
    pub empty_streak: u32,
}

/// In-memory view of the whole state file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    targets: BTreeMap<String, TargetState>,
}

impl StateSnapshot {
    pub fn get(&self, name: &str) -> Option<&TargetState> {
        self.targets.get(name)
    }

    pub fn entry_mut(&mut self, name: &str) -> &mut TargetState {
        self.targets.entry(name.to_string()).or_default()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

// --- on-disk forms ---

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredId {
    Text(String),
    Number(u64),
}

impl From<StoredId> for String {
    fn from(id: StoredId) -> Self {
        match id {
            StoredId::Text(s) => s,
            StoredId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTarget {
    /// Older files: plain list of ids per target.
    Legacy(Vec<StoredId>),
    Full {
        seen: Vec<StoredId>,
        #[serde(default)]
        empty_streak: u32,
    },
}

#[derive(Serialize)]
struct TargetOut {
    seen: Vec<String>,
    empty_streak: u32,
}

/// Parse a state file body.
pub fn decode(s: &str) -> Result<StateSnapshot> {
    let raw: BTreeMap<String, StoredTarget> =
        serde_json::from_str(s).context("parsing state JSON")?;
    let targets = raw
        .into_iter()
        .map(|(name, st)| {
            let (ids, empty_streak) = match st {
                StoredTarget::Full { seen, empty_streak } => (seen, empty_streak),
                StoredTarget::Legacy(seen) => (seen, 0),
            };
            let seen: SeenSet = ids.into_iter().map(String::from).collect();
            (name, TargetState { seen, empty_streak })
        })
        .collect();
    Ok(StateSnapshot { targets })
}

/// Serialize a snapshot: ids numerically descending, capped per target.
pub fn encode(snap: &StateSnapshot) -> Result<String> {
    let out: BTreeMap<&str, TargetOut> = snap
        .targets
        .iter()
        .map(|(name, st)| {
            let mut kept = st.seen.clone();
            kept.retain_largest(SEEN_CAP);
            (
                name.as_str(),
                TargetOut {
                    seen: kept.sorted_desc(),
                    empty_streak: st.empty_streak,
                },
            )
        })
        .collect();
    serde_json::to_string_pretty(&out).context("serializing state")
}

#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or malformed file → empty snapshot.
    pub async fn load(&self) -> StateSnapshot {
        let body = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no state file, cold start");
                return StateSnapshot::default();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "read state: {e:#}; cold start");
                return StateSnapshot::default();
            }
        };
        match decode(&body) {
            Ok(snap) => {
                tracing::debug!(targets = snap.len(), "state loaded");
                snap
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "state unreadable: {e:#}; cold start");
                StateSnapshot::default()
            }
        }
    }

    /// Write the whole snapshot. Readers never see a half-written file.
    pub async fn save(&self, snap: &StateSnapshot) -> Result<()> {
        let body = encode(snap)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating state dir {}", dir.display()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body.as_bytes())
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), targets = snap.len(), "state saved");
        Ok(())
    }
}
