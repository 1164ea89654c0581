// src/config/mod.rs
pub mod notify;
pub mod target;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub use target::{
    ExtractionType, RunSettings, SiteRuleConfig, Target, TransportOverrides, TransportProfile,
};

pub const ENV_CONFIG_PATH: &str = "WATCH_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/targets.toml";
pub const LEGACY_CONFIG_PATH: &str = "targets.json";
/// Upper bound for `transport.retries`, global or per target.
pub const MAX_RETRIES: u8 = 10;

fn default_strip_tags() -> Vec<String> {
    vec!["[new]".to_string(), "[recruiting]".to_string()]
}

/// Everything a run needs besides credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    pub targets: Vec<Target>,
    #[serde(default)]
    pub site_rules: Vec<SiteRuleConfig>,
    /// Decorative tags stripped from titles found by the generic extractor.
    #[serde(default = "default_strip_tags")]
    pub strip_tags: Vec<String>,
    #[serde(default)]
    pub transport: TransportProfile,
    #[serde(default)]
    pub run: RunSettings,
}

impl WatchConfig {
    pub fn from_targets(targets: Vec<Target>) -> Self {
        Self {
            targets,
            site_rules: Vec::new(),
            strip_tags: default_strip_tags(),
            transport: TransportProfile::default(),
            run: RunSettings::default(),
        }
    }

    /// Effective transport profile for one target.
    pub fn transport_for(&self, target: &Target) -> TransportProfile {
        self.transport.merged(&target.transport)
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Reject configurations no run could make sense of.
    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            bail!("no targets configured");
        }
        if self.transport.retries > MAX_RETRIES {
            bail!("transport.retries must be at most {MAX_RETRIES}");
        }
        let mut names = HashSet::new();
        for t in &self.targets {
            if t.name.trim().is_empty() {
                bail!("target with url `{}` has an empty name", t.url);
            }
            if !names.insert(t.name.as_str()) {
                bail!("duplicate target name `{}`", t.name);
            }
            if t.latest_n == 0 {
                bail!("target `{}`: latest_n must be at least 1", t.name);
            }
            if t.url.trim().is_empty() {
                bail!("target `{}` has an empty url", t.name);
            }
            if t.transport.retries.is_some_and(|r| r > MAX_RETRIES) {
                bail!("target `{}`: transport.retries must be at most {MAX_RETRIES}", t.name);
            }
        }
        for r in &self.site_rules {
            if r.url_contains.is_empty() || r.href_contains.is_empty() {
                bail!("site rule `{}`: url_contains and href_contains must be set", r.name);
            }
            if r.id_param.is_empty() || !r.id_param.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                bail!("site rule `{}`: invalid id_param `{}`", r.name, r.id_param);
            }
        }
        Ok(())
    }
}

/// Load and validate a config file. TOML or JSON, picked by extension.
pub fn load_from(path: &Path) -> Result<WatchConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg = parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Resolve the config path:
/// 1) explicit path (CLI flag or $WATCH_CONFIG_PATH)
/// 2) config/targets.toml
/// 3) targets.json
pub fn load_default(explicit: Option<&Path>) -> Result<WatchConfig> {
    if let Some(p) = explicit {
        if !p.exists() {
            bail!("config path {} does not exist", p.display());
        }
        return load_from(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_from(&pb);
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    for candidate in [DEFAULT_CONFIG_PATH, LEGACY_CONFIG_PATH] {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            return load_from(&pb);
        }
    }
    bail!("no config found (tried {DEFAULT_CONFIG_PATH}, {LEGACY_CONFIG_PATH})")
}

fn parse_config(s: &str, hint_ext: &str) -> Result<WatchConfig> {
    match hint_ext {
        "toml" => return toml::from_str(s).context("TOML"),
        "json" => return serde_json::from_str(s).context("JSON"),
        _ => {}
    }
    if let Ok(v) = serde_json::from_str(s) {
        return Ok(v);
    }
    toml::from_str(s).map_err(|e| anyhow!("neither JSON nor TOML: {e}"))
}
