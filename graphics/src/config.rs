//! Render index configuration.
//!
//! Settings can come from a TOML file and are then overridden by process
//! environment variables:
//!
//! | Variable                   | Field                  |
//! |----------------------------|------------------------|
//! | `HD_ENABLE_REFINED_CURVES` | `force_refined_curves` |
//! | `HD_SAFE_MODE`             | `safe_mode`            |
//! | `HD_SYNC_THREADS`          | `sync_threads`         |
//!
//! ```toml
//! force_refined_curves = false
//! safe_mode = true
//! sync_threads = 8
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{GraphicsError, Result};

/// Environment variable forcing every curve repr to the refined style.
pub const ENV_ENABLE_REFINED_CURVES: &str = "HD_ENABLE_REFINED_CURVES";
/// Environment variable enabling topology collision checks.
pub const ENV_SAFE_MODE: &str = "HD_SAFE_MODE";
/// Environment variable fixing the number of sync worker threads.
pub const ENV_SYNC_THREADS: &str = "HD_SYNC_THREADS";

/// Settings consumed by the render index and the rprim drivers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Always request smooth refinement for curves, regardless of refine level.
    pub force_refined_curves: bool,
    /// Verify that topologies shared by hash are structurally equal.
    pub safe_mode: bool,
    /// Number of sync worker threads. `None` uses the available parallelism.
    pub sync_threads: Option<usize>,
    /// Dirty rprim count below which a sync pass runs on the calling thread.
    pub parallel_threshold: usize,
    /// Minimum number of rprims handed to one worker.
    pub min_batch_size: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            force_refined_curves: false,
            safe_mode: cfg!(debug_assertions),
            sync_threads: None,
            parallel_threshold: 128,
            min_batch_size: 64,
        }
    }
}

impl RenderConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Parse a TOML document. Missing fields keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| GraphicsError::Config(e.to_string()))
    }

    /// Load a TOML file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GraphicsError::Config(format!("failed to read {}: {e}", path.display())))?;
        Ok(Self::from_toml_str(&content)?.with_env_overrides())
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup(ENV_ENABLE_REFINED_CURVES) {
            self.force_refined_curves = parse_flag(ENV_ENABLE_REFINED_CURVES, &v)
                .unwrap_or(self.force_refined_curves);
        }
        if let Some(v) = lookup(ENV_SAFE_MODE) {
            self.safe_mode = parse_flag(ENV_SAFE_MODE, &v).unwrap_or(self.safe_mode);
        }
        if let Some(v) = lookup(ENV_SYNC_THREADS) {
            match v.trim().parse::<usize>() {
                Ok(0) => self.sync_threads = None,
                Ok(n) => self.sync_threads = Some(n),
                Err(_) => log::warn!("ignoring {ENV_SYNC_THREADS}={v:?}: not a thread count"),
            }
        }
        self
    }

    /// Number of worker threads a sync pass may use.
    pub fn effective_threads(&self) -> usize {
        self.sync_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

fn parse_flag(name: &str, value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" | "" => Some(false),
        _ => {
            log::warn!("ignoring {name}={value:?}: expected 0 or 1");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = RenderConfig::default();
        assert!(!config.force_refined_curves);
        assert_eq!(config.sync_threads, None);
        assert!(config.effective_threads() >= 1);
    }

    #[test]
    fn toml_keeps_missing_defaults() {
        let config = RenderConfig::from_toml_str("force_refined_curves = true\nsync_threads = 3")
            .unwrap();
        assert!(config.force_refined_curves);
        assert_eq!(config.sync_threads, Some(3));
        assert_eq!(config.parallel_threshold, 128);
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = RenderConfig::from_toml_str("safe_mode = 12").unwrap_err();
        assert!(matches!(err, GraphicsError::Config(_)));
    }

    #[test]
    fn overrides_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_ENABLE_REFINED_CURVES, "1"),
            (ENV_SAFE_MODE, "off"),
            (ENV_SYNC_THREADS, "4"),
        ]
        .into_iter()
        .collect();
        let config = RenderConfig::default()
            .with_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert!(config.force_refined_curves);
        assert!(!config.safe_mode);
        assert_eq!(config.effective_threads(), 4);
    }

    #[test]
    fn malformed_override_is_ignored() {
        let config = RenderConfig::default()
            .with_overrides(|k| (k == ENV_ENABLE_REFINED_CURVES).then(|| "maybe".to_string()));
        assert!(!config.force_refined_curves);
    }
}
