//! Settings for opening a database and for the background refresh.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which snapshot [`Database::open`](crate::Database::open) starts from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotChoice {
    /// The snapshot with the latest save time.
    #[default]
    Newest,
    /// A specific file; falls back to the newest one if it is not a
    /// readable snapshot.
    Named(String),
}

/// How a directory is opened.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// Ignore snapshots and import every file.
    pub force_new_import: bool,
    pub snapshot: SnapshotChoice,
    /// Write a snapshot right after opening.
    pub save_after_open: bool,
}

/// Cadence of the background refresh loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub enabled: bool,

    /// Pause between the update check and the snapshot flush.
    pub action_gap_ms: u64,

    /// Pause after the flush before the next cycle.
    pub cycle_gap_ms: u64,

    /// Stop on its own after this many cycles.
    pub max_cycles: Option<u64>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            action_gap_ms: 5_000,
            cycle_gap_ms: 60_000,
            max_cycles: None,
        }
    }
}

impl RefreshConfig {
    /// Create a disabled refresh config.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn action_gap(&self) -> Duration {
        Duration::from_millis(self.action_gap_ms)
    }

    pub fn cycle_gap(&self) -> Duration {
        Duration::from_millis(self.cycle_gap_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RefreshConfig::default();
        assert!(config.enabled);
        assert_eq!(config.action_gap(), Duration::from_secs(5));
        assert_eq!(config.cycle_gap(), Duration::from_secs(60));
        assert!(!RefreshConfig::disabled().enabled);
    }

    #[test]
    fn test_options_from_partial_json() {
        let options: OpenOptions =
            serde_json::from_str(r#"{"snapshot": {"named": "_database_3.spmdb"}}"#).unwrap();
        assert!(!options.force_new_import);
        assert_eq!(options.snapshot, SnapshotChoice::Named("_database_3.spmdb".into()));
    }
}
