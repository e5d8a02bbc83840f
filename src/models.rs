//! Data models module
//!
//! Defines core data structures:
//! - WatcherState: whether this process has a running poll loop
//! - WatcherConfig: allow-list location and poll interval

use crate::constants::{
    ALLOW_LIST_PATH, MAX_POLL_INTERVAL_MS, MIN_POLL_INTERVAL_MS, POLL_INTERVAL_MS,
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Process-wide watcher state. Moves from `Absent` to `Running` once and
/// never back for the global watcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatcherState {
    #[default]
    Absent,
    Running,
}

impl WatcherState {
    pub fn is_running(self) -> bool {
        self == WatcherState::Running
    }
}

/// Settings for one watcher instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Allow-list file, one process name per line
    pub allow_list_path: PathBuf,
    /// Delay between unpack routine invocations in milliseconds
    pub poll_interval_ms: u64,
}

impl WatcherConfig {
    /// Get the poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allow_list_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyAllowListPath);
        }

        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.poll_interval_ms) {
            return Err(ConfigError::IntervalOutOfRange {
                actual: self.poll_interval(),
                min: Duration::from_millis(MIN_POLL_INTERVAL_MS),
                max: Duration::from_millis(MAX_POLL_INTERVAL_MS),
            });
        }

        Ok(())
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            allow_list_path: PathBuf::from(ALLOW_LIST_PATH),
            poll_interval_ms: POLL_INTERVAL_MS,
        }
    }
}
