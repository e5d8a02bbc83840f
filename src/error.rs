//! Error types for each fallible step of the watcher lifecycle
//!
//! None of these ever escape to the host as a panic: the gate folds its
//! errors into "not allowed", the poll loop logs routine errors and keeps
//! going, and the global entry points log launch errors.

use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure while evaluating the identity gate
#[derive(Debug, Error)]
pub enum GateError {
    /// The host did not supply a usable process name
    #[error("current process name is unknown")]
    UnknownProcess,

    #[error("failed to open allow-list {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read allow-list {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure of a single unpack routine invocation
#[derive(Debug, Error)]
pub enum RoutineError {
    #[error("unpack routine failed: {0:#}")]
    Failed(#[source] anyhow::Error),

    #[error("unpack routine panicked: {0}")]
    Panicked(String),
}

/// Failure to bring up the poll loop after the gate passed
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to build poll loop runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("failed to spawn watcher thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Rejected watcher configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("allow-list path must not be empty")]
    EmptyAllowListPath,

    #[error("poll interval {actual:?} is outside {min:?}..={max:?}")]
    IntervalOutOfRange {
        actual: Duration,
        min: Duration,
        max: Duration,
    },
}
