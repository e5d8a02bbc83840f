//! Structured logging for watcher lifecycle events
//!
//! Every event goes through the `log` facade under [`LOG_TARGET`] as a short
//! message followed by a JSON payload. The host owns the backend; on macOS
//! [`init_logger`] can install the Unified Logging one.

use crate::constants::LOG_TARGET;
use crate::error::{GateError, LaunchError, RoutineError};
use crate::models::WatcherConfig;
use anyhow::Result;
use log::{debug, error, info, warn};
use serde_json::json;
use std::path::Path;

/// Install a `log` backend for standalone use
pub fn init_logger() -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        let logger = oslog::OsLogger::new(crate::constants::APP_SUBSYSTEM);
        log::set_boxed_logger(Box::new(logger))
            .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))?;
        log::set_max_level(log::LevelFilter::Debug);
        Ok(())
    }

    #[cfg(not(target_os = "macos"))]
    {
        Err(anyhow::anyhow!(
            "No bundled log backend for this platform; the host must install one"
        ))
    }
}

/// Logger for watcher events
#[derive(Debug, Clone)]
pub struct WatcherLogger {
    /// Most verbose level that is emitted
    level: LogLevel,
}

/// Log levels for watcher events, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
}

impl WatcherLogger {
    pub fn new(level: LogLevel) -> Self {
        Self { level }
    }

    /// Outcome of an allow-list comparison
    pub fn log_gate_decision(&self, allow_list: &Path, process_name: &str, allowed: bool) {
        let message = json!({
            "event": "gate_decision",
            "process_name": process_name,
            "allow_list": allow_list.display().to_string(),
            "allowed": allowed,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let summary = if allowed {
            format!("Process {} is allow-listed", process_name)
        } else {
            format!("Process {} is not allow-listed", process_name)
        };
        self.log_structured(LogLevel::Debug, &summary, &message);
    }

    /// Gate could not be evaluated; treated as "not allowed"
    pub fn log_gate_error(&self, err: &GateError) {
        let message = json!({
            "event": "gate_error",
            "error": err.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        // A missing allow-list is the normal state for most processes
        let level = match err {
            GateError::Open { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                LogLevel::Debug
            }
            GateError::UnknownProcess => LogLevel::Debug,
            _ => LogLevel::Warn,
        };
        self.log_structured(level, "Allow-list check failed", &message);
    }

    pub fn log_started(&self, config: &WatcherConfig, pid: u32) {
        let message = json!({
            "event": "watcher_started",
            "pid": pid,
            "config": serde_json::to_value(config).unwrap_or_default(),
            "version": env!("UNPACK_WATCHER_VERSION"),
            "git_hash": env!("GIT_HASH"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Info, "Watcher started", &message);
    }

    /// Activation request that did not start a loop
    pub fn log_activation_skipped(&self, reason: &str) {
        let message = json!({
            "event": "activation_skipped",
            "reason": reason,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Debug, "Watcher activation skipped", &message);
    }

    pub fn log_launch_failed(&self, err: &LaunchError) {
        let message = json!({
            "event": "launch_failed",
            "error": err.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Error, "Watcher launch failed", &message);
    }

    pub fn log_sleep_interrupted(&self) {
        let message = json!({
            "event": "sleep_interrupted",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Info, "Poll sleep interrupted", &message);
    }

    pub fn log_routine_failed(&self, err: &RoutineError, invocation: u64) {
        let message = json!({
            "event": "routine_failed",
            "invocation": invocation,
            "panicked": matches!(err, RoutineError::Panicked(_)),
            "error": err.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Error, "Unpack routine failed", &message);
    }

    pub fn log_stopped(&self, invocations: u64, failures: u64) {
        let message = json!({
            "event": "watcher_stopped",
            "invocations": invocations,
            "failures": failures,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.log_structured(LogLevel::Info, "Watcher stopped", &message);
    }

    fn log_structured(&self, level: LogLevel, message: &str, data: &serde_json::Value) {
        if !self.should_log(level) {
            return;
        }

        let full_message = format!("{} | {}", message, data);

        match level {
            LogLevel::Error => error!(target: LOG_TARGET, "{}", full_message),
            LogLevel::Warn => warn!(target: LOG_TARGET, "{}", full_message),
            LogLevel::Info => info!(target: LOG_TARGET, "{}", full_message),
            LogLevel::Debug => debug!(target: LOG_TARGET, "{}", full_message),
        }
    }

    /// Check if we should log at this level
    pub fn should_log(&self, level: LogLevel) -> bool {
        level <= self.level
    }
}

impl Default for WatcherLogger {
    fn default() -> Self {
        Self::new(LogLevel::Debug)
    }
}
