//! Global constants for unpack-watcher
//!
//! Centralized location for process-wide constants

/// Allow-list consulted by the identity gate, one process name per line
pub const ALLOW_LIST_PATH: &str = "/data/local/tmp/sunlake.config";

/// Delay between unpack routine invocations, in milliseconds
pub const POLL_INTERVAL_MS: u64 = 10_000;

/// Lower bound accepted for a configured poll interval
pub const MIN_POLL_INTERVAL_MS: u64 = 1;

/// Upper bound accepted for a configured poll interval (one hour)
pub const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;

/// Application subsystem identifier used for the macOS Unified Logging backend
pub const APP_SUBSYSTEM: &str = "com.sysinternals.unpackwatcher";

/// Target attached to every record emitted through the `log` facade
pub const LOG_TARGET: &str = "unpack_watcher";

/// Name given to the dedicated poll loop thread
pub const WATCHER_THREAD_NAME: &str = "unpack-watcher";

/// argv[0] placeholder an Android app process carries before it is bound
/// to its package; the process has no usable name yet
pub const UNINITIALIZED_PROCESS_NAME: &str = "<pre-initialized>";

/// Procfs entry holding the argv of the current process
pub const PROC_SELF_CMDLINE: &str = "/proc/self/cmdline";
