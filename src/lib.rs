//! unpack-watcher - process-gated periodic trigger
//!
//! Embedded in a host process, the watcher checks once whether the host's
//! process name is on an allow-list file and, if so, invokes an unpack
//! routine on a dedicated background thread at a fixed interval for the
//! rest of the process lifetime.

pub mod constants;
pub mod error;
pub mod ffi;
pub mod gate;
pub mod logging;
pub mod models;
pub mod watcher;

pub use error::{ConfigError, GateError, LaunchError, RoutineError};
pub use gate::{should_activate, FixedIdentity, HostIdentity, ProcessIdentity};
pub use models::{WatcherConfig, WatcherState};
pub use watcher::{
    activate_if_needed, interrupt_watcher, watcher_handle, watcher_state, Activation, Launcher,
    NativeRoutine, UnpackRoutine, WatcherHandle,
};
