//! Watcher lifecycle: launcher, poll loop and the routine they trigger
//!
//! The functions at this level drive the single process-wide watcher. It
//! is created lazily, gated against the host's own process name, and once
//! running it is never torn down.

pub mod launcher;
pub mod poll_loop;
pub mod routine;

pub use launcher::{Activation, Launcher, WatcherHandle};
pub use poll_loop::{LoopSignals, LoopStats, PollLoop};
pub use routine::{invoke_guarded, NativeRoutine, UnpackRoutine};

use crate::gate::ProcessIdentity;
use crate::logging::WatcherLogger;
use crate::models::WatcherState;
use std::sync::OnceLock;

static GLOBAL_LAUNCHER: OnceLock<Launcher> = OnceLock::new();

fn global() -> &'static Launcher {
    GLOBAL_LAUNCHER.get_or_init(Launcher::host)
}

/// Start the process-wide watcher if this process is allow-listed.
///
/// Safe to call any number of times from any thread; only the first
/// successful call starts a loop and later routines are dropped unused.
pub fn activate_if_needed<R>(routine: R) -> WatcherState
where
    R: UnpackRoutine + 'static,
{
    activate_on(global(), routine)
}

/// Activate `launcher`, logging launch failures instead of returning them
fn activate_on<I, R>(launcher: &Launcher<I>, routine: R) -> WatcherState
where
    I: ProcessIdentity,
    R: UnpackRoutine + 'static,
{
    if let Err(err) = launcher.activate_if_needed(routine) {
        WatcherLogger::default().log_launch_failed(&err);
    }

    launcher.state()
}

fn interrupt_on<I: ProcessIdentity>(launcher: Option<&Launcher<I>>) -> bool {
    match launcher.and_then(Launcher::handle) {
        Some(handle) => {
            handle.interrupt();
            true
        }
        None => false,
    }
}

/// Current state of the process-wide watcher
pub fn watcher_state() -> WatcherState {
    GLOBAL_LAUNCHER
        .get()
        .map(Launcher::state)
        .unwrap_or_default()
}

/// Wake the process-wide watcher early. Returns false when none is running.
pub fn interrupt_watcher() -> bool {
    interrupt_on(GLOBAL_LAUNCHER.get())
}

/// Handle to the process-wide watcher, if it is running
pub fn watcher_handle() -> Option<WatcherHandle> {
    GLOBAL_LAUNCHER.get().and_then(Launcher::handle)
}
