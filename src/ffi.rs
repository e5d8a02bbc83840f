//! C ABI entry points for native hosts
//!
//! These drive the process-wide watcher from native bootstrap code, with
//! the unpack routine passed as a plain function pointer.

use crate::watcher::{self, NativeRoutine};

/// Start the watcher if this process is allow-listed.
///
/// Returns true when a watcher is running after the call. A null routine
/// never starts one.
#[no_mangle]
pub extern "C" fn unpack_watcher_activate(routine: Option<extern "C" fn()>) -> bool {
    match routine {
        Some(routine) => watcher::activate_if_needed(NativeRoutine::new(routine)).is_running(),
        None => watcher::watcher_state().is_running(),
    }
}

/// Whether the watcher is running in this process
#[no_mangle]
pub extern "C" fn unpack_watcher_is_running() -> bool {
    watcher::watcher_state().is_running()
}

/// Cut the current poll sleep short. Returns false when no watcher runs.
#[no_mangle]
pub extern "C" fn unpack_watcher_interrupt() -> bool {
    watcher::interrupt_watcher()
}
