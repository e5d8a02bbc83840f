//! The unpack routine the watcher triggers
//!
//! The routine is opaque: it takes nothing, returns nothing useful and may
//! fail in ways this crate cannot predict. [`invoke_guarded`] turns both
//! returned errors and panics into a [`RoutineError`].

use crate::error::RoutineError;
use anyhow::Result;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Routine invoked on every poll tick
pub trait UnpackRoutine: Send + Sync {
    fn invoke(&self) -> Result<()>;
}

impl<F> UnpackRoutine for F
where
    F: Fn() -> Result<()> + Send + Sync,
{
    fn invoke(&self) -> Result<()> {
        self()
    }
}

/// Routine exported by native code through the C ABI.
///
/// A native routine that unwinds across the FFI boundary aborts the
/// process; only Rust panics can be contained.
#[derive(Debug, Clone, Copy)]
pub struct NativeRoutine(extern "C" fn());

impl NativeRoutine {
    pub fn new(routine: extern "C" fn()) -> Self {
        Self(routine)
    }
}

impl UnpackRoutine for NativeRoutine {
    fn invoke(&self) -> Result<()> {
        (self.0)();
        Ok(())
    }
}

/// Run the routine once, containing any failure
pub fn invoke_guarded(routine: &dyn UnpackRoutine) -> std::result::Result<(), RoutineError> {
    match panic::catch_unwind(AssertUnwindSafe(|| routine.invoke())) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(RoutineError::Failed(err)),
        Err(payload) => Err(RoutineError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NATIVE_CALLS: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn native_unpack() {
        NATIVE_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn test_successful_invocation() {
        let routine = || -> Result<()> { Ok(()) };
        assert!(invoke_guarded(&routine).is_ok());
    }

    #[test]
    fn test_returned_error_is_contained() {
        let routine = || -> Result<()> { anyhow::bail!("dex file busy") };

        match invoke_guarded(&routine) {
            Err(RoutineError::Failed(err)) => assert!(err.to_string().contains("dex file busy")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_panic_is_contained() {
        let routine = || -> Result<()> { panic!("class loader gone") };

        match invoke_guarded(&routine) {
            Err(RoutineError::Panicked(message)) => assert_eq!(message, "class loader gone"),
            other => panic!("expected Panicked, got {:?}", other),
        }
    }

    #[test]
    fn test_formatted_panic_message() {
        let routine = || -> Result<()> { panic!("bad cookie {}", 7) };

        match invoke_guarded(&routine) {
            Err(RoutineError::Panicked(message)) => assert_eq!(message, "bad cookie 7"),
            other => panic!("expected Panicked, got {:?}", other),
        }
    }

    #[test]
    fn test_native_routine_is_called() {
        let before = NATIVE_CALLS.load(Ordering::SeqCst);
        let routine = NativeRoutine::new(native_unpack);

        invoke_guarded(&routine).unwrap();
        invoke_guarded(&routine).unwrap();

        assert_eq!(NATIVE_CALLS.load(Ordering::SeqCst), before + 2);
    }
}
