//! Poll-and-trigger loop
//!
//! Sleeps for the poll interval, then invokes the unpack routine, forever.
//! The next sleep starts only once the routine has returned, so
//! invocations never overlap. Neither an interrupted sleep nor a failing
//! invocation ends the loop; only a shutdown request from the owner does.

use crate::logging::WatcherLogger;
use crate::watcher::routine::{invoke_guarded, UnpackRoutine};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Wake-ups delivered to a running loop.
///
/// Both signals are latched: one raised while the routine is running is
/// seen at the start of the next sleep.
#[derive(Debug, Default)]
pub struct LoopSignals {
    interrupt: Notify,
    shutdown: Notify,
}

impl LoopSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cut the current sleep short; the routine runs right away
    pub fn interrupt(&self) {
        self.interrupt.notify_one();
    }

    pub(crate) fn request_shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// Counters updated by the loop
#[derive(Debug, Default)]
pub struct LoopStats {
    invocations: AtomicU64,
    failures: AtomicU64,
}

impl LoopStats {
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::SeqCst)
    }
}

/// A configured loop, ready to be driven by a runtime
pub struct PollLoop {
    interval: Duration,
    routine: Arc<dyn UnpackRoutine>,
    signals: Arc<LoopSignals>,
    stats: Arc<LoopStats>,
    logger: WatcherLogger,
}

impl PollLoop {
    pub fn new(interval: Duration, routine: Arc<dyn UnpackRoutine>, logger: WatcherLogger) -> Self {
        Self {
            interval,
            routine,
            signals: Arc::new(LoopSignals::new()),
            stats: Arc::new(LoopStats::default()),
            logger,
        }
    }

    pub fn signals(&self) -> Arc<LoopSignals> {
        Arc::clone(&self.signals)
    }

    pub fn stats(&self) -> Arc<LoopStats> {
        Arc::clone(&self.stats)
    }

    /// Run until shutdown is requested
    pub async fn run(self) {
        loop {
            tokio::select! {
                biased;
                _ = self.signals.shutdown.notified() => break,
                _ = self.signals.interrupt.notified() => {
                    self.logger.log_sleep_interrupted();
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            self.trigger();
        }

        self.logger
            .log_stopped(self.stats.invocations(), self.stats.failures());
    }

    fn trigger(&self) {
        let invocation = self.stats.invocations.fetch_add(1, Ordering::SeqCst) + 1;

        if let Err(err) = invoke_guarded(self.routine.as_ref()) {
            self.stats.failures.fetch_add(1, Ordering::SeqCst);
            self.logger.log_routine_failed(&err, invocation);
        }
    }
}
