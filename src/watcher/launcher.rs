//! Singleton launcher for the poll loop
//!
//! The "already running" check, the identity gate and the transition to
//! running all happen under one mutex, so any number of concurrent callers
//! start at most one loop per launcher.

use crate::constants::WATCHER_THREAD_NAME;
use crate::error::{ConfigError, LaunchError};
use crate::gate::{self, HostIdentity, ProcessIdentity};
use crate::logging::WatcherLogger;
use crate::models::{WatcherConfig, WatcherState};
use crate::watcher::poll_loop::{LoopSignals, LoopStats, PollLoop};
use crate::watcher::routine::UnpackRoutine;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Result of an activation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// This call started the poll loop
    Started,
    /// A loop was already running; nothing changed
    AlreadyRunning,
    /// The gate refused this process; nothing changed
    NotAllowed,
}

/// Cloneable view of a running watcher
#[derive(Debug, Clone)]
pub struct WatcherHandle {
    signals: Arc<LoopSignals>,
    stats: Arc<LoopStats>,
    started_at: DateTime<Utc>,
}

impl WatcherHandle {
    /// Wake the loop early; it invokes the routine and keeps going
    pub fn interrupt(&self) {
        self.signals.interrupt();
    }

    pub fn invocations(&self) -> u64 {
        self.stats.invocations()
    }

    pub fn failures(&self) -> u64 {
        self.stats.failures()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

struct RunningWatcher {
    handle: WatcherHandle,
    thread: JoinHandle<()>,
}

/// Starts the poll loop at most once, for processes that pass the gate
pub struct Launcher<I = HostIdentity> {
    config: WatcherConfig,
    identity: I,
    logger: WatcherLogger,
    running: Mutex<Option<RunningWatcher>>,
}

impl Launcher<HostIdentity> {
    /// Launcher for the host process with the built-in allow-list and interval
    pub fn host() -> Self {
        Self::build(WatcherConfig::default(), HostIdentity::new())
    }
}

impl<I: ProcessIdentity> Launcher<I> {
    pub fn new(config: WatcherConfig, identity: I) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, identity))
    }

    fn build(config: WatcherConfig, identity: I) -> Self {
        Self {
            config,
            identity,
            logger: WatcherLogger::default(),
            running: Mutex::new(None),
        }
    }

    pub fn with_logger(mut self, logger: WatcherLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Start the poll loop if none is running and this process is allow-listed.
    ///
    /// Never blocks on the loop. On error the launcher stays absent and a
    /// later call may try again.
    pub fn activate_if_needed<R>(&self, routine: R) -> Result<Activation, LaunchError>
    where
        R: UnpackRoutine + 'static,
    {
        let mut running = self.lock();

        if running.is_some() {
            self.logger.log_activation_skipped("already running");
            return Ok(Activation::AlreadyRunning);
        }

        if !gate::should_activate(&self.config.allow_list_path, &self.identity, &self.logger) {
            self.logger.log_activation_skipped("process not allow-listed");
            return Ok(Activation::NotAllowed);
        }

        *running = Some(self.spawn(Arc::new(routine))?);
        self.logger.log_started(&self.config, std::process::id());

        Ok(Activation::Started)
    }

    pub fn state(&self) -> WatcherState {
        if self.lock().is_some() {
            WatcherState::Running
        } else {
            WatcherState::Absent
        }
    }

    pub fn handle(&self) -> Option<WatcherHandle> {
        self.lock().as_ref().map(|running| running.handle.clone())
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Stop the loop and wait for its thread to exit
    pub fn shutdown(mut self) {
        let running = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(running) = running {
            running.handle.signals.request_shutdown();
            // The loop contains routine panics, so a join error is unexpected
            let _ = running.thread.join();
        }
    }

    fn spawn(&self, routine: Arc<dyn UnpackRoutine>) -> Result<RunningWatcher, LaunchError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(LaunchError::Runtime)?;

        let poll_loop = PollLoop::new(self.config.poll_interval(), routine, self.logger.clone());
        let handle = WatcherHandle {
            signals: poll_loop.signals(),
            stats: poll_loop.stats(),
            started_at: Utc::now(),
        };

        let thread = thread::Builder::new()
            .name(WATCHER_THREAD_NAME.to_string())
            .spawn(move || runtime.block_on(poll_loop.run()))
            .map_err(LaunchError::Spawn)?;

        Ok(RunningWatcher { handle, thread })
    }

    fn lock(&self) -> MutexGuard<'_, Option<RunningWatcher>> {
        // State stays consistent even if a holder panicked
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<I> Drop for Launcher<I> {
    fn drop(&mut self) {
        let running = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(running) = running.as_ref() {
            running.handle.signals.request_shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::FixedIdentity;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn config(path: &Path, interval_ms: u64) -> WatcherConfig {
        WatcherConfig {
            allow_list_path: path.to_path_buf(),
            poll_interval_ms: interval_ms,
        }
    }

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempdir().unwrap();
        let result = Launcher::new(config(&dir.path().join("list"), 0), FixedIdentity::new("a"));

        assert!(matches!(result, Err(ConfigError::IntervalOutOfRange { .. })));
    }

    #[test]
    fn test_not_allowed_leaves_state_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sunlake.config");
        fs::write(&path, "system_server\n").unwrap();

        let launcher =
            Launcher::new(config(&path, 10), FixedIdentity::new("com.example.app")).unwrap();
        let activation = launcher.activate_if_needed(|| -> anyhow::Result<()> { Ok(()) }).unwrap();

        assert_eq!(activation, Activation::NotAllowed);
        assert_eq!(launcher.state(), WatcherState::Absent);
        assert!(launcher.handle().is_none());
    }

    #[test]
    fn test_started_then_already_running() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sunlake.config");
        fs::write(&path, "system_server\ncom.android.phone\n").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let launcher =
            Launcher::new(config(&path, 10), FixedIdentity::new("com.android.phone")).unwrap();

        let first = calls.clone();
        let activation = launcher
            .activate_if_needed(move || -> anyhow::Result<()> {
                first.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        assert_eq!(activation, Activation::Started);
        assert_eq!(launcher.state(), WatcherState::Running);

        let activation = launcher
            .activate_if_needed(|| -> anyhow::Result<()> {
                panic!("second routine must never run")
            })
            .unwrap();
        assert_eq!(activation, Activation::AlreadyRunning);

        let handle = launcher.handle().unwrap();
        assert!(wait_for(|| handle.invocations() >= 3));
        assert_eq!(handle.failures(), 0);
        assert!(calls.load(Ordering::SeqCst) >= 3);

        launcher.shutdown();
    }

    #[test]
    fn test_gate_not_reevaluated_once_running() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sunlake.config");
        fs::write(&path, "com.android.phone\n").unwrap();

        let launcher =
            Launcher::new(config(&path, 50), FixedIdentity::new("com.android.phone")).unwrap();
        assert_eq!(
            launcher.activate_if_needed(|| -> anyhow::Result<()> { Ok(()) }).unwrap(),
            Activation::Started
        );

        fs::remove_file(&path).unwrap();
        assert_eq!(
            launcher.activate_if_needed(|| -> anyhow::Result<()> { Ok(()) }).unwrap(),
            Activation::AlreadyRunning
        );
        assert_eq!(launcher.state(), WatcherState::Running);

        launcher.shutdown();
    }

    #[test]
    fn test_shutdown_stops_invocations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sunlake.config");
        fs::write(&path, "com.android.phone\n").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let launcher =
            Launcher::new(config(&path, 5), FixedIdentity::new("com.android.phone")).unwrap();
        let counter = calls.clone();
        launcher
            .activate_if_needed(move || -> anyhow::Result<()> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        assert!(wait_for(|| calls.load(Ordering::SeqCst) >= 1));
        launcher.shutdown();

        let after_shutdown = calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(calls.load(Ordering::SeqCst), after_shutdown);
    }

    #[test]
    fn test_handle_interrupt_runs_routine_early() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sunlake.config");
        fs::write(&path, "com.android.phone\n").unwrap();

        // Long interval so only the interrupt can trigger an invocation
        let launcher =
            Launcher::new(config(&path, 60_000), FixedIdentity::new("com.android.phone")).unwrap();
        launcher.activate_if_needed(|| -> anyhow::Result<()> { Ok(()) }).unwrap();

        let handle = launcher.handle().unwrap();
        assert_eq!(handle.invocations(), 0);
        assert!(handle.started_at() <= Utc::now());

        handle.interrupt();
        assert!(wait_for(|| handle.invocations() == 1));

        launcher.shutdown();
    }
}
