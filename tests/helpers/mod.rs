#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use unpack_watcher::{UnpackRoutine, WatcherConfig};

/// Test helper owning a scratch directory with an allow-list file
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub allow_list: PathBuf,
}

impl TestEnvironment {
    /// Environment whose allow-list holds `names`, one per line
    pub fn with_allow_list(names: &[&str]) -> anyhow::Result<Self> {
        let env = Self::without_allow_list()?;
        let mut content = names.join("\n");
        content.push('\n');
        fs::write(&env.allow_list, content)?;
        Ok(env)
    }

    /// Environment whose allow-list path does not exist
    pub fn without_allow_list() -> anyhow::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let allow_list = temp_dir.path().join("sunlake.config");
        Ok(Self {
            temp_dir,
            allow_list,
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self, poll_interval_ms: u64) -> WatcherConfig {
        WatcherConfig {
            allow_list_path: self.allow_list.clone(),
            poll_interval_ms,
        }
    }
}

/// Routine that counts its invocations
#[derive(Clone, Default)]
pub struct CountingRoutine {
    calls: Arc<AtomicUsize>,
}

impl CountingRoutine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl UnpackRoutine for CountingRoutine {
    fn invoke(&self) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
