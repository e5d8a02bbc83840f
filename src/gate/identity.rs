//! Process identity sources for the gate
//!
//! The gate never computes the process name itself; it asks a
//! [`ProcessIdentity`]. [`HostIdentity`] reads what the host process has
//! published about itself.

use crate::constants::{PROC_SELF_CMDLINE, UNINITIALIZED_PROCESS_NAME};
use std::path::PathBuf;
use sysinfo::{ProcessExt, System, SystemExt};

/// Supplies the name of the current process, if known
pub trait ProcessIdentity: Send + Sync {
    fn process_name(&self) -> Option<String>;
}

impl<F> ProcessIdentity for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn process_name(&self) -> Option<String> {
        self()
    }
}

/// Identity supplied up front by the embedder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedIdentity(pub String);

impl FixedIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl ProcessIdentity for FixedIdentity {
    fn process_name(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Identity of the running host process.
///
/// Android app processes are renamed by rewriting argv[0], so the full
/// name is read from the cmdline file first. The kernel process table is
/// the fallback, which on Linux may hold a truncated name.
#[derive(Debug, Clone)]
pub struct HostIdentity {
    cmdline_path: PathBuf,
}

impl HostIdentity {
    pub fn new() -> Self {
        Self {
            cmdline_path: PathBuf::from(PROC_SELF_CMDLINE),
        }
    }

    /// Read argv from a different file (tests, chroots)
    pub fn with_cmdline_path(path: impl Into<PathBuf>) -> Self {
        Self {
            cmdline_path: path.into(),
        }
    }

    fn from_cmdline(&self) -> Option<String> {
        let raw = std::fs::read(&self.cmdline_path).ok()?;
        parse_cmdline_name(&raw)
    }

    fn from_process_table() -> Option<String> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut system = System::new();
        if !system.refresh_process(pid) {
            return None;
        }

        system
            .process(pid)
            .map(|process| process.name().to_string())
            .filter(|name| is_usable_name(name))
    }
}

impl Default for HostIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessIdentity for HostIdentity {
    fn process_name(&self) -> Option<String> {
        self.from_cmdline().or_else(Self::from_process_table)
    }
}

/// Extract argv[0] from a NUL-separated cmdline buffer
pub fn parse_cmdline_name(raw: &[u8]) -> Option<String> {
    let argv0 = raw.split(|&b| b == 0).next()?;
    let name = String::from_utf8_lossy(argv0).into_owned();

    is_usable_name(&name).then_some(name)
}

fn is_usable_name(name: &str) -> bool {
    !name.is_empty() && name != UNINITIALIZED_PROCESS_NAME
}
