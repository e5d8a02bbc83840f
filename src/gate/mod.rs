//! Identity gate: decides whether this process may start the watcher
//!
//! The allow-list is read fresh on every evaluation and compared line by
//! line against the current process name. Only exact, byte-equal lines
//! match; there is no trimming, no case folding and no comment syntax.

pub mod identity;

pub use identity::{parse_cmdline_name, FixedIdentity, HostIdentity, ProcessIdentity};

use crate::error::GateError;
use crate::logging::WatcherLogger;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

/// Ordered view over an allow-list source, consumed line by line
pub struct AllowList<R> {
    path: PathBuf,
    reader: R,
    /// Previous line ended at `\r`; a `\n` right after it belongs to it
    skip_lf: bool,
}

impl AllowList<BufReader<File>> {
    /// Open the allow-list file at `path`
    pub fn open(path: &Path) -> Result<Self, GateError> {
        let file = File::open(path).map_err(|source| GateError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::from_reader(path, BufReader::new(file)))
    }
}

impl<R: BufRead> AllowList<R> {
    /// Wrap an already open source; `path` is only used in errors
    pub fn from_reader(path: impl Into<PathBuf>, reader: R) -> Self {
        Self {
            path: path.into(),
            reader,
            skip_lf: false,
        }
    }

    /// Whether some line equals `process_name` exactly.
    ///
    /// Stops reading at the first match, so a read error further down the
    /// file does not undo an earlier hit.
    pub fn contains(mut self, process_name: &str) -> Result<bool, GateError> {
        let wanted = process_name.as_bytes();
        let mut line = Vec::new();

        while self.next_line(&mut line)? {
            if line == wanted {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// All entries in file order
    pub fn entries(self) -> Entries<R> {
        Entries {
            list: self,
            done: false,
        }
    }

    /// Read the next line into `buf`. Lines end at `\n`, `\r` or `\r\n`.
    fn next_line(&mut self, buf: &mut Vec<u8>) -> Result<bool, GateError> {
        buf.clear();
        let mut read_any = false;

        loop {
            let available = match self.reader.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(GateError::Read {
                        path: self.path.clone(),
                        source,
                    })
                }
            };

            if available.is_empty() {
                return Ok(read_any);
            }

            if self.skip_lf {
                self.skip_lf = false;
                if available[0] == b'\n' {
                    self.reader.consume(1);
                    continue;
                }
            }

            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(end) => {
                    buf.extend_from_slice(&available[..end]);
                    self.skip_lf = available[end] == b'\r';
                    self.reader.consume(end + 1);
                    return Ok(true);
                }
                None => {
                    let len = available.len();
                    buf.extend_from_slice(available);
                    self.reader.consume(len);
                    read_any = true;
                }
            }
        }
    }
}

/// Iterator over allow-list entries; ends after the first error
pub struct Entries<R> {
    list: AllowList<R>,
    done: bool,
}

impl<R: BufRead> Iterator for Entries<R> {
    type Item = Result<String, GateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut line = Vec::new();
        match self.list.next_line(&mut line) {
            Ok(true) => Some(Ok(String::from_utf8_lossy(&line).into_owned())),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Check a process name against the allow-list file at `path`
pub fn check_allow_list(path: &Path, process_name: &str) -> Result<bool, GateError> {
    AllowList::open(path)?.contains(process_name)
}

/// Gate decision for the current process.
///
/// Any failure (unknown process name, missing or unreadable allow-list)
/// means "not allowed". Errors are logged, never returned.
pub fn should_activate<I>(allow_list: &Path, identity: &I, logger: &WatcherLogger) -> bool
where
    I: ProcessIdentity + ?Sized,
{
    let decision = identity
        .process_name()
        .ok_or(GateError::UnknownProcess)
        .and_then(|name| {
            let allowed = check_allow_list(allow_list, &name)?;
            logger.log_gate_decision(allow_list, &name, allowed);
            Ok(allowed)
        });

    match decision {
        Ok(allowed) => allowed,
        Err(err) => {
            logger.log_gate_error(&err);
            false
        }
    }
}
