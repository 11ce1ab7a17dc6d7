//! Append-only diagnostic log with one tab-separated line per entry.
//!
//! Line layout: `utm  cymd  hms  path  filename  line  message`, where `utm`
//! is the Unix time in microseconds and date/time are UTC. The header is
//! written once, when the file is created.

use std::fmt::Write as _;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;

use super::{file_append, file_path_exists, split, FileLock};
use crate::error::Result;

pub const LOG_HEADER: &str = "utm\tcymd\thms\tpath\tfilename\tline\terror\n";

/// Writes log lines to a single file under a shared [`FileLock`]
#[derive(Debug, Clone)]
pub struct Logger {
    path: PathBuf,
    lock: Arc<FileLock>,
}

impl Logger {
    pub fn new(path: impl Into<PathBuf>, lock: Arc<FileLock>) -> Self {
        Self {
            path: path.into(),
            lock,
        }
    }

    /// Logger writing to [`Logger::default_path`].
    pub fn with_default_path(lock: Arc<FileLock>) -> Self {
        Self::new(Self::default_path(), lock)
    }

    /// `<temp dir>/rust_utils.log`
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join("rust_utils.log")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock(&self) -> &Arc<FileLock> {
        &self.lock
    }

    /// Append one entry attributed to the calling source location.
    #[track_caller]
    pub fn log(&self, message: &str) -> Result<()> {
        let caller = Location::caller();
        let _guard = self.lock.enter();

        let mut line = String::new();
        if !file_path_exists(&self.path) {
            line.push_str(LOG_HEADER);
        }

        let (caller_dir, caller_file) = split(caller.file());
        let now = Utc::now();
        let _ = writeln!(
            line,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            now.timestamp_micros(),
            now.format("%Y%m%d"),
            now.format("%H%M%S"),
            caller_dir.trim_end_matches('/'),
            caller_file,
            caller.line(),
            escape_log_message(message)
        );

        file_append(&self.lock, &self.path, &line)
    }
}

/// Make a message safe for a single tab-separated line.
///
/// Backslash, tab, newline and carriage return become `\\`, `\t`, `\n`, `\r`;
/// any other byte outside printable ASCII becomes `\xHH`.
pub fn escape_log_message(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    for byte in message.bytes() {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            0x20..=0x7e => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\x{byte:02X}");
            }
        }
    }
    out
}
