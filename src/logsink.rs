//! Append-only audit log
//!
//! Operator-facing history of probe and login events, kept separate from
//! tracing diagnostics in the reference client's plain-text format.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const HEADER_RULE: &str =
    "================================================================================";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct LogSink {
    file: Mutex<File>,
    path: PathBuf,
}

impl LogSink {
    /// Open the audit log, creating it if needed. A newly created file
    /// gets a header block recording the start time.
    pub fn open(path: &Path) -> Result<Self> {
        let fresh = !path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening audit log {}", path.display()))?;

        if fresh {
            writeln!(file, "{HEADER_RULE}")?;
            writeln!(file, "srunkeep audit log")?;
            writeln!(file, "started: {}", Local::now().format(TIMESTAMP_FORMAT))?;
            writeln!(file, "{HEADER_RULE}")?;
            writeln!(file)?;
        }

        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Append one timestamped line. Writes are whole lines under the
    /// lock, so an interrupt between polls cannot tear a record and
    /// concurrent appenders cannot interleave.
    pub fn append(&self, message: &str) {
        let line = format!("[{}] {message}", Local::now().format(TIMESTAMP_FORMAT));
        if let Ok(mut file) = self.file.lock() {
            if let Err(e) = writeln!(file, "{line}") {
                tracing::warn!("audit log write failed ({}): {e}", self.path.display());
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
