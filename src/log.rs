//! Run log sinks.
//!
//! The pipeline records a human-readable trail of every step through an
//! injected [`LogSink`]. Recording never fails from the caller's point of
//! view: sink errors are reported through `tracing` and dropped.

use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait LogSink {
    fn record(&self, message: &str);
}

/// Appends timestamped lines to `<dir>/<YYYY-MM-DD-HH>.txt`, so a new file
/// starts every hour.
#[derive(Debug, Clone)]
pub struct HourlyFileSink {
    dir: PathBuf,
}

impl HourlyFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.extract-interface-bulk/logs`, or a relative `logs` directory when
    /// no home directory is known.
    pub fn default_dir() -> PathBuf {
        home::home_dir()
            .map(|home| home.join(".extract-interface-bulk").join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Log file that a message recorded at `at` goes to.
    pub fn file_for(&self, at: &DateTime<Local>) -> PathBuf {
        self.dir
            .join(format!("{}.txt", at.format("%Y-%m-%d-%H")))
    }

    fn append(&self, at: &DateTime<Local>, message: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_for(at))?;
        writeln!(file, "{} {}", at.format("%Y-%m-%d %H:%M:%S"), message)?;
        file.flush()
    }
}

impl LogSink for HourlyFileSink {
    fn record(&self, message: &str) {
        let now = Local::now();
        if let Err(e) = self.append(&now, message) {
            tracing::warn!(dir = %self.dir.display(), "failed to write run log: {e}");
        }
    }
}

/// Keeps messages in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|entry| entry.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn record(&self, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.to_string());
    }
}
