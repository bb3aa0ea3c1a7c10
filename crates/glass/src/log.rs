//! Operator command log
//!
//! Appends timestamped lines to a file. Writing is best effort: a full disk
//! or a missing directory must never break a dispatch.

use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Line appender for rejected and failed dispatches
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    path: Option<PathBuf>,
}

impl CommandLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Log that only emits tracing events
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one line; failures are swallowed
    pub fn log(&self, line: &str) {
        tracing::info!(target: "glass::log", "{}", line);

        if let Some(path) = &self.path {
            if let Err(e) = append_line(path, line) {
                tracing::debug!(path = %path.display(), error = %e, "could not write command log");
            }
        }
    }

    /// Append a line prefixed with a tag such as `BAD_PARAMS`
    pub fn tagged(&self, tag: &str, message: &str) {
        self.log(&format!("{}: {}", tag, message));
    }

    pub fn debug(&self, message: &str) {
        self.log(&format!("DEBUG:{}", message));
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}{}", Local::now().format("%b %d %Y %H:%M:%S: "), line)?;
    Ok(())
}
