//! Rolling stdout/stderr logs of the external scanner.

use crate::config::Settings;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The pair of append-only log files the scanner's output is written to.
#[derive(Clone, Debug)]
pub struct ScannerLogs {
    stdout_path: PathBuf,
    stderr_path: PathBuf,
}

impl ScannerLogs {
    /// Logs at explicit paths.
    pub fn new(stdout_path: impl Into<PathBuf>, stderr_path: impl Into<PathBuf>) -> Self {
        Self {
            stdout_path: stdout_path.into(),
            stderr_path: stderr_path.into(),
        }
    }

    /// Logs in the configured log directory.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.stdout_log(), settings.stderr_log())
    }

    /// Path of the stdout log.
    pub fn stdout_path(&self) -> &Path {
        &self.stdout_path
    }

    /// Path of the stderr log.
    pub fn stderr_path(&self) -> &Path {
        &self.stderr_path
    }

    /// Appends captured output. Existing content is never truncated.
    ///
    /// Both logs are attempted; the first failure is returned.
    pub fn append(&self, stdout: &[u8], stderr: &[u8]) -> io::Result<()> {
        let stdout_result = append_to(&self.stdout_path, stdout);
        let stderr_result = append_to(&self.stderr_path, stderr);
        stdout_result.and(stderr_result)
    }

    /// Returns `(stdout, stderr)`; a log that was never written reads as empty.
    pub fn read(&self) -> (String, String) {
        (read_or_empty(&self.stdout_path), read_or_empty(&self.stderr_path))
    }

    /// Deletes both logs. Missing or locked files are left alone.
    pub fn clear(&self) {
        for path in [&self.stdout_path, &self.stderr_path] {
            match fs::remove_file(path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove {}: {}", path.display(), e),
            }
        }
    }
}

fn append_to(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(bytes)?;
    file.flush()
}

fn read_or_empty(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => {
            warn!("Could not read {}: {}", path.display(), e);
            String::new()
        }
    }
}
