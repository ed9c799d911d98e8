//! Custom error types for the scan-session controller.
//!
//! This module defines the primary error type, `DaqError`, for the entire crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to handle
//! the failure modes of the controller, from configuration problems to the external
//! scanner refusing to start or stop.
//!
//! ## Error Hierarchy
//!
//! - **`ConfigUnavailable`**: The scanner's trigger/encoder record is missing or corrupt.
//!   Reads recover locally by falling back to defaults; writes are refused.
//! - **`Configuration`**: Semantic errors in settings or in a config write, such as a
//!   non-positive frame rate. These are caught during validation.
//! - **`Settings`**: Wraps errors from `figment` while loading application settings.
//! - **`LaunchFailure`**: The external scanner could not be spawned (missing executable,
//!   permission denied, ...).
//! - **`SessionActive`**: A start was requested while another session owns the scanner.
//! - **`StopTimeout`**: The scanner did not exit after the quit signal within the bound.
//!   Carries the run summary so the recorded data is not lost with the process.
//! - **`DataUnavailable`**: A scan produced no usable samples, so there is nothing to render.
//!   Kept distinct so a caller can report "no data recorded" instead of a generic error.
//! - **`Render`**: The plotting backend failed while drawing or encoding the image.
//!
//! By using `#[from]`, `DaqError` can be created from underlying error types,
//! simplifying error handling throughout the crate with the `?` operator.

use crate::session::{RunSummary, SessionState};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

/// Every failure the controller can report to its caller.
#[derive(Error, Debug)]
pub enum DaqError {
    /// Scanner config record could not be read or parsed.
    #[error("Scanner configuration unavailable: {0}")]
    ConfigUnavailable(String),

    /// A value failed validation.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// Application settings could not be loaded.
    #[error("Settings error: {0}")]
    Settings(#[from] figment::Error),

    /// Plain I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The external scanner could not be spawned.
    #[error("Failed to launch scanner '{}': {source}", program.display())]
    LaunchFailure {
        /// Executable that was being launched.
        program: PathBuf,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// A session is already running.
    #[error("A scanner session is already active ({0})")]
    SessionActive(SessionState),

    /// The scanner ignored the quit signal and was killed.
    #[error("Scanner did not exit within {timeout:?} of the quit signal and was killed")]
    StopTimeout {
        /// Bound that was exceeded.
        timeout: Duration,
        /// What the killed run left behind; its output is already logged.
        run: Box<RunSummary>,
    },

    /// No valid samples to render.
    #[error("No profile data available: {0}")]
    DataUnavailable(String),

    /// Plotting backend failure.
    #[error("Render error: {0}")]
    Render(String),
}

impl DaqError {
    /// True for the "nothing was recorded" outcome of a render.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, DaqError::DataUnavailable(_))
    }
}
