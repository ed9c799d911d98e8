//! Application settings loaded with Figment.
//!
//! Settings are layered, later sources winning:
//! 1. Built-in defaults ([`Settings::default`])
//! 2. A TOML file (`config/hqs.toml` unless another path is given)
//! 3. Environment variables prefixed with `HQS_`
//!
//! # Environment Variable Overrides
//!
//! Nested keys are separated with a double underscore:
//!
//! ```text
//! HQS_APPLICATION__LOG_LEVEL=debug
//! HQS_SCANNER__EXECUTABLE=/opt/gocator/gocator_encoder
//! HQS_SCANNER__STOP_TIMEOUT_MS=10000
//! ```
//!
//! These settings describe the host installation. The trigger and encoder
//! settings the scanner itself reads live in a separate file managed by
//! [`crate::scanner_config::ConfigStore`].

use crate::error::{AppResult, DaqError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "config/hqs.toml";

/// Top-level application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationSettings,
    /// External scanner process settings
    #[serde(default)]
    pub scanner: ScannerSettings,
    /// Output locations
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Application-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSettings {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            name: "Hole Quality Scanner".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// How to run the external scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// Path to the scanner executable
    pub executable: PathBuf,
    /// Trigger/encoder record shared with the scanner
    pub config_file: PathBuf,
    /// How long `stop` waits for the scanner to exit after the quit signal
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
    /// Command-line flags understood by the scanner
    #[serde(default)]
    pub flags: ScannerFlags,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("gocator_encoder/gocator_encoder"),
            config_file: PathBuf::from("gocator_encoder/gocator_encoder.toml"),
            stop_timeout_ms: default_stop_timeout_ms(),
            flags: ScannerFlags::default(),
        }
    }
}

impl ScannerSettings {
    /// Stop timeout as a `Duration`.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// Flag prefixes passed to the scanner. Values are appended directly
/// (`-c/path/to/file`), matching how the scanner parses its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerFlags {
    /// Prefix for the config file path
    pub config: String,
    /// Prefix for the output data path
    pub output: String,
    /// Prefix for the free-text comment
    pub comment: String,
    /// Flag selecting alignment-only targeting mode
    pub target: String,
}

impl Default for ScannerFlags {
    fn default() -> Self {
        Self {
            config: "-c".to_string(),
            output: "-o".to_string(),
            comment: "-m".to_string(),
            target: "-t".to_string(),
        }
    }
}

/// Where recorded data, rendered plots and scanner logs are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory for per-scan CSV files
    pub data_dir: PathBuf,
    /// Directory for rendered profile images
    pub image_dir: PathBuf,
    /// Directory holding the scanner stdout/stderr logs
    pub log_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("static/data"),
            image_dir: PathBuf::from("static/data/img"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

fn default_stop_timeout_ms() -> u64 {
    5000
}

impl Settings {
    /// Load settings from the default file location.
    ///
    /// A missing file is not an error; defaults and environment overrides
    /// still apply.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_SETTINGS_PATH)
    }

    /// Load settings from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns `DaqError::Settings` if a source cannot be parsed and
    /// `DaqError::Configuration` if the merged settings fail validation.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings: Self = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("HQS_").split("__"))
            .extract()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings after loading.
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Stop timeout is non-zero
    /// - Scanner flags are non-empty
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.scanner.stop_timeout_ms == 0 {
            return Err(DaqError::Configuration(
                "scanner.stop_timeout_ms must be > 0".to_string(),
            ));
        }

        let flags = &self.scanner.flags;
        for (name, value) in [
            ("config", &flags.config),
            ("output", &flags.output),
            ("comment", &flags.comment),
            ("target", &flags.target),
        ] {
            if value.trim().is_empty() {
                return Err(DaqError::Configuration(format!(
                    "scanner.flags.{} cannot be empty",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Path of the scanner stdout log.
    pub fn stdout_log(&self) -> PathBuf {
        self.storage.log_dir.join("profiler_output.log")
    }

    /// Path of the scanner stderr log.
    pub fn stderr_log(&self) -> PathBuf {
        self.storage.log_dir.join("profiler_errors.log")
    }
}
