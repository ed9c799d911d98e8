//! Command line of the external scanner.

use crate::config::{ScannerFlags, Settings};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// What a run of the scanner is for.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum RunRequest {
    Targeting,
    Scanning {
        data_path: PathBuf,
        comment: Option<String>,
    },
}

/// Builds scanner invocations from the installation settings.
#[derive(Clone, Debug)]
pub struct ScannerCommand {
    executable: PathBuf,
    config_file: PathBuf,
    flags: ScannerFlags,
}

impl ScannerCommand {
    /// Scanner at `executable` reading its trigger/encoder record from `config_file`.
    pub fn new(executable: impl Into<PathBuf>, config_file: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            config_file: config_file.into(),
            flags: ScannerFlags::default(),
        }
    }

    /// Scanner described by the settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            executable: settings.scanner.executable.clone(),
            config_file: settings.scanner.config_file.clone(),
            flags: settings.scanner.flags.clone(),
        }
    }

    /// Replaces the flag prefixes.
    pub fn with_flags(mut self, flags: ScannerFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Scanner executable.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub(crate) fn args(&self, request: &RunRequest) -> Vec<OsString> {
        let mut args = vec![flagged(&self.flags.config, self.config_file.as_os_str())];
        match request {
            RunRequest::Targeting => args.push(OsString::from(&self.flags.target)),
            RunRequest::Scanning { data_path, comment } => {
                args.push(flagged(&self.flags.output, data_path.as_os_str()));
                if let Some(comment) = comment {
                    args.push(flagged(&self.flags.comment, OsStr::new(comment)));
                }
            }
        }
        args
    }

    /// Piped stdin/stdout/stderr; the child is killed if its handle is dropped.
    pub(crate) fn command(&self, request: &RunRequest) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(self.args(request))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

fn flagged(flag: &str, value: &OsStr) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(value);
    arg
}
