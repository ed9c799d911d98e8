//! Supervisor of the external scanner process.
//!
//! `ScanSession` owns at most one scanner process at a time and moves
//! between three states:
//!
//! ```text
//!          start_target()              stop()
//!   Idle ─────────────────▶ Targeting ────────▶ Idle
//!     │    start_scan()                 stop()
//!     └────────────────────▶ Scanning ─────────▶ Idle
//! ```
//!
//! Starting from any state other than `Idle` is rejected; the running
//! process is left untouched. `stop` sends the scanner its quit signal,
//! waits a bounded time for it to exit, and appends everything it wrote to
//! the rolling logs. A scanner that dies on its own is noticed lazily, the
//! next time `is_running` is asked.
//!
//! # Thread Safety
//!
//! The active run sits behind a `tokio::sync::Mutex`, held for the whole of a
//! start or stop, so concurrent callers serialize instead of racing to spawn.

mod capture;
mod launch;
mod logs;

pub use launch::ScannerCommand;
pub use logs::ScannerLogs;

use crate::config::Settings;
use crate::error::{AppResult, DaqError};
use capture::StreamCapture;
use launch::RunRequest;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Single-character quit command understood by the scanner.
const QUIT_SIGNAL: &[u8] = b"q\n";

/// How long reader tasks may lag behind process exit before being abandoned.
const READER_GRACE: Duration = Duration::from_secs(1);

/// Run state of the scanner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No scanner process.
    Idle,
    /// Laser on for operator alignment, nothing recorded.
    Targeting,
    /// Recording samples to a data file.
    Scanning,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "Idle",
            SessionState::Targeting => "Targeting",
            SessionState::Scanning => "Scanning",
        };
        f.write_str(name)
    }
}

/// Point-in-time view of the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Current state
    pub state: SessionState,
    /// Whether the scanner process is still alive
    pub running: bool,
    /// Data file of the current scan
    pub data_path: Option<PathBuf>,
    /// Comment passed to the current scan
    pub comment: Option<String>,
    /// Requested plot of the current scan
    pub image_path: Option<PathBuf>,
}

impl SessionInfo {
    fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            running: false,
            data_path: None,
            comment: None,
            image_path: None,
        }
    }
}

/// What a completed run left behind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// State the session was in before stopping
    pub mode: SessionState,
    /// Data file written by a scan
    pub data_path: Option<PathBuf>,
    /// Comment passed to a scan
    pub comment: Option<String>,
    /// Plot requested for a scan
    pub image_path: Option<PathBuf>,
    /// Exit code, if the process exited normally
    pub exit_code: Option<i32>,
    /// Bytes the scanner wrote to stdout
    pub stdout_bytes: usize,
    /// Bytes the scanner wrote to stderr
    pub stderr_bytes: usize,
    /// Time from launch to exit
    pub elapsed: Duration,
    /// The scanner ignored the quit signal and was killed
    pub killed: bool,
}

struct ActiveRun {
    request: RunRequest,
    image_path: Option<PathBuf>,
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: StreamCapture,
    stderr: StreamCapture,
    started: Instant,
}

impl ActiveRun {
    fn state(&self) -> SessionState {
        match self.request {
            RunRequest::Targeting => SessionState::Targeting,
            RunRequest::Scanning { .. } => SessionState::Scanning,
        }
    }

    fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(None) => false,
            Ok(Some(status)) => {
                debug!("Scanner exited on its own with {}", status);
                true
            }
            Err(e) => {
                warn!("Could not poll scanner process: {}", e);
                true
            }
        }
    }

    fn info(&mut self) -> SessionInfo {
        let running = !self.has_exited();
        let (data_path, comment) = match &self.request {
            RunRequest::Targeting => (None, None),
            RunRequest::Scanning { data_path, comment } => {
                (Some(data_path.clone()), comment.clone())
            }
        };
        SessionInfo {
            state: self.state(),
            running,
            data_path,
            comment,
            image_path: self.image_path.clone(),
        }
    }
}

/// Owns the external scanner process and its diagnostics.
pub struct ScanSession {
    command: ScannerCommand,
    logs: ScannerLogs,
    stop_timeout: Duration,
    active: Mutex<Option<ActiveRun>>,
}

impl fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanSession")
            .field("command", &self.command)
            .field("logs", &self.logs)
            .field("stop_timeout", &self.stop_timeout)
            .finish_non_exhaustive()
    }
}

impl ScanSession {
    /// Idle session for the given scanner.
    pub fn new(command: ScannerCommand, logs: ScannerLogs, stop_timeout: Duration) -> Self {
        Self {
            command,
            logs,
            stop_timeout,
            active: Mutex::new(None),
        }
    }

    /// Idle session configured from the application settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            ScannerCommand::from_settings(settings),
            ScannerLogs::from_settings(settings),
            settings.scanner.stop_timeout(),
        )
    }

    /// Current state. A scanner that crashed still counts until `stop`.
    pub async fn state(&self) -> SessionState {
        self.active
            .lock()
            .await
            .as_ref()
            .map_or(SessionState::Idle, ActiveRun::state)
    }

    /// True while a session is active and its process has not exited.
    pub async fn is_running(&self) -> bool {
        match self.active.lock().await.as_mut() {
            Some(run) => !run.has_exited(),
            None => false,
        }
    }

    /// Snapshot of the current session.
    pub async fn info(&self) -> SessionInfo {
        match self.active.lock().await.as_mut() {
            Some(run) => run.info(),
            None => SessionInfo::idle(),
        }
    }

    /// Launches the scanner in targeting mode. Returns whether it is running.
    pub async fn start_target(&self) -> bool {
        match self.try_start_target().await {
            Ok(()) => self.is_running().await,
            Err(e) => {
                error!("Targeting not started: {}", e);
                false
            }
        }
    }

    /// Launches the scanner in targeting mode.
    ///
    /// # Errors
    ///
    /// `DaqError::SessionActive` if a session is already active,
    /// `DaqError::LaunchFailure` if the process cannot be spawned.
    pub async fn try_start_target(&self) -> AppResult<()> {
        self.launch(RunRequest::Targeting).await
    }

    /// Launches a scan recording to `data_path`. Returns whether it is running.
    pub async fn start_scan(&self, data_path: impl Into<PathBuf>, comment: Option<&str>) -> bool {
        match self.try_start_scan(data_path, comment).await {
            Ok(()) => self.is_running().await,
            Err(e) => {
                error!("Scan not started: {}", e);
                false
            }
        }
    }

    /// Launches a scan recording to `data_path`.
    ///
    /// # Errors
    ///
    /// Same as [`ScanSession::try_start_target`].
    pub async fn try_start_scan(
        &self,
        data_path: impl Into<PathBuf>,
        comment: Option<&str>,
    ) -> AppResult<()> {
        self.launch(RunRequest::Scanning {
            data_path: data_path.into(),
            comment: comment.map(str::to_string),
        })
        .await
    }

    /// Records where the plot of the active scan should go.
    /// Returns false unless a scan is in progress.
    pub async fn request_profile(&self, image_path: impl Into<PathBuf>) -> bool {
        match self.active.lock().await.as_mut() {
            Some(run) if run.state() == SessionState::Scanning => {
                run.image_path = Some(image_path.into());
                true
            }
            _ => false,
        }
    }

    async fn launch(&self, request: RunRequest) -> AppResult<()> {
        let mut active = self.active.lock().await;
        if let Some(run) = active.as_ref() {
            let state = run.state();
            warn!("Refusing to start scanner: session already {}", state);
            return Err(DaqError::SessionActive(state));
        }

        let mut child = self
            .command
            .command(&request)
            .spawn()
            .map_err(|source| DaqError::LaunchFailure {
                program: self.command.executable().to_path_buf(),
                source,
            })?;

        let stdin = child.stdin.take();
        let stdout = StreamCapture::spawn("stdout", child.stdout.take());
        let stderr = StreamCapture::spawn("stderr", child.stderr.take());

        let run = ActiveRun {
            request,
            image_path: None,
            child,
            stdin,
            stdout,
            stderr,
            started: Instant::now(),
        };
        match &run.request {
            RunRequest::Targeting => info!("Scanner started in targeting mode"),
            RunRequest::Scanning { data_path, .. } => {
                info!("Scanner started, recording to {}", data_path.display())
            }
        }
        *active = Some(run);
        Ok(())
    }

    /// Stops the active session and logs its output. No-op when idle.
    ///
    /// # Errors
    ///
    /// `DaqError::StopTimeout` if the scanner ignored the quit signal. It has
    /// been killed and its output logged by then, the session is idle, and
    /// the error carries the run summary.
    ///
    /// # Cancellation
    ///
    /// Not cancel-safe. The run leaves the session as soon as `stop` begins;
    /// dropping the future before it completes kills the scanner (its handle
    /// is `kill_on_drop`) and discards output not yet logged. The session is
    /// idle afterwards either way.
    pub async fn stop(&self) -> AppResult<Option<RunSummary>> {
        let mut active = self.active.lock().await;
        let Some(mut run) = active.take() else {
            debug!("Stop requested with no active session");
            return Ok(None);
        };
        let mode = run.state();
        info!("Stopping scanner ({})", mode);

        if let Some(mut stdin) = run.stdin.take() {
            if let Err(e) = send_quit(&mut stdin).await {
                debug!("Quit signal not delivered, scanner likely gone: {}", e);
            }
        }

        let mut timed_out = false;
        let exit_code = match timeout(self.stop_timeout, run.child.wait()).await {
            Ok(Ok(status)) => {
                info!("Scanner exited with {}", status);
                status.code()
            }
            Ok(Err(e)) => {
                warn!("Could not collect scanner exit status: {}", e);
                None
            }
            Err(_) => {
                error!(
                    "Scanner still running {:?} after quit signal; killing it",
                    self.stop_timeout
                );
                if let Err(e) = run.child.kill().await {
                    error!("Failed to kill scanner: {}", e);
                }
                timed_out = true;
                None
            }
        };

        let stdout = run.stdout.finish(READER_GRACE).await;
        let stderr = run.stderr.finish(READER_GRACE).await;
        if let Err(e) = self.logs.append(&stdout, &stderr) {
            warn!("Scanner output not logged: {}", e);
        }

        let (data_path, comment) = match run.request {
            RunRequest::Targeting => (None, None),
            RunRequest::Scanning { data_path, comment } => (Some(data_path), comment),
        };
        let summary = RunSummary {
            mode,
            data_path,
            comment,
            image_path: run.image_path,
            exit_code,
            stdout_bytes: stdout.len(),
            stderr_bytes: stderr.len(),
            elapsed: run.started.elapsed(),
            killed: timed_out,
        };

        if timed_out {
            return Err(DaqError::StopTimeout {
                timeout: self.stop_timeout,
                run: Box::new(summary),
            });
        }
        Ok(Some(summary))
    }

    /// Contents of the `(stdout, stderr)` logs.
    pub fn read_logs(&self) -> (String, String) {
        self.logs.read()
    }

    /// Deletes both logs, best effort.
    pub fn clear_logs(&self) {
        self.logs.clear()
    }

    /// The scanner's log files.
    pub fn logs(&self) -> &ScannerLogs {
        &self.logs
    }
}

async fn send_quit(stdin: &mut ChildStdin) -> std::io::Result<()> {
    stdin.write_all(QUIT_SIGNAL).await?;
    stdin.flush().await
}
