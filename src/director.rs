//! Orchestration seam for the presentation layer.
//!
//! `SessionDirector` sequences the config store, the scan session and the
//! renderer for one request at a time and hands back plain data. It holds no
//! state of its own beyond the components it owns.

use crate::config::Settings;
use crate::data::ProfileSummary;
use crate::error::{AppResult, DaqError};
use crate::render::ProfileRenderer;
use crate::scanner_config::{ConfigStore, EncoderConfig, EncoderPatch, TriggerConfig, TriggerPatch};
use crate::session::{RunSummary, ScanSession, SessionInfo};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Parameters of a scan requested by the operator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Free text passed to the scanner
    #[serde(default)]
    pub comment: Option<String>,
    /// Render a profile plot when the scan ends
    #[serde(default)]
    pub render_profile: bool,
}

/// Result of rendering the profile of a finished scan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ProfileOutcome {
    /// No plot was requested.
    NotRequested,
    /// The plot was written.
    Rendered(ProfileSummary),
    /// The scan recorded no valid samples.
    NoData,
    /// Drawing failed.
    Failed(String),
}

/// What `end_scan` reports back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Data file of the scan, if one was running
    pub data_path: Option<PathBuf>,
    /// Plot location, if one was requested
    pub image_path: Option<PathBuf>,
    /// Rendering outcome
    pub profile: ProfileOutcome,
    /// Details of the run that was stopped
    pub run: Option<RunSummary>,
}

/// Entry point for the presentation layer.
#[derive(Debug)]
pub struct SessionDirector {
    settings: Settings,
    config: ConfigStore,
    session: ScanSession,
    renderer: ProfileRenderer,
}

impl SessionDirector {
    /// Builds every component from the settings.
    pub fn new(settings: Settings) -> Self {
        let config = ConfigStore::new(&settings.scanner.config_file);
        let session = ScanSession::from_settings(&settings);
        Self::with_parts(settings, config, session, ProfileRenderer::new())
    }

    /// Assembles a director from prebuilt components.
    pub fn with_parts(
        settings: Settings,
        config: ConfigStore,
        session: ScanSession,
        renderer: ProfileRenderer,
    ) -> Self {
        Self {
            settings,
            config,
            session,
            renderer,
        }
    }

    /// Settings in use.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Starts a scan into a new timestamped data file.
    ///
    /// # Errors
    ///
    /// `DaqError::SessionActive` or `DaqError::LaunchFailure` from the session,
    /// `DaqError::Io` if the output directories cannot be created.
    pub async fn begin_scan(&self, request: ScanRequest) -> AppResult<SessionInfo> {
        let stamp = timestamp(Local::now());
        let data_path = prepare(&self.settings.storage.data_dir, &stamp, "csv")?;
        let image_path = if request.render_profile {
            Some(prepare(&self.settings.storage.image_dir, &stamp, "png")?)
        } else {
            None
        };

        self.session
            .try_start_scan(&data_path, request.comment.as_deref())
            .await?;
        if let Some(image_path) = image_path {
            self.session.request_profile(image_path).await;
        }
        Ok(self.session.info().await)
    }

    /// Stops the scan and renders its profile if one was requested.
    ///
    /// Rendering problems are reported in [`ScanResult::profile`] rather
    /// than as an error, since the scan itself completed. A scanner that had
    /// to be killed after ignoring the quit signal still gets its recorded
    /// data rendered; [`RunSummary::killed`] marks that case.
    ///
    /// `end_scan` and [`SessionDirector::end_target`] both stop whatever run
    /// is active. Ending a targeting run here reports it in
    /// [`ScanResult::run`] with no data path.
    pub async fn end_scan(&self) -> AppResult<ScanResult> {
        let run = match self.session.stop().await {
            Ok(Some(run)) => run,
            Ok(None) => {
                return Ok(ScanResult {
                    data_path: None,
                    image_path: None,
                    profile: ProfileOutcome::NotRequested,
                    run: None,
                })
            }
            Err(DaqError::StopTimeout { timeout, run }) => {
                warn!(
                    "Scanner was killed after ignoring the quit signal for {:?}; keeping its data",
                    timeout
                );
                *run
            }
            Err(e) => return Err(e),
        };

        let profile = match (&run.data_path, &run.image_path) {
            (Some(data_path), Some(image_path)) => self.render(data_path, image_path).await,
            _ => ProfileOutcome::NotRequested,
        };
        Ok(ScanResult {
            data_path: run.data_path.clone(),
            image_path: run.image_path.clone(),
            profile,
            run: Some(run),
        })
    }

    /// Starts targeting mode.
    pub async fn begin_target(&self) -> AppResult<SessionInfo> {
        self.session.try_start_target().await?;
        Ok(self.session.info().await)
    }

    /// Stops targeting mode, or any other active run.
    ///
    /// # Errors
    ///
    /// `DaqError::StopTimeout` if the scanner had to be killed.
    pub async fn end_target(&self) -> AppResult<()> {
        self.session.stop().await.map(|_| ())
    }

    /// Current session state.
    pub async fn status(&self) -> SessionInfo {
        self.session.info().await
    }

    /// Configured trigger settings.
    pub fn trigger(&self) -> TriggerConfig {
        self.config.get_trigger()
    }

    /// Saves trigger settings.
    pub fn set_trigger(&self, patch: impl Into<TriggerPatch>) -> bool {
        self.config.set_trigger(patch)
    }

    /// Configured encoder settings.
    pub fn encoder(&self) -> EncoderConfig {
        self.config.get_encoder()
    }

    /// Saves encoder settings.
    pub fn set_encoder(&self, patch: impl Into<EncoderPatch>) -> bool {
        self.config.set_encoder(patch)
    }

    /// Scanner `(stdout, stderr)` logs.
    pub fn logs(&self) -> (String, String) {
        self.session.read_logs()
    }

    /// Deletes the scanner logs.
    pub fn clear_logs(&self) {
        self.session.clear_logs()
    }

    async fn render(&self, data_path: &Path, image_path: &Path) -> ProfileOutcome {
        let renderer = self.renderer.clone();
        let data_path = data_path.to_path_buf();
        let image_path = image_path.to_path_buf();
        let rendered =
            tokio::task::spawn_blocking(move || renderer.render(&data_path, &image_path)).await;

        match rendered {
            Ok(Ok(summary)) => ProfileOutcome::Rendered(summary),
            Ok(Err(DaqError::DataUnavailable(reason))) => {
                info!("No profile rendered: {}", reason);
                ProfileOutcome::NoData
            }
            Ok(Err(e)) => {
                warn!("Profile rendering failed: {}", e);
                ProfileOutcome::Failed(e.to_string())
            }
            Err(e) => {
                warn!("Profile rendering task failed: {}", e);
                ProfileOutcome::Failed(e.to_string())
            }
        }
    }
}

/// File stem for a scan started at `now`, e.g. `FriOct162026_140501`.
fn timestamp(now: DateTime<Local>) -> String {
    now.format("%a%b%d%Y_%H%M%S").to_string()
}

fn prepare(dir: &Path, stem: &str, extension: &str) -> AppResult<PathBuf> {
    fs::create_dir_all(dir)?;
    Ok(dir.join(format!("{}.{}", stem, extension)))
}
