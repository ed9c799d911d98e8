//! Command-line front end for the Hole Quality Scanner.
//!
//! Every command prints its result as JSON on stdout; diagnostics go to
//! stderr through `tracing`.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use hqs_daq::config::Settings;
use hqs_daq::render::ProfileRenderer;
use hqs_daq::scanner_config::{EncoderPatch, TravelDirection, TriggerPatch, TriggerType};
use hqs_daq::{ScanRequest, SessionDirector};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hqs_daq")]
#[command(about = "Drive the laser profiler and inspect its recordings", long_about = None)]
struct Cli {
    /// Settings file (defaults to config/hqs.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show or change the trigger settings
    Trigger {
        #[command(subcommand)]
        action: TriggerAction,
    },
    /// Show or change the encoder settings
    Encoder {
        #[command(subcommand)]
        action: EncoderAction,
    },
    /// Record a scan until Ctrl-C or the given duration elapses
    Scan {
        /// Free-text comment stored with the scan
        #[arg(long)]
        comment: Option<String>,

        /// Render a profile plot once the scan ends
        #[arg(long)]
        profile: bool,

        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Turn the laser on for alignment until Ctrl-C or the given duration elapses
    Target {
        /// Stop automatically after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Render a profile plot from a recorded CSV file
    Render {
        /// Recorded x,y,z samples
        data: PathBuf,
        /// PNG file to write
        image: PathBuf,
    },
    /// Show or delete the scanner's output logs
    Logs {
        #[command(subcommand)]
        action: LogsAction,
    },
}

#[derive(Subcommand)]
enum TriggerAction {
    /// Print the configured trigger settings
    Show,
    /// Change the given trigger settings, leaving the others as they are
    Set(TriggerArgs),
}

#[derive(Args)]
struct TriggerArgs {
    /// Encoder, Time or Input
    #[arg(long = "type")]
    trigger_type: Option<TriggerType>,

    /// Require the external gate input
    #[arg(long)]
    enable_gate: Option<bool>,

    /// Frames per second for time triggering
    #[arg(long)]
    frame_rate: Option<u32>,

    /// Millimetres of travel between captures for encoder triggering
    #[arg(long)]
    travel_threshold: Option<f64>,

    /// Forward, Backward or Bidirectional
    #[arg(long)]
    travel_direction: Option<TravelDirection>,
}

impl From<TriggerArgs> for TriggerPatch {
    fn from(args: TriggerArgs) -> Self {
        Self {
            trigger_type: args.trigger_type,
            enable_gate: args.enable_gate,
            frame_rate: args.frame_rate,
            travel_threshold: args.travel_threshold,
            travel_direction: args.travel_direction,
        }
    }
}

#[derive(Subcommand)]
enum EncoderAction {
    /// Print the configured encoder settings
    Show,
    /// Change the given encoder settings, leaving the others as they are
    Set {
        /// Encoder model name
        #[arg(long)]
        model: Option<String>,

        /// Encoder resolution
        #[arg(long)]
        resolution: Option<f64>,
    },
}

#[derive(Subcommand)]
enum LogsAction {
    /// Print the scanner's stdout and stderr logs
    Show,
    /// Delete both logs
    Clear,
}

#[derive(Serialize)]
struct LogContents {
    stdout: String,
    stderr: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::load().context("Failed to load settings")?,
    };

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.application.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting {}", settings.application.name);
    let director = SessionDirector::new(settings);

    match cli.command {
        Command::Trigger { action } => match action {
            TriggerAction::Show => print_json(&director.trigger()),
            TriggerAction::Set(args) => {
                let patch = TriggerPatch::from(args);
                if !director.set_trigger(patch) {
                    bail!("Trigger settings were not saved");
                }
                print_json(&director.trigger())
            }
        },
        Command::Encoder { action } => match action {
            EncoderAction::Show => print_json(&director.encoder()),
            EncoderAction::Set { model, resolution } => {
                let patch = EncoderPatch {
                    encoder_model: model,
                    encoder_resolution: resolution,
                };
                if !director.set_encoder(patch) {
                    bail!("Encoder settings were not saved");
                }
                print_json(&director.encoder())
            }
        },
        Command::Scan {
            comment,
            profile,
            duration,
        } => {
            let request = ScanRequest {
                comment,
                render_profile: profile,
            };
            let started = director
                .begin_scan(request)
                .await
                .context("Failed to start scan")?;
            print_json(&started)?;

            wait_for_stop(duration).await?;
            let result = director.end_scan().await.context("Failed to stop scan")?;
            print_json(&result)
        }
        Command::Target { duration } => {
            let started = director
                .begin_target()
                .await
                .context("Failed to start targeting")?;
            print_json(&started)?;

            wait_for_stop(duration).await?;
            director
                .end_target()
                .await
                .context("Failed to stop targeting")?;
            print_json(&director.status().await)
        }
        Command::Render { data, image } => {
            let summary = ProfileRenderer::new()
                .render(&data, &image)
                .with_context(|| format!("Failed to render {}", data.display()))?;
            print_json(&summary)
        }
        Command::Logs { action } => match action {
            LogsAction::Show => {
                let (stdout, stderr) = director.logs();
                print_json(&LogContents { stdout, stderr })
            }
            LogsAction::Clear => {
                director.clear_logs();
                Ok(())
            }
        },
    }
}

async fn wait_for_stop(duration: Option<u64>) -> Result<()> {
    match duration {
        Some(secs) => {
            info!("Running for {}s (Ctrl-C stops early)", secs);
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => Ok(()),
                signal = tokio::signal::ctrl_c() => signal.context("Failed to listen for Ctrl-C"),
            }
        }
        None => {
            info!("Running until Ctrl-C");
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
