//! Core library for the Hole Quality Scanner.
//!
//! This library drives the external laser-profiler process and owns the
//! pieces of the system with real state: the scanner's trigger/encoder
//! settings, the lifecycle of the scanner process and its diagnostic logs,
//! and the rendering of recorded profiles. A presentation layer (web UI or
//! the bundled CLI) talks to it through [`director::SessionDirector`].

pub mod config;
pub mod data;
pub mod director;
pub mod error;
pub mod render;
pub mod scanner_config;
pub mod session;

pub use director::{ProfileOutcome, ScanRequest, ScanResult, SessionDirector};
pub use error::{AppResult, DaqError};
