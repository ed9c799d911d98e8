//! Persistent trigger/encoder record shared with the external scanner.
//!
//! Reads never fail outward: a missing or corrupt file yields the sane
//! defaults, and individual bad fields fall back one at a time. Writes are
//! read-modify-write of the whole document, serialized by a per-store lock
//! and committed with an atomic rename so a failed write leaves the previous
//! file intact.

use super::types::{
    EncoderConfig, EncoderPatch, TravelDirection, TriggerConfig, TriggerPatch, TriggerType,
};
use crate::error::{AppResult, DaqError};
use parking_lot::Mutex;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use toml::{Table, Value};
use tracing::{debug, info, warn};

const TRIGGER_SECTION: &str = "Trigger";
const ENCODER_SECTION: &str = "Encoder";

const KEY_TYPE: &str = "type";
const KEY_ENABLE_GATE: &str = "enable_gate";
const KEY_FRAME_RATE: &str = "frame_rate";
const KEY_TRAVEL_THRESHOLD: &str = "travel_threshold";
// The scanner reads the travel direction under this name.
const KEY_TRAVEL_DIRECTION: &str = "trigger_direction";
const KEY_MODEL: &str = "model";
const KEY_RESOLUTION: &str = "resolution";

/// Reads and writes the scanner's trigger and encoder settings.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ConfigStore {
    /// Creates a store backed by `path`. The file does not need to exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sane default trigger settings.
    pub fn sane_trigger() -> TriggerConfig {
        TriggerConfig::default()
    }

    /// Sane default encoder settings.
    pub fn sane_encoder() -> EncoderConfig {
        EncoderConfig::default()
    }

    /// Returns the configured trigger, falling back to defaults field by field.
    pub fn get_trigger(&self) -> TriggerConfig {
        let _guard = self.lock.lock();
        let mut trigger = Self::sane_trigger();
        let Some(section) = self.load_section(TRIGGER_SECTION) else {
            return trigger;
        };

        if let Some(value) = section.get(KEY_TYPE) {
            match value.as_str().map(str::parse::<TriggerType>) {
                Some(Ok(parsed)) => trigger.trigger_type = parsed,
                Some(Err(reason)) => warn!("Ignoring stored trigger type: {}", reason),
                None => warn!("Ignoring non-text trigger type {}", value),
            }
        }
        if let Some(value) = section.get(KEY_ENABLE_GATE) {
            match parse_bool(value) {
                Some(enabled) => trigger.enable_gate = enabled,
                None => warn!("Ignoring invalid enable_gate value {}", value),
            }
        }
        if let Some(value) = section.get(KEY_FRAME_RATE) {
            match parse_positive_u32(value) {
                Some(rate) => trigger.frame_rate = rate,
                None => warn!("Ignoring invalid frame_rate value {}", value),
            }
        }
        if let Some(value) = section.get(KEY_TRAVEL_THRESHOLD) {
            match parse_f64(value).filter(|t| *t > 0.0) {
                Some(threshold) => trigger.travel_threshold = threshold,
                None => warn!("Ignoring invalid travel_threshold value {}", value),
            }
        }
        if let Some(value) = section.get(KEY_TRAVEL_DIRECTION) {
            match value.as_str().map(str::parse::<TravelDirection>) {
                Some(Ok(parsed)) => trigger.travel_direction = parsed,
                Some(Err(reason)) => warn!("Ignoring stored travel direction: {}", reason),
                None => warn!("Ignoring non-text travel direction {}", value),
            }
        }

        trigger
    }

    /// Persists the fields present in `patch`. Returns false if nothing was written.
    pub fn set_trigger(&self, patch: impl Into<TriggerPatch>) -> bool {
        match self.try_set_trigger(patch) {
            Ok(()) => true,
            Err(e) => {
                warn!("Trigger settings not saved to {}: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Persists the fields present in `patch`, reporting why a write was refused.
    pub fn try_set_trigger(&self, patch: impl Into<TriggerPatch>) -> AppResult<()> {
        let patch = patch.into();
        patch.validate().map_err(DaqError::Configuration)?;

        let _guard = self.lock.lock();
        let mut document = self.load_document_for_write()?;
        let section = section_mut(&mut document, TRIGGER_SECTION)?;

        if let Some(trigger_type) = patch.trigger_type {
            section.insert(KEY_TYPE.into(), Value::String(trigger_type.to_string()));
        }
        if let Some(enable_gate) = patch.enable_gate {
            section.insert(KEY_ENABLE_GATE.into(), Value::Boolean(enable_gate));
        }
        if let Some(frame_rate) = patch.frame_rate {
            section.insert(KEY_FRAME_RATE.into(), Value::Integer(i64::from(frame_rate)));
        }
        if let Some(threshold) = patch.travel_threshold {
            section.insert(KEY_TRAVEL_THRESHOLD.into(), Value::Float(threshold));
        }
        if let Some(direction) = patch.travel_direction {
            section.insert(KEY_TRAVEL_DIRECTION.into(), Value::String(direction.to_string()));
        }

        self.commit(&document)?;
        info!("Saved trigger settings to {}", self.path.display());
        Ok(())
    }

    /// Returns the configured encoder, falling back to defaults field by field.
    pub fn get_encoder(&self) -> EncoderConfig {
        let _guard = self.lock.lock();
        let mut encoder = Self::sane_encoder();
        let Some(section) = self.load_section(ENCODER_SECTION) else {
            return encoder;
        };

        if let Some(value) = section.get(KEY_MODEL) {
            match value.as_str() {
                Some(model) => encoder.encoder_model = model.to_string(),
                None => warn!("Ignoring non-text encoder model {}", value),
            }
        }
        if let Some(value) = section.get(KEY_RESOLUTION) {
            match parse_f64(value).filter(|r| *r >= 0.0) {
                Some(resolution) => encoder.encoder_resolution = resolution,
                None => warn!("Ignoring invalid encoder resolution {}", value),
            }
        }

        encoder
    }

    /// Persists the fields present in `patch`. Returns false if nothing was written.
    pub fn set_encoder(&self, patch: impl Into<EncoderPatch>) -> bool {
        match self.try_set_encoder(patch) {
            Ok(()) => true,
            Err(e) => {
                warn!("Encoder settings not saved to {}: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Persists the fields present in `patch`, reporting why a write was refused.
    pub fn try_set_encoder(&self, patch: impl Into<EncoderPatch>) -> AppResult<()> {
        let patch = patch.into();
        patch.validate().map_err(DaqError::Configuration)?;

        let _guard = self.lock.lock();
        let mut document = self.load_document_for_write()?;
        let section = section_mut(&mut document, ENCODER_SECTION)?;

        if let Some(model) = patch.encoder_model {
            section.insert(KEY_MODEL.into(), Value::String(model));
        }
        if let Some(resolution) = patch.encoder_resolution {
            section.insert(KEY_RESOLUTION.into(), Value::Float(resolution));
        }

        self.commit(&document)?;
        info!("Saved encoder settings to {}", self.path.display());
        Ok(())
    }

    /// Loads one section for reading. Any failure is logged and yields `None`.
    fn load_section(&self, name: &str) -> Option<Table> {
        let document = match self.read_document() {
            Ok(Some(document)) => document,
            Ok(None) => {
                debug!("{} not found, using default settings", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("{}, using default settings", e);
                return None;
            }
        };

        match document.get(name) {
            Some(Value::Table(section)) => Some(section.clone()),
            Some(other) => {
                warn!(
                    "[{}] in {} is a {}, not a section; using defaults",
                    name,
                    self.path.display(),
                    other.type_str()
                );
                None
            }
            None => None,
        }
    }

    /// The current document, or an empty one if the file does not exist yet.
    fn load_document_for_write(&self) -> AppResult<Table> {
        Ok(self.read_document()?.unwrap_or_default())
    }

    fn read_document(&self) -> AppResult<Option<Table>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DaqError::ConfigUnavailable(format!(
                    "cannot read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        text.parse::<Table>().map(Some).map_err(|e| {
            DaqError::ConfigUnavailable(format!("cannot parse {}: {}", self.path.display(), e))
        })
    }

    fn commit(&self, document: &Table) -> AppResult<()> {
        let text = toml::to_string(document)
            .map_err(|e| DaqError::ConfigUnavailable(format!("cannot serialize settings: {}", e)))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut staged = NamedTempFile::new_in(&dir)?;
        staged.write_all(text.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| DaqError::Io(e.error))?;
        Ok(())
    }
}

fn section_mut<'a>(document: &'a mut Table, name: &str) -> AppResult<&'a mut Table> {
    let entry = document
        .entry(name.to_string())
        .or_insert_with(|| Value::Table(Table::new()));
    match entry {
        Value::Table(section) => Ok(section),
        other => Err(DaqError::ConfigUnavailable(format!(
            "[{}] is a {}, not a section",
            name,
            other.type_str()
        ))),
    }
}

/// Accepts TOML booleans and the textual spellings operators tend to use.
fn parse_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::Integer(1) => Some(true),
        Value::Integer(0) => Some(false),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_positive_u32(value: &Value) -> Option<u32> {
    let parsed = match value {
        Value::Integer(i) => u32::try_from(*i).ok(),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.filter(|v| *v > 0)
}

fn parse_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Float(f) => Some(*f),
        Value::Integer(i) => Some(*i as f64),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}
