//! Recorded laser profiles.
//!
//! The scanner writes one `x,y,z` row per sample (millimetres, no header).
//! Readings at or below the invalid-reading floor are sensor artifacts and
//! never reach bounds, colour mapping or statistics.

use crate::error::{AppResult, DaqError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Range value at or below which the profiler reports a failed reading.
pub const INVALID_RANGE_FLOOR_MM: f64 = -20.0;

/// One recorded sample, in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointSample {
    /// Horizontal position across the laser line
    pub x: f64,
    /// Position along the scan
    pub y: f64,
    /// Range reading
    pub z: f64,
}

impl PointSample {
    /// Creates a sample.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// False for sensor artifacts (`z <= -20`).
    pub fn is_valid_range(&self) -> bool {
        self.z > INVALID_RANGE_FLOOR_MM
    }
}

/// Axis-aligned extent of a profile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest x
    pub x_min: f64,
    /// Largest x
    pub x_max: f64,
    /// Smallest y
    pub y_min: f64,
    /// Largest y
    pub y_max: f64,
}

/// Statistics over the valid samples of a profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    /// Samples that survived filtering
    pub valid_samples: usize,
    /// Rows dropped as malformed or below the invalid-reading floor
    pub discarded_samples: usize,
    /// Extent of the valid samples
    pub bounds: Bounds,
    /// Smallest valid range reading
    pub z_min: f64,
    /// Largest valid range reading
    pub z_max: f64,
}

/// A non-empty sequence of valid samples.
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    samples: Vec<PointSample>,
    discarded: usize,
}

impl Profile {
    /// Reads a scanner data file.
    ///
    /// # Errors
    ///
    /// `DaqError::DataUnavailable` if the file cannot be opened or read, or
    /// holds no valid samples.
    pub fn load(path: &Path) -> AppResult<Self> {
        let file = File::open(path).map_err(|e| {
            DaqError::DataUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::read(file).map_err(|e| match e {
            DaqError::DataUnavailable(reason) => {
                DaqError::DataUnavailable(format!("{}: {}", path.display(), reason))
            }
            other => other,
        })
    }

    /// Parses `x,y,z` rows from any reader. Malformed rows are skipped.
    pub fn read<R: Read>(reader: R) -> AppResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut samples = Vec::new();
        let mut malformed = 0usize;
        for result in rdr.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    if let csv::ErrorKind::Io(io) = e.kind() {
                        return Err(DaqError::DataUnavailable(format!("read failed: {}", io)));
                    }
                    malformed += 1;
                    continue;
                }
            };
            match parse_record(&record) {
                Some(sample) => samples.push(sample),
                None => malformed += 1,
            }
        }

        if malformed > 0 {
            debug!("Skipped {} malformed profile rows", malformed);
        }
        Self::from_parts(samples, malformed)
    }

    /// Builds a profile from samples, dropping invalid readings.
    pub fn from_samples<I>(samples: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = PointSample>,
    {
        Self::from_parts(samples.into_iter().collect(), 0)
    }

    fn from_parts(raw: Vec<PointSample>, malformed: usize) -> AppResult<Self> {
        let total = raw.len();
        let samples: Vec<PointSample> = raw.into_iter().filter(PointSample::is_valid_range).collect();
        let discarded = malformed + (total - samples.len());

        if samples.is_empty() {
            return Err(DaqError::DataUnavailable(format!(
                "no valid samples ({} rows discarded)",
                discarded
            )));
        }
        Ok(Self { samples, discarded })
    }

    /// Valid samples in recording order.
    pub fn samples(&self) -> &[PointSample] {
        &self.samples
    }

    /// Rows that were dropped.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Extent of the valid samples.
    pub fn bounds(&self) -> Bounds {
        let first = self.samples[0];
        self.samples.iter().fold(
            Bounds {
                x_min: first.x,
                x_max: first.x,
                y_min: first.y,
                y_max: first.y,
            },
            |b, p| Bounds {
                x_min: b.x_min.min(p.x),
                x_max: b.x_max.max(p.x),
                y_min: b.y_min.min(p.y),
                y_max: b.y_max.max(p.y),
            },
        )
    }

    /// Smallest and largest valid range reading.
    pub fn z_range(&self) -> (f64, f64) {
        let first = self.samples[0].z;
        self.samples
            .iter()
            .fold((first, first), |(lo, hi), p| (lo.min(p.z), hi.max(p.z)))
    }

    /// Statistics over the valid samples.
    pub fn summary(&self) -> ProfileSummary {
        let (z_min, z_max) = self.z_range();
        ProfileSummary {
            valid_samples: self.samples.len(),
            discarded_samples: self.discarded,
            bounds: self.bounds(),
            z_min,
            z_max,
        }
    }
}

fn parse_record(record: &csv::StringRecord) -> Option<PointSample> {
    if record.len() != 3 {
        return None;
    }
    let mut values = [0.0f64; 3];
    for (slot, field) in values.iter_mut().zip(record.iter()) {
        let value: f64 = field.parse().ok()?;
        if !value.is_finite() {
            return None;
        }
        *slot = value;
    }
    Some(PointSample::new(values[0], values[1], values[2]))
}
