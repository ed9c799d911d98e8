//! Recorded scan data.

pub mod profile;

pub use profile::{Bounds, PointSample, Profile, ProfileSummary, INVALID_RANGE_FLOOR_MM};
