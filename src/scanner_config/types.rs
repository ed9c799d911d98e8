//! Typed trigger and encoder records.
//!
//! The on-disk record is loosely typed (the scanner and operators both edit
//! it), so every field is parsed on its own and anything unrecognized falls
//! back to its default instead of poisoning the whole record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Acquisition-timing policy of the profiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerType {
    /// Capture a profile every `travel_threshold` of encoder travel.
    Encoder,
    /// Capture at a fixed `frame_rate`.
    Time,
    /// Capture on an external input signal.
    Input,
}

impl TriggerType {
    /// Name as written to the scanner config file.
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::Encoder => "Encoder",
            TriggerType::Time => "Time",
            TriggerType::Input => "Input",
        }
    }
}

impl FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "encoder" => Ok(TriggerType::Encoder),
            "time" => Ok(TriggerType::Time),
            "input" => Ok(TriggerType::Input),
            other => Err(format!(
                "unsupported trigger type '{}' (expected Encoder, Time or Input)",
                other
            )),
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of encoder travel that fires the trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TravelDirection {
    /// Forward travel only.
    Forward,
    /// Backward travel only.
    Backward,
    /// Either direction.
    Bidirectional,
}

impl TravelDirection {
    /// Name as written to the scanner config file.
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelDirection::Forward => "Forward",
            TravelDirection::Backward => "Backward",
            TravelDirection::Bidirectional => "Bidirectional",
        }
    }
}

impl FromStr for TravelDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" => Ok(TravelDirection::Forward),
            "backward" => Ok(TravelDirection::Backward),
            "bidirectional" => Ok(TravelDirection::Bidirectional),
            other => Err(format!(
                "unsupported travel direction '{}' (expected Forward, Backward or Bidirectional)",
                other
            )),
        }
    }
}

impl fmt::Display for TravelDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trigger settings of the profiler.
///
/// A materialized `TriggerConfig` is always complete; see
/// [`TriggerPatch`] for partial updates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Acquisition-timing policy
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    /// Whether the external gate input must be active to capture
    pub enable_gate: bool,
    /// Frames per second, used when `trigger_type` is `Time`
    pub frame_rate: u32,
    /// Travel between captures in millimetres, used when `trigger_type` is `Encoder`
    pub travel_threshold: f64,
    /// Direction of travel that fires the trigger, used when `trigger_type` is `Encoder`
    pub travel_direction: TravelDirection,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            trigger_type: TriggerType::Encoder,
            enable_gate: false,
            frame_rate: 300,
            travel_threshold: 1.0,
            travel_direction: TravelDirection::Bidirectional,
        }
    }
}

/// Partial trigger update. `None` fields leave the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerPatch {
    /// New trigger type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<TriggerType>,
    /// New gate flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_gate: Option<bool>,
    /// New frame rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<u32>,
    /// New travel threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_threshold: Option<f64>,
    /// New travel direction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_direction: Option<TravelDirection>,
}

impl TriggerPatch {
    /// Rejects values the scanner cannot use.
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_rate == Some(0) {
            return Err("frame_rate must be a positive integer".to_string());
        }
        if let Some(threshold) = self.travel_threshold {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(format!(
                    "travel_threshold must be a positive number, got {}",
                    threshold
                ));
            }
        }
        Ok(())
    }
}

impl From<TriggerConfig> for TriggerPatch {
    fn from(cfg: TriggerConfig) -> Self {
        Self {
            trigger_type: Some(cfg.trigger_type),
            enable_gate: Some(cfg.enable_gate),
            frame_rate: Some(cfg.frame_rate),
            travel_threshold: Some(cfg.travel_threshold),
            travel_direction: Some(cfg.travel_direction),
        }
    }
}

/// Linear magnetic encoder settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Free-form encoder model name
    pub encoder_model: String,
    /// Encoder resolution (non-negative)
    pub encoder_resolution: f64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            encoder_model: "unspecified".to_string(),
            encoder_resolution: 0.0,
        }
    }
}

/// Partial encoder update. `None` fields leave the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderPatch {
    /// New model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder_model: Option<String>,
    /// New resolution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder_resolution: Option<f64>,
}

impl EncoderPatch {
    /// Rejects values the scanner cannot use.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(resolution) = self.encoder_resolution {
            if !resolution.is_finite() || resolution < 0.0 {
                return Err(format!(
                    "encoder_resolution must be a non-negative number, got {}",
                    resolution
                ));
            }
        }
        Ok(())
    }
}

impl From<EncoderConfig> for EncoderPatch {
    fn from(cfg: EncoderConfig) -> Self {
        Self {
            encoder_model: Some(cfg.encoder_model),
            encoder_resolution: Some(cfg.encoder_resolution),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_parsing_is_case_insensitive() {
        assert_eq!("TIME".parse::<TriggerType>(), Ok(TriggerType::Time));
        assert_eq!(" input ".parse::<TriggerType>(), Ok(TriggerType::Input));
        assert_eq!(
            "backward".parse::<TravelDirection>(),
            Ok(TravelDirection::Backward)
        );
        assert!("Sonar".parse::<TriggerType>().is_err());
        assert!("sideways".parse::<TravelDirection>().is_err());
    }

    #[test]
    fn test_trigger_serializes_type_key() {
        let json = serde_json::to_value(TriggerConfig::default()).unwrap();
        assert_eq!(json["type"], "Encoder");
        assert_eq!(json["travel_direction"], "Bidirectional");
        assert_eq!(json["frame_rate"], 300);
    }

    #[test]
    fn test_patch_validation() {
        let zero_rate = TriggerPatch {
            frame_rate: Some(0),
            ..Default::default()
        };
        assert!(zero_rate.validate().is_err());

        let negative_threshold = TriggerPatch {
            travel_threshold: Some(-1.0),
            ..Default::default()
        };
        assert!(negative_threshold.validate().is_err());

        assert!(TriggerPatch::from(TriggerConfig::default()).validate().is_ok());

        let negative_resolution = EncoderPatch {
            encoder_resolution: Some(-0.5),
            ..Default::default()
        };
        assert!(negative_resolution.validate().is_err());
    }
}
