//! Trigger and encoder settings consumed by the external scanner.

mod store;
mod types;

pub use store::ConfigStore;
pub use types::{
    EncoderConfig, EncoderPatch, TravelDirection, TriggerConfig, TriggerPatch, TriggerType,
};
