//! Persistence of the scanner's trigger and encoder record.

use hqs_daq::scanner_config::{
    ConfigStore, EncoderConfig, EncoderPatch, TravelDirection, TriggerConfig, TriggerPatch,
    TriggerType,
};
use std::fs;
use tracing_test::traced_test;

fn store_in(dir: &tempfile::TempDir) -> ConfigStore {
    ConfigStore::new(dir.path().join("gocator_encoder.toml"))
}

#[test]
fn test_trigger_round_trips_every_combination() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    for trigger_type in [TriggerType::Encoder, TriggerType::Time, TriggerType::Input] {
        for travel_direction in [
            TravelDirection::Forward,
            TravelDirection::Backward,
            TravelDirection::Bidirectional,
        ] {
            for enable_gate in [true, false] {
                let written = TriggerConfig {
                    trigger_type,
                    enable_gate,
                    frame_rate: 450,
                    travel_threshold: 0.25,
                    travel_direction,
                };
                assert!(store.set_trigger(written.clone()));
                assert_eq!(store.get_trigger(), written);
            }
        }
    }
}

#[test]
fn test_encoder_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let written = EncoderConfig {
        encoder_model: "LM10 linear".to_string(),
        encoder_resolution: 0.005,
    };
    assert!(store.set_encoder(written.clone()));
    assert_eq!(store.get_encoder(), written);
}

#[test]
fn test_missing_file_reads_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    assert_eq!(store.get_trigger(), ConfigStore::sane_trigger());
    assert_eq!(store.get_encoder(), ConfigStore::sane_encoder());
    assert!(!store.path().exists());
}

#[test]
fn test_garbage_file_reads_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    fs::write(store.path(), "[Trigger\nthis is = = not toml").unwrap();

    assert_eq!(store.get_trigger(), ConfigStore::sane_trigger());
    assert_eq!(store.get_encoder(), ConfigStore::sane_encoder());
}

#[test]
fn test_bad_field_falls_back_alone() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    fs::write(
        store.path(),
        r#"
[Trigger]
type = "Sonar"
enable_gate = true
frame_rate = 120
travel_threshold = 2.5
trigger_direction = "forward"
"#,
    )
    .unwrap();

    let trigger = store.get_trigger();
    assert_eq!(trigger.trigger_type, TriggerType::Encoder);
    assert!(trigger.enable_gate);
    assert_eq!(trigger.frame_rate, 120);
    assert_eq!(trigger.travel_threshold, 2.5);
    assert_eq!(trigger.travel_direction, TravelDirection::Forward);
}

#[test]
fn test_partial_patch_keeps_other_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert!(store.set_trigger(TriggerConfig {
        trigger_type: TriggerType::Time,
        enable_gate: true,
        frame_rate: 200,
        travel_threshold: 0.5,
        travel_direction: TravelDirection::Backward,
    }));

    assert!(store.set_trigger(TriggerPatch {
        frame_rate: Some(600),
        ..Default::default()
    }));

    let trigger = store.get_trigger();
    assert_eq!(trigger.frame_rate, 600);
    assert_eq!(trigger.trigger_type, TriggerType::Time);
    assert_eq!(trigger.travel_direction, TravelDirection::Backward);
    assert!(trigger.enable_gate);
}

#[test]
fn test_write_preserves_unrelated_sections() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    fs::write(
        store.path(),
        r#"
[Sensor]
ip = "192.168.1.10"
exposure_us = 85

[Encoder]
model = "LM10"
resolution = 0.01
"#,
    )
    .unwrap();

    assert!(store.set_trigger(TriggerPatch {
        trigger_type: Some(TriggerType::Input),
        ..Default::default()
    }));

    let text = fs::read_to_string(store.path()).unwrap();
    let document: toml::Table = text.parse().unwrap();
    assert_eq!(document["Sensor"]["ip"].as_str(), Some("192.168.1.10"));
    assert_eq!(document["Sensor"]["exposure_us"].as_integer(), Some(85));
    assert_eq!(document["Trigger"]["type"].as_str(), Some("Input"));
    assert_eq!(store.get_encoder().encoder_model, "LM10");
}

#[test]
fn test_corrupt_file_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let garbage = "[Trigger\nframe_rate = ";
    fs::write(store.path(), garbage).unwrap();

    assert!(!store.set_trigger(TriggerConfig::default()));
    assert!(!store.set_encoder(EncoderConfig::default()));
    assert!(store.try_set_trigger(TriggerConfig::default()).is_err());
    assert_eq!(fs::read_to_string(store.path()).unwrap(), garbage);
}

#[test]
fn test_invalid_patch_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    assert!(!store.set_trigger(TriggerPatch {
        frame_rate: Some(0),
        ..Default::default()
    }));
    assert!(!store.set_encoder(EncoderPatch {
        encoder_resolution: Some(f64::NAN),
        ..Default::default()
    }));
    assert!(!store.path().exists());
}

#[test]
fn test_enum_values_read_case_insensitively() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    fs::write(
        store.path(),
        "[Trigger]\ntype = \"TIME\"\ntrigger_direction = \"bidirectional\"\n",
    )
    .unwrap();

    let trigger = store.get_trigger();
    assert_eq!(trigger.trigger_type, TriggerType::Time);
    assert_eq!(trigger.travel_direction, TravelDirection::Bidirectional);
}

#[test]
#[traced_test]
fn test_rejected_field_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    fs::write(store.path(), "[Trigger]\ntype = \"Sonar\"\n").unwrap();

    assert_eq!(store.get_trigger().trigger_type, TriggerType::Encoder);
    assert!(logs_contain("unsupported trigger type"));
}
