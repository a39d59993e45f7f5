// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use camera_demo::Config;
use camera_demo::backends::camera::{CameraBackendType, DevicePosition};
use camera_demo::session::VideoGravity;

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("camera-demo-{}-{}", name, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_config_default() {
    // Test that default config can be created
    let config = Config::default();

    // Check sensible defaults
    assert_eq!(
        config.mirror_preview, true,
        "Mirror preview should be enabled by default"
    );
    assert_eq!(config.initial_position, DevicePosition::Back);
    assert_eq!(config.preview_gravity, VideoGravity::ResizeAspectFill);
    assert!(config.enable_audio);
}

#[test]
fn test_config_round_trip() {
    let dir = temp_dir("config");
    let path = dir.join("nested").join("config.json");

    let config = Config {
        backend: CameraBackendType::Virtual,
        initial_position: DevicePosition::Front,
        enable_audio: false,
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_partial_config_takes_defaults() {
    let dir = temp_dir("partial");
    let path = dir.join("config.json");
    std::fs::write(&path, r#"{ "photo_quality": 250, "save_folder": "  " }"#).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.photo_quality, 100);
    assert_eq!(loaded.save_folder, Config::default().save_folder);
    assert_eq!(loaded.backend, CameraBackendType::GStreamer);
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_invalid_config_falls_back_to_defaults() {
    let dir = temp_dir("invalid");
    let path = dir.join("config.json");
    std::fs::write(&path, "not json").unwrap();

    assert!(Config::load_from(&path).is_err());
    assert_eq!(Config::load_or_default(&path), Config::default());
    assert_eq!(
        Config::load_or_default(&dir.join("missing.json")),
        Config::default()
    );
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_recording_dir_override() {
    let config = Config::default();
    assert_eq!(config.recording_dir(), std::env::temp_dir());

    let custom = Config {
        recording_dir: Some("/tmp/recordings".into()),
        ..Config::default()
    };
    assert_eq!(custom.recording_dir(), std::path::PathBuf::from("/tmp/recordings"));
}
