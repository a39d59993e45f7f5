// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Taking photos
//! - Recording videos
//!
//! Photo and video commands drive the same capture session controller as the
//! terminal surface.

use camera_demo::Config;
use camera_demo::backends::camera::{DevicePosition, get_backend_for_type};
use camera_demo::constants::format_bitrate;
use camera_demo::session::{
    CaptureSessionController, MediaEvent, SessionSettings, next_photo_outcome,
};
use camera_demo::storage::MediaLibrary;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;

/// How long to wait for a photo to be encoded and written
const PHOTO_SAVE_TIMEOUT: Duration = Duration::from_secs(10);

/// List all available cameras
pub fn list_cameras(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = get_backend_for_type(config.backend);
    if !backend.is_available() {
        return Err(format!("{} backend is not available", backend.backend_type()).into());
    }

    let cameras = backend.enumerate_cameras();
    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Position: {}", camera.position);
        println!("      Path: {}", camera.path);
        println!();
    }

    match backend.default_audio_device() {
        Some(audio) => println!("Microphone: {}", audio.name),
        None => println!("Microphone: none"),
    }

    Ok(())
}

/// Take a photo with the camera at `position`
pub fn take_photo(
    config: &Config,
    runtime: &Runtime,
    position: Option<DevicePosition>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = SessionSettings::from_config(config);
    settings.enable_audio = false;
    if let Some(position) = position {
        settings.initial_position = position;
    }

    let controller = start_controller(config, runtime, settings)?;
    println!("Capturing...");

    let mut events = controller.subscribe();
    let accepted = runtime.block_on(controller.capture_photo()).unwrap_or(false);
    if !accepted {
        controller.stop_session();
        return Err("No active camera to capture from".into());
    }

    let outcome = runtime.block_on(async {
        tokio::time::timeout(PHOTO_SAVE_TIMEOUT, next_photo_outcome(&mut events))
            .await
            .ok()
            .flatten()
    });
    controller.stop_session();

    match outcome {
        Some(MediaEvent::PhotoSaved(path)) => {
            let path = deliver(&path, output.as_deref())?;
            println!("Photo saved: {}", path.display());
            Ok(())
        }
        Some(MediaEvent::PhotoFailed(reason)) => Err(reason.into()),
        _ => Err("Timed out waiting for the photo".into()),
    }
}

/// Record a video for `duration` seconds, or until Ctrl+C
pub fn record_video(
    config: &Config,
    runtime: &Runtime,
    position: Option<DevicePosition>,
    duration: u64,
    output: Option<PathBuf>,
    no_audio: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = SessionSettings::from_config(config);
    settings.enable_audio = config.enable_audio && !no_audio;
    if let Some(position) = position {
        settings.initial_position = position;
    }

    let controller = start_controller(config, runtime, settings)?;
    let recording_path = match controller.start_recording() {
        Ok(path) => path,
        Err(e) => {
            controller.stop_session();
            return Err(e.into());
        }
    };

    let format = settings_format(&controller);
    println!("Recording to: {}", recording_path.display());
    println!("Format: {}", format);
    println!("Duration: {} seconds", duration);
    if controller.has_audio_input() && !no_audio {
        println!("Audio: enabled");
    }
    println!();
    println!("Recording... (press Ctrl+C to stop early)");

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    })?;

    let target_duration = Duration::from_secs(duration);
    let started = Instant::now();
    while started.elapsed() < target_duration {
        if stop.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    println!();

    let outcome = runtime.block_on(controller.stop_recording_and_wait());
    controller.stop_session();

    match outcome {
        Some(MediaEvent::VideoSaved { path, .. }) => {
            let path = deliver(&path, output.as_deref())?;
            println!("Video saved: {}", path.display());
            Ok(())
        }
        Some(MediaEvent::VideoFailed { reason, .. }) => Err(reason.into()),
        _ => Err("Recording was not saved".into()),
    }
}

/// "High 1920x1080 @ 30fps, Medium bitrate (8 Mbps)"
fn settings_format(controller: &CaptureSessionController) -> String {
    let settings = controller.settings();
    let format = settings.preset.format();
    format!(
        "{} {}, {} bitrate ({})",
        settings.preset.display_name(),
        format,
        settings.bitrate_preset.display_name(),
        format_bitrate(settings.bitrate_preset.bitrate_kbps(format.width))
    )
}

/// Parse a `--position` argument
pub fn parse_position(value: &str) -> Result<DevicePosition, String> {
    match DevicePosition::from_location(value) {
        DevicePosition::Unspecified => Err(format!(
            "unknown camera position '{}' (expected front or back)",
            value
        )),
        position => Ok(position),
    }
}

fn start_controller(
    config: &Config,
    runtime: &Runtime,
    settings: SessionSettings,
) -> Result<CaptureSessionController, Box<dyn std::error::Error>> {
    let backend = get_backend_for_type(config.backend);
    let library = MediaLibrary::from_config(config);
    let controller =
        CaptureSessionController::initialize(backend, settings, library, runtime.handle().clone());

    controller.start_session()?;
    match controller.current_device() {
        Some(camera) => println!("Using camera: {} ({})", camera.name, camera.position),
        None => return Err("No cameras found".into()),
    }
    Ok(controller)
}

/// Copy a saved file to a user-requested path, keeping the library copy
fn deliver(saved: &Path, output: Option<&Path>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let Some(output) = output else {
        return Ok(saved.to_path_buf());
    };

    let target = if output.is_dir() {
        match saved.file_name() {
            Some(name) => output.join(name),
            None => output.to_path_buf(),
        }
    } else {
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        output.to_path_buf()
    };

    std::fs::copy(saved, &target)?;
    Ok(target)
}
