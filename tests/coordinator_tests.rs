// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the recording coordinator and the presentation
//! surface, run against the virtual camera backend

use camera_demo::app::{
    Alert, CaptureIcon, MediaType, PresentationSurface, RecordingCoordinator, SurfaceAction,
    TriggerOutcome,
};
use camera_demo::backends::camera::DevicePosition;
use camera_demo::backends::camera::virtual_camera::VirtualBackend;
use camera_demo::constants::SessionPreset;
use camera_demo::errors::CameraError;
use camera_demo::session::{
    CaptureSessionController, MediaEvent, SessionSettings, VideoGravity, next_recording_outcome,
};
use camera_demo::storage::MediaLibrary;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);

fn controller(root: &Path, backend: VirtualBackend) -> CaptureSessionController {
    let settings = SessionSettings {
        preset: SessionPreset::Low,
        recording_dir: root.join("recordings"),
        ..SessionSettings::default()
    };
    let controller = CaptureSessionController::initialize(
        Arc::new(backend),
        settings,
        MediaLibrary::new(root.join("photos"), root.join("videos")),
        Handle::current(),
    );
    controller.start_session().unwrap();
    controller
}

fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("camera-demo-coordinator-{}", uuid::Uuid::new_v4()))
}

/// Poll the surface the way the UI loop does until an alert shows up
async fn wait_for_alert(surface: &mut PresentationSurface) -> Alert {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    loop {
        surface.process_events();
        if let Some(alert) = surface.alert() {
            return alert;
        }
        assert!(tokio::time::Instant::now() < deadline, "no alert shown");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_mode_toggle_cycles() {
    let root = temp_root();
    let mut coordinator = RecordingCoordinator::new(controller(&root, VirtualBackend::new()));

    assert_eq!(coordinator.current_media_type(), MediaType::Photo);
    assert_eq!(coordinator.toggle_media_type(), MediaType::Video);
    assert_eq!(coordinator.toggle_media_type(), MediaType::Photo);
    assert!(coordinator.set_current_media_type(MediaType::Video));
    assert_eq!(coordinator.current_media_type(), MediaType::Video);

    coordinator.controller().stop_session();
    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_video_trigger_starts_and_stops_recording() {
    let root = temp_root();
    let mut coordinator = RecordingCoordinator::new(controller(&root, VirtualBackend::new()));
    coordinator.set_current_media_type(MediaType::Video);
    let mut events = coordinator.controller().subscribe();

    let TriggerOutcome::RecordingStarted(path) = coordinator.trigger_capture() else {
        panic!("recording did not start");
    };
    assert!(coordinator.is_recording_video());
    assert!(coordinator.controller().is_recording());
    assert!(path.starts_with(root.join("recordings")));

    // Mode is pinned while recording
    assert!(!coordinator.set_current_media_type(MediaType::Photo));
    assert_eq!(coordinator.toggle_media_type(), MediaType::Video);

    tokio::time::sleep(Duration::from_millis(200)).await;

    let TriggerOutcome::RecordingStopped(stopped) = coordinator.trigger_capture() else {
        panic!("recording did not stop");
    };
    assert!(stopped.await.unwrap());
    assert!(!coordinator.is_recording_video());

    let outcome = tokio::time::timeout(WAIT_TIMEOUT, next_recording_outcome(&mut events, &path))
        .await
        .unwrap();
    assert!(matches!(outcome, Some(MediaEvent::VideoSaved { .. })));

    coordinator.controller().stop_session();
    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_start_leaves_flag_down() {
    let root = temp_root();
    let mut coordinator =
        RecordingCoordinator::new(controller(&root, VirtualBackend::with_devices(Vec::new(), None)));
    coordinator.set_current_media_type(MediaType::Video);

    match coordinator.trigger_capture() {
        TriggerOutcome::RecordingRejected(e) => assert_eq!(e, CameraError::NoActiveVideoConnection),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!coordinator.is_recording_video());
    assert!(coordinator.set_current_media_type(MediaType::Photo));

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_photo_trigger_reports_missing_camera() {
    let root = temp_root();
    let mut coordinator =
        RecordingCoordinator::new(controller(&root, VirtualBackend::with_devices(Vec::new(), None)));

    let TriggerOutcome::PhotoRequested(completion) = coordinator.trigger_capture() else {
        panic!("photo mode should request a photo");
    };
    assert!(!completion.await.unwrap());

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_surface_shows_photo_alert() {
    let root = temp_root();
    let coordinator = RecordingCoordinator::new(controller(&root, VirtualBackend::new()));
    let mut surface = PresentationSurface::new(coordinator, Handle::current());

    surface.handle(SurfaceAction::Capture);
    assert_eq!(wait_for_alert(&mut surface).await, Alert::PHOTO_SAVED);

    // The alert is modal until dismissed
    surface.handle(SurfaceAction::ToggleMode);
    assert_eq!(surface.controls().mode, MediaType::Photo);
    surface.handle(SurfaceAction::DismissAlert);
    assert!(surface.alert().is_none());

    surface.coordinator().controller().stop_session();
    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_surface_shows_failure_alert_without_camera() {
    let root = temp_root();
    let coordinator =
        RecordingCoordinator::new(controller(&root, VirtualBackend::with_devices(Vec::new(), None)));
    let mut surface = PresentationSurface::new(coordinator, Handle::current());

    surface.handle(SurfaceAction::Capture);
    let alert = wait_for_alert(&mut surface).await;
    assert_eq!(alert, Alert::PHOTO_FAILED);
    assert!(alert.is_error());

    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_surface_controls_follow_recording() {
    let root = temp_root();
    let coordinator = RecordingCoordinator::new(controller(&root, VirtualBackend::new()));
    let mut surface = PresentationSurface::new(coordinator, Handle::current());

    let idle = surface.controls();
    assert_eq!(idle.capture_icon, CaptureIcon::Circle);
    assert!(idle.show_switch_camera && idle.show_mode_toggle);

    surface.handle(SurfaceAction::ToggleMode);
    surface.handle(SurfaceAction::Capture);
    let recording = surface.controls();
    assert_eq!(recording.mode, MediaType::Video);
    assert_eq!(recording.capture_icon, CaptureIcon::Square);
    assert!(!recording.show_switch_camera && !recording.show_mode_toggle);

    // Switching is hidden and ignored while recording
    surface.handle(SurfaceAction::SwitchCamera);
    assert_eq!(
        surface.coordinator().controller().current_position(),
        Some(DevicePosition::Back)
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    surface.handle(SurfaceAction::Capture);
    assert_eq!(wait_for_alert(&mut surface).await, Alert::VIDEO_SAVED);
    assert_eq!(surface.controls().capture_icon, CaptureIcon::Circle);

    surface.coordinator().controller().stop_session();
    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_surface_switches_camera_and_preview_mode() {
    let root = temp_root();
    let coordinator = RecordingCoordinator::new(controller(&root, VirtualBackend::new()));
    let mut surface = PresentationSurface::new(coordinator, Handle::current());

    surface.handle(SurfaceAction::SwitchCamera);
    assert_eq!(
        surface.coordinator().controller().current_position(),
        Some(DevicePosition::Front)
    );
    assert_eq!(surface.status(), Some("Switched to Front camera"));

    assert_eq!(surface.preview().gravity(), VideoGravity::ResizeAspectFill);
    surface.handle(SurfaceAction::CycleGravity);
    assert_ne!(surface.preview().gravity(), VideoGravity::ResizeAspectFill);

    let mirrored = surface.preview().is_mirrored();
    surface.handle(SurfaceAction::ToggleMirror);
    assert_eq!(surface.preview().is_mirrored(), !mirrored);

    surface.coordinator().controller().stop_session();
    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_stops_in_flight_recording() {
    let root = temp_root();
    let coordinator = RecordingCoordinator::new(controller(&root, VirtualBackend::new()));
    let mut surface = PresentationSurface::new(coordinator, Handle::current());
    assert!(surface.shutdown().is_none());

    surface.handle(SurfaceAction::ToggleMode);
    surface.handle(SurfaceAction::Capture);
    assert!(surface.coordinator().is_recording_video());
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stopped = surface.shutdown().expect("recording was in flight");
    assert!(stopped.await.unwrap());
    assert!(!surface.coordinator().controller().is_recording());

    surface.coordinator().controller().stop_session();
    std::fs::remove_dir_all(&root).ok();
}
