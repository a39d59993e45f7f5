// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture session controller, run against the
//! virtual camera backend

use camera_demo::backends::camera::virtual_camera::{FRONT_CAMERA_PATH, VirtualBackend};
use camera_demo::backends::camera::{CameraBackend, DevicePosition};
use camera_demo::constants::SessionPreset;
use camera_demo::errors::CameraError;
use camera_demo::session::{
    CaptureSessionController, MediaEvent, SessionSettings, next_photo_outcome,
    next_recording_outcome,
};
use camera_demo::storage::MediaLibrary;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

const SAVE_TIMEOUT: Duration = Duration::from_secs(10);

struct Fixture {
    root: PathBuf,
    controller: CaptureSessionController,
}

impl Fixture {
    fn new(backend: Arc<dyn CameraBackend>) -> Self {
        let root = std::env::temp_dir().join(format!("camera-demo-session-{}", uuid::Uuid::new_v4()));
        let settings = SessionSettings {
            preset: SessionPreset::Low,
            recording_dir: root.join("recordings"),
            ..SessionSettings::default()
        };
        let library = MediaLibrary::new(root.join("photos"), root.join("videos"));
        let controller =
            CaptureSessionController::initialize(backend, settings, library, Handle::current());
        controller.start_session().unwrap();
        Self { root, controller }
    }

    fn virtual_cameras() -> Self {
        Self::new(Arc::new(VirtualBackend::new()))
    }

    async fn next_photo(&self, events: &mut tokio::sync::broadcast::Receiver<MediaEvent>) -> MediaEvent {
        tokio::time::timeout(SAVE_TIMEOUT, next_photo_outcome(events))
            .await
            .expect("timed out waiting for save")
            .expect("event channel closed")
    }

    async fn record_for(&self, duration: Duration) -> MediaEvent {
        self.controller.start_recording().unwrap();
        tokio::time::sleep(duration).await;
        tokio::time::timeout(SAVE_TIMEOUT, self.controller.stop_recording_and_wait())
            .await
            .expect("timed out waiting for video")
            .expect("recording was in flight")
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.controller.stop_session();
        std::fs::remove_dir_all(&self.root).ok();
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_session_starts_on_requested_camera() {
    let fixture = Fixture::virtual_cameras();
    let controller = &fixture.controller;

    assert!(controller.is_running());
    assert_eq!(controller.current_position(), Some(DevicePosition::Back));
    assert!(controller.has_video_connection());
    assert!(controller.has_audio_input());
    assert!(!controller.is_recording());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_start_and_stop_session_are_idempotent() {
    let fixture = Fixture::virtual_cameras();
    let controller = &fixture.controller;

    controller.start_session().unwrap();
    assert!(controller.is_running());
    controller.stop_session();
    controller.stop_session();
    assert!(!controller.is_running());
    controller.start_session().unwrap();
    assert!(controller.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_toggle_alternates_positions() {
    let fixture = Fixture::virtual_cameras();
    let controller = &fixture.controller;

    for n in 1..=4 {
        let expected = if n % 2 == 1 {
            DevicePosition::Front
        } else {
            DevicePosition::Back
        };
        assert_eq!(controller.toggle_camera_position().unwrap(), expected);
        assert_eq!(controller.current_position(), Some(expected));
    }
    assert!(controller.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_toggle_keeps_camera_when_open_fails() {
    let backend = Arc::new(VirtualBackend::new());
    let fixture = Fixture::new(backend.clone());
    backend.fail_on_open(FRONT_CAMERA_PATH);

    let result = fixture.controller.toggle_camera_position();
    assert!(matches!(result, Err(CameraError::InputConfigurationFailed(_))));
    assert_eq!(fixture.controller.current_position(), Some(DevicePosition::Back));

    // The previous camera still feeds the photo output
    let mut events = fixture.controller.subscribe();
    assert!(fixture.controller.capture_photo().await.unwrap());
    assert!(matches!(
        fixture.next_photo(&mut events).await,
        MediaEvent::PhotoSaved(_)
    ));

    backend.clear_failures();
    assert_eq!(
        fixture.controller.toggle_camera_position().unwrap(),
        DevicePosition::Front
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_toggle_rolls_back_when_start_fails() {
    let backend = Arc::new(VirtualBackend::new());
    let fixture = Fixture::new(backend.clone());
    backend.fail_on_start(FRONT_CAMERA_PATH);

    let result = fixture.controller.toggle_camera_position();
    assert!(matches!(result, Err(CameraError::InputConfigurationFailed(_))));
    assert_eq!(fixture.controller.current_position(), Some(DevicePosition::Back));
    assert!(fixture.controller.is_running());

    let mut preview = fixture.controller.preview();
    let _ = preview.latest_frame_if_new();
    let mut delivered = false;
    for _ in 0..50 {
        if preview.latest_frame_if_new().is_some() {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(delivered, "previous camera should keep streaming");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_toggle_without_other_camera_fails() {
    let backend = VirtualBackend::with_devices(
        vec![camera_demo::backends::camera::CameraDevice {
            name: "Only Camera".to_string(),
            path: "virtual:only".to_string(),
            position: DevicePosition::Unspecified,
        }],
        None,
    );
    let fixture = Fixture::new(Arc::new(backend));

    // A lone unreported camera is treated as front-facing
    assert_eq!(fixture.controller.current_position(), Some(DevicePosition::Front));
    assert!(matches!(
        fixture.controller.toggle_camera_position(),
        Err(CameraError::DeviceUnavailable(_))
    ));
    assert!(!fixture.controller.has_audio_input());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_photo_fails_without_camera() {
    let fixture = Fixture::new(Arc::new(VirtualBackend::with_devices(Vec::new(), None)));

    assert!(!fixture.controller.has_video_connection());
    assert!(!fixture.controller.capture_photo().await.unwrap());
    assert!(fixture.controller.toggle_camera_position().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_photo_is_saved_as_decodable_jpeg() {
    let fixture = Fixture::virtual_cameras();
    let mut events = fixture.controller.subscribe();

    assert!(fixture.controller.capture_photo().await.unwrap());

    let MediaEvent::PhotoSaved(path) = fixture.next_photo(&mut events).await else {
        panic!("photo was not saved");
    };
    assert!(path.starts_with(fixture.root.join("photos")));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));

    let image = image::open(&path).unwrap();
    assert_eq!((image.width(), image.height()), (640, 480));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_photo_accepted_before_first_frame() {
    let root = std::env::temp_dir().join(format!("camera-demo-fresh-{}", uuid::Uuid::new_v4()));
    let settings = SessionSettings {
        preset: SessionPreset::Low,
        recording_dir: root.join("recordings"),
        ..SessionSettings::default()
    };
    let controller = CaptureSessionController::initialize(
        Arc::new(VirtualBackend::new()),
        settings,
        MediaLibrary::new(root.join("photos"), root.join("videos")),
        Handle::current(),
    );

    // The session may still be starting in the background
    assert!(controller.capture_photo().await.unwrap());

    controller.stop_session();
    std::fs::remove_dir_all(&root).ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_second_recording_start_is_rejected() {
    let fixture = Fixture::virtual_cameras();
    let controller = &fixture.controller;

    let path = controller.start_recording().unwrap();
    assert!(controller.is_recording());
    assert_eq!(controller.recording_path(), Some(path.clone()));
    assert_eq!(controller.start_recording(), Err(CameraError::AlreadyRecording));
    assert_eq!(controller.recording_path(), Some(path));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(controller.stop_recording().await.unwrap());
    assert!(!controller.is_recording());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_without_recording_resolves_true() {
    let fixture = Fixture::virtual_cameras();
    assert!(fixture.controller.stop_recording().await.unwrap());
    assert!(fixture.controller.stop_recording_and_wait().await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_recording_lands_in_library() {
    let fixture = Fixture::virtual_cameras();

    let MediaEvent::VideoSaved { path, .. } = fixture.record_for(Duration::from_millis(300)).await
    else {
        panic!("video was not saved");
    };
    assert!(path.starts_with(fixture.root.join("videos")));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("y4m"));

    let contents = std::fs::read(&path).unwrap();
    assert!(contents.starts_with(b"YUV4MPEG2 W640 H480"));

    let leftovers = std::fs::read_dir(fixture.root.join("recordings"))
        .unwrap()
        .count();
    assert_eq!(leftovers, 0, "recording file should be moved, not copied");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_each_recording_gets_its_own_destination() {
    let fixture = Fixture::virtual_cameras();
    let controller = &fixture.controller;

    let first = controller.start_recording().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(controller.stop_recording_and_wait().await.is_some());

    let second = controller.start_recording().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(controller.stop_recording_and_wait().await.is_some());

    assert_ne!(first, second);
    assert!(first.starts_with(fixture.root.join("recordings")));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_waits_for_its_own_recording_not_a_photo() {
    let fixture = Fixture::virtual_cameras();
    let controller = &fixture.controller;

    let recording = controller.start_recording().unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // A photo saved while the recording stops must not be taken as its outcome
    let mut photos = controller.subscribe();
    assert!(controller.capture_photo().await.unwrap());
    let outcome = tokio::time::timeout(SAVE_TIMEOUT, controller.stop_recording_and_wait())
        .await
        .expect("timed out waiting for video")
        .expect("recording was in flight");

    match outcome {
        MediaEvent::VideoSaved { recording: saved, path } => {
            assert_eq!(saved, recording);
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("y4m"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(matches!(
        fixture.next_photo(&mut photos).await,
        MediaEvent::PhotoSaved(_)
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_recording_outcome_ignores_other_events() {
    let (tx, mut rx) = tokio::sync::broadcast::channel(8);
    let wanted = PathBuf::from("/tmp/video_b");
    tx.send(MediaEvent::PhotoSaved(PathBuf::from("/tmp/photo.jpg"))).unwrap();
    tx.send(MediaEvent::VideoSaved {
        recording: PathBuf::from("/tmp/video_a"),
        path: PathBuf::from("/videos/a.mp4"),
    })
    .unwrap();
    tx.send(MediaEvent::VideoFailed {
        recording: wanted.clone(),
        reason: "disk full".to_string(),
    })
    .unwrap();

    let outcome = next_recording_outcome(&mut rx, &wanted).await;
    assert_eq!(
        outcome,
        Some(MediaEvent::VideoFailed {
            recording: wanted,
            reason: "disk full".to_string(),
        })
    );

    drop(tx);
    assert!(next_recording_outcome(&mut rx, Path::new("/tmp/video_c")).await.is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_recording_requires_camera() {
    let fixture = Fixture::new(Arc::new(VirtualBackend::with_devices(Vec::new(), None)));
    assert_eq!(
        fixture.controller.start_recording(),
        Err(CameraError::NoActiveVideoConnection)
    );
    assert!(!fixture.controller.is_recording());
}
