// SPDX-License-Identifier: GPL-3.0-only

//! Recording coordinator
//!
//! Translates user intent into capture session calls and owns the two bits
//! of UI-facing state: the media mode and the recording flag.

use crate::backends::camera::DevicePosition;
use crate::errors::{CameraError, CameraResult};
use crate::session::{CaptureSessionController, PreviewLayer};
use std::path::PathBuf;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// What the capture trigger produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaType {
    #[default]
    Photo,
    Video,
}

impl MediaType {
    pub fn toggled(self) -> Self {
        match self {
            MediaType::Photo => MediaType::Video,
            MediaType::Video => MediaType::Photo,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Photo => "Photo",
            MediaType::Video => "Video",
        }
    }
}

/// Result of pressing the capture trigger
#[derive(Debug)]
pub enum TriggerOutcome {
    /// Photo requested; resolves `false` when no camera feeds the photo output
    PhotoRequested(oneshot::Receiver<bool>),
    RecordingStarted(PathBuf),
    RecordingRejected(CameraError),
    /// Recording stop issued; always resolves `true`
    RecordingStopped(oneshot::Receiver<bool>),
}

pub struct RecordingCoordinator {
    controller: CaptureSessionController,
    media_type: MediaType,
    is_recording_video: bool,
}

impl RecordingCoordinator {
    pub fn new(controller: CaptureSessionController) -> Self {
        Self {
            controller,
            media_type: MediaType::default(),
            is_recording_video: false,
        }
    }

    /// Capture a photo or start/stop a recording, depending on the mode
    pub fn trigger_capture(&mut self) -> TriggerOutcome {
        match (self.media_type, self.is_recording_video) {
            (MediaType::Photo, _) => TriggerOutcome::PhotoRequested(self.capture_photo()),
            (MediaType::Video, true) => TriggerOutcome::RecordingStopped(self.stop_video_recording()),
            (MediaType::Video, false) => match self.start_video_recording() {
                Ok(path) => TriggerOutcome::RecordingStarted(path),
                Err(e) => TriggerOutcome::RecordingRejected(e),
            },
        }
    }

    pub fn capture_photo(&self) -> oneshot::Receiver<bool> {
        self.controller.capture_photo()
    }

    /// The flag is only raised once the controller accepted the start
    pub fn start_video_recording(&mut self) -> CameraResult<PathBuf> {
        if self.is_recording_video {
            return Err(CameraError::AlreadyRecording);
        }
        let path = self.controller.start_recording()?;
        self.is_recording_video = true;
        Ok(path)
    }

    pub fn stop_video_recording(&mut self) -> oneshot::Receiver<bool> {
        self.is_recording_video = false;
        self.controller.stop_recording()
    }

    pub fn toggle_camera_position(&self) -> CameraResult<DevicePosition> {
        self.controller.toggle_camera_position()
    }

    /// Photo ↔ video. Ignored while recording.
    pub fn toggle_media_type(&mut self) -> MediaType {
        self.set_current_media_type(self.media_type.toggled());
        self.media_type
    }

    pub fn current_media_type(&self) -> MediaType {
        self.media_type
    }

    /// Returns `false` when the change was refused because a recording is in flight
    pub fn set_current_media_type(&mut self, media_type: MediaType) -> bool {
        if self.is_recording_video {
            debug!(requested = media_type.label(), "Mode change ignored while recording");
            return false;
        }
        if self.media_type != media_type {
            info!(mode = media_type.label(), "Media mode changed");
        }
        self.media_type = media_type;
        true
    }

    pub fn is_recording_video(&self) -> bool {
        self.is_recording_video
    }

    pub fn controller(&self) -> &CaptureSessionController {
        &self.controller
    }

    pub fn preview(&self) -> PreviewLayer {
        self.controller.preview()
    }
}
