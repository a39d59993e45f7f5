// SPDX-License-Identifier: MPL-2.0

//! Presentation surface state
//!
//! Binds the three triggers (capture, switch camera, mode toggle) to the
//! [`RecordingCoordinator`] and keeps everything the terminal draws: control
//! visibility, the capture button icon, the modal alert and the status line.
//!
//! Completions and media events arrive on runtime threads. They are turned
//! into [`UiEvent`]s and queued; only [`PresentationSurface::process_events`],
//! called from the UI loop, touches surface state.

use super::coordinator::{MediaType, RecordingCoordinator, TriggerOutcome};
use crate::session::{MediaEvent, PreviewLayer};
use futures::channel::mpsc;
use std::path::Path;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, warn};

/// Modal alert shown after a capture completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alert {
    pub title: &'static str,
    pub message: &'static str,
}

impl Alert {
    pub const PHOTO_SAVED: Alert = Alert {
        title: "Success",
        message: "Photo successfully captured and saved.",
    };
    pub const PHOTO_FAILED: Alert = Alert {
        title: "Error",
        message: "Failed to capture and save photo.",
    };
    pub const VIDEO_SAVED: Alert = Alert {
        title: "Success",
        message: "Video successfully recorded and saved.",
    };
    pub const VIDEO_FAILED: Alert = Alert {
        title: "Error",
        message: "Failed to record and save video.",
    };

    pub fn is_error(&self) -> bool {
        self.title == "Error"
    }
}

/// Capture button glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureIcon {
    /// Idle
    Circle,
    /// Recording
    Square,
}

impl CaptureIcon {
    pub fn glyph(&self) -> &'static str {
        match self {
            CaptureIcon::Circle => "●",
            CaptureIcon::Square => "■",
        }
    }
}

/// What the control bar shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controls {
    pub capture_icon: CaptureIcon,
    pub show_switch_camera: bool,
    pub show_mode_toggle: bool,
    pub mode: MediaType,
}

/// User input, already decoded from keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceAction {
    Capture,
    SwitchCamera,
    ToggleMode,
    CycleGravity,
    ToggleMirror,
    DismissAlert,
}

/// Work handed back to the UI loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    PhotoCompleted(bool),
    RecordingCompleted(bool),
    Media(MediaEvent),
}

pub struct PresentationSurface {
    coordinator: RecordingCoordinator,
    preview: PreviewLayer,
    alert: Option<Alert>,
    status: Option<String>,
    events_tx: mpsc::UnboundedSender<UiEvent>,
    events_rx: mpsc::UnboundedReceiver<UiEvent>,
    runtime: Handle,
}

impl PresentationSurface {
    pub fn new(coordinator: RecordingCoordinator, runtime: Handle) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded();
        let preview = coordinator.preview();

        let mut media_events = coordinator.controller().subscribe();
        let forward = events_tx.clone();
        runtime.spawn(async move {
            loop {
                match media_events.recv().await {
                    Ok(event) => {
                        if forward.unbounded_send(UiEvent::Media(event)).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Surface fell behind on media events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self {
            coordinator,
            preview,
            alert: None,
            status: None,
            events_tx,
            events_rx,
            runtime,
        }
    }

    pub fn handle(&mut self, action: SurfaceAction) {
        if self.alert.is_some() {
            if action == SurfaceAction::DismissAlert {
                self.alert = None;
            }
            return;
        }

        match action {
            SurfaceAction::Capture => self.on_capture(),
            SurfaceAction::SwitchCamera => {
                if self.coordinator.is_recording_video() {
                    return;
                }
                match self.coordinator.toggle_camera_position() {
                    Ok(position) => {
                        self.status = Some(format!("Switched to {} camera", position));
                    }
                    Err(e) => self.status = Some(format!("Camera switch failed: {}", e)),
                }
            }
            SurfaceAction::ToggleMode => {
                let mode = self.coordinator.toggle_media_type();
                debug!(mode = mode.label(), "Mode toggled");
            }
            SurfaceAction::CycleGravity => {
                let gravity = self.preview.gravity().next();
                self.preview.set_gravity(gravity);
                self.status = Some(format!("Preview: {}", gravity.display_name()));
            }
            SurfaceAction::ToggleMirror => {
                let mirrored = !self.preview.is_mirrored();
                self.preview.set_mirrored(mirrored);
            }
            SurfaceAction::DismissAlert => {}
        }
    }

    fn on_capture(&mut self) {
        match self.coordinator.trigger_capture() {
            TriggerOutcome::PhotoRequested(completion) => {
                self.forward(completion, UiEvent::PhotoCompleted);
            }
            TriggerOutcome::RecordingStarted(_) => {
                self.status = Some("Recording".to_string());
            }
            TriggerOutcome::RecordingRejected(e) => {
                self.status = Some(format!("Could not start recording: {}", e));
            }
            TriggerOutcome::RecordingStopped(completion) => {
                self.status = Some("Finishing video".to_string());
                self.forward(completion, UiEvent::RecordingCompleted);
            }
        }
    }

    fn forward(&self, completion: oneshot::Receiver<bool>, event: fn(bool) -> UiEvent) {
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let success = completion.await.unwrap_or(false);
            let _ = tx.unbounded_send(event(success));
        });
    }

    /// Apply queued completions. Returns how many were applied.
    pub fn process_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::PhotoCompleted(success) => {
                self.alert = Some(if success {
                    Alert::PHOTO_SAVED
                } else {
                    Alert::PHOTO_FAILED
                });
            }
            UiEvent::RecordingCompleted(success) => {
                self.alert = Some(if success {
                    Alert::VIDEO_SAVED
                } else {
                    Alert::VIDEO_FAILED
                });
            }
            UiEvent::Media(
                MediaEvent::PhotoSaved(path) | MediaEvent::VideoSaved { path, .. },
            ) => {
                self.status = Some(format!("Saved {}", file_name(&path)));
            }
            UiEvent::Media(
                MediaEvent::PhotoFailed(reason) | MediaEvent::VideoFailed { reason, .. },
            ) => {
                self.status = Some(format!("Save failed: {}", reason));
            }
        }
    }

    /// Stop an in-flight recording before the surface goes away
    pub fn shutdown(&mut self) -> Option<oneshot::Receiver<bool>> {
        if self.coordinator.is_recording_video() {
            Some(self.coordinator.stop_video_recording())
        } else {
            None
        }
    }

    pub fn controls(&self) -> Controls {
        let recording = self.coordinator.is_recording_video();
        Controls {
            capture_icon: if recording {
                CaptureIcon::Square
            } else {
                CaptureIcon::Circle
            },
            show_switch_camera: !recording,
            show_mode_toggle: !recording,
            mode: self.coordinator.current_media_type(),
        }
    }

    pub fn alert(&self) -> Option<Alert> {
        self.alert
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn preview(&self) -> &PreviewLayer {
        &self.preview
    }

    pub fn preview_mut(&mut self) -> &mut PreviewLayer {
        &mut self.preview
    }

    pub fn coordinator(&self) -> &RecordingCoordinator {
        &self.coordinator
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_texts() {
        assert_eq!(Alert::PHOTO_SAVED.title, "Success");
        assert!(Alert::VIDEO_FAILED.is_error());
        assert!(!Alert::VIDEO_SAVED.is_error());
        assert_eq!(CaptureIcon::Square.glyph(), "■");
    }
}
