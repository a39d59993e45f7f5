// SPDX-License-Identifier: GPL-3.0-only

//! Capture session controller
//!
//! Owns the capture session: one video input and one audio input (each in an
//! [`InputSlot`]), a photo output and a movie-file output behind the
//! [`OutputStage`], and the preview layer.
//!
//! ```text
//!  CameraBackend ──frames──▶ OutputStage ──┬──▶ PreviewLayer
//!   (VideoStream)                          ├──▶ photo requests ──▶ JPEG ──▶ MediaLibrary
//!                                          └──▶ MovieWriter ────────────▶ MediaLibrary
//! ```
//!
//! Completions are single-shot channels resolved from runtime tasks, never
//! on the caller's thread. Saves are fire-and-forget: their outcome is only
//! visible through [`MediaEvent`]s.

mod outputs;
mod photo;
mod preview;
mod slot;

pub use outputs::{ConfigurationTransaction, OutputStage};
pub use photo::encode_jpeg;
pub use preview::{PreviewLayer, VideoGravity, source_point};
pub use slot::InputSlot;

use crate::backends::audio::{AudioCategory, AudioDevice, AudioSession};
use crate::backends::camera::{
    CameraBackend, CameraDevice, CameraFormat, DevicePosition, FrameSink, MovieSettings,
    VideoStream,
};
use crate::config::Config;
use crate::constants::{BitratePreset, SessionPreset, format_bitrate, timing};
use crate::errors::{CameraError, CameraResult};
use crate::storage::MediaLibrary;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, warn};

/// Capacity of the media event channel
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Session parameters fixed at initialization
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub preset: SessionPreset,
    pub bitrate_preset: BitratePreset,
    pub initial_position: DevicePosition,
    pub enable_audio: bool,
    pub photo_quality: u8,
    pub recording_dir: PathBuf,
    pub preview_gravity: VideoGravity,
    pub mirror_preview: bool,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            preset: config.session_preset,
            bitrate_preset: config.bitrate_preset,
            initial_position: config.initial_position,
            enable_audio: config.enable_audio,
            photo_quality: config.photo_quality,
            recording_dir: config.recording_dir(),
            preview_gravity: config.preview_gravity,
            mirror_preview: config.mirror_preview,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Outcome of a fire-and-forget save.
///
/// Video outcomes name the recording they finalize, so a waiter can tell
/// its own recording apart from photos or an earlier recording still saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    PhotoSaved(PathBuf),
    PhotoFailed(String),
    VideoSaved { recording: PathBuf, path: PathBuf },
    VideoFailed { recording: PathBuf, reason: String },
}

impl MediaEvent {
    pub fn is_photo(&self) -> bool {
        matches!(self, MediaEvent::PhotoSaved(_) | MediaEvent::PhotoFailed(_))
    }

    /// Recording this event finalizes; `None` for photos
    pub fn recording(&self) -> Option<&Path> {
        match self {
            MediaEvent::VideoSaved { recording, .. } | MediaEvent::VideoFailed { recording, .. } => {
                Some(recording)
            }
            MediaEvent::PhotoSaved(_) | MediaEvent::PhotoFailed(_) => None,
        }
    }
}

/// Recording state machine: `Idle → Recording → Idle`
#[derive(Debug, Clone, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording {
        start_time: Instant,
        file_path: PathBuf,
    },
}

struct ActiveVideoInput {
    device: CameraDevice,
    stream: Box<dyn VideoStream>,
}

#[derive(Default)]
struct SessionState {
    video_input: InputSlot<ActiveVideoInput>,
    audio_input: InputSlot<AudioDevice>,
    audio_session: AudioSession,
    running: bool,
    recording: RecordingState,
}

/// Handle to the capture session. Clones share the same session.
#[derive(Clone)]
pub struct CaptureSessionController {
    state: Arc<Mutex<SessionState>>,
    outputs: Arc<OutputStage>,
    backend: Arc<dyn CameraBackend>,
    library: Arc<MediaLibrary>,
    settings: Arc<SessionSettings>,
    preview: PreviewLayer,
    events: broadcast::Sender<MediaEvent>,
    runtime: Handle,
}

impl CaptureSessionController {
    /// Configure the session and start it in the background.
    ///
    /// Missing devices and inputs that fail to open are logged and leave the
    /// controller in a degraded state; they never fail initialization.
    pub fn initialize(
        backend: Arc<dyn CameraBackend>,
        settings: SessionSettings,
        library: MediaLibrary,
        runtime: Handle,
    ) -> Self {
        let outputs = Arc::new(OutputStage::new());
        let preview = PreviewLayer::new(
            outputs.subscribe_preview(),
            settings.preview_gravity,
            settings.mirror_preview,
        );
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let controller = Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            outputs,
            backend,
            library: Arc::new(library),
            settings: Arc::new(settings),
            preview,
            events,
            runtime,
        };

        controller.configure_session();

        let background = controller.clone();
        controller.runtime.spawn_blocking(move || {
            if let Err(e) = background.start_session() {
                error!(error = %e, "Failed to start capture session");
            }
        });

        controller
    }

    fn configure_session(&self) {
        let format = self.format();
        info!(
            preset = self.settings.preset.display_name(),
            format = %format,
            backend = %self.backend.backend_type(),
            "Configuring capture session"
        );

        let mut state = self.lock_state();

        let camera = self
            .backend
            .camera_at(self.settings.initial_position)
            .or_else(|| self.backend.default_camera());
        match camera {
            Some(device) => match self.backend.open_video_input(&device, &format) {
                Ok(stream) => {
                    info!(device = %device.name, position = %device.position, "Video input attached");
                    if state
                        .video_input
                        .attach(ActiveVideoInput { device, stream })
                        .is_err()
                    {
                        warn!("Session already has a video input");
                    }
                }
                Err(e) => warn!(device = %device.name, error = %e, "Failed to open video input"),
            },
            None => warn!("No camera available, continuing without video input"),
        }

        if self.settings.enable_audio {
            match self.backend.default_audio_device() {
                Some(mic) => match self.backend.open_audio_input(&mic) {
                    Ok(()) => {
                        info!(device = %mic.name, "Audio input attached");
                        if state.audio_input.attach(mic).is_err() {
                            warn!("Session already has an audio input");
                        }
                    }
                    Err(e) => warn!(device = %mic.name, error = %e, "Failed to open audio input"),
                },
                None => warn!("No microphone available, recordings will be silent"),
            }

            let state = &mut *state;
            state.audio_session.set_category(AudioCategory::Record);
            if let Err(e) = state
                .audio_session
                .set_active(true, state.audio_input.get())
            {
                warn!(error = %e, "Failed to activate audio session");
            }
        }

        self.outputs.attach_photo_output();
        self.outputs.attach_movie_output();
    }

    // ===== Session lifecycle =====

    /// Start delivering frames. Does nothing if already running.
    pub fn start_session(&self) -> CameraResult<()> {
        let mut state = self.lock_state();
        if state.running {
            return Ok(());
        }

        let sink = self.frame_sink();
        if let Some(input) = state.video_input.get_mut() {
            input
                .stream
                .start(sink)
                .map_err(|e| CameraError::SessionConfigurationFailed(e.to_string()))?;
        }

        state.running = true;
        info!("Capture session running");
        Ok(())
    }

    /// Stop delivering frames. Does nothing if already stopped.
    pub fn stop_session(&self) {
        let mut state = self.lock_state();
        if !state.running {
            return;
        }
        if let Some(input) = state.video_input.get_mut() {
            input.stream.stop();
        }
        state.running = false;
        info!("Capture session stopped");
    }

    // ===== Device switching =====

    /// Switch to the camera on the other side.
    ///
    /// The new input is opened before the session is touched; if it cannot be
    /// opened, or fails to start, the previous camera stays active.
    pub fn toggle_camera_position(&self) -> CameraResult<DevicePosition> {
        let mut state = self.lock_state();

        let Some(current) = state.video_input.get().map(|input| input.device.clone()) else {
            warn!("Camera toggle requested without a current camera");
            return Err(CameraError::DeviceUnavailable(
                "no camera is attached".to_string(),
            ));
        };
        let target = current.position.toggled();

        // Phase 1: resolve and open without touching the session
        let device = self.backend.camera_at(target).ok_or_else(|| {
            warn!(position = %target, "No camera at requested position");
            CameraError::DeviceUnavailable(format!("no {} camera", target.display_name()))
        })?;
        let mut stream = self
            .backend
            .open_video_input(&device, &self.format())
            .map_err(|e| {
                warn!(device = %device.name, error = %e, "Failed to open camera for toggle");
                CameraError::InputConfigurationFailed(e.to_string())
            })?;

        // Phase 2: swap inside a configuration transaction
        let transaction = ConfigurationTransaction::begin(&self.outputs);
        let Some(mut previous) = state.video_input.detach() else {
            return Err(CameraError::SessionConfigurationFailed(
                "video input vanished during toggle".to_string(),
            ));
        };
        previous.stream.stop();

        if state.running
            && let Err(e) = stream.start(self.frame_sink())
        {
            warn!(device = %device.name, error = %e, "New camera failed to start, restoring previous");
            if let Err(restart) = previous.stream.start(self.frame_sink()) {
                error!(device = %previous.device.name, error = %restart, "Failed to restart previous camera");
            }
            if state.video_input.attach(previous).is_err() {
                error!("Video input slot occupied during rollback");
            }
            return Err(CameraError::InputConfigurationFailed(e.to_string()));
        }

        info!(from = %current.name, to = %device.name, position = %target, "Switched camera");
        if state
            .video_input
            .attach(ActiveVideoInput { device, stream })
            .is_err()
        {
            error!("Video input slot occupied during toggle");
        }
        transaction.commit();
        Ok(target)
    }

    // ===== Photo =====

    /// Request a still photo.
    ///
    /// Resolves `false` only when no video input feeds the photo output.
    /// Otherwise resolves `true` once the request is accepted; the capture
    /// and the save happen afterwards and report through [`MediaEvent`]s.
    pub fn capture_photo(&self) -> oneshot::Receiver<bool> {
        let (done, completion) = oneshot::channel();

        let frame_request = if self.has_video_connection() {
            self.outputs.request_photo_frame()
        } else {
            None
        };
        let Some(frame_request) = frame_request else {
            warn!(error = %CameraError::NoActiveVideoConnection, "Cannot capture photo");
            let _ = done.send(false);
            return completion;
        };

        let library = Arc::clone(&self.library);
        let events = self.events.clone();
        let quality = self.settings.photo_quality;
        self.runtime.spawn(async move {
            let _ = done.send(true);

            let result = async {
                let frame = tokio::time::timeout(timing::PHOTO_FRAME_TIMEOUT, frame_request)
                    .await
                    .map_err(|_| CameraError::SaveFailed("timed out waiting for a frame".into()))?
                    .map_err(|_| CameraError::SaveFailed("capture was cancelled".into()))?;

                let jpeg = tokio::task::spawn_blocking(move || encode_jpeg(&frame, quality))
                    .await
                    .map_err(|e| CameraError::SaveFailed(e.to_string()))??;

                library.save_photo(jpeg).await
            }
            .await;

            let event = match result {
                Ok(path) => MediaEvent::PhotoSaved(path),
                Err(e) => {
                    error!(error = %e, "Failed to capture and save photo");
                    MediaEvent::PhotoFailed(e.to_string())
                }
            };
            let _ = events.send(event);
        });

        completion
    }

    // ===== Video =====

    /// Start recording to a fresh destination in the recording directory
    pub fn start_recording(&self) -> CameraResult<PathBuf> {
        let mut state = self.lock_state();

        if matches!(state.recording, RecordingState::Recording { .. }) {
            warn!("Recording already in progress");
            return Err(CameraError::AlreadyRecording);
        }
        if !self.outputs.has_movie_output() {
            return Err(CameraError::SessionConfigurationFailed(
                "no movie file output".to_string(),
            ));
        }
        if !state.video_input.is_occupied() {
            return Err(CameraError::NoActiveVideoConnection);
        }

        let dir = &self.settings.recording_dir;
        std::fs::create_dir_all(dir)
            .map_err(|e| CameraError::SessionConfigurationFailed(e.to_string()))?;

        let format = self.format();
        let audio = if state.audio_session.is_recording_enabled() {
            state.audio_input.get().cloned()
        } else {
            None
        };
        let movie_settings = MovieSettings {
            output_path: dir.join(format!("video_{}", uuid::Uuid::new_v4())),
            format,
            bitrate_kbps: self.settings.bitrate_preset.bitrate_kbps(format.width),
            audio,
        };

        let writer = self
            .backend
            .create_movie_writer(&movie_settings)
            .map_err(|e| CameraError::SessionConfigurationFailed(e.to_string()))?;
        let file_path = writer.output_path().to_path_buf();
        self.outputs.start_writer(writer);

        info!(
            path = %file_path.display(),
            bitrate = %format_bitrate(movie_settings.bitrate_kbps),
            audio = movie_settings.audio.is_some(),
            "Recording started"
        );
        state.recording = RecordingState::Recording {
            start_time: Instant::now(),
            file_path: file_path.clone(),
        };
        Ok(file_path)
    }

    /// Stop the in-flight recording.
    ///
    /// Always resolves `true`: it reports that the stop was issued, not that
    /// the video was saved. The save outcome arrives as a [`MediaEvent`].
    pub fn stop_recording(&self) -> oneshot::Receiver<bool> {
        let (done, completion) = oneshot::channel();

        let previous = std::mem::take(&mut self.lock_state().recording);
        let RecordingState::Recording {
            start_time,
            file_path,
        } = previous
        else {
            debug!(error = %CameraError::NotRecording, "Stop requested with nothing to stop");
            let _ = done.send(true);
            return completion;
        };

        let writer = self.outputs.take_writer();
        let library = Arc::clone(&self.library);
        let events = self.events.clone();
        info!(path = %file_path.display(), elapsed = ?start_time.elapsed(), "Recording stopped");

        self.runtime.spawn(async move {
            let _ = done.send(true);

            let result = async {
                let writer = writer.ok_or_else(|| {
                    CameraError::SaveFailed("recording had no movie writer".to_string())
                })?;
                let path = tokio::task::spawn_blocking(move || writer.finish())
                    .await
                    .map_err(|e| CameraError::SaveFailed(e.to_string()))?
                    .map_err(|e| CameraError::SaveFailed(e.to_string()))?;
                library.save_video(&path).await
            }
            .await;

            let event = match result {
                Ok(path) => MediaEvent::VideoSaved {
                    recording: file_path,
                    path,
                },
                Err(e) => {
                    error!(error = %e, recording = %file_path.display(), "Failed to record and save video");
                    MediaEvent::VideoFailed {
                        recording: file_path,
                        reason: e.to_string(),
                    }
                }
            };
            let _ = events.send(event);
        });

        completion
    }

    // ===== Queries =====

    pub fn is_running(&self) -> bool {
        self.lock_state().running
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.lock_state().recording, RecordingState::Recording { .. })
    }

    /// Destination of the in-flight recording
    pub fn recording_path(&self) -> Option<PathBuf> {
        match &self.lock_state().recording {
            RecordingState::Recording { file_path, .. } => Some(file_path.clone()),
            RecordingState::Idle => None,
        }
    }

    pub fn recording_elapsed(&self) -> Option<Duration> {
        match &self.lock_state().recording {
            RecordingState::Recording { start_time, .. } => Some(start_time.elapsed()),
            RecordingState::Idle => None,
        }
    }

    pub fn current_device(&self) -> Option<CameraDevice> {
        self.lock_state()
            .video_input
            .get()
            .map(|input| input.device.clone())
    }

    pub fn current_position(&self) -> Option<DevicePosition> {
        self.current_device().map(|device| device.position)
    }

    pub fn has_audio_input(&self) -> bool {
        self.lock_state().audio_input.is_occupied()
    }

    /// A video input is attached and the photo output can receive its frames
    pub fn has_video_connection(&self) -> bool {
        self.lock_state().video_input.is_occupied() && self.outputs.has_photo_output()
    }

    /// Preview layer bound to this session (aspect-fill by default)
    pub fn preview(&self) -> PreviewLayer {
        self.preview.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Stop the in-flight recording and wait until the video is saved (or not)
    pub async fn stop_recording_and_wait(&self) -> Option<MediaEvent> {
        let recording = self.recording_path()?;
        let mut events = self.subscribe();
        let _ = self.stop_recording().await;
        next_recording_outcome(&mut events, &recording).await
    }

    fn format(&self) -> CameraFormat {
        self.settings.preset.format()
    }

    fn frame_sink(&self) -> FrameSink {
        let outputs = Arc::clone(&self.outputs);
        Arc::new(move |frame| outputs.publish(frame))
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wait for the next photo outcome, skipping video events
pub async fn next_photo_outcome(events: &mut broadcast::Receiver<MediaEvent>) -> Option<MediaEvent> {
    next_matching(events, MediaEvent::is_photo).await
}

/// Wait for the outcome of the recording written to `recording`
pub async fn next_recording_outcome(
    events: &mut broadcast::Receiver<MediaEvent>,
    recording: &Path,
) -> Option<MediaEvent> {
    next_matching(events, |event| event.recording() == Some(recording)).await
}

async fn next_matching(
    events: &mut broadcast::Receiver<MediaEvent>,
    wanted: impl Fn(&MediaEvent) -> bool,
) -> Option<MediaEvent> {
    loop {
        match events.recv().await {
            Ok(event) if wanted(&event) => return Some(event),
            Ok(event) => debug!(?event, "Skipping unrelated media event"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Media event subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
