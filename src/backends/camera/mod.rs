// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │ CaptureSessionController │  ← session, inputs, outputs
//! └────────────┬─────────────┘
//!              │
//!              ▼
//! ┌──────────────────────────┐
//! │   CameraBackend trait    │  ← devices, video inputs, movie writers
//! └────────────┬─────────────┘
//!              │
//!        ┌─────┴──────┐
//!        ▼            ▼
//!   ┌─────────┐  ┌─────────┐
//!   │GStreamer│  │ Virtual │
//!   └─────────┘  └─────────┘
//! ```

pub mod gstreamer_backend;
pub mod types;
pub mod virtual_camera;

pub use types::*;

use crate::backends::audio::AudioDevice;
use std::path::Path;
use std::sync::Arc;

/// Platform capture framework as seen by the capture session
pub trait CameraBackend: Send + Sync {
    // ===== Devices =====

    /// Enumerate available cameras, with positions filled in
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// The camera used when nothing more specific is requested
    fn default_camera(&self) -> Option<CameraDevice> {
        self.enumerate_cameras().into_iter().next()
    }

    /// Resolve the camera at a given position
    fn camera_at(&self, position: DevicePosition) -> Option<CameraDevice> {
        self.enumerate_cameras()
            .into_iter()
            .find(|camera| camera.position == position)
    }

    /// The default microphone, if any
    fn default_audio_device(&self) -> Option<AudioDevice>;

    // ===== Inputs =====

    /// Open a video input for a camera.
    ///
    /// The returned stream is idle; nothing is captured until
    /// [`VideoStream::start`] is called.
    fn open_video_input(
        &self,
        device: &CameraDevice,
        format: &CameraFormat,
    ) -> BackendResult<Box<dyn VideoStream>>;

    /// Check that a microphone can be opened for recording
    fn open_audio_input(&self, device: &AudioDevice) -> BackendResult<()>;

    // ===== Outputs =====

    /// Create a writer for a new recording.
    ///
    /// The writer appends its container extension to
    /// [`MovieSettings::output_path`].
    fn create_movie_writer(&self, settings: &MovieSettings) -> BackendResult<Box<dyn MovieWriter>>;

    // ===== Metadata =====

    fn backend_type(&self) -> CameraBackendType;

    /// Check if this backend is usable on the current system
    fn is_available(&self) -> bool;
}

/// A camera feed attached to the session
pub trait VideoStream: Send {
    /// Start delivering frames to `sink`
    fn start(&mut self, sink: FrameSink) -> BackendResult<()>;

    /// Stop delivering frames. Stopping an idle stream does nothing.
    fn stop(&mut self);

    fn is_running(&self) -> bool;
}

/// Destination of a single recording
pub trait MovieWriter: Send {
    /// Final path of the file being written
    fn output_path(&self) -> &Path;

    fn write_frame(&mut self, frame: &CameraFrame) -> BackendResult<()>;

    /// Flush and close the file
    fn finish(self: Box<Self>) -> BackendResult<std::path::PathBuf>;
}

/// Get a concrete backend instance for the given type
pub fn get_backend_for_type(backend_type: CameraBackendType) -> Arc<dyn CameraBackend> {
    match backend_type {
        CameraBackendType::GStreamer => Arc::new(gstreamer_backend::GStreamerBackend::new()),
        CameraBackendType::Virtual => Arc::new(virtual_camera::VirtualBackend::new()),
    }
}
