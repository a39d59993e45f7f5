// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera demo

use crate::backends::camera::types::BackendError;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for capture session operations
pub type CameraResult<T> = Result<T, CameraError>;

/// Top-level application error
#[derive(Debug, Clone)]
pub enum AppError {
    /// Capture session errors
    Camera(CameraError),
    /// Backend errors that happened outside a session operation
    Backend(BackendError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Errors raised by the capture session controller
///
/// Only [`CameraError::NoActiveVideoConnection`] ever reaches the
/// presentation layer (as a failed photo completion). Everything else is
/// logged where it happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// No camera (or microphone) could be resolved for the request
    DeviceUnavailable(String),
    /// A device was found but its input could not be opened or attached
    InputConfigurationFailed(String),
    /// The session itself could not be (re)configured or started
    SessionConfigurationFailed(String),
    /// The photo output has no video input feeding it
    NoActiveVideoConnection,
    /// Saving an artifact to the media library failed
    SaveFailed(String),
    /// A recording is already in flight
    AlreadyRecording,
    /// Stop was requested with no recording in flight
    NotRecording,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Backend(e) => write!(f, "Backend error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::DeviceUnavailable(msg) => write!(f, "Device unavailable: {}", msg),
            CameraError::InputConfigurationFailed(msg) => {
                write!(f, "Input configuration failed: {}", msg)
            }
            CameraError::SessionConfigurationFailed(msg) => {
                write!(f, "Session configuration failed: {}", msg)
            }
            CameraError::NoActiveVideoConnection => write!(f, "No active video connection"),
            CameraError::SaveFailed(msg) => write!(f, "Save failed: {}", msg),
            CameraError::AlreadyRecording => write!(f, "Recording already in progress"),
            CameraError::NotRecording => write!(f, "No recording in progress"),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        AppError::Backend(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::SaveFailed(err.to_string())
    }
}

impl From<image::ImageError> for CameraError {
    fn from(err: image::ImageError) -> Self {
        CameraError::SaveFailed(err.to_string())
    }
}
