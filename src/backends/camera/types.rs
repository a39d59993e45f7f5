// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CameraBackendType {
    /// GStreamer device monitor + appsink/appsrc pipelines
    #[default]
    GStreamer,
    /// Synthetic test-pattern cameras, no hardware required
    Virtual,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::GStreamer => write!(f, "GStreamer"),
            CameraBackendType::Virtual => write!(f, "virtual"),
        }
    }
}

/// Which way a camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DevicePosition {
    /// Facing the user
    Front,
    /// Facing away from the user
    #[default]
    Back,
    /// Location not reported by the device
    Unspecified,
}

impl DevicePosition {
    /// Position a camera toggle switches to.
    ///
    /// Back goes to front; front and unspecified both go to back.
    pub fn toggled(self) -> Self {
        match self {
            DevicePosition::Back => DevicePosition::Front,
            DevicePosition::Front | DevicePosition::Unspecified => DevicePosition::Back,
        }
    }

    /// Parse a location string as reported by libcamera/PipeWire
    pub fn from_location(location: &str) -> Self {
        match location.trim().to_ascii_lowercase().as_str() {
            "front" | "user" => DevicePosition::Front,
            "back" | "rear" | "environment" => DevicePosition::Back,
            _ => DevicePosition::Unspecified,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DevicePosition::Front => "Front",
            DevicePosition::Back => "Back",
            DevicePosition::Unspecified => "Unspecified",
        }
    }
}

impl std::fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    pub name: String,
    /// Backend-specific identifier (device node, PipeWire serial, virtual id)
    pub path: String,
    pub position: DevicePosition,
}

/// Fill in positions the devices did not report themselves.
///
/// Desktop machines rarely expose a location. The first camera without one is
/// treated as front-facing (built-in webcams look at the user), the next one
/// as back-facing; anything after that stays unspecified. Positions already
/// claimed by a device that did report its location are never handed out
/// twice.
pub fn assign_positions(devices: &mut [CameraDevice]) {
    let mut front_taken = devices.iter().any(|d| d.position == DevicePosition::Front);
    let mut back_taken = devices.iter().any(|d| d.position == DevicePosition::Back);

    for device in devices
        .iter_mut()
        .filter(|d| d.position == DevicePosition::Unspecified)
    {
        if !front_taken {
            device.position = DevicePosition::Front;
            front_taken = true;
        } else if !back_taken {
            device.position = DevicePosition::Back;
            back_taken = true;
        }
    }
}

/// Framerate as a fraction (numerator/denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    pub fn from_int(fps: u32) -> Self {
        Self { num: fps, denom: 1 }
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    /// Duration of a single frame in nanoseconds
    pub fn frame_duration_ns(&self) -> u64 {
        if self.num == 0 {
            return 0;
        }
        1_000_000_000u64 * self.denom as u64 / self.num as u64
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denom != 1 {
            write!(f, "{:.2}", self.as_f64())
        } else {
            write!(f, "{}", self.num)
        }
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self { num: 30, denom: 1 }
    }
}

/// Camera format requested from a video input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub framerate: Framerate,
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} @ {}fps", self.width, self.height, self.framerate)
    }
}

/// A single RGBA frame from a video input
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA pixels, `stride` bytes per row
    pub data: Arc<[u8]>,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// When the frame left the device
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap tightly packed RGBA bytes
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    /// RGB value at (x, y), clamped to the frame bounds
    pub fn rgb_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        if self.width == 0 || self.height == 0 {
            return (0, 0, 0);
        }
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        let idx = (y * self.stride + x * 4) as usize;
        match self.data.get(idx..idx + 3) {
            Some(px) => (px[0], px[1], px[2]),
            None => (0, 0, 0),
        }
    }

    /// Copy into a tightly packed RGBA image, dropping row padding
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        let row_bytes = (self.width * 4) as usize;
        let stride = self.stride as usize;
        if stride < row_bytes || self.data.len() < stride * self.height.saturating_sub(1) as usize + row_bytes {
            return None;
        }

        let packed = if stride == row_bytes {
            self.data[..row_bytes * self.height as usize].to_vec()
        } else {
            let mut packed = Vec::with_capacity(row_bytes * self.height as usize);
            for row in self.data.chunks(stride).take(self.height as usize) {
                packed.extend_from_slice(&row[..row_bytes]);
            }
            packed
        };

        image::RgbaImage::from_raw(self.width, self.height, packed)
    }
}

/// Callback invoked by a video input for every frame it produces.
///
/// Backends call this from their own threads (GStreamer streaming thread,
/// virtual camera thread), never from the UI context.
pub type FrameSink = Arc<dyn Fn(CameraFrame) + Send + Sync + 'static>;

/// Parameters for a movie writer
#[derive(Debug, Clone)]
pub struct MovieSettings {
    /// Destination without extension; the writer picks the container extension
    pub output_path: PathBuf,
    pub format: CameraFormat,
    /// Target video bitrate; writers without rate control ignore it
    pub bitrate_kbps: u32,
    /// Microphone to mux in, if the session has an audio input
    pub audio: Option<crate::backends::audio::AudioDevice>,
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Failed to initialize backend or pipeline
    InitializationFailed(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// Writing a recording failed
    RecordingFailed(String),
    /// General I/O error
    IoError(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::RecordingFailed(msg) => write!(f, "Recording failed: {}", msg),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::IoError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(path: &str, position: DevicePosition) -> CameraDevice {
        CameraDevice {
            name: path.to_string(),
            path: path.to_string(),
            position,
        }
    }

    #[test]
    fn test_toggle_positions() {
        assert_eq!(DevicePosition::Back.toggled(), DevicePosition::Front);
        assert_eq!(DevicePosition::Front.toggled(), DevicePosition::Back);
        assert_eq!(DevicePosition::Unspecified.toggled(), DevicePosition::Back);
    }

    #[test]
    fn test_location_parsing() {
        assert_eq!(DevicePosition::from_location("front"), DevicePosition::Front);
        assert_eq!(DevicePosition::from_location(" Back "), DevicePosition::Back);
        assert_eq!(
            DevicePosition::from_location("external"),
            DevicePosition::Unspecified
        );
    }

    #[test]
    fn test_assign_positions_fills_unreported() {
        let mut devices = vec![
            device("a", DevicePosition::Unspecified),
            device("b", DevicePosition::Unspecified),
            device("c", DevicePosition::Unspecified),
        ];
        assign_positions(&mut devices);
        assert_eq!(devices[0].position, DevicePosition::Front);
        assert_eq!(devices[1].position, DevicePosition::Back);
        assert_eq!(devices[2].position, DevicePosition::Unspecified);
    }

    #[test]
    fn test_assign_positions_respects_reported() {
        let mut devices = vec![
            device("a", DevicePosition::Unspecified),
            device("b", DevicePosition::Front),
        ];
        assign_positions(&mut devices);
        assert_eq!(devices[0].position, DevicePosition::Back);
        assert_eq!(devices[1].position, DevicePosition::Front);
    }

    #[test]
    fn test_frame_to_image_strips_padding() {
        // 2x2 frame with 4 bytes of padding per row
        let mut data = vec![0u8; 12 * 2];
        data[0..4].copy_from_slice(&[10, 20, 30, 255]);
        data[12..16].copy_from_slice(&[40, 50, 60, 255]);
        let frame = CameraFrame {
            width: 2,
            height: 2,
            data: Arc::from(data.into_boxed_slice()),
            stride: 12,
            captured_at: Instant::now(),
        };

        let image = frame.to_rgba_image().unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(image.get_pixel(0, 1).0, [40, 50, 60, 255]);
        assert_eq!(frame.rgb_at(5, 5), frame.rgb_at(1, 1));
    }

    #[test]
    fn test_framerate_duration() {
        assert_eq!(Framerate::from_int(25).frame_duration_ns(), 40_000_000);
        assert_eq!(Framerate::new(30, 0).denom, 1);
    }
}
