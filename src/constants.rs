// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use crate::backends::camera::types::{CameraFormat, Framerate};
use serde::{Deserialize, Serialize};

/// Capture quality preset applied to the session
///
/// Mirrors the usual low/medium/high presets of mobile capture frameworks.
/// Every preset captures at 30 fps; only the frame size changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPreset {
    /// 640x480
    Low,
    /// 1280x720
    Medium,
    /// 1920x1080 (default)
    #[default]
    High,
}

impl SessionPreset {
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionPreset::Low => "Low",
            SessionPreset::Medium => "Medium",
            SessionPreset::High => "High",
        }
    }

    /// Format requested from video inputs under this preset
    pub fn format(&self) -> CameraFormat {
        let (width, height) = match self {
            SessionPreset::Low => (640, 480),
            SessionPreset::Medium => (1280, 720),
            SessionPreset::High => (1920, 1080),
        };
        CameraFormat {
            width,
            height,
            framerate: Framerate::from_int(30),
        }
    }
}

/// Video encoder bitrate presets
///
/// These presets define the target bitrate for video encoding based on resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitratePreset {
    /// Low bitrate - smaller files, reduced quality
    Low,
    /// Medium bitrate - balanced quality and file size (default)
    #[default]
    Medium,
    /// High bitrate - larger files, better quality
    High,
}

impl BitratePreset {
    pub fn display_name(&self) -> &'static str {
        match self {
            BitratePreset::Low => "Low",
            BitratePreset::Medium => "Medium",
            BitratePreset::High => "High",
        }
    }

    /// Get bitrate in kbps for a given frame width
    ///
    /// - SD (640x480): Low=1, Medium=2, High=4 Mbps
    /// - HD (1280x720): Low=2.5, Medium=5, High=10 Mbps
    /// - Full HD (1920x1080): Low=4, Medium=8, High=16 Mbps
    /// - 4K (3840x2160): Low=15, Medium=30, High=50 Mbps
    pub fn bitrate_kbps(&self, width: u32) -> u32 {
        match (get_resolution_tier(width), self) {
            (ResolutionTier::SD, BitratePreset::Low) => 1_000,
            (ResolutionTier::SD, BitratePreset::Medium) => 2_000,
            (ResolutionTier::SD, BitratePreset::High) => 4_000,
            (ResolutionTier::HD, BitratePreset::Low) => 2_500,
            (ResolutionTier::HD, BitratePreset::Medium) => 5_000,
            (ResolutionTier::HD, BitratePreset::High) => 10_000,
            (ResolutionTier::FullHD, BitratePreset::Low) => 4_000,
            (ResolutionTier::FullHD, BitratePreset::Medium) => 8_000,
            (ResolutionTier::FullHD, BitratePreset::High) => 16_000,
            (ResolutionTier::FourK, BitratePreset::Low) => 15_000,
            (ResolutionTier::FourK, BitratePreset::Medium) => 30_000,
            (ResolutionTier::FourK, BitratePreset::High) => 50_000,
        }
    }
}

/// Resolution tiers for bitrate calculation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    /// 640x480 and below
    SD,
    /// 1280x720
    HD,
    /// 1920x1080 up to 2K
    FullHD,
    /// 3840x2160 and above
    FourK,
}

/// Get the resolution tier for a given width
pub fn get_resolution_tier(width: u32) -> ResolutionTier {
    match width {
        w if w >= 3840 => ResolutionTier::FourK,
        w if w >= 1920 => ResolutionTier::FullHD,
        w if w >= 1280 => ResolutionTier::HD,
        _ => ResolutionTier::SD,
    }
}

/// Format bitrate for display (e.g., "8 Mbps" or "2.5 Mbps")
pub fn format_bitrate(kbps: u32) -> String {
    let mbps = kbps as f64 / 1000.0;
    if mbps == mbps.floor() {
        format!("{} Mbps", mbps as u32)
    } else {
        format!("{:.1} Mbps", mbps)
    }
}

/// Folder created under the user's Pictures and Videos directories
pub const DEFAULT_SAVE_FOLDER: &str = "Camera";

/// JPEG quality used for saved photos
pub const DEFAULT_PHOTO_QUALITY: u8 = 92;

/// Timing constants
pub mod timing {
    use std::time::Duration;

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 30;

    /// How long a freshly started pipeline is watched for immediate errors
    pub const STATE_CHANGE_TIMEOUT_MS: u64 = 50;

    /// Upper bound for a recording pipeline to drain after end-of-stream
    pub const EOS_TIMEOUT_SECS: u64 = 5;

    /// How long a photo request waits for the next frame
    pub const PHOTO_FRAME_TIMEOUT: Duration = Duration::from_secs(3);

    /// Terminal input poll interval (~60 fps redraw)
    pub const UI_POLL_INTERVAL: Duration = Duration::from_millis(16);
}

/// Recognised output file formats
pub mod file_formats {
    /// Containers accepted into the video library
    pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "y4m"];

    /// Check if a file extension is a supported video format
    pub fn is_video_extension(ext: &str) -> bool {
        VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application information utilities
pub mod app_info {
    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_tiers() {
        assert_eq!(get_resolution_tier(3840), ResolutionTier::FourK);
        assert_eq!(get_resolution_tier(2560), ResolutionTier::FullHD);
        assert_eq!(get_resolution_tier(1280), ResolutionTier::HD);
        assert_eq!(get_resolution_tier(320), ResolutionTier::SD);
    }

    #[test]
    fn test_video_extensions_case_insensitive() {
        assert!(file_formats::is_video_extension("MP4"));
        assert!(file_formats::is_video_extension("y4m"));
        assert!(!file_formats::is_video_extension("jpg"));
    }
}
