// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::{CameraBackendType, DevicePosition};
use crate::constants::{BitratePreset, DEFAULT_PHOTO_QUALITY, DEFAULT_SAVE_FOLDER, SessionPreset};
use crate::errors::AppResult;
use crate::session::VideoGravity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the directory under the user's config dir
const CONFIG_DIR_NAME: &str = "camera-demo";
const CONFIG_FILE_NAME: &str = "config.json";

/// User configuration, stored as JSON.
///
/// Missing fields take their defaults, so older files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera backend to use
    pub backend: CameraBackendType,
    /// Capture quality preset
    pub session_preset: SessionPreset,
    /// Video encoder bitrate preset (Low, Medium, High)
    pub bitrate_preset: BitratePreset,
    /// Camera the session starts with
    pub initial_position: DevicePosition,
    /// Attach the default microphone and record audio with videos
    pub enable_audio: bool,
    /// Mirror camera preview horizontally (selfie mode)
    pub mirror_preview: bool,
    /// How the preview fills the surface
    pub preview_gravity: VideoGravity,
    /// Folder name under Pictures/Videos
    pub save_folder: String,
    /// JPEG quality (1-100)
    pub photo_quality: u8,
    /// Where in-flight recordings are written; OS temp dir when unset
    pub recording_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            session_preset: SessionPreset::default(),
            bitrate_preset: BitratePreset::default(),
            initial_position: DevicePosition::Back,
            enable_audio: true,
            mirror_preview: true, // Default to mirrored (selfie mode)
            preview_gravity: VideoGravity::default(),
            save_folder: DEFAULT_SAVE_FOLDER.to_string(),
            photo_quality: DEFAULT_PHOTO_QUALITY,
            recording_dir: None,
        }
    }
}

impl Config {
    /// `<config_dir>/camera-demo/config.json`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_or_default(&path),
            None => {
                warn!("No config directory available, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing or unreadable file yields defaults
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config.sanitized())
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Directory photos are saved to
    pub fn photos_dir(&self) -> PathBuf {
        dirs::picture_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join(&self.save_folder)
    }

    /// Directory finished videos are moved to
    pub fn videos_dir(&self) -> PathBuf {
        dirs::video_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join(&self.save_folder)
    }

    /// Directory in-flight recordings are written to
    pub fn recording_dir(&self) -> PathBuf {
        self.recording_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    fn sanitized(mut self) -> Self {
        self.photo_quality = self.photo_quality.clamp(1, 100);
        if self.save_folder.trim().is_empty() {
            self.save_folder = DEFAULT_SAVE_FOLDER.to_string();
        }
        self
    }
}
