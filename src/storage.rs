// SPDX-License-Identifier: MPL-2.0

//! Media library: where finished photos and videos end up
//!
//! One save call per artifact type. Photos arrive as encoded JPEG bytes and
//! are validated before they touch the disk; videos arrive as a finished file
//! in the recording directory and are moved in.

use crate::config::Config;
use crate::constants::file_formats;
use crate::errors::{CameraError, CameraResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct MediaLibrary {
    photos_dir: PathBuf,
    videos_dir: PathBuf,
}

impl MediaLibrary {
    pub fn new(photos_dir: PathBuf, videos_dir: PathBuf) -> Self {
        Self {
            photos_dir,
            videos_dir,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.photos_dir(), config.videos_dir())
    }

    pub fn photos_dir(&self) -> &Path {
        &self.photos_dir
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    /// Validate and store an encoded JPEG
    pub async fn save_photo(&self, jpeg: Vec<u8>) -> CameraResult<PathBuf> {
        let jpeg = tokio::task::spawn_blocking(move || {
            image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg).map(|_| jpeg)
        })
        .await
        .map_err(|e| CameraError::SaveFailed(format!("Photo validation task failed: {}", e)))??;

        tokio::fs::create_dir_all(&self.photos_dir).await?;
        let path = self.photos_dir.join(timestamped_name("IMG", "jpg"));
        tokio::fs::write(&path, &jpeg).await?;

        info!(path = %path.display(), bytes = jpeg.len(), "Photo saved");
        Ok(path)
    }

    /// Whether a finished recording can go into the library
    pub fn is_video_compatible(path: &Path) -> bool {
        let known_container = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(file_formats::is_video_extension);
        let non_empty = std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0);
        known_container && non_empty
    }

    /// Move a finished recording into the library
    pub async fn save_video(&self, source: &Path) -> CameraResult<PathBuf> {
        if !Self::is_video_compatible(source) {
            return Err(CameraError::SaveFailed(format!(
                "{} is not a compatible video",
                source.display()
            )));
        }

        let ext = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("mp4")
            .to_lowercase();

        tokio::fs::create_dir_all(&self.videos_dir).await?;
        let dest = self.videos_dir.join(timestamped_name("VID", &ext));

        if let Err(e) = tokio::fs::rename(source, &dest).await {
            // Temp dir and library are often on different filesystems
            debug!(error = %e, "Rename failed, copying instead");
            tokio::fs::copy(source, &dest).await?;
            if let Err(e) = tokio::fs::remove_file(source).await {
                warn!(path = %source.display(), error = %e, "Failed to remove recording after copy");
            }
        }

        info!(path = %dest.display(), "Video saved");
        Ok(dest)
    }
}

fn timestamped_name(prefix: &str, ext: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}_{}.{}", prefix, timestamp, &id[..8], ext)
}
