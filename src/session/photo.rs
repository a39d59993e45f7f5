// SPDX-License-Identifier: GPL-3.0-only

//! Still photo encoding

use crate::backends::camera::CameraFrame;
use crate::errors::{CameraError, CameraResult};
use image::codecs::jpeg::JpegEncoder;
use tracing::debug;

/// Encode a captured frame as JPEG.
///
/// Alpha is dropped; JPEG has no use for it.
pub fn encode_jpeg(frame: &CameraFrame, quality: u8) -> CameraResult<Vec<u8>> {
    let rgba = frame
        .to_rgba_image()
        .ok_or_else(|| CameraError::SaveFailed("Captured frame is malformed".to_string()))?;
    let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100)).encode_image(&rgb)?;

    debug!(
        width = frame.width,
        height = frame.height,
        quality,
        bytes = jpeg.len(),
        "Encoded photo"
    );
    Ok(jpeg)
}
