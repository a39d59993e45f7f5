// SPDX-License-Identifier: MPL-2.0

//! Preview layer bound to the capture session
//!
//! The layer only holds a receiver of the latest frame plus the presentation
//! settings; mapping surface coordinates back to frame pixels is done by
//! [`source_point`], which the terminal renderer calls per cell.

use crate::backends::camera::CameraFrame;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// How the frame is fitted into the preview surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoGravity {
    /// Keep aspect ratio, letterbox to fit
    ResizeAspect,
    /// Keep aspect ratio, crop to fill
    #[default]
    ResizeAspectFill,
    /// Stretch to the surface
    Resize,
}

impl VideoGravity {
    pub fn next(self) -> Self {
        match self {
            VideoGravity::ResizeAspect => VideoGravity::ResizeAspectFill,
            VideoGravity::ResizeAspectFill => VideoGravity::Resize,
            VideoGravity::Resize => VideoGravity::ResizeAspect,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            VideoGravity::ResizeAspect => "Fit",
            VideoGravity::ResizeAspectFill => "Fill",
            VideoGravity::Resize => "Stretch",
        }
    }
}

#[derive(Clone)]
pub struct PreviewLayer {
    frames: watch::Receiver<Option<CameraFrame>>,
    gravity: VideoGravity,
    mirrored: bool,
}

impl PreviewLayer {
    pub fn new(
        frames: watch::Receiver<Option<CameraFrame>>,
        gravity: VideoGravity,
        mirrored: bool,
    ) -> Self {
        Self {
            frames,
            gravity,
            mirrored,
        }
    }

    /// Most recent frame, if the session has produced one
    pub fn latest_frame(&self) -> Option<CameraFrame> {
        self.frames.borrow().clone()
    }

    /// Whether a frame arrived since the last [`latest_frame_if_new`](Self::latest_frame_if_new)
    pub fn has_new_frame(&self) -> bool {
        self.frames.has_changed().unwrap_or(false)
    }

    pub fn latest_frame_if_new(&mut self) -> Option<CameraFrame> {
        if !self.has_new_frame() {
            return None;
        }
        self.frames.borrow_and_update().clone()
    }

    pub fn gravity(&self) -> VideoGravity {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: VideoGravity) {
        self.gravity = gravity;
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    pub fn set_mirrored(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }
}

/// Map a point on the surface to the frame pixel shown there.
///
/// `surface` and `frame` are `(width, height)`. Returns `None` for points in
/// the letterbox area of [`VideoGravity::ResizeAspect`].
pub fn source_point(
    gravity: VideoGravity,
    mirrored: bool,
    frame: (u32, u32),
    surface: (u32, u32),
    x: u32,
    y: u32,
) -> Option<(u32, u32)> {
    let (fw, fh) = (frame.0 as f32, frame.1 as f32);
    let (sw, sh) = (surface.0 as f32, surface.1 as f32);
    if fw <= 0.0 || fh <= 0.0 || sw <= 0.0 || sh <= 0.0 {
        return None;
    }

    let x = if mirrored {
        surface.0.saturating_sub(1).saturating_sub(x)
    } else {
        x
    };
    // Sample at pixel centers
    let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);

    let (scale_x, scale_y) = match gravity {
        VideoGravity::Resize => (sw / fw, sh / fh),
        VideoGravity::ResizeAspect => {
            let s = (sw / fw).min(sh / fh);
            (s, s)
        }
        VideoGravity::ResizeAspectFill => {
            let s = (sw / fw).max(sh / fh);
            (s, s)
        }
    };

    let offset_x = (sw - fw * scale_x) / 2.0;
    let offset_y = (sh - fh * scale_y) / 2.0;
    let src_x = (px - offset_x) / scale_x;
    let src_y = (py - offset_y) / scale_y;

    if src_x < 0.0 || src_y < 0.0 || src_x >= fw || src_y >= fh {
        return None;
    }
    Some((src_x as u32, src_y as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stretch_maps_corners() {
        let g = VideoGravity::Resize;
        assert_eq!(source_point(g, false, (40, 20), (10, 10), 0, 0), Some((2, 1)));
        assert_eq!(source_point(g, false, (40, 20), (10, 10), 9, 9), Some((38, 19)));
    }

    #[test]
    fn test_aspect_fit_letterboxes() {
        // 2:1 frame in a square surface leaves bands top and bottom
        let g = VideoGravity::ResizeAspect;
        assert_eq!(source_point(g, false, (200, 100), (100, 100), 50, 0), None);
        assert!(source_point(g, false, (200, 100), (100, 100), 50, 50).is_some());
    }

    #[test]
    fn test_aspect_fill_crops_sides() {
        // 2:1 frame filling a square surface shows only the middle half
        let g = VideoGravity::ResizeAspectFill;
        let (left, _) = source_point(g, false, (200, 100), (100, 100), 0, 50).unwrap();
        let (right, _) = source_point(g, false, (200, 100), (100, 100), 99, 50).unwrap();
        assert_eq!(left, 50);
        assert_eq!(right, 149);
    }

    #[test]
    fn test_mirroring_flips_horizontally() {
        let g = VideoGravity::Resize;
        let plain = source_point(g, false, (10, 10), (10, 10), 0, 0);
        let mirrored = source_point(g, true, (10, 10), (10, 10), 9, 0);
        assert_eq!(plain, mirrored);
    }
}
