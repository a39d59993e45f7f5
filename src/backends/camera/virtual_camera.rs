// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera backend
//!
//! Synthetic cameras that render an animated test pattern on a background
//! thread, plus a movie writer producing uncompressed YUV4MPEG2 files. Used
//! when no camera hardware is present and throughout the test suite.

use super::types::*;
use super::{CameraBackend, MovieWriter, VideoStream};
use crate::backends::audio::AudioDevice;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const FRONT_CAMERA_PATH: &str = "virtual:front";
pub const BACK_CAMERA_PATH: &str = "virtual:back";

pub struct VirtualBackend {
    cameras: Vec<CameraDevice>,
    audio: Option<AudioDevice>,
    /// Device paths whose inputs refuse to open
    fail_open: Mutex<HashSet<String>>,
    /// Device paths whose streams refuse to start
    fail_start: Mutex<HashSet<String>>,
}

impl VirtualBackend {
    /// A front camera, a back camera and a microphone
    pub fn new() -> Self {
        let cameras = vec![
            CameraDevice {
                name: "Virtual Front Camera".to_string(),
                path: FRONT_CAMERA_PATH.to_string(),
                position: DevicePosition::Front,
            },
            CameraDevice {
                name: "Virtual Back Camera".to_string(),
                path: BACK_CAMERA_PATH.to_string(),
                position: DevicePosition::Back,
            },
        ];
        let audio = AudioDevice {
            name: "Virtual Microphone".to_string(),
            serial: "0".to_string(),
            node_name: "virtual_mic".to_string(),
            is_default: true,
        };
        Self::with_devices(cameras, Some(audio))
    }

    /// Custom device set; positions are filled in like real hardware
    pub fn with_devices(mut cameras: Vec<CameraDevice>, audio: Option<AudioDevice>) -> Self {
        assign_positions(&mut cameras);
        Self {
            cameras,
            audio,
            fail_open: Mutex::new(HashSet::new()),
            fail_start: Mutex::new(HashSet::new()),
        }
    }

    /// Make opening the camera at `path` fail, as a busy device would
    pub fn fail_on_open(&self, path: &str) {
        self.fail_open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string());
    }

    /// Make streams for the camera at `path` fail when started
    pub fn fail_on_start(&self, path: &str) {
        self.fail_start
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string());
    }

    /// Undo [`fail_on_open`](Self::fail_on_open) and [`fail_on_start`](Self::fail_on_start)
    pub fn clear_failures(&self) {
        self.fail_open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.fail_start
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for VirtualBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for VirtualBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        self.cameras.clone()
    }

    fn default_audio_device(&self) -> Option<AudioDevice> {
        self.audio.clone()
    }

    fn open_video_input(
        &self,
        device: &CameraDevice,
        format: &CameraFormat,
    ) -> BackendResult<Box<dyn VideoStream>> {
        let index = self
            .cameras
            .iter()
            .position(|c| c.path == device.path)
            .ok_or_else(|| BackendError::DeviceNotFound(device.name.clone()))?;

        if self
            .fail_open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&device.path)
        {
            return Err(BackendError::InitializationFailed(format!(
                "{} is busy",
                device.name
            )));
        }

        let fail_start = self
            .fail_start
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&device.path);

        Ok(Box::new(VirtualStream {
            name: device.name.clone(),
            format: *format,
            pattern_seed: index as u32,
            fail_start,
            running: None,
        }))
    }

    fn open_audio_input(&self, device: &AudioDevice) -> BackendResult<()> {
        match &self.audio {
            Some(audio) if audio.serial == device.serial => Ok(()),
            _ => Err(BackendError::DeviceNotFound(device.name.clone())),
        }
    }

    fn create_movie_writer(&self, settings: &MovieSettings) -> BackendResult<Box<dyn MovieWriter>> {
        Ok(Box::new(Y4mWriter::create(settings)?))
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Virtual
    }

    fn is_available(&self) -> bool {
        true
    }
}

struct RunningStream {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Test-pattern video input
pub struct VirtualStream {
    name: String,
    format: CameraFormat,
    pattern_seed: u32,
    fail_start: bool,
    running: Option<RunningStream>,
}

impl VideoStream for VirtualStream {
    fn start(&mut self, sink: FrameSink) -> BackendResult<()> {
        if self.running.is_some() {
            return Ok(());
        }
        if self.fail_start {
            return Err(BackendError::InitializationFailed(format!(
                "{} stopped responding",
                self.name
            )));
        }

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let format = self.format;
        let seed = self.pattern_seed;
        let interval = Duration::from_nanos(format.framerate.frame_duration_ns().max(1_000_000));

        let thread = std::thread::Builder::new()
            .name(format!("virtual-camera-{}", seed))
            .spawn(move || {
                let mut frame_index = 0u32;
                while !stop_flag.load(Ordering::Acquire) {
                    let started = Instant::now();
                    sink(render_test_pattern(format.width, format.height, seed, frame_index));
                    frame_index = frame_index.wrapping_add(1);
                    if let Some(remaining) = interval.checked_sub(started.elapsed()) {
                        std::thread::sleep(remaining);
                    }
                }
            })
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        info!(device = %self.name, format = %self.format, "Virtual camera started");
        self.running = Some(RunningStream { stop, thread });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.stop.store(true, Ordering::Release);
            if running.thread.join().is_err() {
                warn!(device = %self.name, "Virtual camera thread panicked");
            }
            debug!(device = %self.name, "Virtual camera stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

impl Drop for VirtualStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Diagonal color bands scrolling one pixel per frame.
///
/// Each camera gets its own base tint so switching is visible.
pub fn render_test_pattern(width: u32, height: u32, seed: u32, frame_index: u32) -> CameraFrame {
    let tint: [u8; 3] = match seed % 3 {
        0 => [255, 140, 60],
        1 => [60, 140, 255],
        _ => [120, 255, 120],
    };

    let mut data = vec![0u8; (width * height * 4) as usize];
    for (i, pixel) in data.chunks_exact_mut(4).enumerate() {
        let x = i as u32 % width.max(1);
        let y = i as u32 / width.max(1);
        let band = (x.wrapping_add(y).wrapping_add(frame_index) / 16) % 8;
        let level = 64 + band * 24;
        pixel[0] = (tint[0] as u32 * level / 255) as u8;
        pixel[1] = (tint[1] as u32 * level / 255) as u8;
        pixel[2] = (tint[2] as u32 * level / 255) as u8;
        pixel[3] = 255;
    }

    CameraFrame::from_rgba(width, height, data)
}

/// Uncompressed YUV4MPEG2 (4:4:4) movie writer
pub struct Y4mWriter {
    out: BufWriter<File>,
    output_path: PathBuf,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl Y4mWriter {
    pub fn create(settings: &MovieSettings) -> BackendResult<Self> {
        let output_path = settings.output_path.with_extension("y4m");
        let format = settings.format;

        let mut out = BufWriter::new(File::create(&output_path)?);
        writeln!(
            out,
            "YUV4MPEG2 W{} H{} F{}:{} Ip A1:1 C444",
            format.width, format.height, format.framerate.num, format.framerate.denom
        )?;

        if settings.audio.is_some() {
            debug!("YUV4MPEG2 has no audio track, recording video only");
        }
        info!(path = %output_path.display(), format = %format, "Y4M writer started");

        Ok(Self {
            out,
            output_path,
            width: format.width,
            height: format.height,
            frames_written: 0,
        })
    }
}

impl MovieWriter for Y4mWriter {
    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn write_frame(&mut self, frame: &CameraFrame) -> BackendResult<()> {
        if frame.width != self.width || frame.height != self.height {
            return Ok(());
        }

        let pixels = (self.width * self.height) as usize;
        let mut planes = vec![0u8; pixels * 3];
        let (y_plane, chroma) = planes.split_at_mut(pixels);
        let (u_plane, v_plane) = chroma.split_at_mut(pixels);

        for y in 0..self.height {
            for x in 0..self.width {
                let (r, g, b) = frame.rgb_at(x, y);
                let (yy, u, v) = rgb_to_yuv(r, g, b);
                let idx = (y * self.width + x) as usize;
                y_plane[idx] = yy;
                u_plane[idx] = u;
                v_plane[idx] = v;
            }
        }

        self.out.write_all(b"FRAME\n")?;
        self.out.write_all(&planes)?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> BackendResult<PathBuf> {
        self.out.flush()?;
        if self.frames_written == 0 {
            return Err(BackendError::RecordingFailed(
                "No frames were recorded".to_string(),
            ));
        }
        info!(path = %self.output_path.display(), frames = self.frames_written, "Y4M writer finished");
        Ok(self.output_path.clone())
    }
}

/// BT.601 full-range conversion
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let u = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let v = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    (
        y.round().clamp(0.0, 255.0) as u8,
        u.round().clamp(0.0, 255.0) as u8,
        v.round().clamp(0.0, 255.0) as u8,
    )
}
