// SPDX-License-Identifier: MPL-2.0

//! GStreamer camera backend
//!
//! Cameras come from the GStreamer device monitor, which covers both PipeWire
//! and V4L2 providers. Each video input runs its own preview pipeline ending
//! in an appsink; recordings run a separate appsrc pipeline fed by the
//! session, so the camera pipeline never has to be rebuilt to start or stop
//! a recording.

mod enumeration;
mod pipeline;
mod writer;

use super::types::*;
use super::{CameraBackend, MovieWriter, VideoStream};
use crate::backends::audio::{self, AudioDevice};
use enumeration::DiscoveredCamera;
use gstreamer as gst;
use pipeline::GstVideoStream;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};
use writer::GstMovieWriter;

pub struct GStreamerBackend {
    /// Devices from the last enumeration, with their GStreamer handles
    cameras: Mutex<Vec<DiscoveredCamera>>,
}

impl GStreamerBackend {
    pub fn new() -> Self {
        Self {
            cameras: Mutex::new(Vec::new()),
        }
    }

    fn lookup(&self, device: &CameraDevice) -> Option<gst::Device> {
        let find = |cameras: &[DiscoveredCamera]| {
            cameras
                .iter()
                .find(|c| c.device.path == device.path)
                .map(|c| c.gst_device.clone())
        };

        if let Some(found) = find(self.cameras.lock().unwrap_or_else(PoisonError::into_inner).as_slice()) {
            return Some(found);
        }

        // The device may have been plugged in since the last enumeration
        self.enumerate_cameras();
        find(self.cameras.lock().unwrap_or_else(PoisonError::into_inner).as_slice())
    }
}

impl Default for GStreamerBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for GStreamerBackend {
    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        let discovered = enumeration::discover_cameras();
        let devices = discovered.iter().map(|c| c.device.clone()).collect();
        *self.cameras.lock().unwrap_or_else(PoisonError::into_inner) = discovered;
        devices
    }

    fn default_audio_device(&self) -> Option<AudioDevice> {
        audio::enumerate_audio_devices().into_iter().next()
    }

    fn open_video_input(
        &self,
        device: &CameraDevice,
        format: &CameraFormat,
    ) -> BackendResult<Box<dyn VideoStream>> {
        let gst_device = self
            .lookup(device)
            .ok_or_else(|| BackendError::DeviceNotFound(device.name.clone()))?;

        debug!(device = %device.name, format = %format, "Opening video input");
        Ok(Box::new(GstVideoStream::new(
            device.clone(),
            gst_device,
            *format,
        )))
    }

    fn open_audio_input(&self, device: &AudioDevice) -> BackendResult<()> {
        gst::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let has_source = ["pipewiresrc", "autoaudiosrc"]
            .iter()
            .any(|name| gst::ElementFactory::find(name).is_some());
        if !has_source {
            return Err(BackendError::NotAvailable(
                "No audio source element available".to_string(),
            ));
        }

        info!(device = %device.name, serial = %device.serial, "Audio input ready");
        Ok(())
    }

    fn create_movie_writer(&self, settings: &MovieSettings) -> BackendResult<Box<dyn MovieWriter>> {
        Ok(Box::new(GstMovieWriter::new(settings)?))
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::GStreamer
    }

    fn is_available(&self) -> bool {
        gst::init().is_ok() && gst::ElementFactory::find("appsink").is_some()
    }
}
