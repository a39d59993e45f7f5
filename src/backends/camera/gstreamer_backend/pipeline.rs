// SPDX-License-Identifier: MPL-2.0

//! GStreamer preview pipeline for a single camera
//!
//! ```text
//! device source → videoconvert → videoscale → videorate → appsink (RGBA)
//! ```

use super::super::VideoStream;
use super::super::types::*;
use crate::constants::timing;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Video input backed by a GStreamer device
pub struct GstVideoStream {
    camera: CameraDevice,
    gst_device: gst::Device,
    format: CameraFormat,
    pipeline: Option<gst::Pipeline>,
}

impl GstVideoStream {
    pub fn new(camera: CameraDevice, gst_device: gst::Device, format: CameraFormat) -> Self {
        Self {
            camera,
            gst_device,
            format,
            pipeline: None,
        }
    }

    fn build_pipeline(&self, sink: FrameSink) -> BackendResult<gst::Pipeline> {
        let pipeline = gst::Pipeline::new();

        let source = self
            .gst_device
            .create_element(Some("source"))
            .map_err(|e| {
                BackendError::InitializationFailed(format!(
                    "Failed to create source for {}: {}",
                    self.camera.name, e
                ))
            })?;

        let videoconvert = make_element("videoconvert")?;
        let videoscale = make_element("videoscale")?;
        let videorate = make_element("videorate")?;

        let caps = gst::Caps::builder("video/x-raw")
            .field("format", "RGBA")
            .field("width", self.format.width as i32)
            .field("height", self.format.height as i32)
            .field(
                "framerate",
                gst::Fraction::new(
                    self.format.framerate.num as i32,
                    self.format.framerate.denom as i32,
                ),
            )
            .build();

        let appsink = AppSink::builder()
            .name("sink")
            .caps(&caps)
            .max_buffers(2)
            .drop(true)
            .sync(false)
            .build();

        pipeline
            .add_many([
                &source,
                &videoconvert,
                &videoscale,
                &videorate,
                appsink.upcast_ref(),
            ])
            .map_err(|e| {
                BackendError::InitializationFailed(format!("Failed to add elements: {}", e))
            })?;

        gst::Element::link_many([
            &source,
            &videoconvert,
            &videoscale,
            &videorate,
            appsink.upcast_ref(),
        ])
        .map_err(|e| BackendError::InitializationFailed(format!("Failed to link elements: {}", e)))?;

        let frame_counter = Arc::new(AtomicU64::new(0));
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let frame_num = frame_counter.fetch_add(1, Ordering::Relaxed);

                    let sample = appsink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let caps = sample.caps().ok_or(gst::FlowError::Error)?;

                    let video_info = VideoInfo::from_caps(caps).map_err(|e| {
                        if frame_num % timing::FRAME_LOG_INTERVAL == 0 {
                            error!(frame = frame_num, error = ?e, "Failed to get video info");
                        }
                        gst::FlowError::Error
                    })?;

                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;

                    sink(CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        data: Arc::from(map.as_slice()),
                        stride: video_info.stride()[0] as u32,
                        captured_at: Instant::now(),
                    });

                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        Ok(pipeline)
    }
}

impl VideoStream for GstVideoStream {
    fn start(&mut self, sink: FrameSink) -> BackendResult<()> {
        if self.pipeline.is_some() {
            return Ok(());
        }

        info!(device = %self.camera.name, format = %self.format, "Starting camera pipeline");
        let pipeline = self.build_pipeline(sink)?;

        pipeline.set_state(gst::State::Playing).map_err(|e| {
            BackendError::InitializationFailed(format!("Failed to start pipeline: {}", e))
        })?;

        // Surface immediate failures (device busy, caps negotiation) to the caller
        if let Some(bus) = pipeline.bus()
            && let Some(msg) = bus.timed_pop_filtered(
                gst::ClockTime::from_mseconds(timing::STATE_CHANGE_TIMEOUT_MS),
                &[gst::MessageType::Error],
            )
            && let gst::MessageView::Error(err) = msg.view()
        {
            let _ = pipeline.set_state(gst::State::Null);
            return Err(BackendError::InitializationFailed(format!(
                "Pipeline error: {}",
                err.error()
            )));
        }

        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            debug!(device = %self.camera.name, "Stopping camera pipeline");
            if let Err(e) = pipeline.set_state(gst::State::Null) {
                warn!(error = %e, "Failed to stop camera pipeline");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.pipeline.is_some()
    }
}

impl Drop for GstVideoStream {
    fn drop(&mut self) {
        self.stop();
    }
}

pub(super) fn make_element(factory: &str) -> BackendResult<gst::Element> {
    gst::ElementFactory::make(factory).build().map_err(|e| {
        BackendError::InitializationFailed(format!("Failed to create {}: {}", factory, e))
    })
}
