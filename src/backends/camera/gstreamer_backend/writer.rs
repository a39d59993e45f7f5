// SPDX-License-Identifier: GPL-3.0-only

//! Movie writer fed from the session's frame hub
//!
//! ```text
//! appsrc (RGBA) → videoconvert → encoder → parser → mp4mux → filesink
//!                                                     ↑
//! audio src → audioconvert → audioresample → aac ─────┘
//! ```
//!
//! Frames arrive from the session rather than from the camera directly, so
//! switching cameras mid-recording keeps writing to the same file.

use super::super::MovieWriter;
use super::super::types::*;
use super::pipeline::make_element;
use crate::backends::audio::AudioDevice;
use crate::constants::timing;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app::AppSrc;
use gstreamer_video::{VideoFormat, VideoInfo};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// H.264 encoders in priority order: hardware first, software fallbacks last
const H264_ENCODERS: [&str; 6] = [
    "vah264enc",
    "vaapih264enc",
    "nvh264enc",
    "v4l2h264enc",
    "x264enc",
    "openh264enc",
];

const AAC_ENCODERS: [&str; 3] = ["avenc_aac", "faac", "voaacenc"];

const AUDIO_BITRATE_BPS: i32 = 128_000;

pub struct GstMovieWriter {
    pipeline: gst::Pipeline,
    appsrc: AppSrc,
    output_path: PathBuf,
    width: u32,
    height: u32,
    frames_written: u64,
}

impl GstMovieWriter {
    pub fn new(settings: &MovieSettings) -> BackendResult<Self> {
        gst::init().map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let output_path = settings.output_path.with_extension("mp4");
        let format = settings.format;

        let video_info = VideoInfo::builder(VideoFormat::Rgba, format.width, format.height)
            .fps(gst::Fraction::new(
                format.framerate.num as i32,
                format.framerate.denom as i32,
            ))
            .build()
            .map_err(|e| BackendError::FormatNotSupported(e.to_string()))?;
        let caps = video_info
            .to_caps()
            .map_err(|e| BackendError::FormatNotSupported(e.to_string()))?;

        let appsrc = AppSrc::builder()
            .name("movie_src")
            .caps(&caps)
            .format(gst::Format::Time)
            .is_live(true)
            .do_timestamp(true)
            .build();

        let pipeline = gst::Pipeline::new();
        let videoconvert = make_element("videoconvert")?;
        let (encoder, encoder_name) = select_video_encoder()?;
        configure_video_encoder(&encoder, encoder_name, settings.bitrate_kbps);
        let parser = make_element("h264parse")?;
        let muxer = make_element("mp4mux")?;
        let filesink = gst::ElementFactory::make("filesink")
            .property("location", output_path.to_string_lossy().to_string())
            .build()
            .map_err(|e| {
                BackendError::InitializationFailed(format!("Failed to create filesink: {}", e))
            })?;

        pipeline
            .add_many([
                appsrc.upcast_ref(),
                &videoconvert,
                &encoder,
                &parser,
                &muxer,
                &filesink,
            ])
            .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;
        gst::Element::link_many([appsrc.upcast_ref(), &videoconvert, &encoder, &parser, &muxer])
            .map_err(|e| {
                BackendError::InitializationFailed(format!("Failed to link video branch: {}", e))
            })?;
        muxer.link(&filesink).map_err(|e| {
            BackendError::InitializationFailed(format!("Failed to link muxer: {}", e))
        })?;

        if let Some(device) = &settings.audio {
            // A missing microphone should not cost the user the video
            if let Err(e) = add_audio_branch(&pipeline, &muxer, device) {
                warn!(error = %e, "Recording without audio");
            }
        }

        pipeline.set_state(gst::State::Playing).map_err(|e| {
            BackendError::RecordingFailed(format!("Failed to start recording pipeline: {}", e))
        })?;

        info!(
            path = %output_path.display(),
            encoder = encoder_name,
            format = %format,
            audio = settings.audio.is_some(),
            "Movie writer started"
        );

        Ok(Self {
            pipeline,
            appsrc,
            output_path,
            width: format.width,
            height: format.height,
            frames_written: 0,
        })
    }
}

impl MovieWriter for GstMovieWriter {
    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn write_frame(&mut self, frame: &CameraFrame) -> BackendResult<()> {
        if frame.width != self.width || frame.height != self.height {
            // Caps are fixed for the life of the file
            return Ok(());
        }

        let buffer = if frame.stride == frame.width * 4 {
            gst::Buffer::from_slice(frame.data.to_vec())
        } else {
            let image = frame
                .to_rgba_image()
                .ok_or_else(|| BackendError::RecordingFailed("Malformed frame".to_string()))?;
            gst::Buffer::from_slice(image.into_raw())
        };

        self.appsrc.push_buffer(buffer).map_err(|e| {
            BackendError::RecordingFailed(format!("Failed to push frame: {:?}", e))
        })?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> BackendResult<PathBuf> {
        debug!(frames = self.frames_written, "Finishing movie writer");

        let _ = self.appsrc.end_of_stream();

        let mut result: BackendResult<()> = Ok(());
        if let Some(bus) = self.pipeline.bus() {
            for msg in bus.iter_timed(gst::ClockTime::from_seconds(timing::EOS_TIMEOUT_SECS)) {
                match msg.view() {
                    gst::MessageView::Eos(..) => break,
                    gst::MessageView::Error(err) => {
                        result = Err(BackendError::RecordingFailed(format!(
                            "Pipeline error while finalizing: {}",
                            err.error()
                        )));
                        break;
                    }
                    _ => {}
                }
            }
        }

        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            warn!(error = %e, "Failed to stop recording pipeline");
        }

        result?;
        if self.frames_written == 0 {
            return Err(BackendError::RecordingFailed(
                "No frames were recorded".to_string(),
            ));
        }

        info!(path = %self.output_path.display(), frames = self.frames_written, "Movie writer finished");
        Ok(self.output_path.clone())
    }
}

fn select_video_encoder() -> BackendResult<(gst::Element, &'static str)> {
    for name in H264_ENCODERS {
        if let Ok(encoder) = gst::ElementFactory::make(name).build() {
            debug!(encoder = name, "Selected video encoder");
            return Ok((encoder, name));
        }
    }
    Err(BackendError::NotAvailable(
        "No H.264 encoder available. Install gst-plugins-ugly (x264enc) or gst-plugins-bad (openh264enc)"
            .to_string(),
    ))
}

fn configure_video_encoder(encoder: &gst::Element, name: &str, bitrate_kbps: u32) {
    match name {
        "x264enc" => {
            encoder.set_property_from_str("speed-preset", "veryfast");
            encoder.set_property_from_str("tune", "zerolatency");
            encoder.set_property("bitrate", bitrate_kbps);
        }
        "openh264enc" => {
            encoder.set_property_from_str("rate-control", "bitrate");
            encoder.set_property("bitrate", bitrate_kbps * 1000);
            encoder.set_property_from_str("usage-type", "camera");
        }
        "nvh264enc" | "vaapih264enc" | "vah264enc" => {
            if encoder.has_property("bitrate") {
                encoder.set_property("bitrate", bitrate_kbps);
            }
        }
        _ => {}
    }
    debug!(encoder = name, bitrate_kbps, "Configured video encoder");
}

fn add_audio_branch(
    pipeline: &gst::Pipeline,
    muxer: &gst::Element,
    device: &AudioDevice,
) -> BackendResult<()> {
    let source = match gst::ElementFactory::make("pipewiresrc").build() {
        Ok(source) => {
            if source.has_property("target-object") {
                source.set_property("target-object", device.serial.as_str());
            }
            source
        }
        Err(_) => make_element("autoaudiosrc")?,
    };
    let audioconvert = make_element("audioconvert")?;
    let audioresample = make_element("audioresample")?;
    let queue = make_element("queue")?;

    let encoder = AAC_ENCODERS
        .iter()
        .find_map(|name| gst::ElementFactory::make(name).build().ok())
        .ok_or_else(|| BackendError::NotAvailable("No AAC encoder available".to_string()))?;
    // Property type differs between the AAC encoders
    if encoder.has_property("bitrate") {
        encoder.set_property_from_str("bitrate", &AUDIO_BITRATE_BPS.to_string());
    }

    let elements = [&source, &audioconvert, &audioresample, &queue, &encoder];
    pipeline
        .add_many(elements)
        .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

    let linked = gst::Element::link_many(elements).and_then(|_| encoder.link(muxer));
    if let Err(e) = linked {
        for element in elements {
            let _ = pipeline.remove(element);
        }
        return Err(BackendError::InitializationFailed(format!(
            "Failed to link audio branch: {}",
            e
        )));
    }

    debug!(device = %device.name, "Audio branch added to recording");
    Ok(())
}
