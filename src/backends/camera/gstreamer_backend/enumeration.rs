// SPDX-License-Identifier: GPL-3.0-only

//! Camera discovery through the GStreamer device monitor

use super::super::types::{CameraDevice, DevicePosition, assign_positions};
use gstreamer as gst;
use gstreamer::prelude::*;
use tracing::{debug, info, warn};

/// Property keys that identify a camera, most specific first
const PATH_KEYS: [&str; 4] = ["object.serial", "api.v4l2.path", "device.path", "object.path"];

/// Property keys carrying the camera's physical location
const LOCATION_KEYS: [&str; 2] = ["api.libcamera.location", "camera.location"];

/// A camera plus the GStreamer device used to build its source element
#[derive(Clone)]
pub struct DiscoveredCamera {
    pub device: CameraDevice,
    pub gst_device: gst::Device,
}

/// Enumerate video sources with the device monitor
pub fn discover_cameras() -> Vec<DiscoveredCamera> {
    if let Err(e) = gst::init() {
        warn!(error = %e, "GStreamer init failed");
        return Vec::new();
    }

    let monitor = gst::DeviceMonitor::new();
    monitor.add_filter(Some("Video/Source"), None);

    if let Err(e) = monitor.start() {
        warn!(error = %e, "Failed to start device monitor");
        return Vec::new();
    }
    let gst_devices = monitor.devices();
    monitor.stop();

    let mut found: Vec<DiscoveredCamera> = Vec::new();
    for gst_device in gst_devices {
        let name = gst_device.display_name().to_string();
        let props = gst_device.properties();

        let path = props
            .as_ref()
            .and_then(|p| first_string(p, &PATH_KEYS))
            .unwrap_or_else(|| name.clone());

        let position = props
            .as_ref()
            .and_then(|p| first_string(p, &LOCATION_KEYS))
            .map(|location| DevicePosition::from_location(&location))
            .unwrap_or(DevicePosition::Unspecified);

        // PipeWire and V4L2 providers both report the same physical camera
        if found.iter().any(|c| c.device.name == name) {
            debug!(name = %name, "Skipping duplicate camera from another provider");
            continue;
        }

        debug!(name = %name, path = %path, position = %position, "Found camera");
        found.push(DiscoveredCamera {
            device: CameraDevice {
                name,
                path,
                position,
            },
            gst_device,
        });
    }

    let mut devices: Vec<CameraDevice> = found.iter().map(|c| c.device.clone()).collect();
    assign_positions(&mut devices);
    for (camera, device) in found.iter_mut().zip(devices) {
        camera.device = device;
    }

    info!(count = found.len(), "Camera enumeration complete");
    found
}

fn first_string(props: &gst::StructureRef, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let value = props.value(*key).ok()?;
        if let Ok(s) = value.get::<String>() {
            return Some(s);
        }
        // Serials are integers on some PipeWire versions
        value
            .get::<u64>()
            .map(|n| n.to_string())
            .or_else(|_| value.get::<i64>().map(|n| n.to_string()))
            .or_else(|_| value.get::<i32>().map(|n| n.to_string()))
            .ok()
    })
}
