// SPDX-License-Identifier: MPL-2.0

//! Audio input devices and the audio recording session
//!
//! Devices are enumerated from PipeWire (`pw-dump`). The [`AudioSession`]
//! gates whether recordings carry an audio track: a movie writer only gets a
//! microphone when the session has an audio input *and* the audio session is
//! active for recording.

use crate::backends::camera::types::{BackendError, BackendResult};
use std::process::Command;
use tracing::{debug, info, warn};

/// Represents an audio input device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDevice {
    pub name: String,
    pub serial: String,
    pub node_name: String,
    pub is_default: bool,
}

/// Enumerate available audio input devices using PipeWire
pub fn enumerate_audio_devices() -> Vec<AudioDevice> {
    let output = match Command::new("pw-dump").output() {
        Ok(output) => output,
        Err(e) => {
            warn!("Failed to run pw-dump: {}", e);
            return Vec::new();
        }
    };

    if !output.status.success() {
        warn!("pw-dump command failed");
        return Vec::new();
    }

    match std::str::from_utf8(&output.stdout) {
        Ok(stdout) => parse_pw_dump(stdout),
        Err(e) => {
            warn!("Failed to parse pw-dump output: {}", e);
            Vec::new()
        }
    }
}

/// Extract audio sources from `pw-dump` JSON, default source first
pub fn parse_pw_dump(json: &str) -> Vec<AudioDevice> {
    let nodes: Vec<serde_json::Value> = match serde_json::from_str(json) {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!("Failed to parse JSON from pw-dump: {}", e);
            return Vec::new();
        }
    };

    let default_node_name = nodes.iter().find_map(default_source_name);
    if let Some(name) = &default_node_name {
        debug!(default_source = %name, "Found default audio source from metadata");
    }

    let mut devices: Vec<AudioDevice> = nodes
        .iter()
        .filter_map(|node| node.get("info")?.get("props"))
        .filter(|props| props.get("media.class").and_then(|v| v.as_str()) == Some("Audio/Source"))
        .map(|props| {
            let name = props
                .get("node.nick")
                .or_else(|| props.get("node.description"))
                .or_else(|| props.get("node.name"))
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown Audio Device")
                .to_string();

            // object.serial is a number in recent PipeWire releases, a string in older ones
            let serial = match props.get("object.serial") {
                Some(serde_json::Value::Number(n)) => n.to_string(),
                Some(serde_json::Value::String(s)) => s.clone(),
                _ => "0".to_string(),
            };

            let node_name = props
                .get("node.name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let is_default = default_node_name.as_deref() == Some(node_name.as_str());

            debug!(name = %name, serial = %serial, is_default, "Found audio input device");

            AudioDevice {
                name,
                serial,
                node_name,
                is_default,
            }
        })
        .collect();

    // Default first, then alphabetically
    devices.sort_by(|a, b| b.is_default.cmp(&a.is_default).then_with(|| a.name.cmp(&b.name)));
    devices
}

fn default_source_name(node: &serde_json::Value) -> Option<String> {
    if node.get("type")?.as_str()? != "PipeWire:Interface:Metadata" {
        return None;
    }
    if node.get("props")?.get("metadata.name")?.as_str()? != "default" {
        return None;
    }

    node.get("metadata")?.as_array()?.iter().find_map(|entry| {
        let key = entry.get("key")?.as_str()?;
        if key != "default.audio.source" && key != "default.configured.audio.source" {
            return None;
        }
        Some(entry.get("value")?.get("name")?.as_str()?.to_string())
    })
}

/// What the audio session is configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioCategory {
    /// No audio use declared
    #[default]
    Ambient,
    /// Capturing from a microphone
    Record,
}

/// Process-level audio recording session
#[derive(Debug, Default)]
pub struct AudioSession {
    category: AudioCategory,
    active: bool,
}

impl AudioSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_category(&mut self, category: AudioCategory) {
        self.category = category;
    }

    pub fn category(&self) -> AudioCategory {
        self.category
    }

    /// Activate or deactivate the session.
    ///
    /// Activating a recording session requires a microphone to record from.
    pub fn set_active(&mut self, active: bool, device: Option<&AudioDevice>) -> BackendResult<()> {
        if active && self.category == AudioCategory::Record && device.is_none() {
            return Err(BackendError::NotAvailable(
                "no audio input to record from".to_string(),
            ));
        }

        if self.active != active {
            info!(category = ?self.category, active, "Audio session state changed");
        }
        self.active = active;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True when recordings should carry an audio track
    pub fn is_recording_enabled(&self) -> bool {
        self.active && self.category == AudioCategory::Record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PW_DUMP: &str = r#"[
        {
            "type": "PipeWire:Interface:Metadata",
            "props": { "metadata.name": "default" },
            "metadata": [
                { "key": "default.audio.source", "value": { "name": "alsa_input.usb" } }
            ]
        },
        {
            "type": "PipeWire:Interface:Node",
            "info": { "props": {
                "media.class": "Audio/Source",
                "node.nick": "Built-in Mic",
                "node.name": "alsa_input.pci",
                "object.serial": 41
            } }
        },
        {
            "type": "PipeWire:Interface:Node",
            "info": { "props": {
                "media.class": "Audio/Source",
                "node.description": "USB Mic",
                "node.name": "alsa_input.usb",
                "object.serial": "57"
            } }
        },
        {
            "type": "PipeWire:Interface:Node",
            "info": { "props": { "media.class": "Video/Source", "node.name": "v4l2_input" } }
        }
    ]"#;

    #[test]
    fn test_parse_pw_dump_orders_default_first() {
        let devices = parse_pw_dump(PW_DUMP);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "USB Mic");
        assert!(devices[0].is_default);
        assert_eq!(devices[0].serial, "57");
        assert_eq!(devices[1].name, "Built-in Mic");
        assert_eq!(devices[1].serial, "41");
    }

    #[test]
    fn test_parse_pw_dump_rejects_garbage() {
        assert!(parse_pw_dump("not json").is_empty());
    }

    #[test]
    fn test_record_session_requires_device() {
        let mut session = AudioSession::new();
        session.set_category(AudioCategory::Record);
        assert!(session.set_active(true, None).is_err());
        assert!(!session.is_recording_enabled());

        let mic = AudioDevice {
            name: "Mic".to_string(),
            serial: "1".to_string(),
            node_name: "mic".to_string(),
            is_default: true,
        };
        session.set_active(true, Some(&mic)).unwrap();
        assert!(session.is_recording_enabled());
    }
}
