// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera and audio capture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          Capture Session Controller          │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │    Audio    │    │     Camera       │   │
//! │  │  (PipeWire) │    │ GStreamer/Virtual│   │
//! │  └─────────────┘    └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - [`audio`]: audio device enumeration and the audio recording session
//! - [`camera`]: camera backends with device lookup, video inputs and movie writers

pub mod audio;
pub mod camera;
