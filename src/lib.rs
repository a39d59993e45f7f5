// SPDX-License-Identifier: MPL-2.0

//! Camera demo - live preview, front/back switching, photo and video capture
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Camera and audio backend abstraction (GStreamer, virtual)
//! - [`session`]: The capture session controller, its inputs, outputs and preview
//! - [`app`]: Recording coordinator and presentation surface state
//! - [`terminal`]: Terminal rendering of the presentation surface
//! - [`config`]: User configuration handling
//! - [`storage`]: Saving photos and videos to the user's media library
//!
//! # Example
//!
//! ```ignore
//! let controller = CaptureSessionController::initialize(
//!     get_backend_for_type(CameraBackendType::Virtual),
//!     SessionSettings::default(),
//!     MediaLibrary::from_config(&Config::default()),
//!     runtime.handle().clone(),
//! );
//! let mut coordinator = RecordingCoordinator::new(controller);
//! coordinator.trigger_capture();
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod session;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use app::{MediaType, PresentationSurface, RecordingCoordinator};
pub use config::Config;
pub use constants::{BitratePreset, SessionPreset};
pub use errors::{AppError, CameraError};
pub use session::{CaptureSessionController, MediaEvent, SessionSettings};
