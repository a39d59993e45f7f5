// SPDX-License-Identifier: MPL-2.0

//! Application layer above the capture session
//!
//! - `coordinator`: media mode, recording flag, trigger dispatch
//! - `surface`: what the presentation surface shows and how input maps to
//!   coordinator calls

mod coordinator;
mod surface;

pub use coordinator::{MediaType, RecordingCoordinator, TriggerOutcome};
pub use surface::{Alert, CaptureIcon, Controls, PresentationSurface, SurfaceAction, UiEvent};
