//! Display capture
//!
//! Provider traits for acquiring a live display stream, plus an in-memory
//! implementation.

pub mod traits;
pub mod virtual_display;

// Re-export traits
pub use traits::{
    AudioConstraint, AudioSettings, CaptureConstraints, CaptureError, CaptureSource,
    DisplayCaptureProvider, MediaTrack, TrackKind,
};

pub use virtual_display::{PickerResponse, VirtualDisplayProvider};
