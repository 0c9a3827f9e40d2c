//! Capture trait definitions
//!
//! Platform-agnostic traits for the display capture provider and the
//! stream handle it hands out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while acquiring a capture source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("display capture permission denied: {0}")]
    PermissionDenied(String),

    #[error("display capture not available: {0}")]
    NotAvailable(String),

    #[error("invalid capture constraints: {0}")]
    InvalidConstraints(String),
}

/// Audio part of the capture constraints
///
/// Serializes as either a plain boolean or `{"sampleRate": 44100}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AudioConstraint {
    Enabled(bool),
    Settings(AudioSettings),
}

/// Explicit audio capture settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSettings {
    pub sample_rate: u32,
}

impl AudioConstraint {
    /// Whether any audio was requested
    pub fn is_requested(&self) -> bool {
        match self {
            AudioConstraint::Enabled(enabled) => *enabled,
            AudioConstraint::Settings(_) => true,
        }
    }

    /// Requested sample rate, if one was given
    pub fn sample_rate(&self) -> Option<u32> {
        match self {
            AudioConstraint::Enabled(_) => None,
            AudioConstraint::Settings(settings) => Some(settings.sample_rate),
        }
    }
}

impl Default for AudioConstraint {
    fn default() -> Self {
        AudioConstraint::Enabled(false)
    }
}

/// Options passed to the capture provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    /// Whether to capture video
    #[serde(default = "default_true")]
    pub video: bool,

    /// Whether (and how) to capture audio
    #[serde(default)]
    pub audio: AudioConstraint,
}

fn default_true() -> bool {
    true
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: AudioConstraint::default(),
        }
    }
}

impl CaptureConstraints {
    /// Reject constraints that request nothing at all
    pub fn validate(&self) -> Result<(), CaptureError> {
        if !self.video && !self.audio.is_requested() {
            return Err(CaptureError::InvalidConstraints(
                "at least one of video or audio must be requested".to_string(),
            ));
        }
        Ok(())
    }
}

/// Kind of a media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
        }
    }
}

/// One constituent track of a capture source
pub trait MediaTrack: Send + Sync {
    /// Track kind (video or audio)
    fn kind(&self) -> TrackKind;

    /// Human readable label (e.g. "screen:0")
    fn label(&self) -> &str;

    /// Whether the track currently feeds data downstream
    fn is_enabled(&self) -> bool;

    /// Mute or unmute the track without ending it
    fn set_enabled(&self, enabled: bool);

    /// End the track permanently
    fn stop(&self);

    /// Whether the track has not been stopped yet
    fn is_live(&self) -> bool;
}

/// A live stream handle obtained from the capture provider
pub trait CaptureSource: Send + Sync {
    /// Unique stream identifier
    fn id(&self) -> &str;

    /// All constituent tracks
    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>>;

    /// Stop every track of the stream
    fn stop(&self) {
        for track in self.tracks() {
            track.stop();
        }
    }
}

/// Provider of display capture streams
#[async_trait]
pub trait DisplayCaptureProvider: Send + Sync {
    /// Ask the platform for a display stream matching `constraints`
    async fn get_display_media(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Arc<dyn CaptureSource>, CaptureError>;
}
