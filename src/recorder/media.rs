//! Media recorder trait
//!
//! Defines the interface to the platform's media recorder and the observer
//! through which it delivers encoded chunks.

use super::codec::CodecChoice;
use crate::capture::CaptureSource;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a recorder provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("recorder rejected codec {codec}: {reason}")]
    Rejected { codec: String, reason: String },

    #[error("capture source has no live tracks")]
    NoLiveTracks,

    #[error("recorder could not start: {0}")]
    StartFailed(String),
}

/// State reported by a recorder instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    Inactive,
    Recording,
    Paused,
}

/// Receives chunks produced by a recorder.
///
/// Called from whatever context the recorder emits on; implementations must
/// not block.
pub trait ChunkObserver: Send + Sync {
    fn on_chunk_emitted(&self, chunk: Bytes);
}

/// A recorder bound to one capture source and one codec
pub trait MediaRecorder: Send {
    /// Codec the recorder was created with
    fn mime_type(&self) -> &str;

    /// Current recorder state
    fn state(&self) -> RecorderState;

    /// Begin recording, emitting a chunk roughly every `timeslice`
    fn start(&mut self, timeslice: Duration) -> Result<(), RecorderError>;

    /// Suspend the emission clock
    fn pause(&mut self);

    /// Restart the emission clock
    fn resume(&mut self);

    /// Emit whatever data is pending right now
    fn request_data(&mut self);

    /// Finalize. Any remaining data is emitted before this returns.
    fn stop(&mut self);
}

/// Factory and capability query for media recorders
pub trait MediaRecorderProvider: Send + Sync {
    /// Pure capability query
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Build a recorder for `source` that reports chunks to `observer`
    fn create(
        &self,
        source: Arc<dyn CaptureSource>,
        codec: &CodecChoice,
        observer: Arc<dyn ChunkObserver>,
    ) -> Result<Box<dyn MediaRecorder>, RecorderError>;
}
