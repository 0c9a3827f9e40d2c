//! Recording system module
//!
//! This module implements the recording-session lifecycle:
//! - MediaRecorder / MediaRecorderProvider traits for the platform recorder
//! - Codec negotiation against a fixed candidate list
//! - SessionController to drive capture, recording and artifact assembly

pub mod codec;
pub mod controller;
pub mod error;
pub mod media;
pub mod sink;
pub mod state;
pub mod virtual_recorder;

pub use codec::{CodecChoice, ContainerType, CANDIDATE_MIME_TYPES};
pub use controller::{SessionController, SessionEvent, DEFAULT_TIMESLICE};
pub use error::{SessionError, SessionResult};
pub use media::{ChunkObserver, MediaRecorder, MediaRecorderProvider, RecorderError, RecorderState};
pub use state::{RecordedArtifact, RecordingSession, SessionState, SessionSummary};
pub use virtual_recorder::VirtualRecorderProvider;
