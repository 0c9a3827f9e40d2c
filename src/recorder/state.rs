//! Recording state management
//!
//! Defines the session state machine, the per-session chunk log, and the
//! artifact assembled from a stopped session.

use super::codec::{CodecChoice, ContainerType};
use super::error::SessionError;
use super::sink::{ChunkSink, SinkStats};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Lifecycle state of the session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// No capture source yet
    #[default]
    Idle,
    /// Capture source acquired, not recording
    CaptureActive,
    /// Currently recording
    Recording,
    /// Recording is paused
    Paused,
    /// Recording finalized
    Stopped,
}

impl SessionState {
    /// Whether a recorder is running (possibly paused)
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Recording | SessionState::Paused)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::CaptureActive => write!(f, "capture-active"),
            SessionState::Recording => write!(f, "recording"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::Stopped => write!(f, "stopped"),
        }
    }
}

/// One uninterrupted stretch of recording
///
/// A new span is opened at start and at every resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSpan {
    /// Span index (0, 1, 2, ...)
    pub index: usize,

    /// Duration of this span in milliseconds
    pub duration_ms: f64,

    /// Session clock when the span started
    pub process_time_start_ms: f64,

    /// Session clock when the span ended
    pub process_time_end_ms: f64,

    /// Unix timestamp when the span started
    pub unix_start_ms: u64,

    /// Unix timestamp when the span ended
    pub unix_end_ms: u64,
}

impl ActiveSpan {
    fn new(index: usize, process_time_ms: f64) -> Self {
        let now = Utc::now().timestamp_millis() as u64;
        Self {
            index,
            duration_ms: 0.0,
            process_time_start_ms: process_time_ms,
            process_time_end_ms: process_time_ms,
            unix_start_ms: now,
            unix_end_ms: now,
        }
    }

    fn end(&mut self, process_time_ms: f64) {
        self.process_time_end_ms = process_time_ms;
        self.duration_ms = self.process_time_end_ms - self.process_time_start_ms;
        self.unix_end_ms = Utc::now().timestamp_millis() as u64;
    }
}

/// One run from start to stop
pub struct RecordingSession {
    id: Uuid,
    codec: CodecChoice,
    state: SessionState,
    started_at: DateTime<Utc>,
    clock: Instant,
    spans: Vec<ActiveSpan>,
    sink: Arc<ChunkSink>,
}

impl RecordingSession {
    /// Open a session in the Recording state
    pub(crate) fn begin(codec: CodecChoice, sink: Arc<ChunkSink>) -> Self {
        Self {
            id: Uuid::new_v4(),
            codec,
            state: SessionState::Recording,
            started_at: Utc::now(),
            clock: Instant::now(),
            spans: vec![ActiveSpan::new(0, 0.0)],
            sink,
        }
    }

    fn process_time_ms(&self) -> f64 {
        self.clock.elapsed().as_secs_f64() * 1000.0
    }

    pub(crate) fn mark_paused(&mut self) {
        let now = self.process_time_ms();
        if let Some(span) = self.spans.last_mut() {
            span.end(now);
        }
        self.state = SessionState::Paused;
    }

    pub(crate) fn mark_resumed(&mut self) {
        let span = ActiveSpan::new(self.spans.len(), self.process_time_ms());
        self.spans.push(span);
        self.state = SessionState::Recording;
    }

    /// Close the chunk log and enter the Stopped state
    pub(crate) fn mark_stopped(&mut self) {
        if self.state == SessionState::Recording {
            let now = self.process_time_ms();
            if let Some(span) = self.spans.last_mut() {
                span.end(now);
            }
        }
        self.sink.close();
        self.state = SessionState::Stopped;
    }

    pub(crate) fn sink(&self) -> &ChunkSink {
        &self.sink
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn codec(&self) -> &CodecChoice {
        &self.codec
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn spans(&self) -> &[ActiveSpan] {
        &self.spans
    }

    /// Chunks received so far, in emission order
    pub fn chunks(&self) -> Vec<Bytes> {
        self.sink.chunks()
    }

    pub fn stats(&self) -> SinkStats {
        self.sink.stats()
    }

    /// Time spent recording, excluding pauses
    pub fn active_duration_ms(&self) -> f64 {
        let closed: f64 = self
            .spans
            .iter()
            .take(self.spans.len().saturating_sub(1))
            .map(|s| s.duration_ms)
            .sum();

        let current = if self.state == SessionState::Recording {
            self.spans
                .last()
                .map(|s| self.process_time_ms() - s.process_time_start_ms)
                .unwrap_or(0.0)
        } else {
            self.spans.last().map(|s| s.duration_ms).unwrap_or(0.0)
        };

        closed + current
    }

    pub fn summary(&self) -> SessionSummary {
        let stats = self.stats();
        SessionSummary {
            id: self.id,
            codec: self.codec.clone(),
            state: self.state,
            started_at: self.started_at,
            active_duration_ms: self.active_duration_ms(),
            span_count: self.spans.len(),
            chunk_count: stats.chunks,
            total_bytes: stats.total_bytes,
        }
    }
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("id", &self.id)
            .field("codec", &self.codec)
            .field("state", &self.state)
            .field("spans", &self.spans.len())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Serializable view of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: Uuid,
    pub codec: CodecChoice,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub active_duration_ms: f64,
    pub span_count: usize,
    pub chunk_count: usize,
    pub total_bytes: usize,
}

/// The assembled recording of a stopped session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedArtifact {
    session_id: Uuid,
    codec: CodecChoice,
    container: ContainerType,
    data: Bytes,
}

impl RecordedArtifact {
    /// Concatenate the chunks of a stopped session in emission order.
    pub fn from_session(session: &RecordingSession) -> Result<Self, SessionError> {
        if session.state() != SessionState::Stopped {
            return Err(SessionError::InvalidState {
                operation: "build artifact",
                state: session.state(),
            });
        }

        let chunks = session.chunks();
        let mut data = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
        for chunk in &chunks {
            data.extend_from_slice(chunk);
        }

        Ok(Self {
            session_id: session.id(),
            codec: session.codec().clone(),
            container: session.codec().container(),
            data: data.freeze(),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn codec(&self) -> &CodecChoice {
        &self.codec
    }

    pub fn container(&self) -> ContainerType {
        self.container
    }

    /// Container MIME type (`video/mp4` or `video/webm`)
    pub fn mime_type(&self) -> &'static str {
        self.container.mime_type()
    }

    /// `<basename>.<ext>` for the artifact's container
    pub fn suggested_filename(&self, basename: &str) -> String {
        format!("{}.{}", basename, self.container.extension())
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
