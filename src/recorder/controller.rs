//! Session controller
//!
//! Owns the capture source, the recorder, and the current recording session,
//! and moves them through the recording lifecycle.

use super::codec::{supported_codecs, CodecChoice};
use super::error::{SessionError, SessionResult};
use super::media::{ChunkObserver, MediaRecorder, MediaRecorderProvider};
use super::sink::ChunkSink;
use super::state::{RecordedArtifact, RecordingSession, SessionState};
use crate::capture::{CaptureConstraints, CaptureSource, DisplayCaptureProvider};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default interval between recorder chunks
pub const DEFAULT_TIMESLICE: Duration = Duration::from_millis(200);

/// Events emitted during the session lifecycle
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Capture source acquired
    CaptureAcquired { source_id: String, tracks: usize },
    /// Capture request failed
    CaptureFailed(String),
    /// Capture source released
    CaptureReleased,
    /// Recording started
    Started { session_id: Uuid, codec: CodecChoice },
    /// Recording paused
    Paused,
    /// Recording resumed
    Resumed,
    /// Pending data requested from the recorder
    Flushed,
    /// Recording stopped
    Stopped {
        session_id: Uuid,
        chunks: usize,
        bytes: usize,
    },
    /// Capture tracks muted or unmuted
    TracksToggled { enabled: bool },
    /// A chunk was appended to the session
    ChunkReceived { index: usize, len: usize },
}

fn invalid(operation: &'static str, state: SessionState) -> SessionError {
    SessionError::InvalidState { operation, state }
}

/// Coordinates the capture source and the recorder for one user
pub struct SessionController {
    /// Current lifecycle state
    state: SessionState,

    /// Display capture provider
    capture: Arc<dyn DisplayCaptureProvider>,

    /// Media recorder provider
    recorders: Arc<dyn MediaRecorderProvider>,

    /// Live capture source, shared with the preview
    source: Option<Arc<dyn CaptureSource>>,

    /// Result of the last codec enumeration
    supported: Vec<CodecChoice>,

    /// Recorder for the active session
    recorder: Option<Box<dyn MediaRecorder>>,

    /// Current (or last stopped) session
    session: Option<RecordingSession>,

    /// Interval passed to the recorder on start
    timeslice: Duration,

    /// Event broadcaster
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    /// Create a controller in the Idle state
    pub fn new(
        capture: Arc<dyn DisplayCaptureProvider>,
        recorders: Arc<dyn MediaRecorderProvider>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            state: SessionState::Idle,
            capture,
            recorders,
            source: None,
            supported: Vec::new(),
            recorder: None,
            session: None,
            timeslice: DEFAULT_TIMESLICE,
            event_tx,
        }
    }

    /// Override the chunk timeslice
    pub fn with_timeslice(mut self, timeslice: Duration) -> Self {
        self.timeslice = timeslice;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn timeslice(&self) -> Duration {
        self.timeslice
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Live capture source, if any
    pub fn capture_source(&self) -> Option<Arc<dyn CaptureSource>> {
        self.source.clone()
    }

    /// Codecs from the last enumeration
    pub fn supported(&self) -> &[CodecChoice] {
        &self.supported
    }

    /// Current or last stopped session
    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    /// Whether every track of the capture source is enabled.
    /// `None` when there is no capture source.
    pub fn tracks_enabled(&self) -> Option<bool> {
        self.source
            .as_ref()
            .map(|source| source.tracks().iter().all(|track| track.is_enabled()))
    }

    /// Acquire a capture source and enumerate the codecs it can be recorded with
    pub async fn request_capture(
        &mut self,
        constraints: CaptureConstraints,
    ) -> SessionResult<Arc<dyn CaptureSource>> {
        if self.state != SessionState::Idle {
            return Err(invalid("request capture", self.state));
        }

        tracing::info!("Using media constraints: {:?}", constraints);

        match self.capture.get_display_media(&constraints).await {
            Ok(source) => {
                let tracks = source.tracks().len();
                tracing::info!("Capture source {} acquired with {} track(s)", source.id(), tracks);

                self.source = Some(Arc::clone(&source));
                self.state = SessionState::CaptureActive;
                let _ = self.event_tx.send(SessionEvent::CaptureAcquired {
                    source_id: source.id().to_string(),
                    tracks,
                });

                let codecs = self.enumerate_supported_codecs();
                if codecs.is_empty() {
                    tracing::warn!("No supported codecs; recording is unavailable");
                }
                Ok(source)
            }
            Err(e) => {
                tracing::error!("Display capture failed: {}", e);
                let _ = self.event_tx.send(SessionEvent::CaptureFailed(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Query the recorder provider for supported codecs, in preference order.
    ///
    /// The result replaces the set `start_recording` validates against.
    pub fn enumerate_supported_codecs(&mut self) -> Vec<CodecChoice> {
        self.supported = supported_codecs(self.recorders.as_ref());
        tracing::debug!("Supported codecs: {:?}", self.supported);
        self.supported.clone()
    }

    /// Start a new session with `choice`
    pub fn start_recording(&mut self, choice: &CodecChoice) -> SessionResult<&RecordingSession> {
        if self.state.is_active() {
            return Err(invalid("start recording", self.state));
        }
        let source = match &self.source {
            Some(source) => Arc::clone(source),
            None => return Err(invalid("start recording", self.state)),
        };
        if !self.supported.contains(choice) {
            return Err(SessionError::UnsupportedCodec {
                codec: choice.to_string(),
            });
        }

        let sink = Arc::new(ChunkSink::new(self.event_tx.clone()));
        let observer: Arc<dyn ChunkObserver> = Arc::clone(&sink) as Arc<dyn ChunkObserver>;
        let mut recorder = self
            .recorders
            .create(source, choice, observer)
            .map_err(|e| {
                tracing::error!("Exception while creating media recorder: {}", e);
                SessionError::RecorderConstruction(e)
            })?;
        tracing::info!("Created media recorder with codec {}", choice);

        if let Err(e) = recorder.start(self.timeslice) {
            tracing::error!("Media recorder failed to start: {}", e);
            sink.close();
            return Err(SessionError::RecorderConstruction(e));
        }

        let session = RecordingSession::begin(choice.clone(), sink);
        let session_id = session.id();
        self.recorder = Some(recorder);
        self.state = SessionState::Recording;
        let _ = self.event_tx.send(SessionEvent::Started {
            session_id,
            codec: choice.clone(),
        });
        tracing::info!(
            "Recording {} started (timeslice {}ms)",
            session_id,
            self.timeslice.as_millis()
        );

        Ok(&*self.session.insert(session))
    }

    /// Deliver a chunk to the active session. Empty or late chunks are dropped.
    pub fn on_chunk_emitted(&self, chunk: Bytes) {
        match &self.session {
            Some(session) => session.sink().on_chunk_emitted(chunk),
            None => tracing::warn!("Ignoring {} byte chunk with no session", chunk.len()),
        }
    }

    /// Ask the recorder to emit its pending data now
    pub fn request_flush(&mut self) -> SessionResult<()> {
        if self.state != SessionState::Recording {
            return Err(invalid("request data", self.state));
        }
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.request_data();
        }
        let _ = self.event_tx.send(SessionEvent::Flushed);
        Ok(())
    }

    /// Pause the recorder clock
    pub fn pause_recording(&mut self) -> SessionResult<()> {
        if self.state != SessionState::Recording {
            return Err(invalid("pause", self.state));
        }

        tracing::info!("Pausing recording");
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.pause();
        }
        if let Some(session) = self.session.as_mut() {
            session.mark_paused();
        }

        self.state = SessionState::Paused;
        let _ = self.event_tx.send(SessionEvent::Paused);
        Ok(())
    }

    /// Resume the recorder clock
    pub fn resume_recording(&mut self) -> SessionResult<()> {
        if self.state != SessionState::Paused {
            return Err(invalid("resume", self.state));
        }

        tracing::info!("Resuming recording");
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.resume();
        }
        if let Some(session) = self.session.as_mut() {
            session.mark_resumed();
        }

        self.state = SessionState::Recording;
        let _ = self.event_tx.send(SessionEvent::Resumed);
        Ok(())
    }

    /// Mute or unmute every capture track. Independent of pause/resume.
    pub fn set_track_enabled(&mut self, enabled: bool) -> SessionResult<()> {
        let operation = if enabled { "resume tracks" } else { "pause tracks" };
        if !matches!(
            self.state,
            SessionState::CaptureActive | SessionState::Recording | SessionState::Paused
        ) {
            return Err(invalid(operation, self.state));
        }
        let source = match &self.source {
            Some(source) => source,
            None => return Err(invalid(operation, self.state)),
        };

        for track in source.tracks() {
            track.set_enabled(enabled);
        }
        tracing::info!("Capture tracks {}", if enabled { "enabled" } else { "disabled" });
        let _ = self.event_tx.send(SessionEvent::TracksToggled { enabled });
        Ok(())
    }

    /// Finalize the session. No chunk is accepted after this returns.
    pub fn stop_recording(&mut self) -> SessionResult<&RecordingSession> {
        let state = self.state;
        if !state.is_active() {
            return Err(invalid("stop recording", state));
        }

        tracing::info!("Stopping recording");

        // The recorder flushes its last chunk while the sink is still open.
        if let Some(mut recorder) = self.recorder.take() {
            recorder.stop();
        }

        let session = match self.session.as_mut() {
            Some(session) => session,
            None => return Err(invalid("stop recording", state)),
        };
        session.mark_stopped();
        self.state = SessionState::Stopped;

        let stats = session.stats();
        let _ = self.event_tx.send(SessionEvent::Stopped {
            session_id: session.id(),
            chunks: stats.chunks,
            bytes: stats.total_bytes,
        });
        tracing::info!(
            "Recorder stopped: {} chunk(s), {} bytes, {:.0}ms active",
            stats.chunks,
            stats.total_bytes,
            session.active_duration_ms()
        );

        Ok(&*session)
    }

    /// Assemble the artifact of a stopped session
    pub fn build_artifact(session: &RecordingSession) -> SessionResult<RecordedArtifact> {
        RecordedArtifact::from_session(session)
    }

    /// Assemble the artifact of the current session
    pub fn artifact(&self) -> SessionResult<RecordedArtifact> {
        match &self.session {
            Some(session) => Self::build_artifact(session),
            None => Err(invalid("build artifact", self.state)),
        }
    }

    /// Stop every track and drop the capture source
    pub fn release_capture(&mut self) -> SessionResult<()> {
        if !matches!(self.state, SessionState::CaptureActive | SessionState::Stopped) {
            return Err(invalid("release capture", self.state));
        }

        if let Some(source) = self.source.take() {
            source.stop();
            tracing::info!("Capture source {} released", source.id());
        }
        self.supported.clear();
        self.session = None;
        self.state = SessionState::Idle;
        let _ = self.event_tx.send(SessionEvent::CaptureReleased);
        Ok(())
    }

    /// Stop any recording and release the capture source
    pub fn shutdown(&mut self) {
        if self.state.is_active() {
            if let Err(e) = self.stop_recording() {
                tracing::error!("Failed to stop recording on shutdown: {}", e);
            }
        }
        if self.source.is_some() {
            if let Err(e) = self.release_capture() {
                tracing::error!("Failed to release capture on shutdown: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{PickerResponse, VirtualDisplayProvider};
    use crate::recorder::media::{RecorderError, RecorderState};
    use crate::recorder::virtual_recorder::VirtualRecorderProvider;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Recorder that never emits on its own
    struct QuietRecorder {
        mime_type: String,
        state: RecorderState,
        refuse_start: bool,
    }

    impl MediaRecorder for QuietRecorder {
        fn mime_type(&self) -> &str {
            &self.mime_type
        }
        fn state(&self) -> RecorderState {
            self.state
        }
        fn start(&mut self, _timeslice: Duration) -> Result<(), RecorderError> {
            if self.refuse_start {
                return Err(RecorderError::StartFailed("encoder busy".to_string()));
            }
            self.state = RecorderState::Recording;
            Ok(())
        }
        fn pause(&mut self) {
            self.state = RecorderState::Paused;
        }
        fn resume(&mut self) {
            self.state = RecorderState::Recording;
        }
        fn request_data(&mut self) {}
        fn stop(&mut self) {
            self.state = RecorderState::Inactive;
        }
    }

    struct QuietProvider {
        supported: Vec<&'static str>,
        refuse_start: Arc<AtomicBool>,
    }

    impl QuietProvider {
        fn new(supported: Vec<&'static str>) -> Self {
            Self {
                supported,
                refuse_start: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl MediaRecorderProvider for QuietProvider {
        fn is_type_supported(&self, mime_type: &str) -> bool {
            self.supported.contains(&mime_type)
        }
        fn create(
            &self,
            _source: Arc<dyn CaptureSource>,
            codec: &CodecChoice,
            _observer: Arc<dyn ChunkObserver>,
        ) -> Result<Box<dyn MediaRecorder>, RecorderError> {
            Ok(Box::new(QuietRecorder {
                mime_type: codec.to_string(),
                state: RecorderState::Inactive,
                refuse_start: self.refuse_start.load(Ordering::SeqCst),
            }))
        }
    }

    fn quiet_controller(supported: Vec<&'static str>) -> SessionController {
        SessionController::new(
            Arc::new(VirtualDisplayProvider::default()),
            Arc::new(QuietProvider::new(supported)),
        )
    }

    const VP8: &str = "video/webm;codecs=vp8,opus";

    #[test]
    fn test_out_of_order_calls_from_idle() {
        let mut controller = quiet_controller(vec![VP8]);

        assert!(matches!(
            controller.pause_recording(),
            Err(SessionError::InvalidState { state: SessionState::Idle, .. })
        ));
        assert!(matches!(
            controller.resume_recording(),
            Err(SessionError::InvalidState { state: SessionState::Idle, .. })
        ));
        assert!(matches!(
            controller.stop_recording(),
            Err(SessionError::InvalidState { state: SessionState::Idle, .. })
        ));
        assert!(controller.request_flush().is_err());
        assert!(controller.set_track_enabled(false).is_err());
        assert_eq!(controller.state(), SessionState::Idle);
    }

    #[test]
    fn test_start_without_capture_fails() {
        let mut controller = quiet_controller(vec![VP8]);
        let result = controller.start_recording(&CodecChoice::new(VP8));
        assert!(matches!(result, Err(SessionError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_capture_denied_stays_idle() {
        let mut controller = SessionController::new(
            Arc::new(VirtualDisplayProvider::new(PickerResponse::Deny)),
            Arc::new(QuietProvider::new(vec![VP8])),
        );
        let mut events = controller.subscribe();

        let result = controller.request_capture(CaptureConstraints::default()).await;
        assert!(matches!(result, Err(SessionError::Capture(_))));
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(matches!(events.try_recv(), Ok(SessionEvent::CaptureFailed(_))));
    }

    #[tokio::test]
    async fn test_capture_twice_is_invalid() {
        let mut controller = quiet_controller(vec![VP8]);
        controller.request_capture(CaptureConstraints::default()).await.unwrap();
        let second = controller.request_capture(CaptureConstraints::default()).await;
        assert!(matches!(
            second,
            Err(SessionError::InvalidState {
                state: SessionState::CaptureActive,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_full_lifecycle_with_manual_chunks() {
        let mut controller = quiet_controller(vec![VP8, "video/mp4"]);
        controller.request_capture(CaptureConstraints::default()).await.unwrap();
        assert_eq!(controller.supported().len(), 2);

        controller.start_recording(&CodecChoice::new(VP8)).unwrap();
        controller.on_chunk_emitted(Bytes::from(vec![1u8; 100]));
        controller.on_chunk_emitted(Bytes::new());
        controller.pause_recording().unwrap();
        controller.on_chunk_emitted(Bytes::from(vec![2u8; 10]));
        controller.resume_recording().unwrap();
        controller.request_flush().unwrap();
        controller.on_chunk_emitted(Bytes::from(vec![3u8; 50]));

        let session = controller.stop_recording().unwrap();
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.chunks().len(), 3);

        controller.on_chunk_emitted(Bytes::from_static(b"late"));
        let artifact = controller.artifact().unwrap();
        assert_eq!(artifact.len(), 160);
        assert_eq!(artifact.mime_type(), "video/webm");
    }

    #[tokio::test]
    async fn test_second_start_leaves_first_session_intact() {
        let mut controller = quiet_controller(vec![VP8]);
        controller.request_capture(CaptureConstraints::default()).await.unwrap();
        let first_id = controller.start_recording(&CodecChoice::new(VP8)).unwrap().id();
        controller.on_chunk_emitted(Bytes::from_static(b"kept"));

        let second = controller.start_recording(&CodecChoice::new(VP8));
        assert!(matches!(
            second,
            Err(SessionError::InvalidState {
                state: SessionState::Recording,
                ..
            })
        ));

        let session = controller.session().unwrap();
        assert_eq!(session.id(), first_id);
        assert_eq!(session.chunks(), vec![Bytes::from_static(b"kept")]);
    }

    #[tokio::test]
    async fn test_new_session_after_stop_resets_chunks() {
        let mut controller = quiet_controller(vec![VP8]);
        controller.request_capture(CaptureConstraints::default()).await.unwrap();
        controller.start_recording(&CodecChoice::new(VP8)).unwrap();
        controller.on_chunk_emitted(Bytes::from_static(b"old"));
        controller.stop_recording().unwrap();

        controller.start_recording(&CodecChoice::new(VP8)).unwrap();
        assert!(controller.session().unwrap().chunks().is_empty());
    }

    #[tokio::test]
    async fn test_track_toggle_is_independent_of_pause() {
        let mut controller = quiet_controller(vec![VP8]);
        controller.request_capture(CaptureConstraints::default()).await.unwrap();
        controller.set_track_enabled(false).unwrap();
        assert_eq!(controller.tracks_enabled(), Some(false));

        controller.start_recording(&CodecChoice::new(VP8)).unwrap();
        controller.pause_recording().unwrap();
        controller.set_track_enabled(true).unwrap();
        assert_eq!(controller.tracks_enabled(), Some(true));
        assert_eq!(controller.state(), SessionState::Paused);

        controller.stop_recording().unwrap();
        assert!(controller.set_track_enabled(false).is_err());
    }

    #[tokio::test]
    async fn test_construction_failure_keeps_capture_active() {
        let mut controller = SessionController::new(
            Arc::new(VirtualDisplayProvider::default()),
            Arc::new(VirtualRecorderProvider::new([VP8]).with_construction_failure(VP8)),
        );
        controller.request_capture(CaptureConstraints::default()).await.unwrap();

        let result = controller.start_recording(&CodecChoice::new(VP8));
        assert!(matches!(result, Err(SessionError::RecorderConstruction(_))));
        assert_eq!(controller.state(), SessionState::CaptureActive);
        assert!(controller.session().is_none());
    }

    #[tokio::test]
    async fn test_start_failure_is_construction_error() {
        let provider = QuietProvider::new(vec![VP8]);
        let refuse_start = Arc::clone(&provider.refuse_start);
        let mut controller =
            SessionController::new(Arc::new(VirtualDisplayProvider::default()), Arc::new(provider));
        controller.request_capture(CaptureConstraints::default()).await.unwrap();

        refuse_start.store(true, Ordering::SeqCst);
        let result = controller.start_recording(&CodecChoice::new(VP8));
        assert!(matches!(
            result,
            Err(SessionError::RecorderConstruction(RecorderError::StartFailed(_)))
        ));
        assert_eq!(controller.state(), SessionState::CaptureActive);
        assert!(controller.session().is_none());

        refuse_start.store(false, Ordering::SeqCst);
        let first_id = controller.start_recording(&CodecChoice::new(VP8)).unwrap().id();
        controller.on_chunk_emitted(Bytes::from_static(b"kept"));
        controller.stop_recording().unwrap();

        refuse_start.store(true, Ordering::SeqCst);
        let retry = controller.start_recording(&CodecChoice::new(VP8));
        assert!(matches!(retry, Err(SessionError::RecorderConstruction(_))));
        assert_eq!(controller.state(), SessionState::Stopped);
        assert_eq!(controller.session().unwrap().id(), first_id);
        assert_eq!(controller.artifact().unwrap().data().as_ref(), b"kept");
    }

    #[test]
    fn test_start_outside_runtime_is_construction_error() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut controller = SessionController::new(
            Arc::new(VirtualDisplayProvider::default()),
            Arc::new(VirtualRecorderProvider::new([VP8])),
        )
        .with_timeslice(Duration::from_millis(50));
        assert_eq!(controller.timeslice(), Duration::from_millis(50));
        runtime
            .block_on(controller.request_capture(CaptureConstraints::default()))
            .unwrap();

        let result = controller.start_recording(&CodecChoice::new(VP8));
        assert!(matches!(
            result,
            Err(SessionError::RecorderConstruction(RecorderError::StartFailed(_)))
        ));
        assert_eq!(controller.state(), SessionState::CaptureActive);
        assert!(controller.session().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_releases_everything() {
        let mut controller = quiet_controller(vec![VP8]);
        let source = controller.request_capture(CaptureConstraints::default()).await.unwrap();
        controller.start_recording(&CodecChoice::new(VP8)).unwrap();

        controller.shutdown();
        assert_eq!(controller.state(), SessionState::Idle);
        assert!(controller.capture_source().is_none());
        assert!(source.tracks().iter().all(|track| !track.is_live()));
    }
}
