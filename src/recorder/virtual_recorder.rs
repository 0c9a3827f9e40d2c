//! In-memory media recorder
//!
//! Produces synthetic chunks on a tokio interval so the session lifecycle can
//! run without a real encoder. Chunk layout:
//! - header: `VREC`, u16 BE length, codec string (prefixed to the first chunk)
//! - block: `BLK`, flag byte (1 = live content, 0 = blank), u64 BE sequence,
//!   32 payload bytes
//! - trailer: `VEND`, u64 BE block count (emitted by `stop`)

use super::codec::CodecChoice;
use super::media::{ChunkObserver, MediaRecorder, MediaRecorderProvider, RecorderError, RecorderState};
use crate::capture::CaptureSource;
use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const HEADER_MAGIC: &[u8] = b"VREC";
const BLOCK_MAGIC: &[u8] = b"BLK";
const TRAILER_MAGIC: &[u8] = b"VEND";
const BLOCK_PAYLOAD: usize = 32;

/// Codecs a Chromium-like platform reports as supported
pub const CHROMIUM_SUPPORTED: &[&str] = &[
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm;codecs=avc1.620011,opus",
    "audio/webm;codecs=opus",
];

#[derive(Default)]
struct EmitState {
    header_sent: bool,
    stopped: bool,
    sequence: u64,
}

struct Shared {
    mime_type: String,
    source: Arc<dyn CaptureSource>,
    observer: Arc<dyn ChunkObserver>,
    paused: AtomicBool,
    emit: Mutex<EmitState>,
}

impl Shared {
    fn content_live(&self) -> bool {
        self.source
            .tracks()
            .iter()
            .any(|track| track.is_live() && track.is_enabled())
    }

    fn header(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_MAGIC.len() + 2 + self.mime_type.len());
        buf.put_slice(HEADER_MAGIC);
        buf.put_u16(self.mime_type.len() as u16);
        buf.put_slice(self.mime_type.as_bytes());
        buf.freeze()
    }

    /// Deliver `body`, prefixed with the header if nothing was sent yet.
    fn deliver(&self, emit: &mut EmitState, body: &[u8]) {
        let mut chunk = BytesMut::new();
        if !emit.header_sent {
            chunk.put_slice(&self.header());
            emit.header_sent = true;
        }
        chunk.put_slice(body);
        self.observer.on_chunk_emitted(chunk.freeze());
    }

    fn emit_block(&self) {
        let mut emit = self.emit.lock();
        if emit.stopped {
            return;
        }

        let live = self.content_live();
        let sequence = emit.sequence;
        emit.sequence += 1;

        let mut block = BytesMut::with_capacity(BLOCK_MAGIC.len() + 9 + BLOCK_PAYLOAD);
        block.put_slice(BLOCK_MAGIC);
        block.put_u8(live as u8);
        block.put_u64(sequence);
        let fill = if live { (sequence % 251) as u8 + 1 } else { 0 };
        block.put_bytes(fill, BLOCK_PAYLOAD);

        self.deliver(&mut emit, &block);
    }

    fn emit_trailer(&self) {
        let mut emit = self.emit.lock();
        if emit.stopped {
            return;
        }

        let mut trailer = BytesMut::with_capacity(TRAILER_MAGIC.len() + 8);
        trailer.put_slice(TRAILER_MAGIC);
        trailer.put_u64(emit.sequence);
        self.deliver(&mut emit, &trailer);
        emit.stopped = true;
    }
}

/// Recorder that emits synthetic blocks every timeslice
pub struct VirtualMediaRecorder {
    shared: Arc<Shared>,
    state: RecorderState,
    ticker: Option<JoinHandle<()>>,
}

impl VirtualMediaRecorder {
    fn new(mime_type: String, source: Arc<dyn CaptureSource>, observer: Arc<dyn ChunkObserver>) -> Self {
        Self {
            shared: Arc::new(Shared {
                mime_type,
                source,
                observer,
                paused: AtomicBool::new(false),
                emit: Mutex::new(EmitState::default()),
            }),
            state: RecorderState::Inactive,
            ticker: None,
        }
    }
}

impl MediaRecorder for VirtualMediaRecorder {
    fn mime_type(&self) -> &str {
        &self.shared.mime_type
    }

    fn state(&self) -> RecorderState {
        self.state
    }

    fn start(&mut self, timeslice: Duration) -> Result<(), RecorderError> {
        if self.state != RecorderState::Inactive || self.shared.emit.lock().stopped {
            return Err(RecorderError::StartFailed("recorder already started".to_string()));
        }
        if timeslice.is_zero() {
            return Err(RecorderError::StartFailed("timeslice must be positive".to_string()));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RecorderError::StartFailed(format!("no async runtime: {}", e)))?;

        let shared = Arc::clone(&self.shared);
        self.ticker = Some(runtime.spawn(async move {
            let mut interval = tokio::time::interval(timeslice);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !shared.paused.load(Ordering::SeqCst) {
                    shared.emit_block();
                }
            }
        }));

        self.state = RecorderState::Recording;
        tracing::debug!(
            "Virtual recorder started ({}, timeslice {}ms)",
            self.shared.mime_type,
            timeslice.as_millis()
        );
        Ok(())
    }

    fn pause(&mut self) {
        if self.state == RecorderState::Recording {
            self.shared.paused.store(true, Ordering::SeqCst);
            self.state = RecorderState::Paused;
        }
    }

    fn resume(&mut self) {
        if self.state == RecorderState::Paused {
            self.shared.paused.store(false, Ordering::SeqCst);
            self.state = RecorderState::Recording;
        }
    }

    fn request_data(&mut self) {
        match self.state {
            RecorderState::Recording => self.shared.emit_block(),
            // Nothing buffered while paused.
            RecorderState::Paused => self.shared.observer.on_chunk_emitted(Bytes::new()),
            RecorderState::Inactive => {}
        }
    }

    fn stop(&mut self) {
        if self.state == RecorderState::Inactive {
            return;
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.shared.emit_trailer();
        self.state = RecorderState::Inactive;
        tracing::debug!("Virtual recorder stopped");
    }
}

impl Drop for VirtualMediaRecorder {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

/// Recorder provider with a configurable capability list
pub struct VirtualRecorderProvider {
    supported: Vec<String>,
    failing: Vec<String>,
}

impl VirtualRecorderProvider {
    pub fn new<I, S>(supported: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            supported: supported.into_iter().map(Into::into).collect(),
            failing: Vec::new(),
        }
    }

    /// Claim support for `mime_type` but refuse to construct a recorder for it
    pub fn with_construction_failure(mut self, mime_type: impl Into<String>) -> Self {
        self.failing.push(mime_type.into());
        self
    }

    pub fn supported(&self) -> &[String] {
        &self.supported
    }
}

impl Default for VirtualRecorderProvider {
    fn default() -> Self {
        Self::new(CHROMIUM_SUPPORTED.iter().copied())
    }
}

impl MediaRecorderProvider for VirtualRecorderProvider {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|s| s == mime_type)
    }

    fn create(
        &self,
        source: Arc<dyn CaptureSource>,
        codec: &CodecChoice,
        observer: Arc<dyn ChunkObserver>,
    ) -> Result<Box<dyn MediaRecorder>, RecorderError> {
        if self.failing.iter().any(|s| s == codec.as_str()) || !self.is_type_supported(codec.as_str()) {
            return Err(RecorderError::Rejected {
                codec: codec.to_string(),
                reason: "NotSupportedError".to_string(),
            });
        }
        if !source.tracks().iter().any(|track| track.is_live()) {
            return Err(RecorderError::NoLiveTracks);
        }

        Ok(Box::new(VirtualMediaRecorder::new(
            codec.to_string(),
            source,
            observer,
        )))
    }
}
