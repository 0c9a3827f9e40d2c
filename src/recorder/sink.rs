//! Chunk sink
//!
//! Append-only chunk log handed to the recorder as its observer.

use super::controller::SessionEvent;
use super::media::ChunkObserver;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::broadcast;

#[derive(Debug, Default)]
struct SinkInner {
    chunks: Vec<Bytes>,
    open: bool,
    total_bytes: usize,
    empty_dropped: usize,
    late_dropped: usize,
}

/// Counters describing what the sink saw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SinkStats {
    pub chunks: usize,
    pub total_bytes: usize,
    pub empty_dropped: usize,
    pub late_dropped: usize,
}

/// Collects chunks for one recording session.
///
/// Accepts chunks from creation until [`ChunkSink::close`]; after that every
/// emission is ignored.
pub struct ChunkSink {
    inner: Mutex<SinkInner>,
    event_tx: Option<broadcast::Sender<SessionEvent>>,
}

impl ChunkSink {
    pub fn new(event_tx: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            inner: Mutex::new(SinkInner {
                open: true,
                ..SinkInner::default()
            }),
            event_tx: Some(event_tx),
        }
    }

    /// Sink without event publishing
    pub fn detached() -> Self {
        Self {
            inner: Mutex::new(SinkInner {
                open: true,
                ..SinkInner::default()
            }),
            event_tx: None,
        }
    }

    /// Stop accepting chunks
    pub fn close(&self) {
        self.inner.lock().open = false;
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().open
    }

    /// Snapshot of the chunks in emission order
    pub fn chunks(&self) -> Vec<Bytes> {
        self.inner.lock().chunks.clone()
    }

    pub fn stats(&self) -> SinkStats {
        let inner = self.inner.lock();
        SinkStats {
            chunks: inner.chunks.len(),
            total_bytes: inner.total_bytes,
            empty_dropped: inner.empty_dropped,
            late_dropped: inner.late_dropped,
        }
    }
}

impl ChunkObserver for ChunkSink {
    fn on_chunk_emitted(&self, chunk: Bytes) {
        let mut inner = self.inner.lock();

        if !inner.open {
            inner.late_dropped += 1;
            tracing::warn!("Ignoring {} byte chunk emitted after stop", chunk.len());
            return;
        }

        if chunk.is_empty() {
            inner.empty_dropped += 1;
            tracing::trace!("Discarding empty chunk");
            return;
        }

        let len = chunk.len();
        inner.total_bytes += len;
        inner.chunks.push(chunk);
        let index = inner.chunks.len() - 1;
        drop(inner);

        tracing::debug!("Chunk {} received ({} bytes)", index, len);
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(SessionEvent::ChunkReceived { index, len });
        }
    }
}
