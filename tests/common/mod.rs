//! Scripted recorder used by the integration tests.
//!
//! The recorder never emits on its own; tests push chunks through the
//! observer it was built with, and every call is logged.

use display_recorder::capture::CaptureSource;
use display_recorder::recorder::{
    ChunkObserver, CodecChoice, MediaRecorder, MediaRecorderProvider, RecorderError, RecorderState,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
pub struct Script {
    pub calls: Vec<String>,
    pub observer: Option<Arc<dyn ChunkObserver>>,
    pub timeslice: Option<Duration>,
}

pub struct ScriptedRecorder {
    mime_type: String,
    state: RecorderState,
    script: Arc<Mutex<Script>>,
}

impl ScriptedRecorder {
    fn log(&self, call: &str) {
        self.script.lock().calls.push(call.to_string());
    }
}

impl MediaRecorder for ScriptedRecorder {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn state(&self) -> RecorderState {
        self.state
    }

    fn start(&mut self, timeslice: Duration) -> Result<(), RecorderError> {
        self.script.lock().timeslice = Some(timeslice);
        self.log("start");
        self.state = RecorderState::Recording;
        Ok(())
    }

    fn pause(&mut self) {
        self.log("pause");
        self.state = RecorderState::Paused;
    }

    fn resume(&mut self) {
        self.log("resume");
        self.state = RecorderState::Recording;
    }

    fn request_data(&mut self) {
        self.log("request_data");
    }

    fn stop(&mut self) {
        self.log("stop");
        self.state = RecorderState::Inactive;
    }
}

pub struct ScriptedProvider {
    supported: Vec<String>,
    pub script: Arc<Mutex<Script>>,
}

impl ScriptedProvider {
    pub fn new(supported: &[&str]) -> Self {
        Self {
            supported: supported.iter().map(|s| s.to_string()).collect(),
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    /// Emit `chunk` as the recorder would
    pub fn emit(&self, chunk: &[u8]) {
        let observer = self.script.lock().observer.clone();
        if let Some(observer) = observer {
            observer.on_chunk_emitted(bytes::Bytes::copy_from_slice(chunk));
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.lock().calls.clone()
    }
}

impl MediaRecorderProvider for ScriptedProvider {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|s| s == mime_type)
    }

    fn create(
        &self,
        _source: Arc<dyn CaptureSource>,
        codec: &CodecChoice,
        observer: Arc<dyn ChunkObserver>,
    ) -> Result<Box<dyn MediaRecorder>, RecorderError> {
        let mut script = self.script.lock();
        script.calls.push(format!("create {}", codec));
        script.observer = Some(observer);
        Ok(Box::new(ScriptedRecorder {
            mime_type: codec.to_string(),
            state: RecorderState::Inactive,
            script: Arc::clone(&self.script),
        }))
    }
}
