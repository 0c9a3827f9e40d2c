//! In-memory display capture
//!
//! A capture provider that hands out synthetic streams. Used by the console
//! front end and by tests in place of a real screen-share picker.

use super::traits::{
    CaptureConstraints, CaptureError, CaptureSource, DisplayCaptureProvider, MediaTrack, TrackKind,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How the virtual picker answers a capture request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerResponse {
    /// The user picks a display
    Grant,
    /// The user dismisses the picker
    Deny,
    /// The platform has no capture capability
    Unavailable,
}

/// Synthetic media track
pub struct VirtualTrack {
    kind: TrackKind,
    label: String,
    enabled: AtomicBool,
    live: AtomicBool,
}

impl VirtualTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            enabled: AtomicBool::new(true),
            live: AtomicBool::new(true),
        }
    }
}

impl MediaTrack for VirtualTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            tracing::debug!("Track {} ({}) stopped", self.label, self.kind);
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Synthetic display stream
pub struct VirtualStream {
    id: String,
    tracks: Vec<Arc<VirtualTrack>>,
}

impl VirtualStream {
    /// Build a stream with the tracks the constraints ask for
    pub fn for_constraints(display_index: u32, constraints: &CaptureConstraints) -> Self {
        let mut tracks = Vec::new();
        if constraints.video {
            tracks.push(Arc::new(VirtualTrack::new(
                TrackKind::Video,
                format!("screen:{}", display_index),
            )));
        }
        if constraints.audio.is_requested() {
            let label = match constraints.audio.sample_rate() {
                Some(rate) => format!("system-audio@{}Hz", rate),
                None => "system-audio".to_string(),
            };
            tracks.push(Arc::new(VirtualTrack::new(TrackKind::Audio, label)));
        }

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks,
        }
    }
}

impl CaptureSource for VirtualStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .map(|track| Arc::clone(track) as Arc<dyn MediaTrack>)
            .collect()
    }
}

/// Capture provider backed by synthetic streams
pub struct VirtualDisplayProvider {
    response: PickerResponse,
    display_index: u32,
}

impl VirtualDisplayProvider {
    pub fn new(response: PickerResponse) -> Self {
        Self {
            response,
            display_index: 0,
        }
    }

    /// Pick a different display for granted requests
    pub fn with_display(mut self, display_index: u32) -> Self {
        self.display_index = display_index;
        self
    }
}

impl Default for VirtualDisplayProvider {
    fn default() -> Self {
        Self::new(PickerResponse::Grant)
    }
}

#[async_trait]
impl DisplayCaptureProvider for VirtualDisplayProvider {
    async fn get_display_media(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Arc<dyn CaptureSource>, CaptureError> {
        constraints.validate()?;

        match self.response {
            PickerResponse::Grant => {
                let stream = VirtualStream::for_constraints(self.display_index, constraints);
                tracing::debug!(
                    "Virtual display {} granted stream {} with {} track(s)",
                    self.display_index,
                    stream.id,
                    stream.tracks.len()
                );
                Ok(Arc::new(stream))
            }
            PickerResponse::Deny => Err(CaptureError::PermissionDenied(
                "the user dismissed the display picker".to_string(),
            )),
            PickerResponse::Unavailable => Err(CaptureError::NotAvailable(
                "no display capture capability on this platform".to_string(),
            )),
        }
    }
}
