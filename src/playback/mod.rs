//! Playback and download of recorded artifacts
//!
//! Artifacts are turned into blobs, published behind object URLs, and either
//! handed to a player or written to disk.

pub mod blob;
pub mod download;

pub use blob::{Blob, ObjectUrl, ObjectUrlRegistry};
pub use download::{download, DownloadOptions, DownloadReceipt};

use crate::recorder::RecordedArtifact;
use serde::{Deserialize, Serialize};

/// What the player was pointed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSource {
    pub url: ObjectUrl,
    pub mime_type: String,
    pub size: usize,
}

/// Single playback surface; replacing the source revokes the old URL.
pub struct Player {
    registry: ObjectUrlRegistry,
    current: Option<PlaybackSource>,
}

impl Player {
    pub fn new(registry: ObjectUrlRegistry) -> Self {
        Self {
            registry,
            current: None,
        }
    }

    /// Load `artifact` into the player.
    ///
    /// The blob is typed with the full codec string the session recorded with.
    pub fn play(&mut self, artifact: &RecordedArtifact) -> PlaybackSource {
        self.unload();

        let blob = Blob::from_parts([artifact.data().clone()], artifact.codec().as_str());
        let size = blob.size();
        let url = self.registry.create_object_url(blob);
        let source = PlaybackSource {
            url,
            mime_type: artifact.codec().to_string(),
            size,
        };

        tracing::info!("Playing {} ({} bytes)", source.url, size);
        self.current = Some(source.clone());
        source
    }

    /// Drop the current source and revoke its URL
    pub fn unload(&mut self) {
        if let Some(previous) = self.current.take() {
            self.registry.revoke(&previous.url);
        }
    }

    pub fn current(&self) -> Option<&PlaybackSource> {
        self.current.as_ref()
    }
}
