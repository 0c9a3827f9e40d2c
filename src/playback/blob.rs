//! Blob and object URL registry
//!
//! Holds assembled blobs behind transient `blob:` URLs that can be resolved
//! by a player or a download and revoked afterwards.

use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const URL_PREFIX: &str = "blob:display-recorder/";

/// Immutable byte blob tagged with a MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
    mime_type: String,
}

impl Blob {
    /// Concatenate `parts` in order into one blob
    pub fn from_parts<I>(parts: I, mime_type: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        let parts: Vec<Bytes> = parts.into_iter().collect();
        let data = match parts.len() {
            0 => Bytes::new(),
            1 => parts.into_iter().next().unwrap_or_default(),
            _ => Bytes::from(parts.concat()),
        };
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A revocable reference to a registered blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry of live object URLs
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlRegistry {
    entries: Arc<RwLock<HashMap<ObjectUrl, Blob>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `blob` and mint a fresh URL for it
    pub fn create_object_url(&self, blob: Blob) -> ObjectUrl {
        let url = ObjectUrl(format!("{}{}", URL_PREFIX, Uuid::new_v4()));
        tracing::debug!("Minted {} ({} bytes, {})", url, blob.size(), blob.mime_type());
        self.entries.write().insert(url.clone(), blob);
        url
    }

    /// Look up a live URL
    pub fn resolve(&self, url: &ObjectUrl) -> Option<Blob> {
        self.entries.read().get(url).cloned()
    }

    /// Release a URL. Returns false if it was not live.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let removed = self.entries.write().remove(url).is_some();
        if removed {
            tracing::debug!("Revoked {}", url);
        }
        removed
    }

    /// Number of live URLs
    pub fn live_count(&self) -> usize {
        self.entries.read().len()
    }
}
