//! Saving a recorded artifact to disk

use super::blob::{Blob, ObjectUrl, ObjectUrlRegistry};
use crate::recorder::RecordedArtifact;
use crate::utils::error::AppResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Where and how a download is written
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Target directory
    pub dir: PathBuf,

    /// File name without extension
    pub basename: String,

    /// How long the object URL stays live after the write
    pub revoke_delay: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            basename: "test".to_string(),
            revoke_delay: Duration::from_millis(100),
        }
    }
}

/// Result of a completed download
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadReceipt {
    pub path: PathBuf,
    pub url: ObjectUrl,
    pub mime_type: String,
    pub size: usize,
}

/// Write `artifact` to `<dir>/<basename>.<ext>` through a transient object URL.
///
/// The URL is revoked `revoke_delay` after the write completes.
pub async fn download(
    registry: &ObjectUrlRegistry,
    artifact: &RecordedArtifact,
    options: &DownloadOptions,
) -> AppResult<DownloadReceipt> {
    let blob = Blob::from_parts([artifact.data().clone()], artifact.mime_type());
    let size = blob.size();
    let url = registry.create_object_url(blob.clone());

    let path = options.dir.join(artifact.suggested_filename(&options.basename));
    let written: std::io::Result<()> = async {
        tokio::fs::create_dir_all(&options.dir).await?;
        tokio::fs::write(&path, blob.data()).await
    }
    .await;

    if let Err(e) = written {
        registry.revoke(&url);
        tracing::error!("Failed to write {:?}: {}", path, e);
        return Err(e.into());
    }

    tracing::info!("Saved {} bytes to {:?}", size, path);

    let delayed_registry = registry.clone();
    let delayed_url = url.clone();
    let delay = options.revoke_delay;
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        delayed_registry.revoke(&delayed_url);
    });

    Ok(DownloadReceipt {
        path,
        url,
        mime_type: artifact.mime_type().to_string(),
        size,
    })
}
