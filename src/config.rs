//! Configuration
//!
//! Settings are read from an optional JSON file; every field has a default.

use crate::capture::CaptureConstraints;
use crate::playback::DownloadOptions;
use crate::utils::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Constraints passed to the capture provider
    #[serde(default)]
    pub capture: CaptureConstraints,

    /// Recorder settings
    #[serde(default)]
    pub recording: RecordingOptions,

    /// Download settings
    #[serde(default)]
    pub output: OutputOptions,

    /// Tracing filter directive, e.g. `display_recorder=trace`
    #[serde(default)]
    pub log_filter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingOptions {
    /// Interval between recorder chunks (ms)
    #[serde(default = "default_timeslice_ms")]
    pub timeslice_ms: u64,

    /// Codec selected before the first recording, if supported
    #[serde(default)]
    pub preferred_codec: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    /// Directory downloads are written to
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// File name (without extension) for downloads
    #[serde(default = "default_download_basename")]
    pub download_basename: String,

    /// Delay before a download's object URL is revoked (ms)
    #[serde(default = "default_revoke_delay_ms")]
    pub revoke_delay_ms: u64,
}

fn default_timeslice_ms() -> u64 {
    200
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_download_basename() -> String {
    "test".to_string()
}

fn default_revoke_delay_ms() -> u64 {
    100
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            timeslice_ms: default_timeslice_ms(),
            preferred_codec: None,
        }
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            download_basename: default_download_basename(),
            revoke_delay_ms: default_revoke_delay_ms(),
        }
    }
}

impl AppConfig {
    /// Load from `path`
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load from `path` if given, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.recording.timeslice_ms == 0 {
            return Err(AppError::Config("timesliceMs must be positive".to_string()));
        }
        if self.output.download_basename.trim().is_empty() {
            return Err(AppError::Config("downloadBasename must not be empty".to_string()));
        }
        self.capture
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn timeslice(&self) -> Duration {
        Duration::from_millis(self.recording.timeslice_ms)
    }

    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            dir: self.output.download_dir.clone(),
            basename: self.output.download_basename.clone(),
            revoke_delay: Duration::from_millis(self.output.revoke_delay_ms),
        }
    }
}
