//! Codec negotiation
//!
//! The candidate list of container/codec strings, the supported-set query,
//! and the mapping from a codec string to the download container.

use super::media::MediaRecorderProvider;
use serde::{Deserialize, Serialize};

/// Candidate codec strings in preference order.
pub const CANDIDATE_MIME_TYPES: &[&str] = &[
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm;codecs=avc1.620011,opus",
    "video/mp4;codecs=avc1,mp4a.40.2",
    "video/mp4;codecs=avc1,opus",
    "video/mp4;codecs=avc1.620011,opus",
    "video/mp4;codecs=avc1.620011",
    "video/mp4;codecs=vp9,mp4a.40.2",
    "video/mp4;codecs=vp9,opus",
    "video/mp4;codecs=vp9",
    "video/mp4;codecs=av01,opus",
    "video/mp4;codecs=av01,mp4a.40.2",
    "video/mp4",
    "audio/mp4;codecs=opus",
    "audio/mp4;codecs=mp4a.40.2",
    "audio/webm;codecs=opus",
];

/// A container + codec identifier, e.g. `video/webm;codecs=vp9,opus`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodecChoice(String);

impl CodecChoice {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self(mime_type.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Container used when the recording is saved or handed to a player
    pub fn container(&self) -> ContainerType {
        ContainerType::from_codec(&self.0)
    }
}

impl std::fmt::Display for CodecChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CodecChoice {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CodecChoice {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Container type of a finished recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerType {
    Mp4,
    Webm,
}

impl ContainerType {
    /// Any codec string mentioning `video/mp4` is treated as mp4; everything
    /// else (including `audio/mp4`) falls back to webm.
    pub fn from_codec(codec: &str) -> Self {
        if codec.contains("video/mp4") {
            ContainerType::Mp4
        } else {
            ContainerType::Webm
        }
    }

    /// MIME type of the container
    pub fn mime_type(&self) -> &'static str {
        match self {
            ContainerType::Mp4 => "video/mp4",
            ContainerType::Webm => "video/webm",
        }
    }

    /// File extension for this container
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerType::Mp4 => "mp4",
            ContainerType::Webm => "webm",
        }
    }
}

/// Query `provider` for each candidate and keep the supported ones in order.
pub fn supported_codecs(provider: &dyn MediaRecorderProvider) -> Vec<CodecChoice> {
    CANDIDATE_MIME_TYPES
        .iter()
        .filter(|mime_type| provider.is_type_supported(mime_type))
        .map(|mime_type| CodecChoice::new(*mime_type))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::virtual_recorder::VirtualRecorderProvider;

    #[test]
    fn test_container_mapping() {
        let mp4 = CodecChoice::new("video/mp4;codecs=avc1,opus");
        assert_eq!(mp4.container(), ContainerType::Mp4);
        assert_eq!(mp4.container().mime_type(), "video/mp4");
        assert_eq!(mp4.container().extension(), "mp4");

        let webm = CodecChoice::new("video/webm;codecs=vp9,opus");
        assert_eq!(webm.container(), ContainerType::Webm);
        assert_eq!(webm.container().mime_type(), "video/webm");
        assert_eq!(webm.container().extension(), "webm");
    }

    #[test]
    fn test_audio_mp4_falls_back_to_webm() {
        assert_eq!(
            ContainerType::from_codec("audio/mp4;codecs=opus"),
            ContainerType::Webm
        );
    }

    #[test]
    fn test_supported_codecs_keep_candidate_order() {
        let provider = VirtualRecorderProvider::new([
            "audio/webm;codecs=opus",
            "video/mp4",
            "video/webm;codecs=vp8,opus",
            "application/x-unknown",
        ]);
        let codecs = supported_codecs(&provider);
        let names: Vec<&str> = codecs.iter().map(|c| c.as_str()).collect();
        assert_eq!(
            names,
            vec!["video/webm;codecs=vp8,opus", "video/mp4", "audio/webm;codecs=opus"]
        );
    }

    #[test]
    fn test_supported_codecs_empty_platform() {
        let provider = VirtualRecorderProvider::new(Vec::<String>::new());
        assert!(supported_codecs(&provider).is_empty());
    }
}
