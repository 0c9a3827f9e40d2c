//! Console front end
//!
//! Maps typed commands onto the session controller, one command per button
//! of the recorder page.

use crate::capture::CaptureSource;
use crate::config::AppConfig;
use crate::playback::{download, ObjectUrlRegistry, Player};
use crate::recorder::{
    CodecChoice, SessionController, SessionError, SessionState, SessionSummary,
    CANDIDATE_MIME_TYPES,
};
use crate::ui::{ControlPanel, ControllerView};
use crate::utils::error::{AppError, AppResult};
use serde::Serialize;
use std::str::FromStr;

pub const HELP: &str = "\
commands:
  start          acquire a display capture
  codecs         list supported codecs
  codec <n|mime> select the codec for the next recording
  record         start or stop recording
  play           load the last recording into the player
  download       save the last recording to disk
  request-data   ask the recorder to emit pending data
  pause          pause the recorder
  resume         resume the recorder
  pause-track    mute the capture tracks
  resume-track   unmute the capture tracks
  status         print the session status as JSON
  help           show this text
  quit           stop everything and exit";

/// A parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Start,
    ListCodecs,
    SelectCodec(String),
    Record,
    Play,
    Download,
    RequestData,
    Pause,
    Resume,
    PauseTrack,
    ResumeTrack,
    Status,
    Help,
    Quit,
}

impl FromStr for Intent {
    type Err = AppError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        let intent = match command.to_ascii_lowercase().as_str() {
            "start" => Intent::Start,
            "codecs" => Intent::ListCodecs,
            "codec" if !argument.is_empty() => Intent::SelectCodec(argument.to_string()),
            "record" => Intent::Record,
            "play" => Intent::Play,
            "download" => Intent::Download,
            "request-data" | "flush" => Intent::RequestData,
            "pause" => Intent::Pause,
            "resume" => Intent::Resume,
            "pause-track" => Intent::PauseTrack,
            "resume-track" => Intent::ResumeTrack,
            "status" => Intent::Status,
            "help" | "?" => Intent::Help,
            "quit" | "exit" => Intent::Quit,
            _ => return Err(AppError::UnknownCommand(line.to_string())),
        };
        Ok(intent)
    }
}

/// Snapshot printed by `status`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub state: SessionState,
    pub selected_codec: Option<CodecChoice>,
    pub supported_codecs: Vec<CodecChoice>,
    pub tracks_enabled: Option<bool>,
    pub session: Option<SessionSummary>,
    pub controls: ControlPanel,
}

/// Holds the controller and everything the buttons act on
pub struct RecorderShell {
    controller: SessionController,
    registry: ObjectUrlRegistry,
    player: Player,
    config: AppConfig,
    selected: Option<CodecChoice>,
}

impl RecorderShell {
    pub fn new(controller: SessionController, config: AppConfig) -> Self {
        let registry = ObjectUrlRegistry::new();
        Self {
            controller,
            player: Player::new(registry.clone()),
            registry,
            config,
            selected: None,
        }
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn registry(&self) -> &ObjectUrlRegistry {
        &self.registry
    }

    pub fn selected(&self) -> Option<&CodecChoice> {
        self.selected.as_ref()
    }

    pub fn controls(&self) -> ControlPanel {
        ControlPanel::project(&ControllerView::of(&self.controller))
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            state: self.controller.state(),
            selected_codec: self.selected.clone(),
            supported_codecs: self.controller.supported().to_vec(),
            tracks_enabled: self.controller.tracks_enabled(),
            session: self.controller.session().map(|s| s.summary()),
            controls: self.controls(),
        }
    }

    /// Run one command and return the text to show
    pub async fn handle(&mut self, intent: Intent) -> AppResult<String> {
        match intent {
            Intent::Start => {
                let source = self.controller.request_capture(self.config.capture).await?;
                self.selected = self.initial_codec();
                Ok(self.describe_capture(source.as_ref()))
            }
            Intent::ListCodecs => Ok(self.list_codecs()),
            Intent::SelectCodec(argument) => {
                let choice = self.select_codec(&argument)?;
                Ok(format!("selected {}", choice))
            }
            Intent::Record => {
                if self.controller.state().is_active() {
                    let session = self.controller.stop_recording()?;
                    let stats = session.stats();
                    Ok(format!(
                        "recording stopped: {} chunk(s), {} bytes",
                        stats.chunks, stats.total_bytes
                    ))
                } else {
                    let choice = self
                        .selected
                        .clone()
                        .unwrap_or_else(|| CodecChoice::new(CANDIDATE_MIME_TYPES[0]));
                    let session = self.controller.start_recording(&choice)?;
                    self.player.unload();
                    Ok(format!("recording {} with {}", session.id(), choice))
                }
            }
            Intent::Play => {
                let artifact = self.controller.artifact()?;
                let source = self.player.play(&artifact);
                Ok(format!(
                    "playing {} ({} bytes, {})",
                    source.url, source.size, source.mime_type
                ))
            }
            Intent::Download => {
                let artifact = self.controller.artifact()?;
                let receipt =
                    download(&self.registry, &artifact, &self.config.download_options()).await?;
                Ok(format!(
                    "saved {} bytes to {} ({})",
                    receipt.size,
                    receipt.path.display(),
                    receipt.mime_type
                ))
            }
            Intent::RequestData => {
                self.controller.request_flush()?;
                Ok("requested data".to_string())
            }
            Intent::Pause => {
                self.controller.pause_recording()?;
                Ok("recorder paused".to_string())
            }
            Intent::Resume => {
                self.controller.resume_recording()?;
                Ok("recorder resumed".to_string())
            }
            Intent::PauseTrack => {
                self.controller.set_track_enabled(false)?;
                Ok("capture tracks muted".to_string())
            }
            Intent::ResumeTrack => {
                self.controller.set_track_enabled(true)?;
                Ok("capture tracks unmuted".to_string())
            }
            Intent::Status => Ok(serde_json::to_string_pretty(&self.status())?),
            Intent::Help => Ok(HELP.to_string()),
            Intent::Quit => {
                self.shutdown();
                Ok("bye".to_string())
            }
        }
    }

    /// Stop recording, release capture, drop the player source
    pub fn shutdown(&mut self) {
        self.player.unload();
        self.controller.shutdown();
    }

    fn initial_codec(&self) -> Option<CodecChoice> {
        let supported = self.controller.supported();
        let preferred = self
            .config
            .recording
            .preferred_codec
            .as_deref()
            .map(CodecChoice::new)
            .filter(|choice| supported.contains(choice));

        if preferred.is_none() && self.config.recording.preferred_codec.is_some() {
            tracing::warn!("Preferred codec is not supported; falling back to the first candidate");
        }
        preferred.or_else(|| supported.first().cloned())
    }

    fn select_codec(&mut self, argument: &str) -> AppResult<CodecChoice> {
        if self.controller.state().is_active() {
            return Err(SessionError::InvalidState {
                operation: "change codec",
                state: self.controller.state(),
            }
            .into());
        }

        let supported = self.controller.supported();
        let choice = match argument.parse::<usize>() {
            Ok(index) if index >= 1 => supported.get(index - 1).cloned(),
            _ => supported.iter().find(|c| c.as_str() == argument).cloned(),
        };

        let choice = choice.ok_or_else(|| SessionError::UnsupportedCodec {
            codec: argument.to_string(),
        })?;
        self.selected = Some(choice.clone());
        Ok(choice)
    }

    fn list_codecs(&self) -> String {
        let supported = self.controller.supported();
        if supported.is_empty() {
            return "no supported codecs".to_string();
        }
        supported
            .iter()
            .enumerate()
            .map(|(i, codec)| {
                let mark = if Some(codec) == self.selected.as_ref() { "*" } else { " " };
                format!("{} {}. {}", mark, i + 1, codec)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn describe_capture(&self, source: &dyn CaptureSource) -> String {
        let tracks = source
            .tracks()
            .iter()
            .map(|track| format!("{} ({})", track.label(), track.kind()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "capturing stream {}: {}\n{}",
            source.id(),
            tracks,
            self.list_codecs()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{PickerResponse, VirtualDisplayProvider};
    use crate::recorder::VirtualRecorderProvider;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    const VP9: &str = "video/webm;codecs=vp9,opus";
    const VP8: &str = "video/webm;codecs=vp8,opus";

    fn shell(response: PickerResponse, config: AppConfig) -> RecorderShell {
        let controller = SessionController::new(
            Arc::new(VirtualDisplayProvider::new(response)),
            Arc::new(VirtualRecorderProvider::default()),
        )
        .with_timeslice(Duration::from_secs(3600));
        RecorderShell::new(controller, config)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("start".parse::<Intent>().unwrap(), Intent::Start);
        assert_eq!(" Record ".parse::<Intent>().unwrap(), Intent::Record);
        assert_eq!(
            "codec video/webm;codecs=vp8,opus".parse::<Intent>().unwrap(),
            Intent::SelectCodec("video/webm;codecs=vp8,opus".to_string())
        );
        assert_eq!("flush".parse::<Intent>().unwrap(), Intent::RequestData);
        assert!(matches!(
            "codec".parse::<Intent>(),
            Err(AppError::UnknownCommand(_))
        ));
        assert!(matches!(
            "launch".parse::<Intent>(),
            Err(AppError::UnknownCommand(_))
        ));
    }

    #[tokio::test]
    async fn test_record_toggle_and_download() {
        let dir = tempdir().unwrap();
        let mut config = AppConfig::default();
        config.output.download_dir = dir.path().to_path_buf();
        let mut shell = shell(PickerResponse::Grant, config);

        shell.handle(Intent::Start).await.unwrap();
        assert_eq!(
            shell.selected().map(|c| c.as_str()),
            Some("video/webm;codecs=vp9,opus")
        );

        shell.handle(Intent::Record).await.unwrap();
        assert_eq!(shell.controller().state(), SessionState::Recording);
        shell.handle(Intent::RequestData).await.unwrap();
        shell.handle(Intent::PauseTrack).await.unwrap();
        shell.handle(Intent::RequestData).await.unwrap();
        shell.handle(Intent::Record).await.unwrap();
        assert_eq!(shell.controller().state(), SessionState::Stopped);

        let played = shell.handle(Intent::Play).await.unwrap();
        assert!(played.contains("blob:display-recorder/"));

        let saved = shell.handle(Intent::Download).await.unwrap();
        assert!(saved.contains("test.webm"));
        let bytes = std::fs::read(dir.path().join("test.webm")).unwrap();
        assert!(bytes.starts_with(b"VREC"));
        assert!(bytes.ends_with(&[b'V', b'E', b'N', b'D', 0, 0, 0, 0, 0, 0, 0, 2]));
    }

    #[tokio::test]
    async fn test_failed_record_keeps_playback() {
        let controller = SessionController::new(
            Arc::new(VirtualDisplayProvider::default()),
            Arc::new(
                VirtualRecorderProvider::new([VP9, VP8]).with_construction_failure(VP8),
            ),
        )
        .with_timeslice(Duration::from_secs(3600));
        let mut shell = RecorderShell::new(controller, AppConfig::default());

        shell.handle(Intent::Start).await.unwrap();
        shell.handle(Intent::Record).await.unwrap();
        shell.handle(Intent::Record).await.unwrap();
        shell.handle(Intent::Play).await.unwrap();
        assert_eq!(shell.registry().live_count(), 1);

        shell.handle(Intent::SelectCodec("2".to_string())).await.unwrap();
        let failed = shell.handle(Intent::Record).await;
        assert!(matches!(
            failed,
            Err(AppError::Session(SessionError::RecorderConstruction(_)))
        ));
        assert_eq!(shell.controller().state(), SessionState::Stopped);
        assert_eq!(shell.registry().live_count(), 1);

        shell.handle(Intent::SelectCodec("1".to_string())).await.unwrap();
        shell.handle(Intent::Record).await.unwrap();
        assert_eq!(shell.registry().live_count(), 0);
    }

    #[tokio::test]
    async fn test_preferred_codec_and_selection() {
        let mut config = AppConfig::default();
        config.recording.preferred_codec = Some("video/webm;codecs=vp8,opus".to_string());
        let mut shell = shell(PickerResponse::Grant, config);
        shell.handle(Intent::Start).await.unwrap();
        assert_eq!(
            shell.selected().map(|c| c.as_str()),
            Some("video/webm;codecs=vp8,opus")
        );

        shell.handle(Intent::SelectCodec("4".to_string())).await.unwrap();
        assert_eq!(shell.selected().map(|c| c.as_str()), Some("audio/webm;codecs=opus"));

        let unsupported = shell
            .handle(Intent::SelectCodec("video/mp4;codecs=vp9".to_string()))
            .await;
        assert!(matches!(
            unsupported,
            Err(AppError::Session(SessionError::UnsupportedCodec { .. }))
        ));
    }

    #[tokio::test]
    async fn test_denied_capture_surfaces_error() {
        let mut shell = shell(PickerResponse::Deny, AppConfig::default());
        let result = shell.handle(Intent::Start).await;
        assert!(matches!(result, Err(AppError::Session(SessionError::Capture(_)))));
        assert!(shell.controls().is_enabled(crate::ui::Control::Start));
    }

    #[tokio::test]
    async fn test_play_before_stop_is_rejected() {
        let mut shell = shell(PickerResponse::Grant, AppConfig::default());
        shell.handle(Intent::Start).await.unwrap();
        assert!(shell.handle(Intent::Play).await.is_err());

        shell.handle(Intent::Record).await.unwrap();
        assert!(matches!(
            shell.handle(Intent::Download).await,
            Err(AppError::Session(SessionError::InvalidState { .. }))
        ));
    }

    #[tokio::test]
    async fn test_status_and_quit() {
        let mut shell = shell(PickerResponse::Grant, AppConfig::default());
        shell.handle(Intent::Start).await.unwrap();
        let source = shell.controller().capture_source().unwrap();
        assert_eq!(source.tracks().len(), 1);

        let status = shell.handle(Intent::Status).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&status).unwrap();
        assert_eq!(json["state"], "captureActive");
        assert_eq!(json["supportedCodecs"].as_array().map(|a| a.len()), Some(4));

        shell.handle(Intent::Quit).await.unwrap();
        assert_eq!(shell.controller().state(), SessionState::Idle);
        assert!(!source.tracks()[0].is_live());
    }
}
