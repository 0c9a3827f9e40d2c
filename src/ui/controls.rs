//! Control enablement
//!
//! Which user controls are usable is derived from the controller state alone.

use crate::recorder::{SessionController, SessionState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A user-facing control
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Control {
    Start,
    CodecPicker,
    Record,
    Play,
    Download,
    RequestData,
    Pause,
    Resume,
    PauseTrack,
    ResumeTrack,
}

impl Control {
    pub const ALL: [Control; 10] = [
        Control::Start,
        Control::CodecPicker,
        Control::Record,
        Control::Play,
        Control::Download,
        Control::RequestData,
        Control::Pause,
        Control::Resume,
        Control::PauseTrack,
        Control::ResumeTrack,
    ];
}

impl std::fmt::Display for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Control::Start => "start",
            Control::CodecPicker => "codec",
            Control::Record => "record",
            Control::Play => "play",
            Control::Download => "download",
            Control::RequestData => "request-data",
            Control::Pause => "pause",
            Control::Resume => "resume",
            Control::PauseTrack => "pause-track",
            Control::ResumeTrack => "resume-track",
        };
        f.write_str(name)
    }
}

/// The inputs the projection depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerView {
    pub state: SessionState,
    pub has_codecs: bool,
    pub tracks_enabled: bool,
}

impl ControllerView {
    pub fn of(controller: &SessionController) -> Self {
        Self {
            state: controller.state(),
            has_codecs: !controller.supported().is_empty(),
            tracks_enabled: controller.tracks_enabled().unwrap_or(true),
        }
    }
}

/// Enabled controls plus the record button label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlPanel {
    pub enabled: BTreeSet<Control>,
    pub record_label: String,
}

impl ControlPanel {
    /// Project a controller view onto the control set
    pub fn project(view: &ControllerView) -> Self {
        use SessionState::*;

        let mut enabled = BTreeSet::new();
        let state = view.state;

        if state == Idle {
            enabled.insert(Control::Start);
        }
        if matches!(state, CaptureActive | Stopped) && view.has_codecs {
            enabled.insert(Control::CodecPicker);
            enabled.insert(Control::Record);
        }
        if state.is_active() {
            enabled.insert(Control::Record);
        }
        if state == Stopped {
            enabled.insert(Control::Play);
            enabled.insert(Control::Download);
        }
        if state == Recording {
            enabled.insert(Control::RequestData);
            enabled.insert(Control::Pause);
        }
        if state == Paused {
            enabled.insert(Control::Resume);
        }
        if matches!(state, CaptureActive | Recording | Paused) {
            if view.tracks_enabled {
                enabled.insert(Control::PauseTrack);
            } else {
                enabled.insert(Control::ResumeTrack);
            }
        }

        let record_label = if state.is_active() {
            "Stop Recording"
        } else {
            "Start Recording"
        };

        Self {
            enabled,
            record_label: record_label.to_string(),
        }
    }

    pub fn is_enabled(&self, control: Control) -> bool {
        self.enabled.contains(&control)
    }

    /// One line per control, e.g. `[x] pause`
    pub fn render(&self) -> String {
        Control::ALL
            .iter()
            .map(|control| {
                let mark = if self.is_enabled(*control) { "x" } else { " " };
                if *control == Control::Record {
                    format!("[{}] {} ({})", mark, control, self.record_label)
                } else {
                    format!("[{}] {}", mark, control)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
