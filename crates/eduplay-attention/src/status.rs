use serde::Serialize;

use eduplay_core::Epoch;

use crate::detector::ModelStatus;

/// Snapshot of the lesson surface, published after every event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttentionStatus {
    /// The learner's webcam toggle.
    pub webcam_enabled: bool,
    /// A camera stream is live.
    pub capturing: bool,
    pub epoch: Option<Epoch>,
    pub model: ModelStatus,
    /// Latest presence signal. `true` unless a live detector saw no face.
    pub presence: bool,
    /// Whether the gate is currently acting on presence.
    pub gating: bool,
    pub playing: bool,
    pub pauses_issued: u64,
}

impl AttentionStatus {
    /// Label of the webcam toggle button.
    pub fn toggle_label(&self) -> &'static str {
        if self.webcam_enabled {
            "Enabled"
        } else {
            "Disabled"
        }
    }

    /// Learner-facing attention banner.
    pub fn presence_banner(&self) -> &'static str {
        if self.presence {
            "You are attentive"
        } else {
            "User not detected - video paused"
        }
    }
}

impl Default for AttentionStatus {
    fn default() -> Self {
        Self {
            webcam_enabled: false,
            capturing: false,
            epoch: None,
            model: ModelStatus::Unloaded,
            presence: true,
            gating: false,
            playing: false,
            pauses_issued: 0,
        }
    }
}
