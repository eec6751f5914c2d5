//! Lesson scenarios for `eduplay simulate`.
//!
//! ```toml
//! name = "learner steps away"
//! duration_ms = 2000
//!
//! [model]
//! detections = [1, 1, 0, "fail", 0]
//! after = 1
//!
//! [[events]]
//! at_ms = 50
//! action = "play"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use eduplay_attention::scripted::{DetectionScript, FrameOutcome};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub duration_ms: u64,
    #[serde(default)]
    pub camera: CameraScenario,
    #[serde(default)]
    pub model: ModelScenario,
    #[serde(default)]
    pub events: Vec<TimedEvent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CameraScenario {
    /// The learner rejects the camera permission prompt.
    #[serde(default)]
    pub denied: bool,
    /// The view has no preview element to attach the stream to.
    #[serde(default)]
    pub detached: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelScenario {
    /// Per-frame results in sampling order.
    #[serde(default)]
    pub detections: Vec<Step>,
    /// Result for every frame after `detections` runs out.
    #[serde(default = "default_after")]
    pub after: Step,
    #[serde(default)]
    pub load_delay_ms: u64,
    #[serde(default)]
    pub load_error: Option<String>,
}

fn default_after() -> Step {
    Step::Faces(1)
}

impl Default for ModelScenario {
    fn default() -> Self {
        Self {
            detections: Vec::new(),
            after: default_after(),
            load_delay_ms: 0,
            load_error: None,
        }
    }
}

/// A face count, `"fail"` for an inference error or `"faint"` for a single
/// face below the confidence threshold.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Faces(usize),
    Named(String),
}

impl Step {
    fn outcome(&self) -> Result<FrameOutcome> {
        match self {
            Step::Faces(n) => Ok(FrameOutcome::Faces(*n)),
            Step::Named(name) => match name.as_str() {
                "fail" => Ok(FrameOutcome::Fail),
                "faint" => Ok(FrameOutcome::Faint(1)),
                other => anyhow::bail!("unknown detection step '{}'", other),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimedEvent {
    pub at_ms: u64,
    pub action: Action,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Play,
    Pause,
    Enable,
    Disable,
    Restart,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario: {}", path.display()))?;
        let mut scenario: Scenario = toml::from_str(&source)
            .with_context(|| format!("failed to parse scenario: {}", path.display()))?;
        scenario.events.sort_by_key(|event| event.at_ms);
        if let Some(event) = scenario.events.iter().find(|e| e.at_ms > scenario.duration_ms) {
            anyhow::bail!(
                "event {:?} at {}ms is past the end of the scenario ({}ms)",
                event.action,
                event.at_ms,
                scenario.duration_ms
            );
        }
        Ok(scenario)
    }

    pub fn title(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed scenario")
    }

    pub fn detection_script(&self) -> Result<Arc<DetectionScript>> {
        let steps = self
            .model
            .detections
            .iter()
            .map(Step::outcome)
            .collect::<Result<Vec<_>>>()?;
        Ok(DetectionScript::new(steps, self.model.after.outcome()?))
    }
}
