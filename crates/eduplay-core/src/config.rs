use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AttentionError, AttentionResult};
use crate::frame::FrameSize;

/// Where the face detection weights are fetched from.
pub const MODEL_LOCATION: &str = "https://cdn.jsdelivr.net/npm/@mediapipe/face_detection/";

/// Detections below this confidence are not counted as a face.
pub const MIN_DETECTION_CONFIDENCE: f32 = 0.5;

/// Capture resolution for the webcam preview and inference input.
pub const CAPTURE_FRAME_SIZE: FrameSize = FrameSize {
    width: 160,
    height: 120,
};

/// Model resolution mode. Only the lightweight short-range model, tuned for
/// faces within ~2m, is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelMode {
    Short,
}

impl std::fmt::Display for ModelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelMode::Short => write!(f, "short"),
        }
    }
}

/// Options handed to a model loader. Always [`ModelOptions::fixed`] in this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    pub mode: ModelMode,
    pub min_detection_confidence: f32,
}

impl ModelOptions {
    pub fn fixed() -> Self {
        Self {
            mode: ModelMode::Short,
            min_detection_confidence: MIN_DETECTION_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SurfaceConfig {
    /// Initial state of the learner's webcam toggle.
    pub webcam_enabled_on_mount: bool,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            webcam_enabled_on_mount: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplingConfig {
    /// Milliseconds between frame samples.
    pub interval_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self { interval_ms: 100 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectorConfig {
    /// Upper bound on model loading. `0` waits forever.
    #[serde(default = "default_model_load_timeout_ms")]
    pub model_load_timeout_ms: u64,
    /// Consecutive inference failures after which detection is switched off
    /// for the session. `None` keeps retrying.
    #[serde(default)]
    pub max_consecutive_failures: Option<u32>,
}

fn default_model_load_timeout_ms() -> u64 {
    30_000
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_load_timeout_ms: default_model_load_timeout_ms(),
            max_consecutive_failures: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AttentionConfig {
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
}

impl AttentionConfig {
    pub fn load_from_file(path: &std::path::Path) -> AttentionResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AttentionConfig = toml::from_str(&contents)?;
        config.validate().map_err(|message| AttentionError::config(message, path))?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> AttentionResult<()> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn to_toml(&self) -> AttentionResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), String> {
        if self.sampling.interval_ms == 0 {
            return Err("sampling.interval_ms must be greater than zero".to_string());
        }
        if self.detector.max_consecutive_failures == Some(0) {
            return Err("detector.max_consecutive_failures must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sampling.interval_ms.max(1))
    }

    pub fn model_load_timeout(&self) -> Option<Duration> {
        match self.detector.model_load_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}
