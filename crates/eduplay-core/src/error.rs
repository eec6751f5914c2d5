/// Core error types for the attention subsystem.
use std::path::PathBuf;

/// A specialized Result type for attention operations.
pub type AttentionResult<T> = Result<T, AttentionError>;

/// Top-level error type shared by capture, detection and configuration.
///
/// None of these reach the lesson surface as a failure: the runtime logs them
/// and falls back to not gating playback.
#[derive(Debug, thiserror::Error)]
pub enum AttentionError {
    #[error("no capture target is mounted")]
    MissingTarget,

    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("camera permission denied")]
    PermissionDenied,

    #[error("model load failed: {message} ({location})")]
    ModelLoad { location: String, message: String },

    #[error("model load timed out after {0:?}")]
    ModelLoadTimeout(std::time::Duration),

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("config error: {message} ({path:?})")]
    Config { message: String, path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl AttentionError {
    /// Create a model load error for a resource location.
    pub fn model_load(location: impl Into<String>, message: impl Into<String>) -> Self {
        AttentionError::ModelLoad {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create a config error tied to a file.
    pub fn config(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        AttentionError::Config {
            message: message.into(),
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_load_error_display() {
        let err = AttentionError::model_load("https://cdn.example/", "404 not found");
        assert_eq!(
            err.to_string(),
            "model load failed: 404 not found (https://cdn.example/)"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = AttentionError::ModelLoadTimeout(std::time::Duration::from_secs(30));
        assert_eq!(err.to_string(), "model load timed out after 30s");
    }

    #[test]
    fn test_config_error_display() {
        let err = AttentionError::config("unknown field", "/tmp/attention.toml");
        assert!(err.to_string().contains("unknown field"));
    }
}
