//! # eduplay-attention
//!
//! Webcam-driven attention gating for lesson video playback. A
//! [`CaptureController`] owns the camera, an [`AttentionDetector`] turns
//! sampled frames into a presence signal, and a [`PlaybackGate`] pauses the
//! lesson video when the learner disappears while it plays.
//! [`AttentionRuntime`] wires the three together for one lesson surface.

pub mod backend;
pub mod capture;
pub mod detector;
pub mod gate;
pub mod image_source;
pub mod runtime;
pub mod scripted;
pub mod status;
pub mod surface;

pub use backend::{
    CameraBackend, CameraStream, CaptureTarget, Detection, FaceModel, ModelLoader, VideoElement,
};
pub use capture::CaptureController;
pub use detector::{AttentionDetector, InferenceOutcome, ModelStatus};
pub use gate::PlaybackGate;
pub use image_source::ImageSequenceCamera;
pub use runtime::{AttentionHandle, AttentionRuntime, SurfaceEvent};
pub use status::AttentionStatus;
pub use surface::{LessonSurface, SurfaceParts};
