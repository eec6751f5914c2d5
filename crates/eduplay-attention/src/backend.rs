use async_trait::async_trait;
use std::sync::Arc;

use eduplay_core::frame::{FrameBuffer, FrameSize};
use eduplay_core::{AttentionResult, ModelOptions};

/// The off-screen preview surface the camera stream is bound to.
///
/// Owned by the hosting view; the controller only borrows it for `acquire`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTarget {
    pub id: String,
}

impl CaptureTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Grants camera access.
#[async_trait]
pub trait CameraBackend: Send {
    /// Request the camera and bind its stream to `target`, producing frames of `size`.
    async fn acquire(
        &mut self,
        target: &CaptureTarget,
        size: FrameSize,
    ) -> AttentionResult<Box<dyn CameraStream>>;
}

/// A live camera stream. Exclusively owned by the capture session that acquired it.
#[async_trait]
pub trait CameraStream: Send {
    /// Latest frame, or `None` if the device has not produced one yet.
    async fn next_frame(&mut self) -> AttentionResult<Option<FrameBuffer>>;

    /// Stop every track and release the device.
    fn stop(&mut self);
}

/// One face found by the model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub confidence: f32,
}

impl Detection {
    pub fn new(confidence: f32) -> Self {
        Self { confidence }
    }
}

/// A loaded face detection model.
#[async_trait]
pub trait FaceModel: Send + Sync {
    async fn detect(&self, frame: &FrameBuffer) -> AttentionResult<Vec<Detection>>;
}

/// Fetches model weights from a resource location.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(
        &self,
        location: &str,
        options: &ModelOptions,
    ) -> AttentionResult<Arc<dyn FaceModel>>;
}

/// The lesson video element. Play/pause events flow the other way, from the
/// host into [`crate::AttentionHandle`].
pub trait VideoElement: Send {
    fn pause(&mut self);
}
