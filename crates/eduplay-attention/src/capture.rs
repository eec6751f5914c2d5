use eduplay_core::frame::{FrameBuffer, FrameSize};
use eduplay_core::{AttentionError, AttentionResult, Epoch, EpochCounter, CAPTURE_FRAME_SIZE};

use crate::backend::{CameraBackend, CameraStream, CaptureTarget};

/// One camera acquisition, from `acquire` to `stop`.
struct CaptureSession {
    epoch: Epoch,
    target: CaptureTarget,
    stream: Box<dyn CameraStream>,
    released: bool,
}

impl CaptureSession {
    fn release(&mut self) {
        if !self.released {
            self.stream.stop();
            self.released = true;
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Owns the camera for the lesson surface. At most one session is live.
pub struct CaptureController {
    backend: Box<dyn CameraBackend>,
    session: Option<CaptureSession>,
    epochs: EpochCounter,
    size: FrameSize,
}

impl CaptureController {
    pub fn new(backend: Box<dyn CameraBackend>) -> Self {
        Self {
            backend,
            session: None,
            epochs: EpochCounter::new(),
            size: CAPTURE_FRAME_SIZE,
        }
    }

    /// Start a capture session bound to `target`, replacing any live one.
    ///
    /// Returns the new session's epoch, or `None` when there is no target or
    /// the camera could not be acquired. Failures are logged, never returned.
    pub async fn enable(&mut self, target: Option<&CaptureTarget>) -> Option<Epoch> {
        match self.start(target).await {
            Ok(epoch) => Some(epoch),
            Err(AttentionError::MissingTarget) => {
                tracing::debug!("No capture target mounted, webcam stays off");
                None
            }
            Err(err) => {
                tracing::warn!("Webcam unavailable, lesson playback will not be gated: {}", err);
                None
            }
        }
    }

    async fn start(&mut self, target: Option<&CaptureTarget>) -> AttentionResult<Epoch> {
        self.disable();
        let target = target.ok_or(AttentionError::MissingTarget)?;
        let stream = self.backend.acquire(target, self.size).await?;

        let epoch = self.epochs.next();
        tracing::info!("Webcam capture started on '{}' ({}, {})", target.id, self.size, epoch);
        self.session = Some(CaptureSession {
            epoch,
            target: target.clone(),
            stream,
            released: false,
        });
        Ok(epoch)
    }

    /// Stop the live session, if any. Returns whether a session was stopped.
    pub fn disable(&mut self) -> bool {
        match self.session.take() {
            Some(mut session) => {
                session.release();
                tracing::info!(
                    "Webcam capture stopped on '{}' ({})",
                    session.target.id,
                    session.epoch
                );
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn epoch(&self) -> Option<Epoch> {
        self.session.as_ref().map(|s| s.epoch)
    }

    /// Pull the latest frame from the live session.
    pub async fn next_frame(&mut self) -> AttentionResult<Option<FrameBuffer>> {
        match self.session.as_mut() {
            Some(session) => session.stream.next_frame().await,
            None => Ok(None),
        }
    }
}
