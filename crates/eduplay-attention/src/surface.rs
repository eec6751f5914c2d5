//! The lesson surface: capture, detection and the playback gate wired together.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use eduplay_core::{AttentionConfig, AttentionError, AttentionResult, Epoch};

use crate::backend::{
    CameraBackend, CaptureTarget, Detection, FaceModel, ModelLoader, VideoElement,
};
use crate::capture::CaptureController;
use crate::detector::{AttentionDetector, InferenceOutcome, LoadRequest};
use crate::gate::PlaybackGate;
use crate::status::AttentionStatus;

/// Host-provided collaborators of a lesson surface.
pub struct SurfaceParts {
    pub camera: Box<dyn CameraBackend>,
    pub loader: Arc<dyn ModelLoader>,
    pub video: Box<dyn VideoElement>,
    /// The webcam preview element, if the view has mounted one.
    pub target: Option<CaptureTarget>,
}

/// A finished asynchronous step, tagged with the epoch it ran under.
pub enum Completion {
    ModelLoaded {
        epoch: Epoch,
        outcome: AttentionResult<Arc<dyn FaceModel>>,
    },
    Inference {
        epoch: Epoch,
        result: AttentionResult<Vec<Detection>>,
    },
}

pub struct LessonSurface {
    capture: CaptureController,
    detector: AttentionDetector,
    gate: PlaybackGate,
    loader: Arc<dyn ModelLoader>,
    video: Box<dyn VideoElement>,
    target: Option<CaptureTarget>,
    load_timeout: Option<Duration>,
    /// Kept across sessions so re-enabling the webcam does not refetch weights.
    cached_model: Option<Arc<dyn FaceModel>>,
    webcam_enabled: bool,
    playing: bool,
    pending_load: Option<JoinHandle<()>>,
    pending_inference: Option<JoinHandle<()>>,
    completions: mpsc::UnboundedSender<Completion>,
}

impl LessonSurface {
    pub fn new(
        config: &AttentionConfig,
        parts: SurfaceParts,
        completions: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        Self {
            capture: CaptureController::new(parts.camera),
            detector: AttentionDetector::new(config.detector.max_consecutive_failures),
            gate: PlaybackGate::new(),
            loader: parts.loader,
            video: parts.video,
            target: parts.target,
            load_timeout: config.model_load_timeout(),
            cached_model: None,
            webcam_enabled: false,
            playing: false,
            pending_load: None,
            pending_inference: None,
            completions,
        }
    }

    /// Apply the learner's webcam toggle.
    pub async fn set_webcam_enabled(&mut self, enabled: bool) {
        if enabled == self.webcam_enabled {
            return;
        }
        self.stop_capture();
        self.webcam_enabled = enabled && self.start_capture().await;
        self.reconcile();
    }

    /// Tear the current session down and start a fresh one.
    pub async fn restart_capture(&mut self) {
        if !self.webcam_enabled {
            return;
        }
        self.stop_capture();
        self.webcam_enabled = self.start_capture().await;
        self.reconcile();
    }

    /// Native `play` event from the lesson video.
    pub fn video_played(&mut self) {
        self.playing = true;
        self.reconcile();
    }

    /// Native `pause` event from the lesson video.
    pub fn video_paused(&mut self) {
        self.playing = false;
        self.reconcile();
    }

    /// One sampling tick: pull a frame and start inference if the detector can take it.
    pub async fn sample(&mut self) {
        let Some(epoch) = self.capture.epoch() else {
            return;
        };
        if !self.detector.can_infer(epoch) {
            tracing::trace!("Skipping sample for {}", epoch);
            return;
        }

        let frame = match self.capture.next_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!("Webcam frame unavailable: {}", err);
                return;
            }
        };

        let Some(ticket) = self.detector.begin_inference(epoch) else {
            return;
        };
        let tx = self.completions.clone();
        self.pending_inference = Some(tokio::spawn(async move {
            let result = ticket.model.detect(&frame).await;
            let _ = tx.send(Completion::Inference {
                epoch: ticket.epoch,
                result,
            });
        }));
    }

    pub fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::ModelLoaded { epoch, outcome } => {
                if self.detector.complete_load(epoch, outcome) {
                    self.pending_load = None;
                    if let Some(model) = self.detector.model() {
                        self.cached_model = Some(model);
                    }
                }
            }
            Completion::Inference { epoch, result } => {
                if self.detector.complete_inference(epoch, result) != InferenceOutcome::Stale {
                    self.pending_inference = None;
                }
            }
        }
        self.reconcile();
    }

    /// The hosting view is going away: release everything.
    pub fn unmount(&mut self) {
        self.stop_capture();
        self.webcam_enabled = false;
        tracing::info!("Lesson surface unmounted");
    }

    pub fn status(&self) -> AttentionStatus {
        AttentionStatus {
            webcam_enabled: self.webcam_enabled,
            capturing: self.capture.is_active(),
            epoch: self.capture.epoch(),
            model: self.detector.status(),
            presence: self.detector.presence(),
            gating: self.detector.gated_presence().is_some(),
            playing: self.playing,
            pauses_issued: self.gate.pauses_issued(),
        }
    }

    /// Returns `false` when the camera could not be acquired; the toggle then
    /// falls back to disabled.
    async fn start_capture(&mut self) -> bool {
        let Some(epoch) = self.capture.enable(self.target.as_ref()).await else {
            return false;
        };
        let Some(request) = self.detector.initialize(epoch) else {
            return true;
        };
        match self.cached_model.clone() {
            Some(model) => {
                self.detector.complete_load(epoch, Ok(model));
            }
            None => self.spawn_load(request),
        }
        self.detector.bind_frame_source(epoch);
        true
    }

    fn stop_capture(&mut self) {
        if let Some(task) = self.pending_load.take() {
            task.abort();
        }
        if let Some(task) = self.pending_inference.take() {
            task.abort();
        }
        self.detector.teardown();
        self.capture.disable();
    }

    fn spawn_load(&mut self, request: LoadRequest) {
        let loader = Arc::clone(&self.loader);
        let limit = self.load_timeout;
        let tx = self.completions.clone();
        self.pending_load = Some(tokio::spawn(async move {
            let load = loader.load(request.location, &request.options);
            let outcome = match limit {
                Some(limit) => tokio::time::timeout(limit, load)
                    .await
                    .unwrap_or(Err(AttentionError::ModelLoadTimeout(limit))),
                None => load.await,
            };
            let _ = tx.send(Completion::ModelLoaded {
                epoch: request.epoch,
                outcome,
            });
        }));
    }

    fn reconcile(&mut self) {
        let presence = self.detector.gated_presence();
        self.gate.apply(presence, self.playing, self.video.as_mut());
    }
}

impl Drop for LessonSurface {
    fn drop(&mut self) {
        self.stop_capture();
    }
}
