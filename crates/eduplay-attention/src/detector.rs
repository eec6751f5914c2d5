//! Face presence detection bound to a capture session.
//!
//! The detector is a synchronous state machine. The surface runtime performs
//! the actual model load and inference as tasks and reports their results
//! back through [`AttentionDetector::complete_load`] and
//! [`AttentionDetector::complete_inference`], tagged with the epoch they were
//! started under. Results from an epoch that is no longer bound are dropped.

use serde::Serialize;
use std::sync::Arc;

use eduplay_core::{AttentionResult, Epoch, ModelOptions, MODEL_LOCATION};

use crate::backend::{Detection, FaceModel};

/// Externally visible model state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Unloaded,
    Loading,
    Ready,
    Failed,
    /// Switched off after too many consecutive inference failures.
    Suspended,
}

enum ModelState {
    Unloaded,
    Loading,
    Ready(Arc<dyn FaceModel>),
    Failed,
    Suspended,
}

/// A model load the runtime should run for `epoch`.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub epoch: Epoch,
    pub location: &'static str,
    pub options: ModelOptions,
}

/// Permission to run one inference for `epoch`.
pub struct InferenceTicket {
    pub epoch: Epoch,
    pub model: Arc<dyn FaceModel>,
}

/// What a finished inference did to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceOutcome {
    /// Result belonged to an older session and was dropped.
    Stale,
    /// Presence was updated.
    Presence(bool),
    /// The frame failed; presence is unchanged.
    Failed,
    /// The frame failed and the failure limit was reached.
    Suspended,
}

pub struct AttentionDetector {
    options: ModelOptions,
    session: Option<Epoch>,
    frame_source: Option<Epoch>,
    state: ModelState,
    in_flight: bool,
    presence: bool,
    consecutive_failures: u32,
    max_consecutive_failures: Option<u32>,
}

impl AttentionDetector {
    pub fn new(max_consecutive_failures: Option<u32>) -> Self {
        Self {
            options: ModelOptions::fixed(),
            session: None,
            frame_source: None,
            state: ModelState::Unloaded,
            in_flight: false,
            presence: true,
            consecutive_failures: 0,
            max_consecutive_failures,
        }
    }

    /// Start loading the model for `epoch`.
    ///
    /// Returns `None` if this epoch already has a model loading or loaded.
    pub fn initialize(&mut self, epoch: Epoch) -> Option<LoadRequest> {
        if self.session == Some(epoch) && !matches!(self.state, ModelState::Unloaded) {
            return None;
        }
        if self.session.is_some_and(|bound| bound != epoch) {
            self.teardown();
        }
        self.session = Some(epoch);
        self.state = ModelState::Loading;
        self.presence = true;
        Some(LoadRequest {
            epoch,
            location: MODEL_LOCATION,
            options: self.options.clone(),
        })
    }

    /// Apply a finished load. Returns `false` if the load was stale.
    pub fn complete_load(
        &mut self,
        epoch: Epoch,
        outcome: AttentionResult<Arc<dyn FaceModel>>,
    ) -> bool {
        if self.session != Some(epoch) || !matches!(self.state, ModelState::Loading) {
            tracing::debug!("Discarding model load for {}", epoch);
            return false;
        }
        match outcome {
            Ok(model) => {
                tracing::info!(
                    "Face detection ready (mode={}, min_confidence={})",
                    self.options.mode,
                    self.options.min_detection_confidence
                );
                self.state = ModelState::Ready(model);
            }
            Err(err) => {
                tracing::warn!("Failed to initialize face detection, playback will not be gated: {}", err);
                self.state = ModelState::Failed;
                self.presence = true;
            }
        }
        true
    }

    /// Attach inference to the capture session's frames.
    pub fn bind_frame_source(&mut self, epoch: Epoch) -> bool {
        if self.session != Some(epoch) {
            return false;
        }
        self.frame_source = Some(epoch);
        true
    }

    /// Whether a tick for `epoch` should pull a frame at all.
    pub fn can_infer(&self, epoch: Epoch) -> bool {
        self.frame_source == Some(epoch)
            && !self.in_flight
            && matches!(self.state, ModelState::Ready(_))
    }

    /// Claim the single inference slot for `epoch`.
    ///
    /// `None` means "not ready, skip this tick" or an inference is already in flight.
    pub fn begin_inference(&mut self, epoch: Epoch) -> Option<InferenceTicket> {
        if !self.can_infer(epoch) {
            return None;
        }
        let ModelState::Ready(model) = &self.state else {
            return None;
        };
        let model = Arc::clone(model);
        self.in_flight = true;
        Some(InferenceTicket { epoch, model })
    }

    pub fn complete_inference(
        &mut self,
        epoch: Epoch,
        result: AttentionResult<Vec<Detection>>,
    ) -> InferenceOutcome {
        if self.frame_source != Some(epoch) || !self.in_flight {
            tracing::debug!("Discarding inference result for {}", epoch);
            return InferenceOutcome::Stale;
        }
        self.in_flight = false;

        match result {
            Ok(detections) => {
                self.consecutive_failures = 0;
                let faces = detections
                    .iter()
                    .filter(|d| d.confidence >= self.options.min_detection_confidence)
                    .count();
                let present = faces > 0;
                if present != self.presence {
                    tracing::debug!("Presence changed to {} ({} faces)", present, faces);
                }
                self.presence = present;
                InferenceOutcome::Presence(present)
            }
            Err(err) => {
                self.consecutive_failures += 1;
                tracing::warn!("Face detection failed on frame: {}", err);
                match self.max_consecutive_failures {
                    Some(limit) if self.consecutive_failures >= limit => {
                        tracing::warn!(
                            "Face detection switched off after {} consecutive failures",
                            self.consecutive_failures
                        );
                        self.state = ModelState::Suspended;
                        self.presence = true;
                        InferenceOutcome::Suspended
                    }
                    _ => InferenceOutcome::Failed,
                }
            }
        }
    }

    /// Detach from the session, drop the model and reset presence.
    pub fn teardown(&mut self) {
        self.session = None;
        self.frame_source = None;
        self.state = ModelState::Unloaded;
        self.in_flight = false;
        self.presence = true;
        self.consecutive_failures = 0;
    }

    pub fn presence(&self) -> bool {
        self.presence
    }

    /// Presence as the gate should see it: `None` while detection is not live.
    pub fn gated_presence(&self) -> Option<bool> {
        match self.state {
            ModelState::Ready(_) if self.frame_source.is_some() => Some(self.presence),
            _ => None,
        }
    }

    pub fn status(&self) -> ModelStatus {
        match self.state {
            ModelState::Unloaded => ModelStatus::Unloaded,
            ModelState::Loading => ModelStatus::Loading,
            ModelState::Ready(_) => ModelStatus::Ready,
            ModelState::Failed => ModelStatus::Failed,
            ModelState::Suspended => ModelStatus::Suspended,
        }
    }

    pub fn model(&self) -> Option<Arc<dyn FaceModel>> {
        match &self.state {
            ModelState::Ready(model) => Some(Arc::clone(model)),
            _ => None,
        }
    }

    pub fn is_inference_in_flight(&self) -> bool {
        self.in_flight
    }
}
