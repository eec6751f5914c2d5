//! Scripted camera, model and video backends.
//!
//! Used by the `eduplay simulate` command and by the test suites. Each piece
//! shares its counters through an `Arc` so callers can inspect resource use
//! after handing the backend to the runtime.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

use eduplay_core::frame::{FrameBuffer, FrameSize};
use eduplay_core::{AttentionError, AttentionResult, ModelOptions};

use crate::backend::{
    CameraBackend, CameraStream, CaptureTarget, Detection, FaceModel, ModelLoader, VideoElement,
};
use crate::runtime::SurfaceEvent;

// ──────────────────────────────────────────────────────────────────────────────
// Camera
// ──────────────────────────────────────────────────────────────────────────────

/// Acquire/release bookkeeping for a [`ScriptedCamera`].
#[derive(Debug, Default)]
pub struct CameraCounters {
    acquired: AtomicUsize,
    released: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    frames: AtomicUsize,
}

impl CameraCounters {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Streams acquired and not yet stopped.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live streams ever observed.
    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn frames(&self) -> usize {
        self.frames.load(Ordering::SeqCst)
    }

    fn on_acquire(&self) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
    }

    fn on_release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A camera that produces flat grey frames, or refuses access.
pub struct ScriptedCamera {
    counters: Arc<CameraCounters>,
    denied: bool,
}

impl ScriptedCamera {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(CameraCounters::default()),
            denied: false,
        }
    }

    /// A camera whose permission prompt is always rejected.
    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::new()
        }
    }

    pub fn counters(&self) -> Arc<CameraCounters> {
        Arc::clone(&self.counters)
    }
}

impl Default for ScriptedCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraBackend for ScriptedCamera {
    async fn acquire(
        &mut self,
        _target: &CaptureTarget,
        size: FrameSize,
    ) -> AttentionResult<Box<dyn CameraStream>> {
        if self.denied {
            return Err(AttentionError::PermissionDenied);
        }
        self.counters.on_acquire();
        Ok(Box::new(ScriptedStream {
            counters: Arc::clone(&self.counters),
            size,
            stopped: false,
        }))
    }
}

struct ScriptedStream {
    counters: Arc<CameraCounters>,
    size: FrameSize,
    stopped: bool,
}

#[async_trait]
impl CameraStream for ScriptedStream {
    async fn next_frame(&mut self) -> AttentionResult<Option<FrameBuffer>> {
        if self.stopped {
            return Ok(None);
        }
        self.counters.frames.fetch_add(1, Ordering::SeqCst);
        Ok(Some(FrameBuffer::solid(self.size, [34, 34, 34, 255])))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.counters.on_release();
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Model
// ──────────────────────────────────────────────────────────────────────────────

/// Result of one scripted inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// This many confident faces.
    Faces(usize),
    /// This many faces, all below the confidence threshold.
    Faint(usize),
    /// The model errors on this frame.
    Fail,
}

/// Queue of per-frame outcomes, falling back to a fixed outcome once drained.
#[derive(Debug)]
pub struct DetectionScript {
    steps: Mutex<VecDeque<FrameOutcome>>,
    fallback: Mutex<FrameOutcome>,
    calls: AtomicUsize,
}

impl DetectionScript {
    pub fn new(steps: impl IntoIterator<Item = FrameOutcome>, fallback: FrameOutcome) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            fallback: Mutex::new(fallback),
            calls: AtomicUsize::new(0),
        })
    }

    /// One face on every frame.
    pub fn present() -> Arc<Self> {
        Self::new([], FrameOutcome::Faces(1))
    }

    /// No face on any frame.
    pub fn absent() -> Arc<Self> {
        Self::new([], FrameOutcome::Faces(0))
    }

    pub fn push(&self, outcome: FrameOutcome) {
        self.steps.lock().push_back(outcome);
    }

    pub fn set_fallback(&self, outcome: FrameOutcome) {
        *self.fallback.lock() = outcome;
    }

    /// Inferences answered so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> FrameOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.steps
            .lock()
            .pop_front()
            .unwrap_or_else(|| *self.fallback.lock())
    }
}

/// A face model that answers from a [`DetectionScript`].
pub struct ScriptedModel {
    script: Arc<DetectionScript>,
    hold: Option<Arc<Semaphore>>,
}

impl ScriptedModel {
    pub fn new(script: Arc<DetectionScript>) -> Self {
        Self { script, hold: None }
    }

    /// Each inference waits for one permit from `hold` before answering.
    pub fn held(script: Arc<DetectionScript>, hold: Arc<Semaphore>) -> Self {
        Self {
            script,
            hold: Some(hold),
        }
    }
}

#[async_trait]
impl FaceModel for ScriptedModel {
    async fn detect(&self, frame: &FrameBuffer) -> AttentionResult<Vec<Detection>> {
        if let Some(hold) = &self.hold {
            hold.acquire()
                .await
                .map_err(|e| AttentionError::Inference(e.to_string()))?
                .forget();
        }
        if frame.pixel_count() == 0 {
            return Err(AttentionError::InvalidFrame("empty frame".to_string()));
        }
        match self.script.next() {
            FrameOutcome::Faces(n) => Ok(vec![Detection::new(0.9); n]),
            FrameOutcome::Faint(n) => Ok(vec![Detection::new(0.2); n]),
            FrameOutcome::Fail => Err(AttentionError::Inference("scripted failure".to_string())),
        }
    }
}

/// Loads [`ScriptedModel`]s, optionally slowly or not at all.
pub struct ScriptedModelLoader {
    script: Arc<DetectionScript>,
    hold: Option<Arc<Semaphore>>,
    delay: Option<Duration>,
    failure: Option<String>,
    loads: AtomicUsize,
}

impl ScriptedModelLoader {
    pub fn new(script: Arc<DetectionScript>) -> Self {
        Self {
            script,
            hold: None,
            delay: None,
            failure: None,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Loaded models hold every inference on `hold`.
    pub fn with_hold(mut self, hold: Arc<Semaphore>) -> Self {
        self.hold = Some(hold);
        self
    }

    /// Load attempts started so far.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelLoader for ScriptedModelLoader {
    async fn load(
        &self,
        location: &str,
        options: &ModelOptions,
    ) -> AttentionResult<Arc<dyn FaceModel>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Loading scripted model from {} (mode={})", location, options.mode);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.failure {
            return Err(AttentionError::model_load(location, message.clone()));
        }
        let model = match &self.hold {
            Some(hold) => ScriptedModel::held(Arc::clone(&self.script), Arc::clone(hold)),
            None => ScriptedModel::new(Arc::clone(&self.script)),
        };
        Ok(Arc::new(model))
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Video
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct VideoShared {
    pauses: AtomicUsize,
    native_events: Mutex<Option<mpsc::UnboundedSender<SurfaceEvent>>>,
}

/// A video element that counts pause commands.
pub struct RecordingVideo {
    shared: Arc<VideoShared>,
}

/// Read side of a [`RecordingVideo`].
#[derive(Clone)]
pub struct VideoProbe {
    shared: Arc<VideoShared>,
}

impl RecordingVideo {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(VideoShared::default()),
        }
    }

    pub fn probe(&self) -> VideoProbe {
        VideoProbe {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for RecordingVideo {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoProbe {
    pub fn pauses(&self) -> usize {
        self.shared.pauses.load(Ordering::SeqCst)
    }

    /// Fire a native `pause` event into `events` whenever the element is paused,
    /// the way a browser video element would.
    pub fn emit_native_events(&self, events: mpsc::UnboundedSender<SurfaceEvent>) {
        *self.shared.native_events.lock() = Some(events);
    }
}

impl VideoElement for RecordingVideo {
    fn pause(&mut self) {
        self.shared.pauses.fetch_add(1, Ordering::SeqCst);
        if let Some(events) = self.shared.native_events.lock().as_ref() {
            let _ = events.send(SurfaceEvent::VideoPaused);
        }
    }
}
