//! Event loop for one lesson surface.
//!
//! Everything runs on a single task: host events, sampling ticks and the
//! results of model-load and inference tasks are handled one at a time, so
//! rapid toggles serialize through disable-before-enable.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use eduplay_core::{AttentionConfig, AttentionError, AttentionResult};

use crate::status::AttentionStatus;
use crate::surface::{Completion, LessonSurface, SurfaceParts};

/// Events from the hosting view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    SetWebcamEnabled(bool),
    RestartCapture,
    VideoPlayed,
    VideoPaused,
}

pub struct AttentionRuntime {
    config: AttentionConfig,
    surface: LessonSurface,
    completions: mpsc::UnboundedReceiver<Completion>,
    status: watch::Sender<AttentionStatus>,
}

impl AttentionRuntime {
    pub fn new(config: AttentionConfig, parts: SurfaceParts) -> Self {
        let (completion_tx, completions) = mpsc::unbounded_channel();
        let surface = LessonSurface::new(&config, parts, completion_tx);
        let (status, _) = watch::channel(surface.status());
        Self {
            config,
            surface,
            completions,
            status,
        }
    }

    /// Mount the surface on the current tokio runtime.
    pub fn spawn(self) -> AttentionHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let status = self.status.subscribe();
        let task = tokio::spawn(self.run(events_rx, cancel.clone()));
        AttentionHandle {
            events: events_tx,
            status,
            cancel,
            task: Some(task),
        }
    }

    /// Drive the surface until `cancel` fires or every event sender is dropped.
    pub async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<SurfaceEvent>,
        cancel: CancellationToken,
    ) {
        let AttentionRuntime {
            config,
            mut surface,
            mut completions,
            status,
        } = self;

        if config.surface.webcam_enabled_on_mount {
            surface.set_webcam_enabled(true).await;
        }
        status.send_replace(surface.status());

        let mut ticker = tokio::time::interval(config.sample_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                event = events.recv() => match event {
                    Some(SurfaceEvent::SetWebcamEnabled(enabled)) => {
                        surface.set_webcam_enabled(enabled).await;
                    }
                    Some(SurfaceEvent::RestartCapture) => surface.restart_capture().await,
                    Some(SurfaceEvent::VideoPlayed) => surface.video_played(),
                    Some(SurfaceEvent::VideoPaused) => surface.video_paused(),
                    None => break,
                },
                _ = cancel.cancelled() => break,
                Some(done) = completions.recv() => surface.handle_completion(done),
                _ = ticker.tick() => surface.sample().await,
            }
            status.send_if_modified(|current| {
                let next = surface.status();
                if *current == next {
                    return false;
                }
                *current = next;
                true
            });
        }

        surface.unmount();
        status.send_replace(surface.status());
    }
}

/// Host-side handle to a mounted lesson surface.
pub struct AttentionHandle {
    events: mpsc::UnboundedSender<SurfaceEvent>,
    status: watch::Receiver<AttentionStatus>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AttentionHandle {
    pub fn set_webcam_enabled(&self, enabled: bool) -> AttentionResult<()> {
        self.send(SurfaceEvent::SetWebcamEnabled(enabled))
    }

    pub fn restart_capture(&self) -> AttentionResult<()> {
        self.send(SurfaceEvent::RestartCapture)
    }

    pub fn video_played(&self) -> AttentionResult<()> {
        self.send(SurfaceEvent::VideoPlayed)
    }

    pub fn video_paused(&self) -> AttentionResult<()> {
        self.send(SurfaceEvent::VideoPaused)
    }

    /// A sender for wiring native video events straight into the surface.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<SurfaceEvent> {
        self.events.clone()
    }

    /// Latest published status.
    pub fn status(&self) -> AttentionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AttentionStatus> {
        self.status.clone()
    }

    /// Unmount the surface, releasing the camera, and return the final status.
    pub async fn unmount(mut self) -> AttentionResult<AttentionStatus> {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| AttentionError::Runtime(e.to_string()))?;
        }
        let status = self.status.borrow().clone();
        Ok(status)
    }

    fn send(&self, event: SurfaceEvent) -> AttentionResult<()> {
        self.events
            .send(event)
            .map_err(|_| AttentionError::Runtime("lesson surface is not running".to_string()))
    }
}

impl Drop for AttentionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
