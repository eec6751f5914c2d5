use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use eduplay_attention::scripted::{
    CameraCounters, RecordingVideo, ScriptedCamera, ScriptedModelLoader,
};
use eduplay_attention::{
    AttentionHandle, AttentionRuntime, AttentionStatus, CameraBackend, CaptureTarget,
    ImageSequenceCamera, ModelStatus, SurfaceParts,
};
use eduplay_core::AttentionConfig;

use crate::scenario::{Action, Scenario};

#[derive(Debug, Serialize)]
pub struct Report {
    pub scenario: String,
    pub duration_ms: u64,
    pub pauses: usize,
    pub model_loads: usize,
    pub inferences: usize,
    /// Only tracked for the scripted camera.
    pub camera: Option<CameraReport>,
    /// Status just before the surface was unmounted.
    pub status: AttentionStatus,
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Debug, Serialize)]
pub struct CameraReport {
    pub acquired: usize,
    pub released: usize,
    pub max_live: usize,
    pub frames: usize,
}

impl CameraReport {
    fn from_counters(counters: &CameraCounters) -> Self {
        Self {
            acquired: counters.acquired(),
            released: counters.released(),
            max_live: counters.max_live(),
            frames: counters.frames(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub at_ms: u64,
    pub capturing: bool,
    pub model: ModelStatus,
    pub presence: bool,
    pub playing: bool,
}

impl TimelineEntry {
    fn same_state(&self, other: &TimelineEntry) -> bool {
        self.capturing == other.capturing
            && self.model == other.model
            && self.presence == other.presence
            && self.playing == other.playing
    }
}

/// Play `scenario` against a scripted lesson surface in real time.
pub async fn run(
    scenario: &Scenario,
    config: AttentionConfig,
    frames: Option<PathBuf>,
) -> Result<Report> {
    let script = scenario.detection_script()?;

    let mut counters = None;
    let camera: Box<dyn CameraBackend> = match frames {
        Some(dir) => {
            tracing::info!("Using frames from {}", dir.display());
            Box::new(ImageSequenceCamera::new(dir))
        }
        None => {
            let camera = if scenario.camera.denied {
                ScriptedCamera::denied()
            } else {
                ScriptedCamera::new()
            };
            counters = Some(camera.counters());
            Box::new(camera)
        }
    };

    let mut loader = ScriptedModelLoader::new(Arc::clone(&script));
    if scenario.model.load_delay_ms > 0 {
        loader = loader.with_delay(Duration::from_millis(scenario.model.load_delay_ms));
    }
    if let Some(message) = &scenario.model.load_error {
        loader = loader.with_failure(message.clone());
    }
    let loader = Arc::new(loader);

    let video = RecordingVideo::new();
    let probe = video.probe();
    let parts = SurfaceParts {
        camera,
        loader: loader.clone(),
        video: Box::new(video),
        target: (!scenario.camera.detached).then(|| CaptureTarget::new("webcam-preview")),
    };

    let start = Instant::now();
    let handle = AttentionRuntime::new(config, parts).spawn();
    probe.emit_native_events(handle.event_sender());
    let recorder = record_timeline(&handle, start);

    for event in &scenario.events {
        tokio::time::sleep_until(start + Duration::from_millis(event.at_ms)).await;
        tracing::debug!("{}ms: {:?}", event.at_ms, event.action);
        match event.action {
            Action::Play => handle.video_played(),
            Action::Pause => handle.video_paused(),
            Action::Enable => handle.set_webcam_enabled(true),
            Action::Disable => handle.set_webcam_enabled(false),
            Action::Restart => handle.restart_capture(),
        }?;
    }
    tokio::time::sleep_until(start + Duration::from_millis(scenario.duration_ms)).await;

    let status = handle.status();
    let unmounted = handle.unmount().await?;
    tracing::debug!("Unmounted (capturing={})", unmounted.capturing);
    let timeline = recorder.await.context("timeline recorder failed")?;

    Ok(Report {
        scenario: scenario.title().to_string(),
        duration_ms: scenario.duration_ms,
        pauses: probe.pauses(),
        model_loads: loader.loads(),
        inferences: script.calls(),
        camera: counters.as_deref().map(CameraReport::from_counters),
        status,
        timeline,
    })
}

fn record_timeline(
    handle: &AttentionHandle,
    start: Instant,
) -> tokio::task::JoinHandle<Vec<TimelineEntry>> {
    let mut updates = handle.subscribe();
    tokio::spawn(async move {
        let mut timeline: Vec<TimelineEntry> = Vec::new();
        loop {
            let entry = {
                let status = updates.borrow_and_update();
                TimelineEntry {
                    at_ms: start.elapsed().as_millis() as u64,
                    capturing: status.capturing,
                    model: status.model,
                    presence: status.presence,
                    playing: status.playing,
                }
            };
            if timeline.last().map_or(true, |last| !last.same_state(&entry)) {
                timeline.push(entry);
            }
            if updates.changed().await.is_err() {
                break;
            }
        }
        timeline
    })
}

impl Report {
    pub fn print(&self) {
        println!("🎓 {}", self.scenario);
        println!("   Duration:     {}ms", self.duration_ms);
        println!("   Webcam:       {}", self.status.toggle_label());
        println!("   Attention:    {}", self.status.presence_banner());
        println!("   Model:        {:?}", self.status.model);
        println!("   Pauses:       {}", self.pauses);
        println!("   Model loads:  {}", self.model_loads);
        println!("   Inferences:   {}", self.inferences);
        if let Some(camera) = &self.camera {
            println!(
                "   Camera:       {} acquired, {} released, {} max live, {} frames",
                camera.acquired, camera.released, camera.max_live, camera.frames
            );
        }
        println!();
        println!("   Timeline:");
        for entry in &self.timeline {
            println!(
                "   {:>6}ms  capturing={:<5} model={:<9} presence={:<5} playing={}",
                entry.at_ms,
                entry.capturing,
                format!("{:?}", entry.model),
                entry.presence,
                entry.playing
            );
        }
    }
}
