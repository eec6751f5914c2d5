use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

use eduplay_attention::scripted::{
    CameraCounters, DetectionScript, FrameOutcome, RecordingVideo, ScriptedCamera,
    ScriptedModelLoader, VideoProbe,
};
use eduplay_attention::{
    AttentionHandle, AttentionRuntime, CaptureTarget, ModelStatus, SurfaceParts,
};
use eduplay_core::AttentionConfig;

struct Harness {
    handle: AttentionHandle,
    camera: Arc<CameraCounters>,
    video: VideoProbe,
    loader: Arc<ScriptedModelLoader>,
}

fn mount(config: AttentionConfig, camera: ScriptedCamera, loader: ScriptedModelLoader) -> Harness {
    let counters = camera.counters();
    let video = RecordingVideo::new();
    let probe = video.probe();
    let loader = Arc::new(loader);
    let parts = SurfaceParts {
        camera: Box::new(camera),
        loader: loader.clone(),
        video: Box::new(video),
        target: Some(CaptureTarget::new("webcam-preview")),
    };
    Harness {
        handle: AttentionRuntime::new(config, parts).spawn(),
        camera: counters,
        video: probe,
        loader,
    }
}

fn mount_default(script: Arc<DetectionScript>) -> Harness {
    mount(
        AttentionConfig::default(),
        ScriptedCamera::new(),
        ScriptedModelLoader::new(script),
    )
}

/// Sampling ticks every 100ms by default.
async fn ticks(n: u64) {
    sleep(Duration::from_millis(100 * n + 10)).await;
}

#[tokio::test(start_paused = true)]
async fn toggling_never_leaks_camera_streams() {
    let h = mount_default(DetectionScript::present());
    ticks(1).await;

    for enabled in [false, true, true, false, true, false, false, true] {
        h.handle.set_webcam_enabled(enabled).unwrap();
    }
    h.handle.restart_capture().unwrap();
    h.handle.restart_capture().unwrap();
    ticks(2).await;
    assert_eq!(h.camera.live(), 1);

    h.handle.unmount().await.unwrap();
    assert_eq!(h.camera.max_live(), 1);
    assert_eq!(h.camera.live(), 0);
    assert_eq!(h.camera.acquired(), h.camera.released());
}

#[tokio::test(start_paused = true)]
async fn absence_while_playing_pauses_within_one_cycle() {
    let script = DetectionScript::present();
    let h = mount_default(script.clone());
    h.handle.video_played().unwrap();
    ticks(3).await;
    assert_eq!(h.video.pauses(), 0);

    script.set_fallback(FrameOutcome::Faces(0));
    ticks(1).await;
    assert_eq!(h.video.pauses(), 1);

    let status = h.handle.status();
    assert!(!status.presence);
    assert_eq!(status.presence_banner(), "User not detected - video paused");
    h.handle.unmount().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn presence_never_pauses_regardless_of_play_state() {
    let h = mount_default(DetectionScript::present());
    for _ in 0..3 {
        h.handle.video_played().unwrap();
        ticks(2).await;
        h.handle.video_paused().unwrap();
        ticks(2).await;
    }
    assert_eq!(h.video.pauses(), 0);
    h.handle.unmount().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn regaining_presence_does_not_resume() {
    let script = DetectionScript::absent();
    let h = mount_default(script.clone());
    h.video.emit_native_events(h.handle.event_sender());
    h.handle.video_played().unwrap();
    ticks(3).await;
    assert_eq!(h.video.pauses(), 1);
    assert!(!h.handle.status().playing);

    script.set_fallback(FrameOutcome::Faces(1));
    ticks(3).await;
    let status = h.handle.status();
    assert!(status.presence);
    assert!(!status.playing);
    assert_eq!(h.video.pauses(), 1);
    h.handle.unmount().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn model_load_failure_never_gates() {
    let h = mount(
        AttentionConfig::default(),
        ScriptedCamera::new(),
        ScriptedModelLoader::new(DetectionScript::absent()).with_failure("cdn unreachable"),
    );
    h.handle.video_played().unwrap();
    ticks(20).await;

    let status = h.handle.status();
    assert_eq!(status.model, ModelStatus::Failed);
    assert!(status.presence);
    assert!(!status.gating);
    assert!(status.capturing);
    assert_eq!(h.video.pauses(), 0);
    h.handle.unmount().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn disabling_twice_is_a_noop() {
    let h = mount_default(DetectionScript::present());
    ticks(1).await;

    h.handle.set_webcam_enabled(false).unwrap();
    ticks(1).await;
    assert_eq!(h.camera.released(), 1);

    h.handle.set_webcam_enabled(false).unwrap();
    ticks(1).await;
    assert_eq!(h.camera.released(), 1);
    assert_eq!(h.handle.status().toggle_label(), "Disabled");
    h.handle.unmount().await.unwrap();
    assert_eq!(h.camera.released(), 1);
}

#[tokio::test(start_paused = true)]
async fn persistent_absence_pauses_exactly_once() {
    let script = DetectionScript::new(
        [FrameOutcome::Faces(0), FrameOutcome::Faces(0), FrameOutcome::Faces(0)],
        FrameOutcome::Faces(0),
    );
    let h = mount_default(script.clone());
    h.handle.video_played().unwrap();
    ticks(4).await;

    assert!(script.calls() >= 3);
    assert_eq!(h.video.pauses(), 1);
    assert_eq!(h.handle.status().pauses_issued, 1);
    h.handle.unmount().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn in_flight_inference_is_ignored_after_disable() {
    let hold = Arc::new(Semaphore::new(0));
    let script = DetectionScript::absent();
    let h = mount(
        AttentionConfig::default(),
        ScriptedCamera::new(),
        ScriptedModelLoader::new(script.clone()).with_hold(hold.clone()),
    );
    h.handle.video_played().unwrap();
    ticks(2).await;
    assert_eq!(h.handle.status().model, ModelStatus::Ready);
    assert!(h.handle.status().presence);

    h.handle.set_webcam_enabled(false).unwrap();
    ticks(1).await;
    hold.add_permits(4);
    ticks(5).await;

    let status = h.handle.status();
    assert!(!status.capturing);
    assert!(status.presence);
    assert_eq!(h.video.pauses(), 0);
    assert_eq!(script.calls(), 0);
    h.handle.unmount().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn slow_load_from_old_session_is_discarded() {
    let h = mount(
        AttentionConfig::default(),
        ScriptedCamera::new(),
        ScriptedModelLoader::new(DetectionScript::present()).with_delay(Duration::from_secs(2)),
    );
    ticks(1).await;
    assert_eq!(h.handle.status().model, ModelStatus::Loading);

    h.handle.restart_capture().unwrap();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.handle.status().model, ModelStatus::Loading);

    sleep(Duration::from_millis(1000)).await;
    let status = h.handle.status();
    assert_eq!(status.model, ModelStatus::Ready);
    assert_eq!(h.loader.loads(), 2);
    h.handle.unmount().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn reenabling_reuses_loaded_model() {
    let h = mount_default(DetectionScript::present());
    ticks(1).await;
    h.handle.set_webcam_enabled(false).unwrap();
    h.handle.set_webcam_enabled(true).unwrap();
    ticks(1).await;

    assert_eq!(h.handle.status().model, ModelStatus::Ready);
    assert_eq!(h.loader.loads(), 1);
    assert_eq!(h.camera.acquired(), 2);
    h.handle.unmount().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn disabling_resets_presence() {
    let h = mount_default(DetectionScript::absent());
    ticks(2).await;
    assert!(!h.handle.status().presence);

    h.handle.set_webcam_enabled(false).unwrap();
    h.handle.video_played().unwrap();
    ticks(3).await;
    let status = h.handle.status();
    assert!(status.presence);
    assert!(!status.gating);
    assert_eq!(h.video.pauses(), 0);
    h.handle.unmount().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn denied_camera_leaves_playback_alone() {
    let h = mount(
        AttentionConfig::default(),
        ScriptedCamera::denied(),
        ScriptedModelLoader::new(DetectionScript::absent()),
    );
    h.handle.video_played().unwrap();
    ticks(5).await;

    let status = h.handle.status();
    assert!(!status.webcam_enabled);
    assert_eq!(status.toggle_label(), "Disabled");
    assert!(!status.capturing);
    assert!(status.presence);
    assert_eq!(h.loader.loads(), 0);
    assert_eq!(h.video.pauses(), 0);

    h.handle.set_webcam_enabled(true).unwrap();
    ticks(2).await;
    let status = h.handle.status();
    assert_eq!(status.toggle_label(), "Disabled");
    assert_eq!(h.camera.acquired(), 0);
    assert_eq!(h.video.pauses(), 0);
    h.handle.unmount().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn missing_preview_element_shows_toggle_disabled() {
    let camera = ScriptedCamera::new();
    let counters = camera.counters();
    let video = RecordingVideo::new();
    let probe = video.probe();
    let parts = SurfaceParts {
        camera: Box::new(camera),
        loader: Arc::new(ScriptedModelLoader::new(DetectionScript::absent())),
        video: Box::new(video),
        target: None,
    };
    let handle = AttentionRuntime::new(AttentionConfig::default(), parts).spawn();
    handle.video_played().unwrap();
    ticks(2).await;

    let status = handle.status();
    assert_eq!(status.toggle_label(), "Disabled");
    assert!(!status.capturing);
    assert_eq!(counters.acquired(), 0);
    assert_eq!(probe.pauses(), 0);
    handle.unmount().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn frame_failures_do_not_stop_the_loop() {
    let script = DetectionScript::new(
        [FrameOutcome::Fail, FrameOutcome::Fail, FrameOutcome::Faint(2)],
        FrameOutcome::Faces(1),
    );
    let h = mount_default(script.clone());
    h.handle.video_played().unwrap();
    ticks(4).await;

    assert!(script.calls() >= 3);
    assert_eq!(h.video.pauses(), 1);
    assert_eq!(h.handle.status().model, ModelStatus::Ready);
    h.handle.unmount().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn repeated_failures_suspend_gating() {
    let mut config = AttentionConfig::default();
    config.detector.max_consecutive_failures = Some(3);
    let h = mount(
        config,
        ScriptedCamera::new(),
        ScriptedModelLoader::new(DetectionScript::new([], FrameOutcome::Fail)),
    );
    h.handle.video_played().unwrap();
    ticks(6).await;

    let status = h.handle.status();
    assert_eq!(status.model, ModelStatus::Suspended);
    assert!(!status.gating);
    assert!(status.presence);
    assert_eq!(h.video.pauses(), 0);
    h.handle.unmount().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn model_load_times_out() {
    let mut config = AttentionConfig::default();
    config.detector.model_load_timeout_ms = 1_000;
    let h = mount(
        config,
        ScriptedCamera::new(),
        ScriptedModelLoader::new(DetectionScript::absent()).with_delay(Duration::from_secs(60)),
    );
    h.handle.video_played().unwrap();
    sleep(Duration::from_millis(1_500)).await;

    let status = h.handle.status();
    assert_eq!(status.model, ModelStatus::Failed);
    assert_eq!(h.video.pauses(), 0);
    h.handle.unmount().await.unwrap();
}
