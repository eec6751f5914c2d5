//! A camera backed by still images on disk.
//!
//! Every image in the directory is decoded once at acquire time, scaled to
//! the capture size and served in file-name order, looping at the end.

use async_trait::async_trait;
use image::imageops::FilterType;
use std::path::{Path, PathBuf};

use eduplay_core::frame::{FrameBuffer, FrameSize};
use eduplay_core::{AttentionError, AttentionResult};

use crate::backend::{CameraBackend, CameraStream, CaptureTarget};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

pub struct ImageSequenceCamera {
    dir: PathBuf,
}

impl ImageSequenceCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl CameraBackend for ImageSequenceCamera {
    async fn acquire(
        &mut self,
        target: &CaptureTarget,
        size: FrameSize,
    ) -> AttentionResult<Box<dyn CameraStream>> {
        let dir = self.dir.clone();
        let frames = tokio::task::spawn_blocking(move || load_frames(&dir, size))
            .await
            .map_err(|e| AttentionError::CameraUnavailable(e.to_string()))??;
        if frames.is_empty() {
            return Err(AttentionError::CameraUnavailable(format!(
                "no images in {}",
                self.dir.display()
            )));
        }
        tracing::debug!(
            "Serving {} frames from {} to '{}'",
            frames.len(),
            self.dir.display(),
            target.id
        );
        Ok(Box::new(ImageSequenceStream {
            frames,
            cursor: 0,
            stopped: false,
        }))
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn load_frames(dir: &Path, size: FrameSize) -> AttentionResult<Vec<FrameBuffer>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        AttentionError::CameraUnavailable(format!("cannot open {}: {}", dir.display(), e))
    })?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_image(path))
        .collect();
    paths.sort();

    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        let img = image::open(&path).map_err(|e| {
            AttentionError::CameraUnavailable(format!("cannot decode {}: {}", path.display(), e))
        })?;
        let scaled = image::imageops::resize(
            &img.to_rgba8(),
            size.width,
            size.height,
            FilterType::Triangle,
        );
        frames.push(FrameBuffer::from_raw(
            size.width,
            size.height,
            scaled.into_raw(),
        )?);
    }
    Ok(frames)
}

struct ImageSequenceStream {
    frames: Vec<FrameBuffer>,
    cursor: usize,
    stopped: bool,
}

#[async_trait]
impl CameraStream for ImageSequenceStream {
    async fn next_frame(&mut self) -> AttentionResult<Option<FrameBuffer>> {
        if self.stopped || self.frames.is_empty() {
            return Ok(None);
        }
        let frame = self.frames[self.cursor % self.frames.len()].clone();
        self.cursor += 1;
        Ok(Some(frame))
    }

    fn stop(&mut self) {
        self.stopped = true;
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduplay_core::CAPTURE_FRAME_SIZE;

    fn is_red(frame: &FrameBuffer, x: u32, y: u32) -> bool {
        let offset = ((y * frame.width + x) as usize) * 4;
        let pixel = &frame.data[offset..offset + 4];
        pixel[0] > 250 && pixel[2] < 5
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("eduplay-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_frames_are_scaled_and_cycled() {
        let dir = temp_dir("frames");
        image::RgbaImage::from_pixel(640, 480, image::Rgba([255, 0, 0, 255]))
            .save(dir.join("000.png"))
            .unwrap();
        image::RgbaImage::from_pixel(32, 24, image::Rgba([0, 0, 255, 255]))
            .save(dir.join("001.png"))
            .unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let mut camera = ImageSequenceCamera::new(&dir);
        let mut stream = camera
            .acquire(&CaptureTarget::new("preview"), CAPTURE_FRAME_SIZE)
            .await
            .unwrap();

        let first = stream.next_frame().await.unwrap().unwrap();
        assert_eq!(first.size(), CAPTURE_FRAME_SIZE);
        assert!(is_red(&first, 80, 60));
        let second = stream.next_frame().await.unwrap().unwrap();
        assert_eq!(second.size(), CAPTURE_FRAME_SIZE);
        assert!(!is_red(&second, 80, 60));
        let third = stream.next_frame().await.unwrap().unwrap();
        assert!(is_red(&third, 0, 0));

        stream.stop();
        assert!(stream.next_frame().await.unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_empty_directory_is_unavailable() {
        let dir = temp_dir("empty");
        let mut camera = ImageSequenceCamera::new(&dir);
        let err = match camera
            .acquire(&CaptureTarget::new("preview"), CAPTURE_FRAME_SIZE)
            .await
        {
            Ok(_) => panic!("empty directory should not yield a camera"),
            Err(err) => err,
        };
        assert!(matches!(err, AttentionError::CameraUnavailable(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_directory_is_unavailable() {
        let mut camera = ImageSequenceCamera::new("/nonexistent/eduplay/frames");
        let result = camera
            .acquire(&CaptureTarget::new("preview"), CAPTURE_FRAME_SIZE)
            .await;
        assert!(matches!(result, Err(AttentionError::CameraUnavailable(_))));
    }
}
