use serde::{Deserialize, Serialize};

use crate::error::{AttentionError, AttentionResult};

/// Bytes per pixel of every frame: cameras and decoders hand over RGBA8.
pub const BYTES_PER_PIXEL: usize = 4;

/// Width and height of a capture surface, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One camera frame handed from the stream to the model, RGBA8 row-major.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl FrameBuffer {
    /// Wrap already-decoded RGBA pixels. The byte length must match the dimensions.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> AttentionResult<Self> {
        let expected = FrameSize::new(width, height).pixel_count() * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(AttentionError::InvalidFrame(format!(
                "frame of {width}x{height} expects {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// A frame filled with one color.
    pub fn solid(size: FrameSize, rgba: [u8; 4]) -> Self {
        Self {
            data: rgba.repeat(size.pixel_count()),
            width: size.width,
            height: size.height,
        }
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.size().pixel_count()
    }
}
