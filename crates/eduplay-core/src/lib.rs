//! # eduplay-core
//!
//! Shared primitives for EduPlay's attentive video playback:
//! frames, session epochs, configuration and the error type.

pub mod config;
pub mod epoch;
pub mod error;
pub mod frame;

pub use config::*;

pub use epoch::{Epoch, EpochCounter};
pub use error::{AttentionError, AttentionResult};
pub use frame::{FrameBuffer, FrameSize};
