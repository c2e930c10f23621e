//! tactus-core: Shared types for the Tactus multichannel player
//!
//! This crate provides the foundational types used across all Tactus crates:
//! the sample type, the player state machine states, channel masks with their
//! validation rules, and small formatting helpers.

mod error;
mod mask;
mod state;
mod time;

pub use error::*;
pub use mask::*;
pub use state::*;
pub use time::*;

/// Audio sample type used throughout the player.
///
/// Templates are streamed verbatim to an f32 output stream, so the whole
/// pipeline stays in f32.
pub type Sample = f32;

/// Default playback sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Volume factor bounds
pub const MIN_VOLUME: f32 = 0.0;
pub const MAX_VOLUME: f32 = 2.0;

/// Default volume step for up/down commands
pub const DEFAULT_VOLUME_STEP: f32 = 0.25;
