//! tactus-audio: Audio output via cpal
//!
//! Device enumeration/selection and the output stream that drives the
//! engine's render path once per buffer.

mod device;
mod error;
mod stream;

pub use device::*;
pub use error::*;
pub use stream::*;

/// Output stream configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// Channels the engine renders (the template width)
    pub channels: u16,
    pub buffer_frames: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: tactus_core::DEFAULT_SAMPLE_RATE,
            channels: 2,
            buffer_frames: 1024,
        }
    }
}
