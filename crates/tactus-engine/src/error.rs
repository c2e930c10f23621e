//! Engine error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No audio samples to play")]
    EmptyAudio,

    #[error("Repeat count out of range: {0} (must be 1-10)")]
    RepeatCount(u32),

    #[error("Repeat interval out of range: {0:.1}s (must be 0-30s)")]
    RepeatInterval(f64),

    #[error(transparent)]
    Mask(#[from] tactus_core::CoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;
