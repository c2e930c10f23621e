//! File error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Rejected: file has {0} channels (max supported: 2)")]
    TooManyChannels(usize),

    #[error("Rejected: sample rate {0}Hz outside the allowed range (8000-96000Hz)")]
    SampleRateOutOfRange(u32),

    #[error("Rejected: duration {0:.2}s outside the allowed range (1s - 2h)")]
    DurationOutOfRange(f64),

    #[error("Rejected: system/metadata file: {0}")]
    MetadataFile(PathBuf),

    #[error("No valid audio files in {0}")]
    NoAudioFiles(PathBuf),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Resample error: {0}")]
    Resample(String),

    #[error("Resampled audio is empty")]
    EmptyResample,

    #[error("Download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error(transparent)]
    Engine(#[from] tactus_engine::EngineError),
}

pub type FileResult<T> = Result<T, FileError>;
