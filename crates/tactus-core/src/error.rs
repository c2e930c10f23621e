//! Core error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Channel mask too short: {0} channel(s), need at least 2")]
    MaskTooShort(usize),

    #[error("Invalid channel mask value at index {index}: expected 0 or 1, got {value}")]
    MaskValue { index: usize, value: i64 },

    #[error("Channel mask reconfiguration unsupported for {0} target channel(s)")]
    MaskTargetTooSmall(usize),
}

pub type CoreResult<T> = Result<T, CoreError>;
