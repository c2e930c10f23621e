//! Control plane error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Failed to bind control socket: {0}")]
    Bind(std::io::Error),

    #[error("Accept failed: {0}")]
    Accept(std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type RemoteResult<T> = Result<T, RemoteError>;
