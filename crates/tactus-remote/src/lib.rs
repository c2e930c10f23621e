//! tactus-remote: WebSocket control plane
//!
//! Remote clients connect over WebSocket, send JSON commands and receive
//! state/position/level/health snapshots. The transport never touches engine
//! state directly: every operation goes through the engine's public command
//! surface.

mod commands;
mod error;
mod publisher;
mod server;

pub use commands::*;
pub use error::*;
pub use publisher::*;
pub use server::*;
