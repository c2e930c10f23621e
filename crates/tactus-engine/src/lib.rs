//! tactus-engine: Real-time playback engine
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    commands     ┌────────────────┐
//! │ remote /     │───────────────▶ │ PlaybackEngine │──▶ device buffer
//! │ repeat worker│    (MPSC queue) │  render path   │
//! └──────────────┘                 └────────────────┘
//!        │         ┌──────────────┐       ▲
//!        └────────▶│ template     │───────┘
//!   mask change    │ builder      │  TemplateSwapSlot
//!   (background)   └──────────────┘  (single pending entry)
//! ```
//!
//! Every mutation of engine-owned fields (state, position, volume) funnels
//! through the command queue and is applied inside the render callback.
//! Background work hands data to the render path only through the swap slot.

mod engine;
mod error;
mod health;
mod repeat;
mod snapshot;
mod template;

pub use engine::*;
pub use error::*;
pub use health::*;
pub use repeat::*;
pub use snapshot::*;
pub use template::*;
