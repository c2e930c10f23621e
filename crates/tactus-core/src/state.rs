//! Player state machine states

use serde::{Deserialize, Serialize};

/// Playback state. Owned by the engine; mutated only inside the render path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PlayerState {
    Stopped = 0,
    Playing = 1,
    Paused = 2,
}

impl PlayerState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }

    /// Decode from the atomic representation. Unknown values map to Stopped.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Playing,
            2 => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::Stopped
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_round_trip() {
        for state in [PlayerState::Stopped, PlayerState::Playing, PlayerState::Paused] {
            assert_eq!(PlayerState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_unknown_maps_to_stopped() {
        assert_eq!(PlayerState::from_u8(17), PlayerState::Stopped);
    }
}
