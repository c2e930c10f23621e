//! Snapshots published to remote observers
//!
//! Snapshots are plain serializable values; the engine pushes them onto an
//! event channel and whatever sink the application wires up (the WebSocket
//! broadcaster in the daemon) forwards them. Nothing here blocks.

use serde::Serialize;

use tactus_core::PlayerState;

/// Player state snapshot, published only on change.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state: PlayerState,
    pub loop_enabled: bool,
    pub volume: f32,
    pub volume_percentage: u32,
    pub auto_start: bool,
    #[serde(flatten)]
    pub repeat: Option<RepeatStatus>,
}

/// Repeat-mode fields, present only while repeat is armed.
#[derive(Debug, Clone, Serialize)]
pub struct RepeatStatus {
    pub repeat_enabled: bool,
    pub repeat_current: u32,
    pub repeat_total: u32,
    pub repeat_interval: f64,
    pub repeat_state: RepeatPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatPhase {
    Playing,
    Waiting,
    Completed,
}

/// Playhead snapshot, published on a fixed cadence while playing.
#[derive(Debug, Clone, Serialize)]
pub struct PositionSnapshot {
    pub position: String,
    pub total_duration: String,
    pub percentage: f64,
    pub current_file: Option<String>,
}

/// Smoothed output level, published while playing when metering is enabled.
#[derive(Debug, Clone, Serialize)]
pub struct LevelSnapshot {
    pub level: f64,
    pub timestamp: f64,
}

/// File transfer progress for load/download requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    Downloading,
    Downloaded,
    DownloadFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferSnapshot {
    pub transfer_state: TransferPhase,
    pub timestamp: f64,
    #[serde(flatten)]
    pub detail: serde_json::Value,
}

/// Everything the engine and file manager emit toward observers.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    State(StateSnapshot),
    Position(PositionSnapshot),
    Level(LevelSnapshot),
    Transfer(TransferSnapshot),
}

/// Seconds since the unix epoch, as used in wire timestamps.
pub fn unix_time_secs() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_snapshot_without_repeat_has_no_repeat_fields() {
        let snap = StateSnapshot {
            state: PlayerState::Stopped,
            loop_enabled: false,
            volume: 1.0,
            volume_percentage: 100,
            auto_start: false,
            repeat: None,
        };

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["state"], "stopped");
        assert!(json.get("repeat_enabled").is_none());
    }

    #[test]
    fn test_state_snapshot_with_repeat_flattens_fields() {
        let snap = StateSnapshot {
            state: PlayerState::Playing,
            loop_enabled: false,
            volume: 0.5,
            volume_percentage: 50,
            auto_start: true,
            repeat: Some(RepeatStatus {
                repeat_enabled: true,
                repeat_current: 2,
                repeat_total: 5,
                repeat_interval: 1.5,
                repeat_state: RepeatPhase::Playing,
            }),
        };

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["repeat_current"], 2);
        assert_eq!(json["repeat_state"], "playing");
    }
}
