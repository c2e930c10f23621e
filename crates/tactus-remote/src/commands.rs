//! Command vocabulary and payload parsing
//!
//! Commands arrive as JSON text frames. Payload fields keep the lenient
//! grammars of the control protocol: volume accepts `"+"`, `"-"` or an
//! absolute value; seek accepts `MM:SS`, a percentage or plain seconds;
//! loop accepts booleans or the usual truthy strings.

use serde::Deserialize;
use serde_json::Value;

/// Commands that remote clients can send to the player
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlayerCommand {
    /// Play from the beginning (runs the repeat cycle when armed)
    Start,

    /// Stop playback; armed repeat/loop parameters survive
    Stop,

    /// Resume from the current position (acts as Start when stopped)
    Play,

    /// Hold the current position
    Pause,

    /// Enable or disable loop mode
    SetLoop {
        /// Boolean or truthy string ("true", "1", "yes", "on", "enable")
        enabled: Value,
    },

    /// Step or set the volume
    Volume {
        /// "+" / "-" for stepping, or an absolute value in 0.0..=1.0
        value: Value,
    },

    /// Move the playhead
    Seek {
        /// "MM:SS", "NN%" or absolute seconds
        target: Value,
    },

    /// Override the channel-enable mask
    SetChannelMask { mask: Vec<i64> },

    /// Arm repeat playback; count 0 cancels an active repeat
    SetRepeat {
        count: u32,
        #[serde(default)]
        interval_secs: f64,
    },

    /// Load a new audio file from a local path or HTTP(S) URL
    LoadFile { source: String },

    /// Trigger an immediate state/position publish
    Status,
}

/// Volume payload interpretation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeAction {
    Up,
    Down,
    Set(f32),
}

/// Parse a lenient boolean payload.
pub fn parse_bool_arg(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => {
            let lower = s.trim().to_ascii_lowercase();
            match lower.as_str() {
                "true" | "1" | "yes" | "on" | "enable" => Some(true),
                "false" | "0" | "no" | "off" | "disable" => Some(false),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Parse a volume payload.
pub fn parse_volume_arg(value: &Value) -> Option<VolumeAction> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| VolumeAction::Set(v as f32)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('+') {
                return Some(VolumeAction::Up);
            }
            if trimmed.starts_with('-') {
                return Some(VolumeAction::Down);
            }
            trimmed.parse::<f32>().ok().map(VolumeAction::Set)
        }
        _ => None,
    }
}

/// Parse a seek payload into absolute seconds.
///
/// Percentage targets need the current duration; `total_frames`/`sample_rate`
/// describe the loaded template.
pub fn parse_seek_target(value: &Value, total_frames: usize, sample_rate: u32) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim().trim_matches(|c| c == '"' || c == '\'');

            if let Some((minutes, seconds)) = trimmed.split_once(':') {
                let minutes: u32 = minutes.parse().ok()?;
                let seconds: u32 = seconds.parse().ok()?;
                return Some(f64::from(minutes) * 60.0 + f64::from(seconds));
            }

            if let Some(percent) = trimmed.strip_suffix('%') {
                let percent: f64 = percent.parse().ok()?;
                if !(0.0..=100.0).contains(&percent) || total_frames == 0 {
                    return None;
                }
                let total_secs = total_frames as f64 / f64::from(sample_rate);
                return Some(percent / 100.0 * total_secs);
            }

            trimmed.parse::<f64>().ok()
        }
        _ => None,
    }
}
