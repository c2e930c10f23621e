//! Daemon configuration
//!
//! YAML file with serde defaults for every field, so a minimal config (or
//! none at all) still yields a runnable player.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
    pub player: PlayerConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log filter when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub audio_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from("audio"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output device name; empty/missing selects the system default
    pub device_name: Option<String>,
    pub sample_rate: u32,
    pub channels: usize,
    /// Static per-channel enable mask; empty enables every channel
    pub channel_mask: Vec<i64>,
    pub volume: f32,
    pub volume_step: f32,
    pub buffer_frames: u32,
    pub auto_start: bool,
    pub audio_level_enabled: bool,
    pub audio_level_freq_hz: f64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            sample_rate: tactus_core::DEFAULT_SAMPLE_RATE,
            channels: 2,
            channel_mask: Vec::new(),
            volume: 1.0,
            volume_step: tactus_core::DEFAULT_VOLUME_STEP,
            buffer_frames: 1024,
            auto_start: false,
            audio_level_enabled: false,
            audio_level_freq_hz: 10.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub bind_addr: String,
    pub client_id: String,
    pub heartbeat: bool,
    pub heartbeat_secs: f64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:9871".to_string(),
            client_id: "tactus-player".to_string(),
            heartbeat: false,
            heartbeat_secs: 10.0,
        }
    }
}

impl Config {
    /// Load configuration. An explicitly passed path must exist; the default
    /// path falls back to built-in defaults when absent.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from("tactus.yaml"), false),
        };

        if !path.exists() {
            if explicit {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = serde_yml::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.player.sample_rate, 48_000);
        assert_eq!(config.player.channels, 2);
        assert_eq!(config.remote.bind_addr, "0.0.0.0:9871");
        assert!(!config.player.auto_start);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
player:
  channels: 8
  auto_start: true
remote:
  client_id: shaker-7
"#;
        let config: Config = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.player.channels, 8);
        assert!(config.player.auto_start);
        assert_eq!(config.player.sample_rate, 48_000);
        assert_eq!(config.remote.client_id, "shaker-7");
        assert_eq!(config.remote.bind_addr, "0.0.0.0:9871");
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let missing = Path::new("/definitely/not/here.yaml");
        assert!(Config::load(Some(missing)).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.yaml");
        std::fs::write(
            &path,
            "player:\n  channel_mask: [1, 0, 1, 0]\n  sample_rate: 44100\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.player.channel_mask, vec![1, 0, 1, 0]);
        assert_eq!(config.player.sample_rate, 44_100);
    }
}
