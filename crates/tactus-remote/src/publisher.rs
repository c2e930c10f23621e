//! Background publisher tasks
//!
//! Bridge the engine's event channel into the WebSocket broadcast, plus the
//! fixed-cadence position/level/heartbeat publishers. Every task watches the
//! shared shutdown flag and exits within one period.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::task::JoinHandle;

use tactus_core::PlayerState;
use tactus_engine::{PlaybackEngine, PlayerEvent};

use crate::server::ControlServer;

/// Playhead publish cadence while playing (8 Hz)
const POSITION_PERIOD: Duration = Duration::from_millis(125);

/// Publisher configuration carried over from the daemon config.
#[derive(Debug, Clone)]
pub struct PublisherSettings {
    pub client_id: String,
    pub heartbeat_enabled: bool,
    pub heartbeat_period: Duration,
    pub level_freq_hz: f64,
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Forward engine events (state changes, transfers) to connected clients.
///
/// The engine side is a blocking crossbeam channel, so this runs on the
/// blocking pool with a timeout that keeps shutdown responsive.
pub fn spawn_event_bridge(
    server: Arc<ControlServer>,
    events: crossbeam_channel::Receiver<PlayerEvent>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !shutdown.load(Ordering::Relaxed) {
            match events.recv_timeout(Duration::from_millis(250)) {
                Ok(PlayerEvent::State(snapshot)) => {
                    server.broadcast("state", to_json(&snapshot));
                }
                Ok(PlayerEvent::Position(snapshot)) => {
                    server.broadcast("position", to_json(&snapshot));
                }
                Ok(PlayerEvent::Level(snapshot)) => {
                    server.broadcast("level", to_json(&snapshot));
                }
                Ok(PlayerEvent::Transfer(snapshot)) => {
                    server.broadcast("transfer", to_json(&snapshot));
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }
        log::debug!("Event bridge exiting");
    })
}

/// Publish the playhead position while playing.
pub fn spawn_position_publisher(
    server: Arc<ControlServer>,
    engine: Arc<PlaybackEngine>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(POSITION_PERIOD);
        while !shutdown.load(Ordering::Relaxed) {
            ticker.tick().await;
            if engine.state() == PlayerState::Playing && engine.template_frames() > 0 {
                server.broadcast("position", to_json(&engine.position_snapshot()));
            }
        }
    })
}

/// Publish smoothed output levels while playing. No-op handle when metering
/// is disabled.
pub fn spawn_level_publisher(
    server: Arc<ControlServer>,
    engine: Arc<PlaybackEngine>,
    settings: &PublisherSettings,
    shutdown: Arc<AtomicBool>,
) -> Option<JoinHandle<()>> {
    if !engine.level_metering() {
        log::info!("Level publishing disabled");
        return None;
    }

    let period = Duration::from_secs_f64(1.0 / settings.level_freq_hz.max(0.1));
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        while !shutdown.load(Ordering::Relaxed) {
            ticker.tick().await;
            if engine.state() == PlayerState::Playing {
                server.broadcast("level", to_json(&engine.level_snapshot()));
            }
        }
    }))
}

/// Periodic liveness heartbeat. No-op handle when disabled in config.
pub fn spawn_heartbeat(
    server: Arc<ControlServer>,
    settings: &PublisherSettings,
    shutdown: Arc<AtomicBool>,
) -> Option<JoinHandle<()>> {
    if !settings.heartbeat_enabled {
        log::info!("Heartbeat disabled");
        return None;
    }

    let client_id = settings.client_id.clone();
    let period = settings.heartbeat_period;
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        while !shutdown.load(Ordering::Relaxed) {
            ticker.tick().await;
            server.broadcast(
                "health",
                json!({
                    "status": "online",
                    "client_id": client_id,
                }),
            );
        }
    }))
}
