//! WebSocket control server
//!
//! Accepts clients, decodes their JSON command frames and fans snapshot
//! envelopes out to every connected client. Commands only ever reach the
//! engine through its public command surface, so a misbehaving client cannot
//! corrupt playback state.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use tactus_core::PlayerState;
use tactus_engine::PlaybackEngine;
use tactus_file::AudioFileManager;

use crate::commands::{PlayerCommand, VolumeAction, parse_bool_arg, parse_seek_target, parse_volume_arg};
use crate::{RemoteError, RemoteResult};

/// Broadcast backlog per client before slow consumers start missing messages
const BROADCAST_CAPACITY: usize = 256;

/// Wire envelope: the snapshot fields plus a `type` tag.
pub fn envelope(kind: &str, payload: Value) -> String {
    let mut fields = match payload {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("payload".to_string(), other);
            map
        }
    };
    fields.insert("type".to_string(), Value::String(kind.to_string()));
    Value::Object(fields).to_string()
}

/// Message counters and connection state for the watchdog.
#[derive(Debug, Default)]
pub struct ServerCounters {
    messages_rx: AtomicU64,
    messages_tx: AtomicU64,
    clients: AtomicUsize,
}

/// Connection health summary.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionHealth {
    pub connected: bool,
    pub clients: usize,
    pub messages_rx: u64,
    pub messages_tx: u64,
}

pub struct ControlServer {
    engine: Arc<PlaybackEngine>,
    manager: Arc<AudioFileManager>,
    out_tx: broadcast::Sender<String>,
    counters: ServerCounters,
}

impl ControlServer {
    pub fn new(engine: Arc<PlaybackEngine>, manager: Arc<AudioFileManager>) -> Arc<Self> {
        let (out_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Arc::new(Self {
            engine,
            manager,
            out_tx,
            counters: ServerCounters::default(),
        })
    }

    /// Serialize and fan a snapshot out to every connected client.
    pub fn broadcast(&self, kind: &str, payload: Value) {
        self.counters.messages_tx.fetch_add(1, Ordering::Relaxed);
        // Send only fails with zero receivers; that is not an error here
        let _ = self.out_tx.send(envelope(kind, payload));
    }

    pub fn health_status(&self) -> ConnectionHealth {
        let clients = self.counters.clients.load(Ordering::Relaxed);
        ConnectionHealth {
            connected: clients > 0,
            clients,
            messages_rx: self.counters.messages_rx.load(Ordering::Relaxed),
            messages_tx: self.counters.messages_tx.load(Ordering::Relaxed),
        }
    }

    /// Accept clients until the socket dies.
    pub async fn run(self: Arc<Self>, bind_addr: &str) -> RemoteResult<()> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(RemoteError::Bind)?;
        log::info!("Control server listening on ws://{bind_addr}");

        loop {
            let (stream, peer) = listener.accept().await.map_err(RemoteError::Accept)?;
            let server = Arc::clone(&self);
            tokio::spawn(async move {
                server.handle_client(stream, peer).await;
            });
        }
    }

    async fn handle_client(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        let ws = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                log::warn!("WebSocket handshake failed for {peer}: {e}");
                return;
            }
        };
        log::info!("Control client connected: {peer}");
        self.counters.clients.fetch_add(1, Ordering::Relaxed);

        let (mut sink, mut source) = ws.split();

        // Greet with the current state so clients need not poll
        let greeting = envelope(
            "state",
            serde_json::to_value(self.engine.state_snapshot()).unwrap_or(Value::Null),
        );
        if sink.send(Message::Text(greeting)).await.is_err() {
            self.counters.clients.fetch_sub(1, Ordering::Relaxed);
            return;
        }

        let mut out_rx = self.out_tx.subscribe();
        let writer = tokio::spawn(async move {
            loop {
                match out_rx.recv().await {
                    Ok(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        log::warn!("Client {peer} lagged, {missed} snapshot(s) dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        while let Some(message) = source.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    self.counters.messages_rx.fetch_add(1, Ordering::Relaxed);
                    log::info!("[{peer}] -->> {text}");
                    self.dispatch(&text).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    log::debug!("Client {peer} read error: {e}");
                    break;
                }
            }
        }

        writer.abort();
        self.counters.clients.fetch_sub(1, Ordering::Relaxed);
        log::info!("Control client disconnected: {peer}");
    }

    async fn dispatch(&self, text: &str) {
        let command: PlayerCommand = match serde_json::from_str(text) {
            Ok(command) => command,
            Err(e) => {
                log::warn!("Dropping unparseable command: {e}");
                return;
            }
        };
        self.route(command).await;
    }

    async fn route(&self, command: PlayerCommand) {
        let engine = &self.engine;

        match command {
            PlayerCommand::Start => {
                engine.start_playback();
                log::info!("Start command executed");
            }
            PlayerCommand::Stop => {
                engine.stop_playback();
                engine.interrupt_repeat_worker();
                log::info!("Stop command executed (repeat/loop params preserved)");
            }
            PlayerCommand::Play => {
                // Play on a stopped player acts as a start trigger
                if engine.state() == PlayerState::Stopped {
                    engine.start_playback();
                    log::info!("Start command executed");
                } else {
                    engine.send_command(tactus_engine::Command::Play);
                    log::info!("Play command executed");
                }
            }
            PlayerCommand::Pause => {
                engine.send_command(tactus_engine::Command::Pause);
                log::info!("Pause command executed");
            }
            PlayerCommand::SetLoop { enabled } => match parse_bool_arg(&enabled) {
                Some(value) => {
                    if value && engine.repeat_enabled() {
                        log::info!("Loop enabled (takes effect after the current play ends)");
                    }
                    engine.set_loop(value);
                }
                None => log::warn!("Invalid loop payload: {enabled}"),
            },
            PlayerCommand::Volume { value } => match parse_volume_arg(&value) {
                Some(VolumeAction::Up) => engine.volume_up(),
                Some(VolumeAction::Down) => engine.volume_down(),
                Some(VolumeAction::Set(v)) => {
                    if !engine.set_volume(v) {
                        log::warn!("Volume out of range: {v}");
                    }
                }
                None => log::warn!("Invalid volume payload: {value}"),
            },
            PlayerCommand::Seek { target } => {
                let parsed = parse_seek_target(
                    &target,
                    engine.template_frames(),
                    engine.sample_rate(),
                );
                match parsed {
                    Some(seconds) => {
                        if engine.seek_to_time(seconds) {
                            log::info!("Seek to {seconds:.1}s");
                        } else {
                            log::warn!("Seek position out of range: {seconds:.1}s");
                        }
                    }
                    None => log::warn!("Invalid seek payload: {target}"),
                }
            }
            PlayerCommand::SetChannelMask { mask } => {
                match engine.set_dynamic_channel_mask(&mask) {
                    Ok(report) => log::info!("Channel mask applied: {}", report.mask),
                    Err(e) => log::warn!("Channel mask rejected: {e}"),
                }
            }
            PlayerCommand::SetRepeat {
                count,
                interval_secs,
            } => {
                if count == 0 {
                    engine.cancel_repeat();
                    return;
                }
                if !(0.0..=30.0).contains(&interval_secs) || !interval_secs.is_finite() {
                    log::warn!("Invalid repeat interval: {interval_secs}s (must be 0-30s)");
                    return;
                }
                match engine
                    .start_repeat_playback(count, Duration::from_secs_f64(interval_secs))
                {
                    Ok(()) => {}
                    Err(e) => log::warn!("Repeat command rejected: {e}"),
                }
            }
            PlayerCommand::LoadFile { source } => {
                let manager = Arc::clone(&self.manager);
                tokio::spawn(async move {
                    manager.swap_to(source).await;
                });
            }
            PlayerCommand::Status => {
                engine.publish_player_state();
                if engine.state() == PlayerState::Playing {
                    self.broadcast(
                        "position",
                        serde_json::to_value(engine.position_snapshot())
                            .unwrap_or(Value::Null),
                    );
                }
            }
        }
    }
}

/// Farewell broadcast sent during shutdown.
pub fn publish_offline(server: &ControlServer, client_id: &str) {
    server.broadcast(
        "health",
        json!({
            "status": "offline",
            "client_id": client_id,
        }),
    );
}
