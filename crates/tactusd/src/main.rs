//! Tactus daemon: remotely controllable multichannel audio player
//!
//! Wires the pieces together: configuration, audio device and stream,
//! playback engine, file manager, WebSocket control plane and the watchdog.

mod config;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use serde_json::json;

use tactus_audio::{AudioConfig, OutputStream, list_output_devices, max_output_channels, select_output_device};
use tactus_core::ChannelMask;
use tactus_engine::{EngineSettings, PlaybackEngine};
use tactus_file::{AudioFileManager, find_audio_files};
use tactus_remote::{
    ControlServer, PublisherSettings, publish_offline, spawn_event_bridge, spawn_heartbeat,
    spawn_level_publisher, spawn_position_publisher,
};

use crate::config::Config;

const WATCHDOG_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "tactusd", about = "Tactus multichannel audio player daemon")]
struct Args {
    /// Path to the configuration file (default: tactus.yaml)
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// List audio output devices and exit
    #[arg(long)]
    list_devices: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(&config.logging.level),
    )
    .init();

    if args.list_devices {
        return print_devices();
    }

    run(config)
}

fn print_devices() -> anyhow::Result<()> {
    let devices = list_output_devices().context("enumerating output devices")?;
    println!("Available audio output devices:");
    println!("{}", "-".repeat(50));
    for device in devices {
        let default = if device.is_default { " (DEFAULT)" } else { "" };
        println!("{}{default}", device.name);
        println!("  Channels: {} out", device.output_channels);
        println!("  Sample rate: {} Hz", device.default_sample_rate);
    }
    Ok(())
}

fn run(config: Config) -> anyhow::Result<()> {
    log::info!("Starting Tactus audio player...");

    // ── Audio files ──────────────────────────────────────────────────────
    let files = find_audio_files(&config.paths.audio_dir)
        .context("no playable audio file found")?;

    // ── Device confirmation ──────────────────────────────────────────────
    let device = select_output_device(config.player.device_name.as_deref())?;
    let device_max = max_output_channels(&device)? as usize;
    let mut channels = config.player.channels.max(1);
    if channels > device_max {
        log::warn!(
            "Device supports {device_max} channel(s), {channels} requested - adjusting"
        );
        channels = device_max;
    }
    let static_mask = build_static_mask(&config.player.channel_mask, channels);

    // ── Engine and initial load ──────────────────────────────────────────
    let engine = Arc::new(PlaybackEngine::new(EngineSettings {
        sample_rate: config.player.sample_rate,
        channels,
        static_mask,
        volume: config.player.volume,
        volume_step: config.player.volume_step,
        level_metering: config.player.audio_level_enabled,
        ..EngineSettings::default()
    }));
    engine.set_auto_start(config.player.auto_start);

    let manager = Arc::new(AudioFileManager::new(
        config.paths.audio_dir.clone(),
        config.player.auto_start,
        Arc::clone(&engine),
    ));
    manager
        .prepare_and_load(&files[0])
        .context("failed to load initial audio file")?;

    // ── Output stream (fatal on failure) ─────────────────────────────────
    let render_engine = Arc::clone(&engine);
    let error_engine = Arc::clone(&engine);
    let stream = OutputStream::open(
        &device,
        AudioConfig {
            sample_rate: config.player.sample_rate,
            channels: channels as u16,
            buffer_frames: config.player.buffer_frames,
        },
        Box::new(move |buffer| render_engine.render(buffer)),
        Box::new(move || error_engine.record_callback_error()),
    )
    .context("failed to open audio output stream")?;
    stream.start().context("failed to start audio stream")?;

    let events = engine
        .take_event_receiver()
        .context("engine event receiver already taken")?;

    log::info!(
        "\"{}\" ready: {} file(s), {} channel(s) @ {}Hz, auto-start {}",
        config.remote.client_id,
        files.len(),
        channels,
        config.player.sample_rate,
        if config.player.auto_start { "ENABLED" } else { "DISABLED" },
    );

    // ── Control plane ────────────────────────────────────────────────────
    let runtime = tokio::runtime::Runtime::new()?;
    let shutdown = Arc::new(AtomicBool::new(false));

    runtime.block_on(async {
        let server = ControlServer::new(Arc::clone(&engine), Arc::clone(&manager));
        let publisher_settings = PublisherSettings {
            client_id: config.remote.client_id.clone(),
            heartbeat_enabled: config.remote.heartbeat,
            heartbeat_period: Duration::from_secs_f64(config.remote.heartbeat_secs.max(1.0)),
            level_freq_hz: config.player.audio_level_freq_hz,
        };

        let mut tasks: Vec<(&'static str, tokio::task::JoinHandle<()>)> = vec![
            (
                "event-bridge",
                spawn_event_bridge(Arc::clone(&server), events, Arc::clone(&shutdown)),
            ),
            (
                "position",
                spawn_position_publisher(
                    Arc::clone(&server),
                    Arc::clone(&engine),
                    Arc::clone(&shutdown),
                ),
            ),
        ];
        if let Some(handle) = spawn_level_publisher(
            Arc::clone(&server),
            Arc::clone(&engine),
            &publisher_settings,
            Arc::clone(&shutdown),
        ) {
            tasks.push(("level", handle));
        }
        if let Some(handle) =
            spawn_heartbeat(Arc::clone(&server), &publisher_settings, Arc::clone(&shutdown))
        {
            tasks.push(("heartbeat", handle));
        }

        {
            let server = Arc::clone(&server);
            let bind_addr = config.remote.bind_addr.clone();
            tokio::spawn(async move {
                if let Err(e) = server.run(&bind_addr).await {
                    log::error!("Control server failed: {e}");
                }
            });
        }

        spawn_watchdog(
            Arc::clone(&server),
            Arc::clone(&engine),
            Arc::clone(&shutdown),
            tasks,
        );

        engine.publish_player_state();

        tokio::signal::ctrl_c().await.ok();
        log::info!("Received interrupt signal");

        publish_offline(&server, &config.remote.client_id);
        // Give client writers a moment to flush the farewell
        tokio::time::sleep(Duration::from_millis(300)).await;
        shutdown.store(true, Ordering::Relaxed);
    });

    // ── Teardown ─────────────────────────────────────────────────────────
    log::info!("Shutting down...");
    engine.cancel_repeat();
    if let Err(e) = stream.stop() {
        log::warn!("Stream stop failed: {e}");
    }
    runtime.shutdown_timeout(Duration::from_secs(1));
    log::info!("Goodbye!");
    Ok(())
}

/// Static mask from config; anything unusable falls back to all-enabled.
fn build_static_mask(raw: &[i64], channels: usize) -> ChannelMask {
    if raw.is_empty() || channels < 2 {
        return ChannelMask::all_enabled(channels);
    }
    match ChannelMask::validate(raw, channels) {
        Ok(report) => {
            if let Some(adjustment) = report.adjustment {
                log::warn!("Static channel mask adjusted: {adjustment:?}");
            }
            report.mask
        }
        Err(e) => {
            log::warn!("Invalid static channel mask ({e}); enabling all channels");
            ChannelMask::all_enabled(channels)
        }
    }
}

/// Periodic system health report: uptime, control connections, task
/// counters and the playback verdict. Logged and broadcast.
fn spawn_watchdog(
    server: Arc<ControlServer>,
    engine: Arc<PlaybackEngine>,
    shutdown: Arc<AtomicBool>,
    tasks: Vec<(&'static str, tokio::task::JoinHandle<()>)>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let started = Instant::now();
        loop {
            tokio::time::sleep(WATCHDOG_PERIOD).await;
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            let uptime_minutes = started.elapsed().as_secs() / 60;
            let connection = server.health_status();
            let audio = engine.check_playback_health();

            let alive = tasks.iter().filter(|(_, h)| !h.is_finished()).count();
            let dead: Vec<&str> = tasks
                .iter()
                .filter(|(_, h)| h.is_finished())
                .map(|(name, _)| *name)
                .collect();

            let audio_label = if audio.is_healthy {
                "OK".to_string()
            } else {
                format!("DEGRADED ({})", audio.issues.join(", "))
            };
            let status = format!(
                "[WATCHDOG] Uptime:{uptime_minutes}m | Control:{} | Clients:{} | Tasks:{alive}/{} | MsgRx:{} | Audio:{audio_label}",
                if connection.connected { "OK" } else { "IDLE" },
                connection.clients,
                tasks.len(),
                connection.messages_rx,
            );

            if !audio.is_healthy || !dead.is_empty() {
                log::error!("{status}");
                if !dead.is_empty() {
                    log::error!("[WATCHDOG] Dead task(s): {}", dead.join(", "));
                }
            } else {
                log::info!("{status}");
            }

            server.broadcast(
                "health",
                json!({
                    "status": "watchdog",
                    "uptime_minutes": uptime_minutes,
                    "connection": connection,
                    "tasks_alive": alive,
                    "tasks_total": tasks.len(),
                    "dead_tasks": dead,
                    "audio": audio,
                }),
            );
        }
    })
}
