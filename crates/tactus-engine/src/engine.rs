//! Playback engine: atomic state machine and the render path
//!
//! The render path is invoked by the audio device once per buffer and must
//! complete in bounded time: no blocking I/O, no unbounded loops, no
//! allocation outside the explicit Start-triggered template rebuild.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use tactus_core::{
    ChannelMask, CoreResult, DEFAULT_SAMPLE_RATE, DEFAULT_VOLUME_STEP, MAX_VOLUME, MIN_VOLUME,
    MaskReport, PlayerState, Sample, format_time, volume_percentage,
};

use crate::health::{HealthMetrics, HealthMonitor, MAX_CALLBACK_ERROR_RATE, PlaybackHealth};
use crate::repeat::RepeatState;
use crate::snapshot::{
    LevelSnapshot, PlayerEvent, PositionSnapshot, RepeatPhase, RepeatStatus, StateSnapshot,
    unix_time_secs,
};
use crate::template::{
    MultichannelTemplate, TemplateSwapSlot, WaveformStore, build_template,
};
use crate::{EngineError, EngineResult};

// ═══════════════════════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Control commands consumed inside the render path, FIFO, exactly once per
/// render invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Reset to the beginning and play
    Start,
    /// Stop and reset position
    Stop,
    /// Resume from the current position
    Play,
    /// Hold the current position
    Pause,
    VolumeUp,
    VolumeDown,
    SetVolume(f32),
    /// Jump to an absolute sample position (pre-validated by the caller)
    Seek(usize),
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETTINGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Engine construction parameters.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Device/output sample rate in Hz
    pub sample_rate: u32,
    /// Output channel count; every mask is normalized to this length
    pub channels: usize,
    /// Static channel mask from configuration
    pub static_mask: ChannelMask,
    /// Initial volume factor
    pub volume: f32,
    /// Step for VolumeUp/VolumeDown
    pub volume_step: f32,
    /// Compute and publish smoothed RMS levels while playing
    pub level_metering: bool,
    /// Playing without position advance beyond this is reported as a stall
    pub stall_threshold: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 2,
            static_mask: ChannelMask::all_enabled(2),
            volume: 1.0,
            volume_step: DEFAULT_VOLUME_STEP,
            level_metering: false,
            stall_threshold: Duration::from_secs(5),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEVEL METER
// ═══════════════════════════════════════════════════════════════════════════════

/// Smoothed RMS level of the rendered output, readable from any thread.
#[derive(Debug)]
struct LevelMeter {
    /// 0.1 = smooth, 0.9 = reactive
    smoothing: f32,
    normalization: f32,
    current_bits: AtomicU32,
    normalized_bits: AtomicU32,
}

impl LevelMeter {
    fn new() -> Self {
        Self {
            smoothing: 0.3,
            normalization: 1.0,
            current_bits: AtomicU32::new(0),
            normalized_bits: AtomicU32::new(0),
        }
    }

    fn update(&self, chunk: &[Sample]) {
        if chunk.is_empty() {
            return;
        }
        let mean_sq = chunk.iter().map(|s| s * s).sum::<f32>() / chunk.len() as f32;
        let rms = mean_sq.sqrt();

        let current = f32::from_bits(self.current_bits.load(Ordering::Relaxed));
        let smoothed = current * (1.0 - self.smoothing) + rms * self.smoothing;
        self.current_bits
            .store(smoothed.to_bits(), Ordering::Relaxed);

        let normalized = (smoothed * self.normalization).min(1.0);
        self.normalized_bits
            .store(normalized.to_bits(), Ordering::Relaxed);
    }

    fn normalized(&self) -> f32 {
        f32::from_bits(self.normalized_bits.load(Ordering::Relaxed))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLAYBACK ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Template currently streamed by the render path, plus the mask it was
/// built from.
struct ActiveTemplate {
    template: Arc<MultichannelTemplate>,
    mask: ChannelMask,
}

/// Tuple of everything remote observers can see; a change triggers a state
/// publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PublishedTuple {
    state: u8,
    volume_bits: u32,
    loop_enabled: bool,
    repeat_enabled: bool,
    repeat_current: u32,
}

pub struct PlaybackEngine {
    settings: EngineSettings,

    // Fields written only inside the render path
    state: AtomicU8,
    position: AtomicUsize,
    volume_bits: AtomicU32,

    // Observer-writable flags (plain reads from the render path)
    loop_enabled: AtomicBool,
    auto_start: AtomicBool,

    template_frames: AtomicUsize,
    active: Mutex<ActiveTemplate>,
    source: Mutex<Arc<WaveformStore>>,
    dynamic_mask: Mutex<Option<ChannelMask>>,
    swap_slot: Arc<TemplateSwapSlot>,
    builder: Mutex<Option<std::thread::JoinHandle<()>>>,

    cmd_tx: Sender<Command>,
    cmd_rx: Receiver<Command>,

    pub(crate) repeat: RepeatState,
    health: HealthMonitor,
    level: LevelMeter,

    events: Sender<PlayerEvent>,
    events_rx: Mutex<Option<Receiver<PlayerEvent>>>,
    last_published: Mutex<Option<PublishedTuple>>,
    current_file: Mutex<Option<String>>,
}

impl PlaybackEngine {
    pub fn new(settings: EngineSettings) -> Self {
        let (cmd_tx, cmd_rx) = unbounded();
        let (events, events_rx) = unbounded();
        let channels = settings.channels;
        let volume = settings.volume.clamp(MIN_VOLUME, MAX_VOLUME);
        let stall_threshold = settings.stall_threshold;
        let static_mask = settings.static_mask.clone();
        let sample_rate = settings.sample_rate;

        Self {
            settings,
            state: AtomicU8::new(PlayerState::Stopped as u8),
            position: AtomicUsize::new(0),
            volume_bits: AtomicU32::new(volume.to_bits()),
            loop_enabled: AtomicBool::new(false),
            auto_start: AtomicBool::new(false),
            template_frames: AtomicUsize::new(0),
            active: Mutex::new(ActiveTemplate {
                template: Arc::new(MultichannelTemplate::silent(channels)),
                mask: static_mask,
            }),
            source: Mutex::new(Arc::new(WaveformStore::empty(sample_rate))),
            dynamic_mask: Mutex::new(None),
            swap_slot: Arc::new(TemplateSwapSlot::new()),
            builder: Mutex::new(None),
            cmd_tx,
            cmd_rx,
            repeat: RepeatState::new(),
            health: HealthMonitor::new(stall_threshold),
            level: LevelMeter::new(),
            events,
            events_rx: Mutex::new(Some(events_rx)),
            last_published: Mutex::new(None),
            current_file: Mutex::new(None),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // OBSERVER ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn state(&self) -> PlayerState {
        PlayerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn position(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled.load(Ordering::Relaxed)
    }

    pub fn template_frames(&self) -> usize {
        self.template_frames.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> u32 {
        self.settings.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.settings.channels
    }

    pub fn level_metering(&self) -> bool {
        self.settings.level_metering
    }

    pub fn auto_start(&self) -> bool {
        self.auto_start.load(Ordering::Relaxed)
    }

    pub fn set_auto_start(&self, enabled: bool) {
        self.auto_start.store(enabled, Ordering::Relaxed);
        log::info!(
            "Auto-start: {}",
            if enabled { "ENABLED" } else { "DISABLED" }
        );
    }

    pub fn current_file(&self) -> Option<String> {
        self.current_file.lock().clone()
    }

    pub fn set_current_file(&self, name: Option<String>) {
        *self.current_file.lock() = name;
    }

    /// Mask currently in effect: the dynamic override when set, otherwise
    /// the static configuration mask.
    pub fn effective_mask(&self) -> ChannelMask {
        self.dynamic_mask
            .lock()
            .clone()
            .unwrap_or_else(|| self.settings.static_mask.clone())
    }

    /// Event receiver for the publishing bridge. Yields once.
    pub fn take_event_receiver(&self) -> Option<Receiver<PlayerEvent>> {
        self.events_rx.lock().take()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // COMMANDS AND SEEKING
    // ═══════════════════════════════════════════════════════════════════════

    /// Enqueue a command for the next render invocation. Never blocks.
    pub fn send_command(&self, command: Command) {
        let _ = self.cmd_tx.send(command);
    }

    pub fn volume_up(&self) {
        self.send_command(Command::VolumeUp);
    }

    pub fn volume_down(&self) {
        self.send_command(Command::VolumeDown);
    }

    /// Absolute volume from the control surface (0.0..=1.0).
    pub fn set_volume(&self, value: f32) -> bool {
        if !(0.0..=1.0).contains(&value) || !value.is_finite() {
            return false;
        }
        self.send_command(Command::SetVolume((value * 100.0).round() / 100.0));
        true
    }

    /// Seek to an absolute sample position. Rejected when out of range.
    pub fn seek_to_samples(&self, target: usize) -> bool {
        if target > self.template_frames() {
            return false;
        }
        self.send_command(Command::Seek(target));
        true
    }

    /// Seek to an absolute time in seconds.
    pub fn seek_to_time(&self, seconds: f64) -> bool {
        if !seconds.is_finite() || seconds < 0.0 {
            return false;
        }
        let target = (seconds * self.settings.sample_rate as f64).round() as usize;
        self.seek_to_samples(target)
    }

    /// Enable/disable loop mode. Enabling loop while a repeat worker is
    /// mid-cycle makes the worker yield; an armed-but-idle repeat keeps its
    /// parameters.
    pub fn set_loop(&self, enabled: bool) {
        let was = self.loop_enabled.swap(enabled, Ordering::Relaxed);
        if was != enabled {
            log::info!("Loop: {}", if enabled { "ENABLED" } else { "DISABLED" });
            self.check_and_publish_state_changes();
        }
    }

    pub fn toggle_loop(&self) {
        self.set_loop(!self.loop_enabled());
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LOADING AND CHANNEL MASKS
    // ═══════════════════════════════════════════════════════════════════════

    /// Install a new waveform (already resampled to the engine rate) and
    /// build the initial template for it. Callers stop playback first; this
    /// is never invoked from the render path and may block.
    pub fn load_waveform(&self, samples: Vec<Sample>) -> EngineResult<()> {
        if samples.is_empty() {
            return Err(EngineError::EmptyAudio);
        }

        let store = Arc::new(WaveformStore::new(samples, self.settings.sample_rate));
        let mask = self.effective_mask();
        let template = Arc::new(build_template(store.samples(), &mask));
        log::info!(
            "Loaded waveform: {} frames ({:.2}s), mask {}",
            template.frames(),
            store.duration_secs(),
            mask
        );

        *self.source.lock() = store;
        {
            let mut active = self.active.lock();
            self.template_frames
                .store(template.frames(), Ordering::Release);
            active.template = template;
            active.mask = mask;
        }
        self.position.store(0, Ordering::Release);
        // A template staged for the previous waveform must never be adopted
        self.swap_slot.clear();
        Ok(())
    }

    /// Validate and store a dynamic channel mask.
    ///
    /// While playing, a replacement template is built on a background thread
    /// and handed to the render path through the swap slot, so the switch is
    /// glitch-free. Otherwise the mask takes effect on the next Start.
    pub fn set_dynamic_channel_mask(&self, input: &[i64]) -> CoreResult<MaskReport> {
        let report = ChannelMask::validate(input, self.settings.channels)?;
        if let Some(adjustment) = report.adjustment {
            log::info!("Channel mask adjusted: {adjustment:?} -> {}", report.mask);
        }
        if report.mask.is_silent() {
            log::warn!("Channel mask disables every channel; playback will be silent");
        }

        let previous = self
            .dynamic_mask
            .lock()
            .replace(report.mask.clone());
        log::info!(
            "Dynamic mask updated: {} -> {}",
            previous.map_or_else(|| "none".to_string(), |m| m.to_string()),
            report.mask
        );

        if self.state() == PlayerState::Playing {
            self.spawn_template_build(report.mask.clone());
        } else {
            log::info!("Not playing - mask takes effect on next start");
        }

        Ok(report)
    }

    fn spawn_template_build(&self, mask: ChannelMask) {
        let mut builder = self.builder.lock();
        if builder.as_ref().is_some_and(|h| !h.is_finished()) {
            log::info!("Template build already in progress, ignoring request");
            return;
        }

        let source = self.source.lock().clone();
        if source.is_empty() {
            log::warn!("No waveform loaded; skipping template build");
            return;
        }

        let slot = Arc::clone(&self.swap_slot);
        let spawned = std::thread::Builder::new()
            .name("template-builder".into())
            .spawn(move || {
                let template = Arc::new(build_template(source.samples(), &mask));
                if template.frames() == 0 {
                    log::warn!("Background template build produced no frames");
                    return;
                }
                log::info!("Background template ready for swap: {mask}");
                slot.stage(template, mask);
            });

        match spawned {
            Ok(handle) => *builder = Some(handle),
            Err(e) => log::error!("Failed to spawn template builder: {e}"),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RENDER PATH
    // ═══════════════════════════════════════════════════════════════════════

    /// Record a device-reported stream error. Called from the device error
    /// callback, not the render path.
    pub fn record_callback_error(&self) {
        self.health.record_error();
    }

    /// Produce one buffer of interleaved output. Invoked by the audio device.
    pub fn render(&self, output: &mut [Sample]) {
        self.health.record_callback();
        self.drain_commands();

        if self.state() != PlayerState::Playing {
            output.fill(0.0);
            return;
        }

        let mut active = self.active.lock();

        // Adopt a pending template before touching audio data: O(1) pointer
        // swap, never blocks.
        if let Some(pending) = self.swap_slot.try_adopt() {
            log::info!("Template swapped: {} -> {}", active.mask, pending.mask);
            self.template_frames
                .store(pending.template.frames(), Ordering::Release);
            active.template = pending.template;
            active.mask = pending.mask;
        }

        let channels = active.template.channels().max(1);
        let frames_out = output.len() / channels;
        let volume = self.volume();
        let mut position = self.position.load(Ordering::Relaxed);
        let mut total = active.template.frames();
        let mut remaining = total.saturating_sub(position);

        if remaining == 0 {
            if self.loop_enabled() && total > 0 {
                self.refresh_template_if_stale(&mut active);
                total = active.template.frames();
                position = 0;
                remaining = total;
            } else {
                output.fill(0.0);
                drop(active);
                self.enter_stopped();
                return;
            }
        }

        if remaining < frames_out {
            let split = remaining * channels;
            copy_scaled(
                &mut output[..split],
                active.template.frame_range(position, position + remaining),
                volume,
            );

            if self.loop_enabled() {
                self.refresh_template_if_stale(&mut active);
                total = active.template.frames();
                let wrap = (frames_out - remaining).min(total);
                copy_scaled(
                    &mut output[split..split + wrap * channels],
                    active.template.frame_range(0, wrap),
                    volume,
                );
                output[split + wrap * channels..].fill(0.0);
                self.position.store(wrap, Ordering::Release);
            } else {
                output[split..].fill(0.0);
                drop(active);
                self.enter_stopped();
            }
            return;
        }

        copy_scaled(
            output,
            active.template.frame_range(position, position + frames_out),
            volume,
        );
        position += frames_out;
        self.position.store(position, Ordering::Release);

        if self.settings.level_metering {
            self.level.update(output);
        }
    }

    fn drain_commands(&self) {
        while let Ok(command) = self.cmd_rx.try_recv() {
            self.apply_command(command);
            self.check_and_publish_state_changes();
        }
    }

    fn apply_command(&self, command: Command) {
        match command {
            Command::Pause => {
                self.state.store(PlayerState::Paused as u8, Ordering::Release);
            }
            Command::Play => {
                self.state
                    .store(PlayerState::Playing as u8, Ordering::Release);
            }
            Command::Stop => {
                self.state
                    .store(PlayerState::Stopped as u8, Ordering::Release);
                self.position.store(0, Ordering::Release);
            }
            Command::Start => {
                {
                    let mut active = self.active.lock();
                    self.refresh_template_if_stale(&mut active);
                }
                self.state
                    .store(PlayerState::Playing as u8, Ordering::Release);
                self.position.store(0, Ordering::Release);
            }
            Command::VolumeUp => {
                let volume =
                    (self.volume() + self.settings.volume_step).min(MAX_VOLUME);
                self.volume_bits.store(volume.to_bits(), Ordering::Relaxed);
            }
            Command::VolumeDown => {
                let volume =
                    (self.volume() - self.settings.volume_step).max(MIN_VOLUME);
                self.volume_bits.store(volume.to_bits(), Ordering::Relaxed);
            }
            Command::SetVolume(value) => {
                let volume = value.clamp(MIN_VOLUME, MAX_VOLUME);
                self.volume_bits.store(volume.to_bits(), Ordering::Relaxed);
            }
            Command::Seek(target) => {
                if target <= self.template_frames() {
                    self.position.store(target, Ordering::Release);
                }
            }
        }
    }

    /// Rebuild the active template when the effective mask no longer matches
    /// the one it was built from. Runs inside the render path, but only on
    /// an explicit Start or a loop wrap following a deferred mask change.
    fn refresh_template_if_stale(&self, active: &mut ActiveTemplate) {
        let effective = self.effective_mask();
        if active.mask == effective {
            return;
        }

        let source = self.source.lock().clone();
        if source.is_empty() {
            return;
        }

        log::info!(
            "Rebuilding template: {} -> {}",
            active.mask,
            effective
        );
        let template = Arc::new(build_template(source.samples(), &effective));
        self.template_frames
            .store(template.frames(), Ordering::Release);
        active.template = template;
        active.mask = effective;
    }

    fn enter_stopped(&self) {
        self.state
            .store(PlayerState::Stopped as u8, Ordering::Release);
        self.position.store(0, Ordering::Release);
        self.check_and_publish_state_changes();
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SNAPSHOTS AND PUBLISHING
    // ═══════════════════════════════════════════════════════════════════════

    pub fn state_snapshot(&self) -> StateSnapshot {
        let volume = self.volume();
        StateSnapshot {
            state: self.state(),
            loop_enabled: self.loop_enabled(),
            volume: (volume * 100.0).round() / 100.0,
            volume_percentage: volume_percentage(volume),
            auto_start: self.auto_start(),
            repeat: self.repeat_status(),
        }
    }

    fn repeat_status(&self) -> Option<RepeatStatus> {
        if !self.repeat.is_enabled() {
            return None;
        }
        let (count, interval) = self.repeat.params();
        let current = self.repeat.current();
        let phase = match self.state() {
            PlayerState::Playing => RepeatPhase::Playing,
            PlayerState::Stopped if current < count => RepeatPhase::Waiting,
            _ => RepeatPhase::Completed,
        };
        Some(RepeatStatus {
            repeat_enabled: true,
            repeat_current: current,
            repeat_total: count,
            repeat_interval: interval.as_secs_f64(),
            repeat_state: phase,
        })
    }

    pub fn position_snapshot(&self) -> PositionSnapshot {
        let position = self.position();
        let total = self.template_frames();
        let percentage = if total > 0 {
            ((position as f64 / total as f64) * 1000.0).round() / 10.0
        } else {
            0.0
        };
        PositionSnapshot {
            position: format_time(position, self.settings.sample_rate),
            total_duration: format_time(total, self.settings.sample_rate),
            percentage,
            current_file: self.current_file(),
        }
    }

    pub fn level_snapshot(&self) -> LevelSnapshot {
        let level = self.level.normalized() as f64;
        LevelSnapshot {
            level: (level * 10_000.0).round() / 10_000.0,
            timestamp: unix_time_secs(),
        }
    }

    fn published_tuple(&self) -> PublishedTuple {
        PublishedTuple {
            state: self.state.load(Ordering::Acquire),
            volume_bits: self.volume_bits.load(Ordering::Relaxed),
            loop_enabled: self.loop_enabled(),
            repeat_enabled: self.repeat.is_enabled(),
            repeat_current: if self.repeat.is_enabled() {
                self.repeat.current()
            } else {
                0
            },
        }
    }

    /// Publish a file transfer progress snapshot.
    pub fn publish_transfer(&self, transfer: crate::snapshot::TransferSnapshot) {
        let _ = self.events.send(PlayerEvent::Transfer(transfer));
    }

    /// Publish the state snapshot unconditionally.
    pub fn publish_player_state(&self) {
        *self.last_published.lock() = Some(self.published_tuple());
        let _ = self.events.send(PlayerEvent::State(self.state_snapshot()));
    }

    /// Publish only when the observable tuple changed since the last publish.
    pub fn check_and_publish_state_changes(&self) {
        let tuple = self.published_tuple();
        {
            let mut last = self.last_published.lock();
            if last.as_ref() == Some(&tuple) {
                return;
            }
            *last = Some(tuple);
        }
        let _ = self.events.send(PlayerEvent::State(self.state_snapshot()));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // HEALTH
    // ═══════════════════════════════════════════════════════════════════════

    pub fn check_playback_health(&self) -> PlaybackHealth {
        let state = self.state();
        let mut metrics = HealthMetrics {
            callback_calls: self.health.calls(),
            callback_errors: self.health.errors(),
            position: self.position(),
            template_frames: self.template_frames(),
            state: state.to_string(),
            ..HealthMetrics::default()
        };

        if state != PlayerState::Playing {
            // During repeat intervals the player is legitimately stopped
            metrics.repeat_waiting =
                self.repeat.is_enabled() && state == PlayerState::Stopped;
            return PlaybackHealth::healthy(metrics);
        }

        let stalled_for = self.health.observe_position(metrics.position);
        metrics.time_since_update =
            (stalled_for.as_secs_f64() * 100.0).round() / 100.0;

        let mut health = PlaybackHealth::healthy(metrics);
        if stalled_for > self.health.stall_threshold() {
            health.flag(format!(
                "position_stalled_{:.1}s",
                stalled_for.as_secs_f64()
            ));
        }
        let error_rate = self.health.error_rate();
        if error_rate > MAX_CALLBACK_ERROR_RATE {
            health.flag(format!("high_error_rate_{:.2}%", error_rate * 100.0));
        }
        health
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.shutdown_repeat_worker();
    }
}

/// Copy `src` into `dst` scaled by `volume`. Slices have equal length.
#[inline]
fn copy_scaled(dst: &mut [Sample], src: &[Sample], volume: f32) {
    for (out, &sample) in dst.iter_mut().zip(src) {
        *out = sample * volume;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let engine = PlaybackEngine::new(EngineSettings::default());
        assert_eq!(engine.state(), PlayerState::Stopped);
        assert_eq!(engine.position(), 0);
        assert_eq!(engine.template_frames(), 0);
        assert!((engine.volume() - 1.0).abs() < f32::EPSILON);
        assert!(!engine.loop_enabled());
    }

    #[test]
    fn test_load_rejects_empty_waveform() {
        let engine = PlaybackEngine::new(EngineSettings::default());
        assert!(matches!(
            engine.load_waveform(Vec::new()),
            Err(EngineError::EmptyAudio)
        ));
    }

    #[test]
    fn test_set_volume_bounds() {
        let engine = PlaybackEngine::new(EngineSettings::default());
        assert!(engine.set_volume(0.0));
        assert!(engine.set_volume(1.0));
        assert!(!engine.set_volume(1.5));
        assert!(!engine.set_volume(-0.1));
        assert!(!engine.set_volume(f32::NAN));
    }

    #[test]
    fn test_seek_bounds_without_audio() {
        let engine = PlaybackEngine::new(EngineSettings::default());
        assert!(engine.seek_to_samples(0));
        assert!(!engine.seek_to_samples(1));
        assert!(!engine.seek_to_time(-1.0));
    }

    #[test]
    fn test_copy_scaled() {
        let src = [1.0, -1.0, 0.5, 0.0];
        let mut dst = [0.0; 4];
        copy_scaled(&mut dst, &src, 0.5);
        assert_eq!(dst, [0.5, -0.5, 0.25, 0.0]);
    }
}
