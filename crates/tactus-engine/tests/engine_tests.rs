//! PlaybackEngine integration tests
//!
//! These drive the render path directly (no audio device): a test buffer
//! stands in for the device buffer and `render` is invoked the way the
//! output stream would.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tactus_core::{ChannelMask, PlayerState, Sample};
use tactus_engine::{Command, EngineSettings, PlaybackEngine, PlayerEvent};

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

const TEST_RATE: u32 = 8_000;
const TEST_CHANNELS: usize = 2;
const BUFFER_FRAMES: usize = 1_024;

fn test_settings() -> EngineSettings {
    EngineSettings {
        sample_rate: TEST_RATE,
        channels: TEST_CHANNELS,
        static_mask: ChannelMask::all_enabled(TEST_CHANNELS),
        volume: 1.0,
        ..EngineSettings::default()
    }
}

/// Engine preloaded with `seconds` of constant 0.5 mono samples.
fn engine_with_audio(seconds: f64) -> PlaybackEngine {
    let engine = PlaybackEngine::new(test_settings());
    let frames = (seconds * TEST_RATE as f64) as usize;
    engine.load_waveform(vec![0.5; frames]).expect("load");
    engine
}

fn buffer() -> Vec<Sample> {
    vec![0.0; BUFFER_FRAMES * TEST_CHANNELS]
}

/// Frames in an interleaved buffer where every channel is non-silent.
fn non_silent_frames(buf: &[Sample]) -> usize {
    buf.chunks(TEST_CHANNELS)
        .filter(|frame| frame.iter().all(|&s| s != 0.0))
        .count()
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER BASICS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_render_while_stopped_is_silent_and_static() {
    let engine = engine_with_audio(1.0);
    let mut buf = buffer();

    for _ in 0..10 {
        buf.fill(0.7); // stale device data must be overwritten
        engine.render(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.0), "stopped render must be silent");
        assert_eq!(engine.position(), 0, "stopped render must not advance");
    }
    assert_eq!(engine.state(), PlayerState::Stopped);
}

#[test]
fn test_full_playthrough_stops_and_resets() {
    let engine = engine_with_audio(2.0);
    let total_frames = 2 * TEST_RATE as usize;
    let mut buf = buffer();
    let mut produced = 0usize;

    engine.send_command(Command::Start);

    let mut renders = 0;
    while renders < 1_000 {
        engine.render(&mut buf);
        renders += 1;
        produced += non_silent_frames(&buf);
        if engine.state() == PlayerState::Stopped {
            break;
        }
    }

    assert_eq!(engine.state(), PlayerState::Stopped, "playback must end on its own");
    assert_eq!(engine.position(), 0, "position resets after natural end");
    assert_eq!(
        produced, total_frames,
        "every source frame must reach both channels exactly once"
    );
}

#[test]
fn test_volume_scales_output() {
    let engine = engine_with_audio(1.0);
    let mut buf = buffer();

    engine.send_command(Command::Start);
    engine.send_command(Command::SetVolume(0.5));
    engine.render(&mut buf);

    // 0.5 source x 0.5 volume
    assert!(buf.iter().all(|&s| (s - 0.25).abs() < 1e-6));
}

#[test]
fn test_pause_holds_position_play_resumes() {
    let engine = engine_with_audio(1.0);
    let mut buf = buffer();

    engine.send_command(Command::Start);
    engine.render(&mut buf);
    engine.render(&mut buf);
    let held = engine.position();
    assert_eq!(held, 2 * BUFFER_FRAMES);

    engine.send_command(Command::Pause);
    engine.render(&mut buf);
    assert_eq!(engine.state(), PlayerState::Paused);
    assert_eq!(engine.position(), held, "pause must not move the playhead");
    assert!(buf.iter().all(|&s| s == 0.0));

    engine.send_command(Command::Play);
    engine.render(&mut buf);
    assert_eq!(engine.position(), held + BUFFER_FRAMES, "play resumes in place");
}

#[test]
fn test_start_always_rewinds() {
    let engine = engine_with_audio(1.0);
    let mut buf = buffer();

    engine.send_command(Command::Start);
    engine.render(&mut buf);
    engine.render(&mut buf);
    assert!(engine.position() > 0);

    engine.send_command(Command::Start);
    engine.render(&mut buf);
    assert_eq!(engine.position(), BUFFER_FRAMES, "start rewinds before playing");
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOOPING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_loop_wraps_position_and_keeps_playing() {
    let engine = engine_with_audio(2.0);
    let total_frames = 2 * TEST_RATE as usize;
    let mut buf = buffer();

    engine.set_loop(true);
    engine.send_command(Command::Start);

    let renders = total_frames / BUFFER_FRAMES + 1;
    for _ in 0..renders {
        engine.render(&mut buf);
        assert_eq!(engine.state(), PlayerState::Playing, "loop never auto-stops");
    }

    let expected = (renders * BUFFER_FRAMES) % total_frames;
    assert_eq!(
        engine.position(),
        expected,
        "position wraps to the remainder instead of stopping"
    );

    // The wrap buffer itself must be fully populated
    assert_eq!(non_silent_frames(&buf), BUFFER_FRAMES);
}

#[test]
fn test_loop_disable_then_natural_stop() {
    let engine = engine_with_audio(0.5);
    let mut buf = buffer();

    engine.set_loop(true);
    engine.send_command(Command::Start);
    for _ in 0..10 {
        engine.render(&mut buf);
    }
    assert_eq!(engine.state(), PlayerState::Playing);

    engine.set_loop(false);
    for _ in 0..10 {
        engine.render(&mut buf);
        if engine.state() == PlayerState::Stopped {
            break;
        }
    }
    assert_eq!(engine.state(), PlayerState::Stopped);
    assert_eq!(engine.position(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEEK AND VOLUME BOUNDS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_seek_bounds() {
    let engine = engine_with_audio(2.0);
    let mut buf = buffer();
    let total = engine.template_frames();

    assert!(engine.seek_to_time(1.0));
    engine.render(&mut buf); // applies the queued seek (engine stays stopped)
    assert_eq!(engine.position(), TEST_RATE as usize);

    assert!(engine.seek_to_samples(total), "end position is in range");
    assert!(!engine.seek_to_samples(total + 1));
    assert!(!engine.seek_to_time(1_000.0));

    engine.render(&mut buf);
    assert_eq!(engine.position(), total, "rejected seeks leave position alone");
}

#[test]
fn test_volume_stepping_never_leaves_bounds() {
    let engine = engine_with_audio(0.5);
    let mut buf = buffer();

    for _ in 0..20 {
        engine.volume_up();
    }
    engine.render(&mut buf);
    assert!(engine.volume() <= 2.0 + f32::EPSILON);
    assert!((engine.volume() - 2.0).abs() < 1e-6);

    for _ in 0..40 {
        engine.volume_down();
    }
    engine.render(&mut buf);
    assert!((engine.volume() - 0.0).abs() < 1e-6);
}

// ═══════════════════════════════════════════════════════════════════════════════
// DYNAMIC CHANNEL MASKS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_mask_swap_mid_playback_is_atomic() {
    let engine = engine_with_audio(4.0);
    let mut buf = buffer();

    engine.send_command(Command::Start);
    engine.render(&mut buf);

    // Channel 0 off, channel 1 on; built in the background and adopted by a
    // later render call.
    engine
        .set_dynamic_channel_mask(&[0, 1])
        .expect("valid mask");

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut adopted = false;
    while Instant::now() < deadline {
        engine.render(&mut buf);
        assert_eq!(engine.state(), PlayerState::Playing);

        let old_frames = buf
            .chunks(TEST_CHANNELS)
            .filter(|f| f[0] != 0.0 && f[1] != 0.0)
            .count();
        let new_frames = buf
            .chunks(TEST_CHANNELS)
            .filter(|f| f[0] == 0.0 && f[1] != 0.0)
            .count();

        // Within one callback every frame comes from a single template
        assert!(
            old_frames == 0 || new_frames == 0,
            "a single buffer mixed old and new template data"
        );

        if new_frames == BUFFER_FRAMES {
            adopted = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(adopted, "staged template was never adopted");
}

#[test]
fn test_mask_change_while_stopped_applies_on_start() {
    let engine = engine_with_audio(1.0);
    let mut buf = buffer();

    engine.set_dynamic_channel_mask(&[1, 0]).expect("valid mask");

    // Nothing staged or adopted while stopped
    engine.render(&mut buf);
    assert!(buf.iter().all(|&s| s == 0.0));

    engine.send_command(Command::Start);
    engine.render(&mut buf);
    for frame in buf.chunks(TEST_CHANNELS) {
        assert!(frame[0] != 0.0 && frame[1] == 0.0, "mask applies on start");
    }
}

#[test]
fn test_invalid_masks_change_nothing() {
    let engine = engine_with_audio(1.0);
    let mut buf = buffer();

    assert!(engine.set_dynamic_channel_mask(&[1]).is_err());
    assert!(engine.set_dynamic_channel_mask(&[1, 2]).is_err());

    engine.send_command(Command::Start);
    engine.render(&mut buf);
    assert_eq!(non_silent_frames(&buf), BUFFER_FRAMES, "static mask still active");
}

// ═══════════════════════════════════════════════════════════════════════════════
// REPEAT CYCLES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_repeat_cycle_runs_count_times_and_stays_armed() {
    let engine = Arc::new(engine_with_audio(0.2));
    let mut buf = buffer();

    engine
        .start_repeat_playback(3, Duration::ZERO)
        .expect("valid params");
    engine.start_playback();

    let mut playthroughs = 0u32;
    let mut was_playing = false;
    let mut max_current = 0u32;
    let deadline = Instant::now() + Duration::from_secs(15);

    // Pump the render path the way the device would
    while Instant::now() < deadline {
        engine.render(&mut buf);
        max_current = max_current.max(engine.repeat_current());

        let playing = engine.state() == PlayerState::Playing;
        if was_playing && !playing {
            playthroughs += 1;
        }
        was_playing = playing;

        if playthroughs >= 3 && engine.repeat_current() == 0 {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(playthroughs, 3, "exactly three full playthroughs");
    assert_eq!(max_current, 3, "iteration counter reached the total");
    assert_eq!(engine.repeat_current(), 0, "counter resets after the cycle");
    assert!(engine.repeat_enabled(), "repeat stays armed after completion");
    assert_eq!(engine.state(), PlayerState::Stopped);
}

#[test]
fn test_repeat_cancel_leaves_playback_running() {
    let engine = Arc::new(engine_with_audio(1.0));
    let mut buf = buffer();

    engine
        .start_repeat_playback(5, Duration::from_secs(5))
        .expect("valid params");
    engine.start_playback();

    // Let the first iteration begin
    let deadline = Instant::now() + Duration::from_secs(5);
    while engine.state() != PlayerState::Playing && Instant::now() < deadline {
        engine.render(&mut buf);
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(engine.state(), PlayerState::Playing);

    engine.cancel_repeat();
    assert!(!engine.repeat_enabled());

    // Cancelling repeat does not stop audio mid-buffer; the render path keeps
    // producing until told otherwise.
    engine.render(&mut buf);
    assert_eq!(engine.state(), PlayerState::Playing);
    assert!(non_silent_frames(&buf) > 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLISHING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_state_published_only_on_change() {
    let engine = engine_with_audio(0.5);
    let events = engine.take_event_receiver().expect("receiver available once");
    let mut buf = buffer();

    engine.send_command(Command::Start);
    engine.render(&mut buf);

    let first = events.try_recv().expect("start publishes a state change");
    match first {
        PlayerEvent::State(snap) => assert_eq!(snap.state, PlayerState::Playing),
        other => panic!("expected state event, got {other:?}"),
    }

    // Steady-state renders publish nothing
    engine.render(&mut buf);
    assert!(events.try_recv().is_err(), "no duplicate publishes while unchanged");

    // Natural end publishes the stop
    for _ in 0..10 {
        engine.render(&mut buf);
    }
    let stopped = events
        .try_recv()
        .expect("auto-stop publishes a state change");
    match stopped {
        PlayerEvent::State(snap) => assert_eq!(snap.state, PlayerState::Stopped),
        other => panic!("expected state event, got {other:?}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_health_stall_detection() {
    let mut settings = test_settings();
    settings.stall_threshold = Duration::from_millis(50);
    let engine = PlaybackEngine::new(settings);
    engine.load_waveform(vec![0.5; TEST_RATE as usize]).unwrap();
    let mut buf = buffer();

    engine.send_command(Command::Start);
    engine.render(&mut buf);

    // Baseline observation, then let the position sit still past the threshold
    assert!(engine.check_playback_health().is_healthy);
    std::thread::sleep(Duration::from_millis(80));

    let health = engine.check_playback_health();
    assert!(!health.is_healthy, "frozen playhead while playing is a stall");
    assert!(health.issues.iter().any(|i| i.starts_with("position_stalled")));
}

#[test]
fn test_health_not_playing_is_never_unhealthy() {
    let engine = engine_with_audio(1.0);
    let health = engine.check_playback_health();
    assert!(health.is_healthy);
    assert!(!health.metrics.repeat_waiting);
}

#[test]
fn test_health_flags_repeat_interval_as_expected_wait() {
    let engine = engine_with_audio(1.0);
    engine
        .start_repeat_playback(3, Duration::from_secs(2))
        .unwrap();

    let health = engine.check_playback_health();
    assert!(health.is_healthy, "waiting between repetitions is not a stall");
    assert!(health.metrics.repeat_waiting);
}

#[test]
fn test_health_error_rate_detection() {
    let engine = engine_with_audio(1.0);
    let mut buf = buffer();

    engine.set_loop(true);
    engine.send_command(Command::Start);
    for _ in 0..50 {
        engine.render(&mut buf);
    }
    for _ in 0..5 {
        engine.record_callback_error();
    }

    let health = engine.check_playback_health();
    assert!(!health.is_healthy);
    assert!(health.issues.iter().any(|i| i.starts_with("high_error_rate")));
}
