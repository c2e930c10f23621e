//! Repeat scheduling: bounded N-iteration playback with intervals
//!
//! A supervised worker thread drives the cycle by issuing Start commands and
//! sleeping interruptibly between repetitions. Arming repeat is passive:
//! audio only starts on a subsequent start trigger.
//!
//! Precedence with loop mode is deliberately asymmetric: arming repeat
//! disables loop immediately, while enabling loop cancels repeat only when a
//! worker is mid-cycle. An armed-but-idle repeat survives a loop toggle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use tactus_core::PlayerState;

use crate::engine::{Command, PlaybackEngine};
use crate::{EngineError, EngineResult};

/// Maximum repetitions per cycle
pub const MAX_REPEAT_COUNT: u32 = 10;
/// Maximum wait between repetitions
pub const MAX_REPEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Poll/cancellation resolution for all worker waits
const SLEEP_QUANTUM: Duration = Duration::from_millis(100);
/// Grace period after issuing Start before observing state
const SETTLE_DELAY: Duration = Duration::from_millis(100);
/// Bounded join timeout when cancelling a worker
const JOIN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
pub(crate) struct RepeatParams {
    pub count: u32,
    pub interval: Duration,
}

pub(crate) struct WorkerHandle {
    handle: JoinHandle<()>,
    cancel: Arc<AtomicBool>,
}

/// Repeat mode state owned by the engine.
pub(crate) struct RepeatState {
    enabled: AtomicBool,
    current: AtomicU32,
    params: Mutex<RepeatParams>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl RepeatState {
    pub(crate) fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            current: AtomicU32::new(0),
            params: Mutex::new(RepeatParams {
                count: 1,
                interval: Duration::ZERO,
            }),
            worker: Mutex::new(None),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn current(&self) -> u32 {
        self.current.load(Ordering::Relaxed)
    }

    pub(crate) fn params(&self) -> (u32, Duration) {
        let params = *self.params.lock();
        (params.count, params.interval)
    }

    fn worker_alive(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }
}

impl PlaybackEngine {
    // ═══════════════════════════════════════════════════════════════════════
    // PUBLIC REPEAT API
    // ═══════════════════════════════════════════════════════════════════════

    pub fn repeat_enabled(&self) -> bool {
        self.repeat.is_enabled()
    }

    pub fn repeat_current(&self) -> u32 {
        self.repeat.current()
    }

    /// Armed (count, interval) parameters, meaningful while repeat is enabled.
    pub fn repeat_params(&self) -> (u32, Duration) {
        self.repeat.params()
    }

    /// Arm repeat mode. Passive: playback begins only on the next start
    /// trigger. Cancels any running worker and takes priority over loop.
    pub fn start_repeat_playback(&self, count: u32, interval: Duration) -> EngineResult<()> {
        if count == 0 || count > MAX_REPEAT_COUNT {
            return Err(EngineError::RepeatCount(count));
        }
        if interval > MAX_REPEAT_INTERVAL {
            return Err(EngineError::RepeatInterval(interval.as_secs_f64()));
        }

        if self.repeat.worker_alive() {
            self.cancel_worker();
            log::info!("Previous repeat worker cancelled");
        }

        if self.loop_enabled() {
            self.set_loop(false);
            log::info!("Loop disabled - repeat mode takes priority");
        }

        *self.repeat.params.lock() = RepeatParams { count, interval };
        self.repeat.current.store(0, Ordering::Relaxed);
        self.repeat.enabled.store(true, Ordering::Relaxed);

        log::info!(
            "Repeat armed: {count}x with {:.1}s interval (waiting for playback trigger)",
            interval.as_secs_f64()
        );
        Ok(())
    }

    /// Cancel repeat mode entirely and return to single-play behavior.
    pub fn cancel_repeat(&self) {
        if self.repeat.is_enabled() {
            self.cancel_worker();
            self.repeat.enabled.store(false, Ordering::Relaxed);
            self.repeat.current.store(0, Ordering::Relaxed);
            log::info!("Repeat cancelled - returning to single-play mode");
            self.check_and_publish_state_changes();
        } else {
            log::info!("No active repeat to cancel");
        }
    }

    /// Stop a running worker but keep the armed parameters (sticky stop):
    /// the next start trigger runs another full cycle.
    pub fn interrupt_repeat_worker(&self) {
        if self.repeat.worker_alive() {
            self.cancel_worker();
            self.repeat.current.store(0, Ordering::Relaxed);
            log::info!("Repeat worker stopped (parameters preserved)");
        }
    }

    /// Router-facing start: runs the repeat cycle when armed, otherwise a
    /// plain Start command.
    pub fn start_playback(self: &Arc<Self>) {
        if !self.repeat.is_enabled() {
            self.send_command(Command::Start);
            return;
        }

        let mut worker = self.repeat.worker.lock();
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            log::info!("Repeat worker already active");
            return;
        }

        let params = *self.repeat.params.lock();
        log::info!(
            "Triggering repeat cycle: {}x with {:.1}s interval",
            params.count,
            params.interval.as_secs_f64()
        );
        self.repeat.current.store(0, Ordering::Relaxed);

        let cancel = Arc::new(AtomicBool::new(false));
        let engine = Arc::clone(self);
        let worker_cancel = Arc::clone(&cancel);
        let spawned = std::thread::Builder::new()
            .name("repeat-worker".into())
            .spawn(move || repeat_worker(engine, params, worker_cancel));

        match spawned {
            Ok(handle) => *worker = Some(WorkerHandle { handle, cancel }),
            Err(e) => log::error!("Failed to spawn repeat worker: {e}"),
        }
    }

    pub fn stop_playback(&self) {
        self.send_command(Command::Stop);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // INTERNALS
    // ═══════════════════════════════════════════════════════════════════════

    fn cancel_worker(&self) {
        let taken = self.repeat.worker.lock().take();
        if let Some(worker) = taken {
            worker.cancel.store(true, Ordering::Relaxed);
            if !join_with_timeout(worker.handle, JOIN_TIMEOUT) {
                log::warn!("Repeat worker did not exit within {JOIN_TIMEOUT:?}");
            }
        }
    }

    pub(crate) fn shutdown_repeat_worker(&self) {
        self.cancel_worker();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WORKER LOOP
// ═══════════════════════════════════════════════════════════════════════════════

fn repeat_worker(engine: Arc<PlaybackEngine>, params: RepeatParams, cancel: Arc<AtomicBool>) {
    log::info!("Repeat worker started");

    for iteration in 1..=params.count {
        if cancel.load(Ordering::Relaxed) {
            log::info!("Repeat worker cancelled at iteration {iteration}");
            engine.repeat.current.store(0, Ordering::Relaxed);
            return;
        }

        engine.repeat.current.store(iteration, Ordering::Relaxed);
        log::info!("Starting play {iteration}/{}", params.count);
        engine.send_command(Command::Start);

        std::thread::sleep(SETTLE_DELAY);
        engine.check_and_publish_state_changes();

        // Wait out the playthrough
        while engine.state() == PlayerState::Playing {
            if cancel.load(Ordering::Relaxed) {
                log::info!("Repeat cancelled during playback");
                engine.repeat.current.store(0, Ordering::Relaxed);
                return;
            }
            if engine.loop_enabled() {
                engine.repeat.enabled.store(false, Ordering::Relaxed);
                log::info!("Loop enabled - handing over to loop mode");
                return;
            }
            std::thread::sleep(SLEEP_QUANTUM);
        }

        // Paused holds the cycle until resumed
        while engine.state() == PlayerState::Paused {
            if cancel.load(Ordering::Relaxed) {
                log::info!("Repeat cancelled while paused");
                engine.repeat.current.store(0, Ordering::Relaxed);
                return;
            }
            if engine.loop_enabled() {
                engine.repeat.enabled.store(false, Ordering::Relaxed);
                log::info!("Loop enabled while paused - handing over to loop mode");
                return;
            }
            std::thread::sleep(SLEEP_QUANTUM);
        }

        log::info!("Play {iteration}/{} finished", params.count);

        if iteration < params.count && params.interval > Duration::ZERO {
            log::info!(
                "Waiting {:.1}s before next play",
                params.interval.as_secs_f64()
            );
            // Park the playhead at the top during the wait
            engine.send_command(Command::Seek(0));
            if !interruptible_sleep(&engine, &cancel, params.interval) {
                log::info!("Repeat wait interrupted");
                engine.repeat.current.store(0, Ordering::Relaxed);
                return;
            }
        }
    }

    // Completed: reset the counter but stay armed so the next start trigger
    // runs another full cycle.
    engine.repeat.current.store(0, Ordering::Relaxed);
    log::info!(
        "All {} repetitions completed (repeat mode still armed)",
        params.count
    );
    engine.check_and_publish_state_changes();
}

/// Sleep for `duration` in cancellable quanta. Pausing the player suspends
/// the countdown. Returns false when interrupted by cancellation.
fn interruptible_sleep(
    engine: &PlaybackEngine,
    cancel: &AtomicBool,
    duration: Duration,
) -> bool {
    let mut elapsed = Duration::ZERO;

    while elapsed < duration {
        if cancel.load(Ordering::Relaxed) {
            return false;
        }

        while engine.state() == PlayerState::Paused {
            if cancel.load(Ordering::Relaxed) {
                return false;
            }
            std::thread::sleep(SLEEP_QUANTUM);
        }

        std::thread::sleep(SLEEP_QUANTUM.min(duration - elapsed));
        elapsed += SLEEP_QUANTUM;
    }

    true
}

/// Wait for a thread with a deadline; a handle that misses it is detached.
fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    handle.join().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineSettings;

    #[test]
    fn test_repeat_param_bounds() {
        let engine = PlaybackEngine::new(EngineSettings::default());

        assert!(matches!(
            engine.start_repeat_playback(0, Duration::ZERO),
            Err(EngineError::RepeatCount(0))
        ));
        assert!(matches!(
            engine.start_repeat_playback(11, Duration::ZERO),
            Err(EngineError::RepeatCount(11))
        ));
        assert!(matches!(
            engine.start_repeat_playback(3, Duration::from_secs(31)),
            Err(EngineError::RepeatInterval(_))
        ));
        assert!(engine.start_repeat_playback(10, MAX_REPEAT_INTERVAL).is_ok());
    }

    #[test]
    fn test_arming_repeat_disables_loop() {
        let engine = PlaybackEngine::new(EngineSettings::default());
        engine.set_loop(true);
        assert!(engine.loop_enabled());

        engine.start_repeat_playback(2, Duration::ZERO).unwrap();
        assert!(!engine.loop_enabled());
        assert!(engine.repeat_enabled());
    }

    #[test]
    fn test_loop_toggle_keeps_idle_repeat_armed() {
        let engine = PlaybackEngine::new(EngineSettings::default());
        engine.start_repeat_playback(2, Duration::ZERO).unwrap();

        // No worker is running; loop toggling must not clear the armed params
        engine.set_loop(true);
        assert!(engine.repeat_enabled());
        assert!(engine.loop_enabled());
    }

    #[test]
    fn test_cancel_repeat_clears_state() {
        let engine = PlaybackEngine::new(EngineSettings::default());
        engine.start_repeat_playback(5, Duration::from_secs(1)).unwrap();
        assert!(engine.repeat_enabled());

        engine.cancel_repeat();
        assert!(!engine.repeat_enabled());
        assert_eq!(engine.repeat_current(), 0);
    }
}
