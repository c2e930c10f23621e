//! Playback health monitoring
//!
//! Counters are bumped from the render path; verdicts are computed on demand
//! from the watchdog. Not playing is never itself unhealthy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;

/// Fraction of erroring callbacks above which playback is flagged degraded.
pub const MAX_CALLBACK_ERROR_RATE: f64 = 0.01;

/// Counters written by the render path, read by health checks.
#[derive(Debug)]
pub struct HealthMonitor {
    callback_calls: AtomicU64,
    callback_errors: AtomicU64,
    watch: Mutex<PositionWatch>,
    stall_threshold: Duration,
}

#[derive(Debug)]
struct PositionWatch {
    last_position: usize,
    last_advance: Instant,
}

impl HealthMonitor {
    pub fn new(stall_threshold: Duration) -> Self {
        Self {
            callback_calls: AtomicU64::new(0),
            callback_errors: AtomicU64::new(0),
            watch: Mutex::new(PositionWatch {
                last_position: 0,
                last_advance: Instant::now(),
            }),
            stall_threshold,
        }
    }

    #[inline]
    pub fn record_callback(&self) {
        self.callback_calls.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.callback_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn calls(&self) -> u64 {
        self.callback_calls.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.callback_errors.load(Ordering::Relaxed)
    }

    pub fn error_rate(&self) -> f64 {
        let calls = self.calls();
        if calls == 0 {
            return 0.0;
        }
        self.errors() as f64 / calls as f64
    }

    /// Note the current position and return how long it has been since it
    /// last advanced.
    pub fn observe_position(&self, position: usize) -> Duration {
        let mut watch = self.watch.lock();
        let now = Instant::now();
        if position != watch.last_position {
            watch.last_position = position;
            watch.last_advance = now;
        }
        now - watch.last_advance
    }

    pub fn stall_threshold(&self) -> Duration {
        self.stall_threshold
    }
}

/// Health verdict returned by `PlaybackEngine::check_playback_health`.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackHealth {
    pub is_healthy: bool,
    pub issues: Vec<String>,
    pub metrics: HealthMetrics,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthMetrics {
    pub callback_calls: u64,
    pub callback_errors: u64,
    pub time_since_update: f64,
    pub position: usize,
    pub template_frames: usize,
    pub state: String,
    pub repeat_waiting: bool,
}

impl PlaybackHealth {
    pub fn healthy(metrics: HealthMetrics) -> Self {
        Self {
            is_healthy: true,
            issues: Vec::new(),
            metrics,
        }
    }

    pub fn flag(&mut self, issue: String) {
        self.is_healthy = false;
        self.issues.push(issue);
    }
}
