//! Duplicate suppression for error reports.
//!
//! Each fingerprint is reported at most once per window. Expired entries are
//! swept lazily, at most once per sweep interval, so the cache only holds
//! fingerprints seen within roughly the last two windows.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracely_common_config::CaptureConfig;
use tracely_common_core::SharedClock;

/// Fingerprint to last-report time cache.
pub struct Throttle {
    clock: SharedClock,
    window_ms: u64,
    sweep_interval_ms: u64,
    state: Mutex<ThrottleState>,
}

struct ThrottleState {
    last_sent: HashMap<String, u64>,
    last_sweep: u64,
}

impl Throttle {
    pub fn new(clock: SharedClock, window: Duration, sweep_interval: Duration) -> Self {
        let now = clock.now_millis();
        Self {
            clock,
            window_ms: window.as_millis() as u64,
            sweep_interval_ms: sweep_interval.as_millis() as u64,
            state: Mutex::new(ThrottleState {
                last_sent: HashMap::new(),
                last_sweep: now,
            }),
        }
    }

    pub fn from_config(clock: SharedClock, config: &CaptureConfig) -> Self {
        Self::new(clock, config.throttle_window(), config.sweep_interval())
    }

    /// Whether a report for `fingerprint` may go out now. A `true` answer
    /// records the send time, so the caller must actually send.
    pub fn should_report(&self, fingerprint: &str) -> bool {
        let now = self.clock.now_millis();
        let mut state = self.state.lock();

        if now.saturating_sub(state.last_sweep) >= self.sweep_interval_ms {
            Self::sweep_locked(&mut state, now, self.window_ms);
        }

        if let Some(&last) = state.last_sent.get(fingerprint) {
            if now.saturating_sub(last) < self.window_ms {
                return false;
            }
        }

        state.last_sent.insert(fingerprint.to_string(), now);
        true
    }

    /// Drop every entry whose window has passed.
    pub fn sweep(&self) {
        let now = self.clock.now_millis();
        Self::sweep_locked(&mut self.state.lock(), now, self.window_ms);
    }

    fn sweep_locked(state: &mut ThrottleState, now: u64, window_ms: u64) {
        let before = state.last_sent.len();
        state
            .last_sent
            .retain(|_, last| now.saturating_sub(*last) < window_ms);
        state.last_sweep = now;

        let evicted = before - state.last_sent.len();
        if evicted > 0 {
            tracing::trace!(evicted, remaining = state.last_sent.len(), "swept throttle cache");
        }
    }

    /// Number of tracked fingerprints.
    pub fn len(&self) -> usize {
        self.state.lock().last_sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("window_ms", &self.window_ms)
            .field("sweep_interval_ms", &self.sweep_interval_ms)
            .field("entries", &self.len())
            .finish()
    }
}
