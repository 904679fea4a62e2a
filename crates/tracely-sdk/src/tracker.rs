//! Page dwell-time tracking.
//!
//! The tracker is an explicit context: created empty, initialised with a
//! config and the first page, updated by navigation and visibility changes,
//! and torn down on unload. Calls outside that lifetime warn and do nothing.

use parking_lot::Mutex;
use std::sync::Arc;
use tracely_common_config::TracelyConfig;
use tracely_common_core::SharedClock;

use crate::payload::ActivePayload;
use crate::transport::{Report, Transport};
use crate::user_id::UserIds;

/// Page visibility as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Current page and when it was entered (epoch ms).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub page: String,
    pub entered_at: u64,
}

struct TrackerState {
    config: Arc<TracelyConfig>,
    current_page: String,
    entered_at: u64,
}

/// A page stay that is ready to be reported.
struct Stay {
    app_id: String,
    page: String,
    elapsed_ms: u64,
}

pub struct ActivityTracker {
    transport: Arc<dyn Transport>,
    clock: SharedClock,
    user_ids: Arc<UserIds>,
    state: Mutex<Option<TrackerState>>,
}

impl ActivityTracker {
    pub fn new(transport: Arc<dyn Transport>, clock: SharedClock, user_ids: Arc<UserIds>) -> Self {
        Self {
            transport,
            clock,
            user_ids,
            state: Mutex::new(None),
        }
    }

    /// Start tracking `initial_page` from now.
    pub fn init(&self, config: Arc<TracelyConfig>, initial_page: impl Into<String>) {
        let page = initial_page.into();
        tracing::debug!(%page, "activity tracker initialised");
        *self.state.lock() = Some(TrackerState {
            config,
            current_page: page,
            entered_at: self.clock.now_millis(),
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Flush the current page, then forget all state.
    pub fn on_unload(&self) {
        let now = self.clock.now_millis();
        let Some(state) = self.state.lock().take() else {
            tracing::warn!("tracker not initialised, ignoring unload");
            return;
        };
        self.report_stay(stay_of(&state, now));
        tracing::debug!("activity tracker torn down");
    }

    /// On `Hidden`, flush the current page and restart its clock.
    pub fn on_visibility_change(&self, visibility: Visibility) {
        let now = self.clock.now_millis();
        let stay = {
            let mut guard = self.state.lock();
            let Some(state) = guard.as_mut() else {
                tracing::warn!(?visibility, "tracker not initialised, ignoring visibility change");
                return;
            };
            if visibility == Visibility::Visible {
                return;
            }
            let stay = stay_of(state, now);
            state.entered_at = now;
            stay
        };
        self.report_stay(stay);
    }

    /// Flush the outgoing page and start timing `new_path`.
    pub fn on_route_change(&self, new_path: impl Into<String>) {
        let new_path = new_path.into();
        let now = self.clock.now_millis();
        let stay = {
            let mut guard = self.state.lock();
            let Some(state) = guard.as_mut() else {
                tracing::warn!(page = %new_path, "tracker not initialised, ignoring route change");
                return;
            };
            let stay = stay_of(state, now);
            state.current_page = new_path;
            state.entered_at = now;
            stay
        };
        self.report_stay(stay);
    }

    pub fn snapshot(&self) -> Option<PageSnapshot> {
        self.state.lock().as_ref().map(|state| PageSnapshot {
            page: state.current_page.clone(),
            entered_at: state.entered_at,
        })
    }

    fn report_stay(&self, stay: Stay) {
        if stay.elapsed_ms == 0 {
            return;
        }

        let payload = ActivePayload {
            app_id: stay.app_id,
            user_id: self.user_ids.get_or_create(),
            page: stay.page,
            duration: stay.elapsed_ms / 1000,
        };
        tracing::debug!(page = %payload.page, duration = payload.duration, "reporting page stay");
        self.transport.dispatch(Report::Active(payload));
    }
}

fn stay_of(state: &TrackerState, now: u64) -> Stay {
    Stay {
        app_id: state.config.app_id.clone(),
        page: state.current_page.clone(),
        elapsed_ms: now.saturating_sub(state.entered_at),
    }
}
