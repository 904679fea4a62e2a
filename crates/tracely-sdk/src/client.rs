//! The `Tracely` client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracely_common_config::{validate_sdk, CaptureConfig, TracelyConfig, TracelySettings};
use tracely_common_core::{LocalStore, MemoryStore, SharedClock, SystemClock};

use crate::capture::{install_panic_hook, ErrorCapture, RuntimeEvent};
use crate::error::Result;
use crate::location::Location;
use crate::payload::ErrorData;
use crate::throttle::Throttle;
use crate::tracker::{ActivityTracker, Visibility};
use crate::transport::{HttpTransport, Transport};
use crate::user_id::UserIds;

/// Entry point for a host application.
///
/// ```no_run
/// # async fn run() -> Result<(), tracely_sdk::TracelyError> {
/// use tracely_sdk::{Tracely, TracelyConfig};
///
/// let tracely = Tracely::new(TracelyConfig::new("my-app-id", "my-app-secret", "http://localhost:3001"))?
///     .with_location("http://localhost:3000/dashboard");
/// tracely.init();
/// tracely.navigate("http://localhost:3000/dashboard/errors");
/// tracely.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct Tracely {
    config: Arc<TracelyConfig>,
    capture: Arc<ErrorCapture>,
    tracker: ActivityTracker,
    transport: Arc<dyn Transport>,
    location: Location,
    capture_panics: bool,
    initialized: AtomicBool,
}

impl Tracely {
    /// Client with default transport and capture settings and an in-memory
    /// user id store. Must be called inside a tokio runtime.
    pub fn new(config: TracelyConfig) -> Result<Self> {
        let settings = TracelySettings {
            sdk: config,
            ..Default::default()
        };
        Self::from_settings(&settings, Arc::new(MemoryStore::new()))
    }

    /// Client built from loaded settings. Must be called inside a tokio runtime.
    pub fn from_settings(settings: &TracelySettings, store: Arc<dyn LocalStore>) -> Result<Self> {
        validate_sdk(&settings.sdk)?;

        let config = Arc::new(settings.sdk.clone());
        let clock = SystemClock::shared();
        let transport = HttpTransport::new(config.clone(), &settings.transport, clock.clone())?;

        Ok(Self::assemble(
            config,
            &settings.capture,
            Arc::new(transport),
            clock,
            store,
        ))
    }

    /// Client over caller-supplied parts, for tests and custom transports.
    pub fn with_parts(
        config: TracelyConfig,
        capture: &CaptureConfig,
        transport: Arc<dyn Transport>,
        clock: SharedClock,
        store: Arc<dyn LocalStore>,
    ) -> Self {
        Self::assemble(Arc::new(config), capture, transport, clock, store)
    }

    fn assemble(
        config: Arc<TracelyConfig>,
        capture_config: &CaptureConfig,
        transport: Arc<dyn Transport>,
        clock: SharedClock,
        store: Arc<dyn LocalStore>,
    ) -> Self {
        let location = Location::default();
        let capture = ErrorCapture::new(
            transport.clone(),
            Throttle::from_config(clock.clone(), capture_config),
            location.clone(),
            capture_config.fingerprint_max_chars,
        );
        let tracker = ActivityTracker::new(transport.clone(), clock, Arc::new(UserIds::new(store)));

        Self {
            config,
            capture: Arc::new(capture),
            tracker,
            transport,
            location,
            capture_panics: capture_config.capture_panics,
            initialized: AtomicBool::new(false),
        }
    }

    /// Set the starting location before `init`.
    pub fn with_location(self, href: impl Into<String>) -> Self {
        self.location.set(href);
        self
    }

    /// Install the panic hook (if enabled) and start tracking the current
    /// page. Calling it again is a no-op.
    pub fn init(&self) {
        if self.initialized.swap(true, Ordering::SeqCst) {
            tracing::debug!("tracely already initialised");
            return;
        }

        if self.capture_panics {
            install_panic_hook(&self.capture);
        }
        self.tracker.init(self.config.clone(), self.location.pathname());
        tracing::info!(app_id = %self.config.app_id, host = %self.config.host, "tracely initialised");
    }

    /// Report a host error by hand.
    pub fn report_error(&self, error: &(dyn std::error::Error + 'static), info: Option<&str>) -> bool {
        self.capture.capture_error(error, info)
    }

    /// Report a prepared error body, subject to throttling.
    pub fn report(&self, data: ErrorData) -> bool {
        self.capture.report_error(data)
    }

    /// Feed a runtime error or unhandled rejection.
    pub fn handle_event(&self, event: RuntimeEvent) -> bool {
        self.capture.handle_event(event)
    }

    /// Update the location and flush the page being left.
    pub fn navigate(&self, href: impl Into<String>) {
        self.location.set(href);
        self.tracker.on_route_change(self.location.pathname());
    }

    pub fn on_visibility_change(&self, visibility: Visibility) {
        self.tracker.on_visibility_change(visibility);
    }

    /// Flush the current page and wait for queued reports.
    pub async fn shutdown(&self) {
        if self.tracker.is_initialized() {
            self.tracker.on_unload();
        }
        self.transport.shutdown().await;
        tracing::debug!("tracely shut down");
    }

    pub fn config(&self) -> &TracelyConfig {
        &self.config
    }

    /// Shared handle to the capture pipeline, e.g. for middleware.
    pub fn capture(&self) -> &Arc<ErrorCapture> {
        &self.capture
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn tracker(&self) -> &ActivityTracker {
        &self.tracker
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

impl std::fmt::Debug for Tracely {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracely")
            .field("config", &self.config)
            .field("location", &self.location.href())
            .field("initialized", &self.initialized.load(Ordering::SeqCst))
            .finish()
    }
}
