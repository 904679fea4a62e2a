//! Span helpers shared by the SDK, the middleware and the CLI.

use std::future::Future;
use std::time::Instant;
use tracing::{info_span, Instrument, Span};

/// Span around one report delivery.
pub fn report_span(endpoint: &str, app_id: &str) -> Span {
    info_span!("report", endpoint = %endpoint, app_id = %app_id, attempt = tracing::field::Empty)
}

/// Span around one dashboard API call.
pub fn dashboard_span(method: &str, path: &str) -> Span {
    info_span!("dashboard", method = %method, path = %path)
}

/// Span around one tracked HTTP request in the middleware.
pub fn request_span(method: &str, route: &str) -> Span {
    info_span!("request", method = %method, route = %route)
}

/// Instrument a future with a span.
pub fn instrument_future<F: Future>(future: F, span: Span) -> impl Future<Output = F::Output> {
    future.instrument(span)
}

/// Wall-clock timer that logs on completion.
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }

    /// Log the elapsed time and return it in milliseconds.
    pub fn finish(self) -> u128 {
        let elapsed = self.start.elapsed().as_millis();
        tracing::debug!(operation = %self.operation, duration_ms = %elapsed, "operation completed");
        elapsed
    }
}
