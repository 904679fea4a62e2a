//! Error capture.
//!
//! Runtime events, manual reports and panics all end up in
//! [`ErrorCapture::report_error`], which fingerprints, throttles and hands the
//! report to the transport. Nothing here returns an error to the host.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Once, Weak};
use std::task::{Context, Poll};

use crate::location::Location;
use crate::payload::{ErrorData, ErrorKind};
use crate::throttle::Throttle;
use crate::transport::{Report, Transport};

/// Where a runtime error event originated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget {
    /// A script error raised at the top level.
    Window,
    /// A resource (image, script tag, ...) that failed to load.
    Element { tag: String },
}

/// Why an asynchronous operation failed without a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionReason {
    /// An error-shaped value.
    Error {
        message: String,
        stack: Option<String>,
    },
    /// Any other value; reported by its string form.
    Value(serde_json::Value),
}

/// Events fed in by the host's runtime integration.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    Error {
        message: String,
        stack: Option<String>,
        target: EventTarget,
    },
    UnhandledRejection {
        reason: RejectionReason,
    },
}

/// Turns failures into throttled error reports.
pub struct ErrorCapture {
    transport: Arc<dyn Transport>,
    throttle: Throttle,
    location: Location,
    fingerprint_max_chars: usize,
}

impl ErrorCapture {
    pub fn new(
        transport: Arc<dyn Transport>,
        throttle: Throttle,
        location: Location,
        fingerprint_max_chars: usize,
    ) -> Self {
        Self {
            transport,
            throttle,
            location,
            fingerprint_max_chars,
        }
    }

    /// Handle a runtime event. Returns whether a report was dispatched.
    pub fn handle_event(&self, event: RuntimeEvent) -> bool {
        match event {
            RuntimeEvent::Error {
                target: EventTarget::Element { tag },
                message,
                ..
            } => {
                tracing::debug!(%tag, %message, "ignoring resource load failure");
                false
            }
            RuntimeEvent::Error {
                message,
                stack,
                target: EventTarget::Window,
            } => self.report_error(
                ErrorData::new(ErrorKind::JsError, message, self.location.href()).with_stack(stack),
            ),
            RuntimeEvent::UnhandledRejection { reason } => {
                let (message, stack) = rejection_message(reason);
                self.report_error(
                    ErrorData::new(ErrorKind::PromiseError, message, self.location.href())
                        .with_stack(stack),
                )
            }
        }
    }

    /// Report a host error by hand. `info` is appended to the message as
    /// `"{message}: {info}"`; the source chain becomes the stack.
    pub fn capture_error(&self, error: &(dyn std::error::Error + 'static), info: Option<&str>) -> bool {
        let message = match info {
            Some(info) => format!("{}: {}", error, info),
            None => error.to_string(),
        };
        self.report_error(
            ErrorData::new(ErrorKind::ManualError, message, self.location.href())
                .with_stack(source_chain(error)),
        )
    }

    /// Throttle and dispatch. Returns whether the report went to the transport.
    pub fn report_error(&self, data: ErrorData) -> bool {
        let fingerprint = data.fingerprint(self.fingerprint_max_chars);
        if !self.throttle.should_report(&fingerprint) {
            tracing::debug!(%fingerprint, "error report throttled");
            return false;
        }

        tracing::debug!(kind = %data.kind, %fingerprint, "dispatching error report");
        self.transport.dispatch(Report::Error(data));
        true
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }
}

fn rejection_message(reason: RejectionReason) -> (String, Option<String>) {
    match reason {
        RejectionReason::Error { message, stack } if !message.is_empty() => (message, stack),
        RejectionReason::Error { stack, .. } => ("Error".to_string(), stack),
        RejectionReason::Value(serde_json::Value::String(s)) => (s, None),
        RejectionReason::Value(value) => (value.to_string(), None),
    }
}

/// Render `error.source()` and its ancestors, one per line.
fn source_chain(error: &(dyn std::error::Error + 'static)) -> Option<String> {
    let mut lines = Vec::new();
    let mut current = error.source();
    while let Some(source) = current {
        lines.push(format!("Caused by: {}", source));
        current = source.source();
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Install a process-wide panic hook that reports `panicError` and then runs
/// the previously installed hook.
///
/// The hook holds a weak reference, so it goes quiet once the capture is
/// dropped. Panics raised inside [`catch_panic`] are left to its caller.
pub fn install_panic_hook(capture: &Arc<ErrorCapture>) {
    install_scope_hook();

    let capture: Weak<ErrorCapture> = Arc::downgrade(capture);
    let previous = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        if !in_panic_scope() {
            if let Some(capture) = capture.upgrade() {
                let data = ErrorData::new(
                    ErrorKind::PanicError,
                    panic_message(info.payload()),
                    capture.location.href(),
                )
                .with_stack(Some(panic_site_stack(info.location())));
                capture.report_error(data);
            }
        }
        previous(info);
    }));

    tracing::debug!("panic hook installed");
}

thread_local! {
    static SCOPE_DEPTH: Cell<usize> = const { Cell::new(0) };
    static STASHED_STACK: RefCell<Option<String>> = const { RefCell::new(None) };
}

static SCOPE_HOOK: Once = Once::new();

/// Install, once per process, the hook that records the stack of panics
/// raised inside [`catch_panic`]. Other panics pass straight through.
pub fn install_scope_hook() {
    SCOPE_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if in_panic_scope() {
                let stack = panic_site_stack(info.location());
                let _ = STASHED_STACK.try_with(|slot| *slot.borrow_mut() = Some(stack));
            }
            previous(info);
        }));
    });
}

fn in_panic_scope() -> bool {
    SCOPE_DEPTH.try_with(|depth| depth.get() > 0).unwrap_or(false)
}

fn panic_site_stack(location: Option<&panic::Location<'_>>) -> String {
    let mut stack = match location {
        Some(location) => format!("panicked at {}\n", location),
        None => String::new(),
    };
    stack.push_str(&Backtrace::force_capture().to_string());
    stack
}

/// Marks the current thread as polling inside a [`catch_panic`] future.
struct ScopeGuard;

impl ScopeGuard {
    fn enter() -> Self {
        SCOPE_DEPTH.with(|depth| {
            if depth.get() == 0 {
                STASHED_STACK.with(|slot| slot.borrow_mut().take());
            }
            depth.set(depth.get() + 1);
        });
        ScopeGuard
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let _ = SCOPE_DEPTH.try_with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// A panic caught by [`catch_panic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaughtPanic {
    pub message: String,
    /// Stack recorded where the panic was raised. `None` when the scope hook
    /// was not installed or has been replaced.
    pub stack: Option<String>,
}

/// Future returned by [`catch_panic`].
pub struct CatchPanic<F> {
    inner: Pin<Box<F>>,
}

/// Poll `future` inside a panic scope. A panic ends the future with
/// [`CaughtPanic`] instead of unwinding into the caller, and the process
/// panic hook leaves it unreported.
pub fn catch_panic<F: Future>(future: F) -> CatchPanic<F> {
    install_scope_hook();
    CatchPanic {
        inner: Box::pin(future),
    }
}

impl<F: Future> Future for CatchPanic<F> {
    type Output = Result<F::Output, CaughtPanic>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = self.get_mut().inner.as_mut();
        let _scope = ScopeGuard::enter();

        match panic::catch_unwind(AssertUnwindSafe(|| inner.poll(cx))) {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(output)) => Poll::Ready(Ok(output)),
            Err(payload) => Poll::Ready(Err(CaughtPanic {
                message: panic_message(payload.as_ref()),
                stack: STASHED_STACK.with(|slot| slot.borrow_mut().take()),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RecordingTransport;
    use std::time::Duration;
    use tracely_common_core::ManualClock;

    fn capture() -> (Arc<RecordingTransport>, Arc<ManualClock>, ErrorCapture) {
        let transport = Arc::new(RecordingTransport::default());
        let clock = ManualClock::shared(1_700_000_000_000);
        let throttle = Throttle::new(clock.clone(), Duration::from_secs(60), Duration::from_secs(60));
        let capture = ErrorCapture::new(
            transport.clone(),
            throttle,
            Location::new("http://h/page"),
            200,
        );
        (transport, clock, capture)
    }

    fn window_error(message: &str) -> RuntimeEvent {
        RuntimeEvent::Error {
            message: message.to_string(),
            stack: Some(format!("Error: {}\n    at main.js:1:1", message)),
            target: EventTarget::Window,
        }
    }

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "failed to load profile")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_window_error_becomes_js_error() {
        let (transport, _, capture) = capture();
        assert!(capture.handle_event(window_error("boom")));

        let reports = transport.error_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, ErrorKind::JsError);
        assert_eq!(reports[0].message, "boom");
        assert_eq!(reports[0].url, "http://h/page");
        assert!(reports[0].stack.as_deref().unwrap().contains("main.js"));
    }

    #[test]
    fn test_resource_errors_are_filtered() {
        let (transport, _, capture) = capture();
        let event = RuntimeEvent::Error {
            message: "failed to load".to_string(),
            stack: None,
            target: EventTarget::Element {
                tag: "img".to_string(),
            },
        };

        assert!(!capture.handle_event(event));
        assert!(transport.reports().is_empty());
    }

    #[test]
    fn test_rejection_reasons() {
        let (transport, _, capture) = capture();

        capture.handle_event(RuntimeEvent::UnhandledRejection {
            reason: RejectionReason::Error {
                message: "fetch failed".to_string(),
                stack: Some("at fetch".to_string()),
            },
        });
        capture.handle_event(RuntimeEvent::UnhandledRejection {
            reason: RejectionReason::Value(serde_json::json!("plain string")),
        });
        capture.handle_event(RuntimeEvent::UnhandledRejection {
            reason: RejectionReason::Value(serde_json::json!({"code": 7})),
        });

        let reports = transport.error_reports();
        let messages: Vec<_> = reports.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, ["fetch failed", "plain string", r#"{"code":7}"#]);
        assert!(reports.iter().all(|r| r.kind == ErrorKind::PromiseError));
        assert_eq!(reports[0].stack.as_deref(), Some("at fetch"));
        assert_eq!(reports[1].stack, None);
    }

    #[test]
    fn test_capture_error_appends_info_and_chain() {
        let (transport, _, capture) = capture();
        let error = Outer(std::io::Error::new(std::io::ErrorKind::NotFound, "profile.json"));

        capture.capture_error(&error, Some("during login"));

        let reports = transport.error_reports();
        assert_eq!(reports[0].kind, ErrorKind::ManualError);
        assert_eq!(reports[0].message, "failed to load profile: during login");
        assert_eq!(reports[0].stack.as_deref(), Some("Caused by: profile.json"));
    }

    #[test]
    fn test_capture_error_without_info() {
        let (transport, _, capture) = capture();
        let error = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        capture.capture_error(&error, None);
        assert_eq!(transport.error_reports()[0].message, "disk full");
    }

    #[test]
    fn test_duplicates_are_throttled_until_window_passes() {
        let (transport, clock, capture) = capture();

        for _ in 0..25 {
            capture.handle_event(window_error("boom"));
        }
        assert_eq!(transport.reports().len(), 1);

        clock.advance(Duration::from_secs(60));
        capture.handle_event(window_error("boom"));
        capture.handle_event(window_error("boom"));
        assert_eq!(transport.reports().len(), 2);
    }

    #[test]
    fn test_location_is_read_at_capture_time() {
        let (transport, _, capture) = capture();
        capture.location().set("http://h/other");
        capture.handle_event(window_error("late"));
        assert_eq!(transport.error_reports()[0].url, "http://h/other");
    }

    #[test]
    fn test_panic_message_payloads() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "Box<dyn Any>");
    }

    #[tokio::test]
    async fn test_catch_panic_passes_output_through() {
        assert_eq!(catch_panic(async { 7 }).await, Ok(7));
    }

    #[inline(never)]
    fn fail_checkout() {
        panic!("checkout failed");
    }

    #[tokio::test]
    async fn test_catch_panic_keeps_panic_site_stack() {
        let caught = catch_panic(async {
            tokio::task::yield_now().await;
            fail_checkout();
        })
        .await
        .unwrap_err();

        assert_eq!(caught.message, "checkout failed");
        let stack = caught.stack.unwrap();
        assert!(stack.starts_with("panicked at"));
        assert!(stack.contains("fail_checkout"), "stack was {stack}");
        assert!(!in_panic_scope());
    }
}
