//! Tracely reporting client.
//!
//! Captures runtime errors, unhandled rejections, manual reports and panics,
//! throttles duplicates, tracks page dwell time, and posts signed JSON reports
//! to a collector without ever blocking or failing the host.
//!
//! ```no_run
//! # async fn run() -> Result<(), tracely_sdk::TracelyError> {
//! use tracely_sdk::{EventTarget, RuntimeEvent, Tracely, TracelyConfig};
//!
//! let tracely = Tracely::new(TracelyConfig::new("a1", "s1", "http://localhost:3001"))?;
//! tracely.init();
//! tracely.handle_event(RuntimeEvent::Error {
//!     message: "boom".into(),
//!     stack: None,
//!     target: EventTarget::Window,
//! });
//! tracely.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod client;
pub mod error;
pub mod location;
pub mod payload;
pub mod sign;
pub mod throttle;
pub mod tracker;
pub mod transport;
pub mod user_id;

pub use capture::{
    catch_panic, install_panic_hook, install_scope_hook, panic_message, CatchPanic, CaughtPanic, ErrorCapture,
    EventTarget, RejectionReason, RuntimeEvent,
};
pub use client::Tracely;
pub use error::{Result, TracelyError, TransportError};
pub use location::Location;
pub use payload::{fingerprint, ActivePayload, ErrorData, ErrorKind};
pub use sign::{build_headers, generate_nonce, generate_signature, AuthHeaders};
pub use throttle::Throttle;
pub use tracker::{ActivityTracker, PageSnapshot, Visibility};
pub use transport::{signed_fetch, Endpoint, HttpTransport, RecordingTransport, Report, Transport};
pub use user_id::{UserIds, USER_ID_KEY};

pub use tracely_common_config::{CaptureConfig, TimestampUnit, TracelyConfig, TracelySettings, TransportConfig};
