//! Report delivery.
//!
//! [`HttpTransport`] never blocks the caller: reports go into a bounded queue
//! and a single worker task posts them. A full queue drops the report, a
//! failed post is logged and forgotten.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracely_common_config::{TracelyConfig, TransportConfig};
use tracely_common_core::SharedClock;
use tracely_common_http::{HttpClient, HttpConfig, Method, RequestBuilder};
use tracely_common_log::spans::{instrument_future, report_span};

use crate::error::TransportError;
use crate::payload::{ActivePayload, ErrorData};
use crate::sign::build_headers;

/// Collector endpoint for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Error,
    Active,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Error => "/report/error",
            Self::Active => "/report/active",
        }
    }
}

/// A report waiting for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Error(ErrorData),
    Active(ActivePayload),
}

impl Report {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Error(_) => Endpoint::Error,
            Self::Active(_) => Endpoint::Active,
        }
    }
}

impl Serialize for Report {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Error(data) => data.serialize(serializer),
            Self::Active(payload) => payload.serialize(serializer),
        }
    }
}

/// Somewhere reports can be handed off to.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Hand a report off without waiting for delivery.
    fn dispatch(&self, report: Report);

    /// Stop accepting reports and wait for queued ones to finish.
    async fn shutdown(&self);
}

/// POST `body` to `config.host + path` with freshly signed headers.
///
/// Returns whether the collector accepted it. Failures are logged, never
/// raised.
pub async fn signed_fetch<T: Serialize + ?Sized>(
    http: &HttpClient,
    config: &TracelyConfig,
    clock: &SharedClock,
    path: &str,
    body: &T,
) -> bool {
    let request = build_headers(config, clock.as_ref())
        .apply(RequestBuilder::new().base_url(&config.host).json_content());

    let result = match http.send_json(Method::POST, path, &request, body).await {
        Ok(response) => HttpClient::check_response(response).await.map(|_| ()),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            tracing::debug!(%path, "report delivered");
            true
        }
        Err(e) => {
            tracing::warn!(%path, error = %e, "failed to deliver report");
            false
        }
    }
}

/// Everything the worker needs to post one report.
struct Delivery {
    http: HttpClient,
    config: Arc<TracelyConfig>,
    clock: SharedClock,
    max_attempts: u32,
    retry_delay: Duration,
}

impl Delivery {
    async fn deliver(&self, report: &Report) {
        let path = report.endpoint().path();
        let span = report_span(path, &self.config.app_id);

        instrument_future(
            async {
                for attempt in 1..=self.max_attempts {
                    tracing::Span::current().record("attempt", attempt);
                    if signed_fetch(&self.http, &self.config, &self.clock, path, report).await {
                        return;
                    }
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                tracing::warn!(attempts = self.max_attempts, "giving up on report");
            },
            span,
        )
        .await
    }
}

/// Queue-backed HTTP transport.
pub struct HttpTransport {
    sender: Mutex<Option<mpsc::Sender<Report>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HttpTransport {
    /// Start the delivery worker on the current tokio runtime.
    pub fn new(
        config: Arc<TracelyConfig>,
        transport: &TransportConfig,
        clock: SharedClock,
    ) -> Result<Self, TransportError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let http = HttpClient::with_config(HttpConfig::with_timeout(transport.timeout()))?;

        let delivery = Delivery {
            http,
            config,
            clock,
            max_attempts: transport.max_attempts.max(1),
            retry_delay: transport.retry_delay(),
        };

        let (sender, mut receiver) = mpsc::channel::<Report>(transport.queue_capacity.max(1));
        let worker = runtime.spawn(async move {
            while let Some(report) = receiver.recv().await {
                delivery.deliver(&report).await;
            }
            tracing::debug!("report queue closed, worker exiting");
        });

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn dispatch(&self, report: Report) {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            tracing::warn!(endpoint = report.endpoint().path(), "transport shut down, dropping report");
            return;
        };

        match sender.try_send(report) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(report)) => {
                tracing::warn!(endpoint = report.endpoint().path(), "report queue full, dropping report");
            }
            Err(mpsc::error::TrySendError::Closed(report)) => {
                tracing::warn!(endpoint = report.endpoint().path(), "report queue closed, dropping report");
            }
        }
    }

    async fn shutdown(&self) {
        // Dropping the sender lets the worker drain what is queued and exit.
        self.sender.lock().take();
        let worker = self.worker.lock().take();

        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "report worker ended abnormally");
            }
        }
    }
}

/// Transport that keeps every report in memory.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    reports: Mutex<Vec<Report>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    pub fn error_reports(&self) -> Vec<ErrorData> {
        self.reports
            .lock()
            .iter()
            .filter_map(|r| match r {
                Report::Error(data) => Some(data.clone()),
                Report::Active(_) => None,
            })
            .collect()
    }

    pub fn active_reports(&self) -> Vec<ActivePayload> {
        self.reports
            .lock()
            .iter()
            .filter_map(|r| match r {
                Report::Active(payload) => Some(payload.clone()),
                Report::Error(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn dispatch(&self, report: Report) {
        self.reports.lock().push(report);
    }

    async fn shutdown(&self) {}
}
