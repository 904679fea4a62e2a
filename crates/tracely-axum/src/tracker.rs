//! Per-request activity reporting.

use axum::{body::Body, extract::Request, http::Response};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tower::{Layer, Service};
use tracely_common_http::headers;
use tracely_common_log::spans::{instrument_future, request_span};
use tracely_sdk::{ActivePayload, Report, Tracely, Transport};

/// Unit of the reported `duration`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DurationUnit {
    /// Whole seconds, as `/report/active` expects.
    #[default]
    Seconds,
    /// Milliseconds, for collectors that want request latency.
    Millis,
}

impl DurationUnit {
    pub fn convert(&self, elapsed: Duration) -> u64 {
        match self {
            Self::Seconds => elapsed.as_secs(),
            Self::Millis => elapsed.as_millis() as u64,
        }
    }
}

/// Reports each request as `{appId, userId, page, duration}`.
#[derive(Clone)]
pub struct RequestTrackerLayer {
    transport: Arc<dyn Transport>,
    app_id: Arc<str>,
    unit: DurationUnit,
}

impl RequestTrackerLayer {
    pub fn new(transport: Arc<dyn Transport>, app_id: impl Into<Arc<str>>) -> Self {
        Self {
            transport,
            app_id: app_id.into(),
            unit: DurationUnit::default(),
        }
    }

    pub fn from_client(tracely: &Tracely) -> Self {
        Self::new(tracely.transport().clone(), tracely.config().app_id.as_str())
    }

    pub fn with_unit(mut self, unit: DurationUnit) -> Self {
        self.unit = unit;
        self
    }
}

impl<S> Layer<S> for RequestTrackerLayer {
    type Service = RequestTrackerMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTrackerMiddleware {
            inner,
            layer: self.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequestTrackerMiddleware<S> {
    inner: S,
    layer: RequestTrackerLayer,
}

impl<S> Service<Request> for RequestTrackerMiddleware<S>
where
    S: Service<Request, Response = Response<Body>, Error = std::convert::Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let layer = self.layer.clone();
        let mut inner = self.inner.clone();

        let page = crate::route_of(&req);
        let user_id = req
            .headers()
            .get(headers::X_USER_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let span = request_span(req.method().as_str(), &page);

        Box::pin(instrument_future(
            async move {
                let start = Instant::now();
                let response = inner.call(req).await?;
                let duration = layer.unit.convert(start.elapsed());

                tracing::debug!(status = response.status().as_u16(), duration, "request tracked");
                layer.transport.dispatch(Report::Active(ActivePayload {
                    app_id: layer.app_id.to_string(),
                    user_id,
                    page,
                    duration,
                }));

                Ok(response)
            },
            span,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_unit_conversion() {
        let elapsed = Duration::from_millis(2_750);
        assert_eq!(DurationUnit::Seconds.convert(elapsed), 2);
        assert_eq!(DurationUnit::Millis.convert(elapsed), 2_750);
        assert_eq!(DurationUnit::default(), DurationUnit::Seconds);
    }
}
