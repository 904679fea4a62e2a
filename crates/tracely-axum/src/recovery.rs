//! Panic recovery middleware.

use axum::{
    body::Body,
    extract::Request,
    http::{Response, StatusCode},
    response::IntoResponse,
    Json,
};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracely_sdk::{catch_panic, install_scope_hook, ErrorCapture, ErrorData, ErrorKind, Tracely};

/// Catches panics from the inner service and reports them against the matched
/// route, with the stack recorded where the panic was raised.
#[derive(Clone)]
pub struct RecoveryLayer {
    capture: Arc<ErrorCapture>,
}

impl RecoveryLayer {
    pub fn new(capture: Arc<ErrorCapture>) -> Self {
        install_scope_hook();
        Self { capture }
    }

    pub fn from_client(tracely: &Tracely) -> Self {
        Self::new(tracely.capture().clone())
    }
}

impl<S> Layer<S> for RecoveryLayer {
    type Service = RecoveryMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RecoveryMiddleware {
            inner,
            capture: self.capture.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RecoveryMiddleware<S> {
    inner: S,
    capture: Arc<ErrorCapture>,
}

impl<S> Service<Request> for RecoveryMiddleware<S>
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
        let capture = self.capture.clone();
        let mut inner = self.inner.clone();
        let route = crate::route_of(&req);

        Box::pin(async move {
            match catch_panic(async move { inner.call(req).await }).await {
                Ok(result) => result,
                Err(caught) => {
                    tracing::error!(%route, message = %caught.message, "handler panicked");

                    let data = ErrorData::new(ErrorKind::PanicError, caught.message, route)
                        .with_stack(caught.stack);
                    capture.report_error(data);

                    Ok(internal_server_error())
                }
            }
        })
    }
}

fn internal_server_error() -> Response<Body> {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Internal Server Error" })),
    )
        .into_response()
}
