//! HTTP client configuration.

use reqwest::{Client, ClientBuilder, Method, Response};
use serde::Serialize;
use std::time::Duration;

use crate::request::RequestBuilder;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub request_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Idle connections kept per host.
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            user_agent: format!("tracely/{}", env!("CARGO_PKG_VERSION")),
            pool_max_idle_per_host: 4,
        }
    }
}

impl HttpConfig {
    /// Default config with both timeouts set to `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            connect_timeout: timeout,
            request_timeout: timeout,
            ..Self::default()
        }
    }
}

/// Build a configured HTTP client.
pub fn build_client(config: HttpConfig) -> Result<Client, HttpError> {
    ClientBuilder::new()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .build()
        .map_err(HttpError::ClientBuild)
}

/// HTTP errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("unauthorized")]
    Unauthorized,

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("server error: {status}")]
    ServerError { status: u16, body: String },

    #[error("client error: {status}")]
    ClientError { status: u16, body: String },
}

impl HttpError {
    /// HTTP status behind this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::RateLimited { .. } => Some(429),
            Self::ServerError { status, .. } | Self::ClientError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout
        } else {
            HttpError::Request(e)
        }
    }
}

/// Shared HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Create a client with default config.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(HttpConfig::default())
    }

    /// Create a client with custom config.
    pub fn with_config(config: HttpConfig) -> Result<Self, HttpError> {
        let inner = build_client(config)?;
        Ok(Self { inner })
    }

    /// Send a request without a body. Headers and query come from `request`.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        request: &RequestBuilder,
    ) -> Result<Response, HttpError> {
        let url = request.url(path);
        tracing::debug!(%method, %url, "sending request");
        let response = self
            .prepare(method.clone(), &url, request)
            .send()
            .await
            .map_err(HttpError::from)?;
        tracing::debug!(%method, %url, status = %response.status(), "received response");
        Ok(response)
    }

    /// Send a request with a JSON body. Headers and query come from `request`.
    pub async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        request: &RequestBuilder,
        body: &T,
    ) -> Result<Response, HttpError> {
        let url = request.url(path);
        tracing::debug!(%method, %url, "sending JSON request");
        let response = self
            .prepare(method.clone(), &url, request)
            .json(body)
            .send()
            .await
            .map_err(HttpError::from)?;
        tracing::debug!(%method, %url, status = %response.status(), "received response");
        Ok(response)
    }

    fn prepare(&self, method: Method, url: &str, request: &RequestBuilder) -> reqwest::RequestBuilder {
        let mut builder = self.inner.request(method, url).headers(request.headers().clone());
        if !request.query_pairs().is_empty() {
            builder = builder.query(request.query_pairs());
        }
        builder
    }

    /// Check response status and convert errors.
    pub async fn check_response(response: Response) -> Result<Response, HttpError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            401 => return Err(HttpError::Unauthorized),
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                return Err(HttpError::RateLimited { retry_after });
            }
            _ => {}
        }

        let body = response.text().await.unwrap_or_default();

        if status.is_server_error() {
            Err(HttpError::ServerError {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(HttpError::ClientError {
                status: status.as_u16(),
                body,
            })
        }
    }
}
