//! HTTP request types and builders.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

/// Header names used on the wire.
pub mod headers {
    pub const CONTENT_TYPE_JSON: &str = "application/json";
    pub const X_APP_ID: &str = "X-App-Id";
    pub const X_TIMESTAMP: &str = "X-Timestamp";
    pub const X_NONCE: &str = "X-Nonce";
    pub const X_SIGNATURE: &str = "X-Signature";
    pub const X_USER_ID: &str = "X-User-Id";
}

/// Accumulates the base URL, headers and query parameters for a request.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    headers: HeaderMap,
    query: Vec<(String, String)>,
    base_url: Option<String>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Add a header. Names or values that are not valid HTTP are skipped.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        match (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name.as_ref(), "skipping invalid header"),
        }
        self
    }

    /// Add bearer token authorization.
    pub fn bearer_auth(mut self, token: impl AsRef<str>) -> Self {
        if let Ok(value) = HeaderValue::try_from(format!("Bearer {}", token.as_ref())) {
            self.headers.insert(AUTHORIZATION, value);
        }
        self
    }

    /// Set content type to JSON.
    pub fn json_content(mut self) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(headers::CONTENT_TYPE_JSON));
        self
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Get the built headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the query parameters in insertion order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// Build the URL.
    pub fn url(&self, path: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), path),
            None => path.to_string(),
        }
    }
}
