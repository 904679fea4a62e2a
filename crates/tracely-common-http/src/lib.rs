//! HTTP client utilities for Tracely.
//!
//! A thin layer over `reqwest` shared by the reporting transport and the
//! dashboard client: one client builder, one header vocabulary, one way of
//! turning non-success statuses into errors.

pub mod client;
pub mod request;
pub mod response;

pub use client::{build_client, HttpClient, HttpConfig, HttpError};
pub use request::{headers, RequestBuilder};
pub use response::{parse_json, ResponseError};

pub use reqwest::{Method, StatusCode};
