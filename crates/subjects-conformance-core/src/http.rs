// crates/subjects-conformance-core/src/http.rs
// ============================================================================
// Module: API HTTP Client
// Description: Blocking HTTP client for the token and resource endpoints.
// Purpose: Issue single, unretried requests with bounded bodies and timing.
// Dependencies: reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! [`ApiClient`] wraps a blocking `reqwest` client configured the way the
//! harness needs it: redirects are never followed (a redirect is a reportable
//! status, not something to chase), response bodies are read under a hard
//! byte limit, and every reply carries the wall-clock time of the full fetch.
//! There are no retries; a transport failure is returned to the caller as-is.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;
use std::time::Instant;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde_json::Value;
use subjects_conformance_config::HarnessConfig;
use thiserror::Error;
use url::form_urlencoded;

use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON media type expected from both endpoints.
pub const JSON_MEDIA_TYPE: &str = "application/json";
/// Media type of the token request body.
const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the API client.
///
/// # Invariants
/// - `max_response_bytes` is a hard upper bound on response bodies.
/// - `request_timeout = None` leaves the transport default in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Optional whole-request timeout.
    pub request_timeout: Option<Duration>,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
            max_response_bytes: subjects_conformance_config::DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: format!("subjects-conformance/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Derives client settings from the harness configuration.
    #[must_use]
    pub fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            request_timeout: config.request_timeout_ms.map(Duration::from_millis),
            max_response_bytes: config.max_response_bytes,
            ..Self::default()
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// HTTP transport errors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The HTTP client could not be constructed.
    #[error("http client build failed: {0}")]
    Build(String),
    /// The request URL is invalid.
    #[error("invalid url {url}: {reason}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser message.
        reason: String,
    },
    /// The request could not be sent or no response arrived.
    #[error("http request to {url} failed: {reason}")]
    Request {
        /// Target URL.
        url: String,
        /// Transport message.
        reason: String,
    },
    /// The response body could not be read.
    #[error("failed to read response: {0}")]
    Read(String),
    /// The response body exceeds the configured limit.
    #[error("http response exceeds size limit of {0} bytes")]
    TooLarge(usize),
}

impl From<HttpError> for HarnessError {
    fn from(err: HttpError) -> Self {
        Self::Transport(err.to_string())
    }
}

// ============================================================================
// SECTION: Reply
// ============================================================================

/// Fully-read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Raw `Content-Type` header value, when present and valid UTF-8.
    pub content_type: Option<String>,
    /// Response body bytes.
    pub body: Vec<u8>,
    /// Wall-clock time from send until the body was fully read.
    pub elapsed: Duration,
}

impl HttpReply {
    /// Returns true when the media type is `application/json`.
    ///
    /// Media type parameters such as `charset` are ignored.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type.as_deref().is_some_and(|value| {
            value.split(';').next().is_some_and(|media| {
                media.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE)
            })
        })
    }

    /// Parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the body is not valid JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Returns the content type for messages, or `none`.
    #[must_use]
    pub fn content_type_label(&self) -> &str {
        self.content_type.as_deref().unwrap_or("none")
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking HTTP client for the API under test.
pub struct ApiClient {
    /// Client settings and limits.
    config: HttpClientConfig,
    /// Underlying `reqwest` client.
    client: Client,
}

impl ApiClient {
    /// Creates a new API client.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Build`] when the client cannot be created.
    pub fn new(config: HttpClientConfig) -> Result<Self, HttpError> {
        let mut builder =
            Client::builder().user_agent(config.user_agent.clone()).redirect(Policy::none());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|err| HttpError::Build(err.to_string()))?;
        Ok(Self {
            config,
            client,
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Sends a GET request, optionally with an `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on invalid URLs, transport failures, or oversized bodies.
    pub fn get(&self, url: &str, authorization: Option<&str>) -> Result<HttpReply, HttpError> {
        let parsed = parse_url(url)?;
        let mut request = self.client.get(parsed);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        self.execute(url, request)
    }

    /// Sends a POST request with a form-encoded body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on invalid URLs, transport failures, or oversized bodies.
    pub fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<HttpReply, HttpError> {
        let parsed = parse_url(url)?;
        let body = form_urlencoded::Serializer::new(String::new()).extend_pairs(fields).finish();
        let request = self.client.post(parsed).header(CONTENT_TYPE, FORM_MEDIA_TYPE).body(body);
        self.execute(url, request)
    }

    /// Sends a prepared request and reads the full response.
    fn execute(&self, url: &str, request: RequestBuilder) -> Result<HttpReply, HttpError> {
        let started = Instant::now();
        let mut response = request.send().map_err(|err| HttpError::Request {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = read_response_limited(&mut response, self.config.max_response_bytes)?;
        Ok(HttpReply {
            status,
            content_type,
            body,
            elapsed: started.elapsed(),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a request URL.
fn parse_url(url: &str) -> Result<Url, HttpError> {
    Url::parse(url).map_err(|err| HttpError::InvalidUrl {
        url: url.to_string(),
        reason: err.to_string(),
    })
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, HttpError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes).map_err(|_| HttpError::TooLarge(max_bytes))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(HttpError::TooLarge(max_bytes));
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    let mut handle = response.take(limit);
    handle.read_to_end(&mut buf).map_err(|err| HttpError::Read(err.to_string()))?;
    if buf.len() > max_bytes {
        return Err(HttpError::TooLarge(max_bytes));
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
