//! Stream configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

use crate::error::{StreamError, StreamResult};

/// Stream-end time applied when none is configured.
pub const DEFAULT_STREAM_END_TIME: Duration = Duration::from_secs(20);

/// Upper bound for establishing the TCP/TLS connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for receiving response headers. Does not apply to the body.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable configuration for one [`SseClient`](crate::SseClient).
///
/// Built with [`StreamConfig::builder`]; every invariant is checked by
/// [`StreamConfigBuilder::build`] before any network activity happens.
#[derive(Clone)]
pub struct StreamConfig {
    url: Url,
    username: String,
    password: String,
    headers: BTreeMap<String, String>,
    stream_end_time: Duration,
}

impl StreamConfig {
    /// Start building a configuration.
    pub fn builder() -> StreamConfigBuilder {
        StreamConfigBuilder::new()
    }

    /// Target SSE endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Basic-auth username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Basic-auth password.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Custom request headers, applied after the fixed ones.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Configured stream-end time.
    ///
    /// Advisory only: it is reported when a stream ends but no read is ever
    /// aborted because of it.
    pub fn stream_end_time(&self) -> Duration {
        self.stream_end_time
    }
}

impl fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConfig")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("stream_end_time", &self.stream_end_time)
            .finish()
    }
}

/// Builder for [`StreamConfig`].
#[derive(Default)]
pub struct StreamConfigBuilder {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    headers: BTreeMap<String, String>,
    stream_end_time: Option<u64>,
}

impl fmt::Debug for StreamConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConfigBuilder")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("stream_end_time", &self.stream_end_time)
            .finish()
    }
}

impl StreamConfigBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SSE endpoint URL (required).
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the basic-auth username (required).
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the basic-auth password (required).
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Add one custom header. A later call with the same name replaces the
    /// earlier value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add every entry of `headers`.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the stream-end time in seconds (default 20).
    #[must_use]
    pub fn stream_end_time(mut self, seconds: u64) -> Self {
        self.stream_end_time = Some(seconds);
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Configuration`] when a required field is missing
    /// or empty, the URL is not an absolute `http`/`https` URL, a custom
    /// header is not a valid HTTP header, or the stream-end time is zero.
    pub fn build(self) -> StreamResult<StreamConfig> {
        let raw_url = required("url", self.url)?;
        let url = Url::parse(&raw_url)
            .map_err(|e| StreamError::Configuration(format!("url {raw_url:?} is invalid: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(StreamError::Configuration(format!(
                "url scheme must be http or https, got {:?}",
                url.scheme()
            )));
        }

        let username = required("username", self.username)?;
        let password = required("password", self.password)?;

        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                StreamError::Configuration(format!("header name {name:?} is not a valid HTTP header"))
            })?;
            HeaderValue::from_str(value).map_err(|_| {
                StreamError::Configuration(format!("header {name:?} has an invalid value"))
            })?;
        }

        let stream_end_time = match self.stream_end_time {
            None => DEFAULT_STREAM_END_TIME,
            Some(0) => {
                return Err(StreamError::Configuration(
                    "stream_end_time must be greater than zero".to_string(),
                ));
            }
            Some(seconds) => Duration::from_secs(seconds),
        };

        Ok(StreamConfig {
            url,
            username,
            password,
            headers: self.headers,
            stream_end_time,
        })
    }
}

fn required(field: &str, value: Option<String>) -> StreamResult<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        Some(_) => Err(StreamError::Configuration(format!("{field} cannot be empty"))),
        None => Err(StreamError::Configuration(format!("{field} is required"))),
    }
}
