//! Stream error types.

use std::time::Duration;
use thiserror::Error;

/// Boxed error used as the cause of a transport failure.
pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A specialized `Result` type for stream operations.
pub type StreamResult<T> = std::result::Result<T, StreamError>;

/// Represents errors that can occur while configuring or running the client.
///
/// Only [`StreamError::Configuration`] ever reaches the caller; every other
/// kind is contained by the reconnect loop and reported through logs.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    /// The client was configured with missing or invalid parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The server answered with a status other than `200 OK`.
    #[error("Non-stream response: HTTP {status}: {body}")]
    NonStreamResponse {
        /// HTTP status code
        status: u16,
        /// Response body, read in full and decoded lossily
        body: String,
    },

    /// A network-level failure while sending the request or reading the body.
    #[error("Transport failure: {message}")]
    Transport {
        /// What the client was doing when the failure happened
        message: String,
        /// Underlying cause
        #[source]
        source: Option<BoxError>,
    },

    /// The request did not produce response headers within the request timeout.
    #[error("Request timed out after {0:?} waiting for response headers")]
    RequestTimeout(Duration),

    /// The active stream was closed because shutdown was requested.
    #[error("Stream closed by shutdown")]
    Shutdown,
}

impl StreamError {
    pub(crate) fn transport(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Whether this error is the expected consequence of a requested shutdown.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }

    /// Whether the reconnect loop should try again after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NonStreamResponse { .. } | Self::Transport { .. } | Self::RequestTimeout(_)
        )
    }

    /// Whether this error is a network-level failure, as opposed to an HTTP
    /// error status.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::RequestTimeout(_))
    }
}

/// Walks the `source()` chain and renders it as `a: b: c`.
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        current = cause.source();
    }
    rendered
}
