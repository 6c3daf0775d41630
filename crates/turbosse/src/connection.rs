//! One connection attempt: request, status check, and body streaming.
//!
//! ```text
//! Idle → Requesting ─┬─ 200 ──────────→ StreamingBody ─→ Closed
//!                    ├─ other status ─→ NonStreamError ─→ Closed
//!                    └─ send failure ─→ TransportFailure → Closed
//! ```
//!
//! Every await point races against the attempt's close token, so a shutdown
//! ends the attempt with [`StreamError::Shutdown`] instead of an error.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use reqwest::header::{
    ACCEPT, AUTHORIZATION, CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue,
};
use reqwest::{Client as HttpClient, Response, StatusCode};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::assembler::EventStream;
use crate::auth::basic_auth_header;
use crate::client::ClientState;
use crate::config::{CONNECT_TIMEOUT, REQUEST_TIMEOUT, StreamConfig};
use crate::error::{StreamError, StreamResult};
use crate::framer::frame_lines;
use crate::handler::{Delivery, EventHandler, deliver};
use crate::shutdown::ShutdownSignal;
use crate::stats::ClientStats;

type LineStream = Pin<Box<dyn Stream<Item = io::Result<String>> + Send>>;

/// Builds and sends the stream request for one endpoint.
pub(crate) struct Connector {
    config: Arc<StreamConfig>,
    http_client: HttpClient,
    headers: HeaderMap,
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("url", &self.config.url().as_str())
            .finish()
    }
}

impl Connector {
    /// Create a connector for `config`.
    ///
    /// The connect timeout is set on the client; the request timeout is
    /// applied around `send()` only, so it never cuts a long-lived body.
    pub(crate) fn new(config: Arc<StreamConfig>) -> StreamResult<Self> {
        let http_client = HttpClient::builder()
            .use_rustls_tls()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("turbosse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                StreamError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;
        let headers = build_headers(&config);

        Ok(Self {
            config,
            http_client,
            headers,
        })
    }

    /// Send the request and return the response if it is `200 OK`.
    ///
    /// # Errors
    ///
    /// - [`StreamError::Shutdown`] if `close` fires first
    /// - [`StreamError::RequestTimeout`] if no response headers arrive in time
    /// - [`StreamError::Transport`] for network failures
    /// - [`StreamError::NonStreamResponse`] for any other status, with the body
    pub(crate) async fn open(&self, close: &CancellationToken) -> StreamResult<Response> {
        let url = self.config.url();
        debug!(%url, "Sending event stream request");

        let request = self
            .http_client
            .get(url.clone())
            .headers(self.headers.clone())
            .send();

        let response = tokio::select! {
            biased;
            () = close.cancelled() => return Err(StreamError::Shutdown),
            sent = tokio::time::timeout(REQUEST_TIMEOUT, request) => match sent {
                Err(_) => return Err(StreamError::RequestTimeout(REQUEST_TIMEOUT)),
                Ok(Err(e)) if close.is_cancelled() => {
                    debug!(error = %e, "Request failed after shutdown");
                    return Err(StreamError::Shutdown);
                }
                Ok(Err(e)) => {
                    return Err(StreamError::transport(format!("request to {url} failed"), e));
                }
                Ok(Ok(response)) => response,
            },
        };

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }

        let body = tokio::select! {
            biased;
            () = close.cancelled() => return Err(StreamError::Shutdown),
            body = tokio::time::timeout(REQUEST_TIMEOUT, response.bytes()) => match body {
                Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
                Ok(Err(e)) => format!("<body unavailable: {e}>"),
                Err(_) => "<body unavailable: timed out>".to_string(),
            },
        };

        Err(StreamError::NonStreamResponse {
            status: status.as_u16(),
            body,
        })
    }

    /// Run one full attempt: open the stream and deliver its events.
    pub(crate) async fn attempt(
        &self,
        shutdown: &ShutdownSignal,
        handler: &dyn EventHandler,
        stats: &ClientStats,
        state: &watch::Sender<ClientState>,
    ) -> StreamResult<()> {
        let stream = shutdown.open_stream();
        let close = stream.token();

        state.send_replace(ClientState::Connecting);
        ClientStats::incr(&stats.connection_attempts);
        let response = self.open(close).await?;

        ClientStats::incr(&stats.streams_opened);
        state.send_replace(ClientState::Streaming);
        info!(url = %self.config.url(), "Handling response");

        let mut connection = ConnectionState::new(response);
        let outcome = connection.pump(close, handler, stats).await;

        if connection.events.discarded().is_some() {
            ClientStats::incr(&stats.truncated_events);
        }
        let idle = connection.idle_for();
        if idle > self.config.stream_end_time() {
            warn!(
                idle_ms = idle.as_millis() as u64,
                stream_end_time_s = self.config.stream_end_time().as_secs(),
                "Stream was idle longer than the configured stream-end time"
            );
        }
        if outcome.is_ok() {
            info!("Done handling response");
        }
        outcome
    }
}

/// Fixed request headers followed by the custom ones, which win on collision.
fn build_headers(config: &StreamConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    if let Ok(mut auth) =
        HeaderValue::from_str(&basic_auth_header(config.username(), config.password()))
    {
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
    }

    // Validated when the config was built
    for (key, value) in config.headers() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }

    headers
}

/// State owned by one streaming attempt; dropped when the attempt ends.
struct ConnectionState {
    events: EventStream<LineStream>,
    opened_at: Instant,
}

impl ConnectionState {
    fn new(response: Response) -> Self {
        let lines: LineStream = Box::pin(frame_lines(response.bytes_stream()));
        Self {
            events: EventStream::new(lines),
            opened_at: Instant::now(),
        }
    }

    /// Time since the last line, or since the stream opened if none arrived.
    fn idle_for(&self) -> Duration {
        self.events
            .last_line_at()
            .unwrap_or(self.opened_at)
            .elapsed()
    }

    /// Deliver events until the body ends, fails, or `close` fires.
    async fn pump(
        &mut self,
        close: &CancellationToken,
        handler: &dyn EventHandler,
        stats: &ClientStats,
    ) -> StreamResult<()> {
        loop {
            let next = tokio::select! {
                biased;
                () = close.cancelled() => {
                    debug!("Stream closed while reading");
                    return Err(StreamError::Shutdown);
                }
                next = self.events.next() => next,
            };

            match next {
                Some(Ok(payload)) => {
                    if close.is_cancelled() {
                        return Err(StreamError::Shutdown);
                    }
                    match deliver(handler, payload) {
                        Delivery::Delivered => ClientStats::incr(&stats.events_delivered),
                        Delivery::Failed(reason) => {
                            ClientStats::incr(&stats.handler_failures);
                            error!(error = %reason, "Error handling event");
                        }
                    }
                }
                Some(Err(_)) if close.is_cancelled() => return Err(StreamError::Shutdown),
                Some(Err(e)) => {
                    return Err(StreamError::transport("error reading event stream", e));
                }
                None => return Ok(()),
            }
        }
    }
}
