//! # TurboSSE
//!
//! A long-lived Server-Sent Events client.
//!
//! The client opens a persistent `GET` to an SSE endpoint with HTTP basic
//! credentials, frames the chunked body into lines, assembles `data:` lines
//! into event payloads and hands every payload to a caller-supplied
//! [`EventHandler`]. Dropped connections are re-established immediately; the
//! owning process stops the client with [`SseClient::shutdown`].
//!
//! ## Features
//!
//! - **Chunk-safe framing**: lines split across network reads are reassembled
//!   before they reach the parser
//! - **Transparent reconnect**: any non-shutdown failure is logged and the
//!   connection is retried
//! - **Cooperative shutdown**: an atomic stop flag plus forced close of the
//!   active body stream, so a blocked read returns promptly
//! - **Status observation**: [`ClientState`] transitions and [`StatsSnapshot`]
//!   counters
//!
//! ## Usage
//!
//! ```rust,no_run
//! use turbosse::{HandlerError, SseClient, StreamConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StreamConfig::builder()
//!         .url("http://localhost:8080/events")
//!         .username("reader")
//!         .password("secret")
//!         .header("X-Client", "turbosse")
//!         .build()?;
//!
//!     let client = SseClient::new(config, |payload: String| -> Result<(), HandlerError> {
//!         println!("event: {payload}");
//!         Ok(())
//!     });
//!
//!     client.start();
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!     client.shutdown();
//!     client.join().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Wire format
//!
//! Only the `data:` field is interpreted. Fragments of one event are joined
//! without a separator and the result is trimmed:
//!
//! ```text
//! data:hello
//! data: world
//!
//! ```
//!
//! is delivered as `helloworld`. Other fields (`event:`, `id:`, `retry:`) and
//! comments are ignored.

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod assembler;
mod auth;
mod client;
mod config;
mod connection;
mod error;
mod framer;
mod handler;
mod reconnect;
mod shutdown;
mod stats;

pub use assembler::{EventStream, SseAssembler};
pub use auth::basic_auth_header;
pub use client::{ClientState, SseClient};
pub use config::{
    CONNECT_TIMEOUT, DEFAULT_STREAM_END_TIME, REQUEST_TIMEOUT, StreamConfig, StreamConfigBuilder,
};
pub use error::{StreamError, StreamResult};
pub use framer::LineCodec;
pub use handler::{EventHandler, HandlerError};
pub use stats::StatsSnapshot;
