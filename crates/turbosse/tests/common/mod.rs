//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use turbosse::{HandlerError, SseClient, StreamConfig};

pub const USERNAME: &str = "user";
pub const PASSWORD: &str = "pass";

/// Base64 of `user:pass`.
pub const EXPECTED_AUTH: &str = "Basic dXNlcjpwYXNz";

pub fn config(url: &str) -> StreamConfig {
    StreamConfig::builder()
        .url(url)
        .username(USERNAME)
        .password(PASSWORD)
        .build()
        .expect("valid test config")
}

/// Send client logs to the test output; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Records every payload it receives.
#[derive(Clone, Default)]
pub struct Collector {
    events: Arc<Mutex<Vec<String>>>,
}

impl Collector {
    pub fn new() -> Self {
        init_tracing();
        Self::default()
    }

    pub fn client(&self, config: StreamConfig) -> SseClient {
        let events = Arc::clone(&self.events);
        SseClient::new(config, move |payload: String| -> Result<(), HandlerError> {
            events.lock().push(payload);
            Ok(())
        })
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn push(&self, payload: String) {
        self.events.lock().push(payload);
    }

    /// Wait until at least `count` events arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<String> {
        eventually(Duration::from_secs(5), || self.events.lock().len() >= count).await;
        self.events()
    }
}

/// Poll `condition` every 10ms until it holds, panicking after `timeout`.
pub async fn eventually(timeout: Duration, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Shut the client down and wait for the stream task, failing after 5s.
pub async fn stop(client: &SseClient) {
    client.shutdown();
    tokio::time::timeout(Duration::from_secs(5), client.join())
        .await
        .expect("stream task did not stop after shutdown");
}

/// One step of a scripted streaming response.
#[derive(Clone, Debug)]
pub enum Step {
    Send(&'static [u8]),
    Pause(Duration),
    /// Keep the connection open without sending anything.
    Hold,
}

const CLOSE_DELIMITED: &[u8] = b"HTTP/1.1 200 OK\r\n\
    Content-Type: text/event-stream\r\n\
    Cache-Control: no-cache\r\n\
    Connection: close\r\n\r\n";

const CHUNKED: &[u8] = b"HTTP/1.1 200 OK\r\n\
    Content-Type: text/event-stream\r\n\
    Cache-Control: no-cache\r\n\
    Transfer-Encoding: chunked\r\n\r\n";

/// Minimal HTTP/1.1 server that answers every request with `200 OK` and a
/// `text/event-stream` body written step by step.
pub struct ScriptedServer {
    pub url: String,
    connections: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedServer {
    /// Close-delimited body: the script's bytes are the body itself.
    pub async fn start(script: Vec<Step>) -> Self {
        Self::serve(CLOSE_DELIMITED, script).await
    }

    /// `Transfer-Encoding: chunked` body: the script writes the chunk framing.
    /// Closing the socket before the terminating `0\r\n\r\n` chunk makes the
    /// body fail on the client side instead of ending cleanly.
    pub async fn start_chunked(script: Vec<Step>) -> Self {
        Self::serve(CHUNKED, script).await
    }

    async fn serve(preamble: &'static [u8], script: Vec<Step>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/events", listener.local_addr().unwrap());
        let connections = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let accepted = Arc::clone(&connections);
        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                accepted.fetch_add(1, Ordering::SeqCst);
                socket.set_nodelay(true).ok();
                let script = script.clone();
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    let head = read_request_head(&mut socket).await;
                    seen.lock().push(head);

                    if socket.write_all(preamble).await.is_err() {
                        return;
                    }
                    for step in script {
                        match step {
                            Step::Send(bytes) => {
                                if socket.write_all(bytes).await.is_err() {
                                    return;
                                }
                                socket.flush().await.ok();
                            }
                            Step::Pause(delay) => tokio::time::sleep(delay).await,
                            Step::Hold => {
                                // Park until the client goes away.
                                let mut buf = [0u8; 64];
                                while matches!(socket.read(&mut buf).await, Ok(n) if n > 0) {}
                                return;
                            }
                        }
                    }
                    socket.shutdown().await.ok();
                });
            }
        });

        Self {
            url,
            connections,
            requests,
        }
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

async fn read_request_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}
