//! Lifecycle controller: the only surface the owning process touches.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::StreamConfig;
use crate::connection::Connector;
use crate::handler::EventHandler;
use crate::reconnect::StreamTask;
use crate::shutdown::ShutdownSignal;
use crate::stats::{ClientStats, StatsSnapshot};

/// Observable state of an [`SseClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientState {
    /// Created but not started.
    Idle,
    /// A request is in flight.
    Connecting,
    /// A `200 OK` body is being read.
    Streaming,
    /// The previous attempt ended; the next one starts immediately.
    Reconnecting,
    /// Shutdown completed. Terminal.
    Stopped,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Streaming => write!(f, "streaming"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// A single-use, self-reconnecting SSE client.
///
/// [`start`](Self::start) spawns the stream task; [`shutdown`](Self::shutdown)
/// stops it and closes the open stream. A client that has been shut down
/// cannot be started again. Dropping the client also shuts it down.
pub struct SseClient {
    config: Arc<StreamConfig>,
    handler: Arc<dyn EventHandler>,
    shutdown: Arc<ShutdownSignal>,
    stats: Arc<ClientStats>,
    state: Arc<watch::Sender<ClientState>>,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for SseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SseClient")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("shutdown_requested", &self.shutdown.is_requested())
            .finish()
    }
}

impl SseClient {
    /// Create a client. No network activity happens until [`start`](Self::start).
    pub fn new<H>(config: StreamConfig, handler: H) -> Self
    where
        H: EventHandler,
    {
        Self::with_shared_handler(config, Arc::new(handler))
    }

    /// Create a client around a handler that is shared with other code.
    pub fn with_shared_handler(config: StreamConfig, handler: Arc<dyn EventHandler>) -> Self {
        let (state, _) = watch::channel(ClientState::Idle);
        Self {
            config: Arc::new(config),
            handler,
            shutdown: Arc::new(ShutdownSignal::new()),
            stats: Arc::new(ClientStats::default()),
            state: Arc::new(state),
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    /// Start the reconnect loop on the current Tokio runtime.
    ///
    /// Returns immediately. Failures are reported through logs only: calling
    /// this outside a runtime, a second time, or after shutdown does nothing.
    pub fn start(&self) {
        if self.shutdown.is_requested() {
            warn!("start() called after shutdown; SseClient instances are single-use");
            return;
        }
        if self.started.swap(true, Ordering::AcqRel) {
            warn!("start() called on a client that is already running");
            return;
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!(error = %e, "start() must be called from within a Tokio runtime");
                self.started.store(false, Ordering::Release);
                return;
            }
        };

        let connector = match Connector::new(Arc::clone(&self.config)) {
            Ok(connector) => connector,
            Err(e) => {
                error!(error = %e, "Could not start event stream");
                self.state.send_replace(ClientState::Stopped);
                return;
            }
        };

        let task = StreamTask {
            connector,
            shutdown: Arc::clone(&self.shutdown),
            handler: Arc::clone(&self.handler),
            stats: Arc::clone(&self.stats),
            state: Arc::clone(&self.state),
        };
        *self.task.lock() = Some(runtime.spawn(task.run()));
    }

    /// Stop the client: set the shutdown flag, then close the open stream.
    ///
    /// Safe to call any number of times, from any thread, whether or not the
    /// client was started or a stream is open.
    pub fn shutdown(&self) {
        if !self.shutdown.request() {
            debug!("shutdown already requested");
            return;
        }
        info!("shutdown");
        if self.task.lock().is_none() {
            self.state.send_replace(ClientState::Stopped);
        }
    }

    /// Wait for the stream task to finish. Returns at once if it never started.
    ///
    /// Only meaningful after [`shutdown`](Self::shutdown); otherwise the task
    /// runs until the client is dropped.
    pub async fn join(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Event stream task failed");
                self.state.send_replace(ClientState::Stopped);
            }
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> ClientState {
        *self.state.borrow()
    }

    /// Subscribe to state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<ClientState> {
        self.state.subscribe()
    }

    /// Snapshot of the client's counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_requested()
    }
}

impl Drop for SseClient {
    fn drop(&mut self) {
        if self.shutdown.request() {
            debug!("SseClient dropped, stopping event stream");
        }
    }
}
