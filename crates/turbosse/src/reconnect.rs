//! The reconnect loop.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::client::ClientState;
use crate::connection::Connector;
use crate::error::{StreamError, error_chain};
use crate::handler::EventHandler;
use crate::shutdown::ShutdownSignal;
use crate::stats::ClientStats;

/// Everything the stream task owns.
pub(crate) struct StreamTask {
    pub(crate) connector: Connector,
    pub(crate) shutdown: Arc<ShutdownSignal>,
    pub(crate) handler: Arc<dyn EventHandler>,
    pub(crate) stats: Arc<ClientStats>,
    pub(crate) state: Arc<watch::Sender<ClientState>>,
}

impl StreamTask {
    /// Connect, stream, and reconnect until shutdown is requested.
    ///
    /// There is no delay and no attempt limit between connections; every
    /// failure other than a shutdown is logged and retried immediately.
    pub(crate) async fn run(self) {
        info!(connector = ?self.connector, "Starting event stream");

        while !self.shutdown.is_requested() {
            let outcome = self
                .connector
                .attempt(&self.shutdown, &*self.handler, &self.stats, &self.state)
                .await;

            match outcome {
                Ok(()) => debug!("Event stream ended"),
                Err(e) => self.report(&e),
            }

            if self.shutdown.is_requested() {
                break;
            }
            self.state.send_replace(ClientState::Reconnecting);
            // Let other tasks run between back-to-back attempts.
            tokio::task::yield_now().await;
        }

        self.state.send_replace(ClientState::Stopped);
        info!("Event stream stopped");
    }

    fn report(&self, err: &StreamError) {
        match err {
            StreamError::Shutdown => {
                debug!("Event stream interrupted by shutdown");
                return;
            }
            StreamError::NonStreamResponse { status, body } => {
                ClientStats::incr(&self.stats.non_stream_responses);
                error!(status, %body, "Got error response");
                return;
            }
            e if e.is_transport_failure() => ClientStats::incr(&self.stats.transport_failures),
            _ => {}
        }
        error!(error = %error_chain(err), "Got error");
    }
}
