//! Client counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A serializable snapshot of a client's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Requests issued to the endpoint.
    pub connection_attempts: u64,

    /// Attempts that returned `200 OK` and started streaming.
    pub streams_opened: u64,

    /// Payloads handed to the handler without error.
    pub events_delivered: u64,

    /// Payloads for which the handler returned an error or panicked.
    pub handler_failures: u64,

    /// Attempts answered with a status other than `200 OK`.
    pub non_stream_responses: u64,

    /// Attempts that failed at the network level.
    pub transport_failures: u64,

    /// Unterminated events dropped at end of stream.
    pub truncated_events: u64,
}

/// Lock-free counters shared between the stream task and observers.
#[derive(Debug, Default)]
pub(crate) struct ClientStats {
    pub(crate) connection_attempts: AtomicU64,
    pub(crate) streams_opened: AtomicU64,
    pub(crate) events_delivered: AtomicU64,
    pub(crate) handler_failures: AtomicU64,
    pub(crate) non_stream_responses: AtomicU64,
    pub(crate) transport_failures: AtomicU64,
    pub(crate) truncated_events: AtomicU64,
}

impl ClientStats {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connection_attempts: self.connection_attempts.load(Ordering::Relaxed),
            streams_opened: self.streams_opened.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            non_stream_responses: self.non_stream_responses.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            truncated_events: self.truncated_events.load(Ordering::Relaxed),
        }
    }
}
