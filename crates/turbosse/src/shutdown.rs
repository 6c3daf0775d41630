//! Shutdown signalling between the owner and the stream task.
//!
//! Two mechanisms cooperate: an atomic flag the reconnect loop checks between
//! attempts, and a close handle for the one open stream, which `request()`
//! cancels so that a pending send or read returns immediately.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Set-once stop flag plus the close handle of the active stream.
#[derive(Debug, Default)]
pub(crate) struct ShutdownSignal {
    requested: AtomicBool,
    active: Mutex<Option<CancellationToken>>,
}

impl ShutdownSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Set the flag and close the active stream, if any.
    ///
    /// Returns `true` only for the call that actually set the flag.
    pub(crate) fn request(&self) -> bool {
        let first = !self.requested.swap(true, Ordering::AcqRel);
        if let Some(token) = self.active.lock().take() {
            token.cancel();
        }
        first
    }

    /// Register a new stream and hand back its close handle.
    ///
    /// The flag is checked under the slot lock, so a racing `request()`
    /// either finds this token or makes it come back already cancelled.
    pub(crate) fn open_stream(&self) -> StreamGuard<'_> {
        let token = CancellationToken::new();
        let mut slot = self.active.lock();
        if self.is_requested() {
            token.cancel();
        } else {
            *slot = Some(token.clone());
        }
        StreamGuard {
            signal: self,
            token,
        }
    }

    #[cfg(test)]
    fn has_active_stream(&self) -> bool {
        self.active.lock().is_some()
    }
}

/// Close handle of the stream owned by the current attempt.
///
/// Dropping it unregisters the stream.
#[derive(Debug)]
pub(crate) struct StreamGuard<'a> {
    signal: &'a ShutdownSignal,
    token: CancellationToken,
}

impl StreamGuard<'_> {
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for StreamGuard<'_> {
    fn drop(&mut self) {
        // Only one attempt runs at a time, so the slot can only hold our token.
        self.signal.active.lock().take();
    }
}
