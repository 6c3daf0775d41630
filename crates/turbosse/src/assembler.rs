//! Assembly of `data:` lines into event payloads.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Instant;

use futures::Stream;
use tracing::{debug, info};

const DATA_PREFIX: &str = "data:";

/// Accumulates `data:` lines until a blank line completes an event.
///
/// One leading space after `data:` is dropped, fragments are joined without
/// a separator and the finished payload is trimmed. Lines that are neither `data:` lines nor blank are ignored.
///
/// ```
/// use turbosse::SseAssembler;
///
/// let mut assembler = SseAssembler::new();
/// assert_eq!(assembler.push_line("data:hello"), None);
/// assert_eq!(assembler.push_line("data: world"), None);
/// assert_eq!(assembler.push_line(""), Some("helloworld".to_string()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SseAssembler {
    buffer: String,
    // Set by any `data:` line, even one with an empty remainder.
    pending: bool,
}

impl SseAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (terminator already stripped).
    ///
    /// Returns the completed payload when `line` is blank and at least one
    /// `data:` line has been seen since the last event.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if let Some(fragment) = line.strip_prefix(DATA_PREFIX) {
            self.buffer
                .push_str(fragment.strip_prefix(' ').unwrap_or(fragment));
            self.pending = true;
            return None;
        }

        if line.trim().is_empty() {
            if !self.pending {
                return None;
            }
            self.pending = false;
            let payload = self.buffer.trim().to_string();
            self.buffer.clear();
            return Some(payload);
        }

        debug!(line, "Ignoring non-data line");
        None
    }

    /// Whether `data:` lines are waiting for a terminating blank line.
    pub fn has_pending(&self) -> bool {
        self.pending
    }

    /// Reset the assembler, returning any unterminated event contents.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        Some(std::mem::take(&mut self.buffer))
    }
}

pin_project_lite::pin_project! {
    /// A [`Stream`] of event payloads assembled from a stream of lines.
    ///
    /// When the line stream ends with an unterminated event, that event is
    /// dropped and logged; it is available afterwards via
    /// [`EventStream::discarded`].
    pub struct EventStream<S> {
        #[pin]
        lines: S,
        assembler: SseAssembler,
        last_line_at: Option<Instant>,
        discarded: Option<String>,
        terminated: bool,
    }
}

impl<S> EventStream<S> {
    /// Wrap a stream of lines.
    pub fn new(lines: S) -> Self {
        Self {
            lines,
            assembler: SseAssembler::new(),
            last_line_at: None,
            discarded: None,
            terminated: false,
        }
    }

    /// When the most recent line was read, if any.
    pub fn last_line_at(&self) -> Option<Instant> {
        self.last_line_at
    }

    /// Contents of the unterminated event dropped at end of stream.
    pub fn discarded(&self) -> Option<&str> {
        self.discarded.as_deref()
    }
}

impl<S> fmt::Debug for EventStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("assembler", &self.assembler)
            .field("last_line_at", &self.last_line_at)
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}

impl<S, E> Stream for EventStream<S>
where
    S: Stream<Item = Result<String, E>>,
{
    type Item = Result<String, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if *this.terminated {
            return Poll::Ready(None);
        }

        loop {
            match ready!(this.lines.as_mut().poll_next(cx)) {
                Some(Ok(line)) => {
                    *this.last_line_at = Some(Instant::now());
                    if let Some(payload) = this.assembler.push_line(&line) {
                        return Poll::Ready(Some(Ok(payload)));
                    }
                }
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => {
                    *this.terminated = true;
                    if let Some(partial) = this.assembler.finish() {
                        info!(data = %partial, "Stream ended inside an event, discarding it");
                        *this.discarded = Some(partial);
                    }
                    return Poll::Ready(None);
                }
            }
        }
    }
}
