//! Line framing for `text/event-stream` bodies.
//!
//! The body arrives as arbitrary byte chunks. [`LineCodec`] buffers partial
//! lines across chunk boundaries and yields one logical line at a time with
//! the terminator stripped. `\n`, `\r\n` and a lone `\r` all terminate a line.

use std::io;

use bytes::{Bytes, BytesMut};
use futures::{Stream, TryStreamExt};
use tokio_util::codec::{Decoder, FramedRead};
use tokio_util::io::StreamReader;

const LF: u8 = b'\n';
const CR: u8 = b'\r';

/// A [`Decoder`] that splits a byte stream into UTF-8 lines.
///
/// Invalid UTF-8 sequences are replaced with `U+FFFD`. Because decoding only
/// happens once a whole line is buffered, a multi-byte character split across
/// two reads is reassembled before it is decoded.
#[derive(Debug, Clone, Default)]
pub struct LineCodec {
    // Offset into the buffer up to which no terminator has been found.
    next_index: usize,
}

impl LineCodec {
    /// Create a new codec.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Finds the next end-of-line in `bytes`.
///
/// Returns `(line_end, remainder_start)`, or `None` when more data is needed.
/// A trailing `\r` needs more data because it may be the first half of `\r\n`.
fn find_eol(bytes: &[u8]) -> Option<(usize, usize)> {
    let pos = bytes.iter().position(|&b| b == LF || b == CR)?;
    if bytes[pos] == LF {
        return Some((pos, pos + 1));
    }
    match bytes.get(pos + 1) {
        None => None,
        Some(&LF) => Some((pos, pos + 2)),
        Some(_) => Some((pos, pos + 1)),
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        let start = self.next_index.min(buf.len());
        match find_eol(&buf[start..]) {
            Some((line_end, remainder_start)) => {
                let line = buf.split_to(start + remainder_start);
                self.next_index = 0;
                Ok(Some(decode_line(&line[..start + line_end])))
            }
            None => {
                self.next_index = if buf.last() == Some(&CR) {
                    buf.len() - 1
                } else {
                    buf.len()
                };
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, io::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if buf.is_empty() {
            return Ok(None);
        }

        // Unterminated final line; a lone trailing CR still counts as a terminator.
        let mut tail = buf.split();
        self.next_index = 0;
        if tail.last() == Some(&CR) {
            tail.truncate(tail.len() - 1);
        }
        Ok(Some(decode_line(&tail)))
    }
}

/// Frame a chunked body into a lazy stream of lines.
///
/// The stream ends when `body` ends. A chunk error is surfaced as an
/// [`io::Error`] wrapping the original error.
pub(crate) fn frame_lines<S, E>(body: S) -> impl Stream<Item = io::Result<String>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    FramedRead::new(StreamReader::new(body.map_err(io::Error::other)), LineCodec::new())
}
