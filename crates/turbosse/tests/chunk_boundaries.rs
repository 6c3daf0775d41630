//! Event assembly must not depend on how the body is split into chunks.

use std::io;

use bytes::Bytes;
use futures::{StreamExt, executor::block_on};
use proptest::prelude::*;
use proptest::sample::Index;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use turbosse::{EventStream, LineCodec};

/// Run `body`, split into the given chunks, through framing and assembly.
fn events_from_chunks(chunks: Vec<Vec<u8>>) -> (Vec<String>, Option<String>) {
    let body = futures::stream::iter(
        chunks
            .into_iter()
            .map(|chunk| Ok::<_, io::Error>(Bytes::from(chunk))),
    );
    let lines = FramedRead::new(StreamReader::new(body), LineCodec::new());
    let mut events = Box::pin(EventStream::new(lines));

    block_on(async {
        let mut delivered = Vec::new();
        while let Some(event) = events.next().await {
            delivered.push(event.expect("in-memory body cannot fail"));
        }
        (delivered, events.discarded().map(str::to_owned))
    })
}

fn split_at(body: &[u8], cuts: &[Index]) -> Vec<Vec<u8>> {
    let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(body.len() + 1)).collect();
    offsets.sort_unstable();
    offsets.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for offset in offsets {
        chunks.push(body[start..offset].to_vec());
        start = offset;
    }
    chunks.push(body[start..].to_vec());
    chunks
}

fn fragment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.:é😀]{0,12}"
}

fn noise() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["id: 7", "event: update", ": keep-alive", "retry: 500"])
}

/// One event: its data fragments and optional non-data lines before it.
fn event() -> impl Strategy<Value = (Option<&'static str>, Vec<String>)> {
    (prop::option::of(noise()), prop::collection::vec(fragment(), 1..4))
}

fn terminator() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["\n", "\r\n", "\r"])
}

fn expected_payload(fragments: &[String]) -> String {
    fragments
        .iter()
        .map(|f| f.strip_prefix(' ').unwrap_or(f))
        .collect::<String>()
        .trim()
        .to_string()
}

proptest! {
    #[test]
    fn chunking_does_not_change_events(
        events in prop::collection::vec(event(), 0..6),
        eol in terminator(),
        cuts in prop::collection::vec(any::<Index>(), 0..12),
    ) {
        let mut body = String::new();
        let mut expected = Vec::new();
        for (noise, fragments) in &events {
            if let Some(line) = noise {
                body.push_str(line);
                body.push_str(eol);
            }
            for fragment in fragments {
                body.push_str("data:");
                body.push_str(fragment);
                body.push_str(eol);
            }
            body.push_str(eol);
            expected.push(expected_payload(fragments));
        }

        let (whole, _) = events_from_chunks(vec![body.as_bytes().to_vec()]);
        let (split, _) = events_from_chunks(split_at(body.as_bytes(), &cuts));

        prop_assert_eq!(&whole, &expected);
        prop_assert_eq!(&split, &expected);
    }

    #[test]
    fn unterminated_tail_is_discarded(
        complete in prop::collection::vec(fragment(), 1..4),
        tail in "[a-z]{1,8}",
        cuts in prop::collection::vec(any::<Index>(), 0..6),
    ) {
        let mut body = String::new();
        for fragment in &complete {
            body.push_str("data:");
            body.push_str(fragment);
            body.push('\n');
        }
        body.push('\n');
        body.push_str("data:");
        body.push_str(&tail);

        let (events, discarded) = events_from_chunks(split_at(body.as_bytes(), &cuts));
        prop_assert_eq!(events, vec![expected_payload(&complete)]);
        prop_assert_eq!(discarded, Some(tail));
    }
}

#[test]
fn crlf_split_between_chunks_is_one_terminator() {
    let chunks = vec![
        b"data:a\r".to_vec(),
        b"\n\r".to_vec(),
        b"\ndata:b\r\n\r\n".to_vec(),
    ];
    let (events, discarded) = events_from_chunks(chunks);
    assert_eq!(events, vec!["a", "b"]);
    assert_eq!(discarded, None);
}

#[test]
fn multibyte_character_split_between_chunks() {
    let body = "data:héllo 😀\n\n".as_bytes();
    // Cut inside both multi-byte sequences.
    let chunks = vec![body[..7].to_vec(), body[7..15].to_vec(), body[15..].to_vec()];
    let (events, _) = events_from_chunks(chunks);
    assert_eq!(events, vec!["héllo 😀"]);
}
