//! Server-Sent Events (SSE) processing for streaming responses.
//!
//! Gemini's `alt=sse` mode sends one `data:` line per event, each holding a
//! complete JSON document.  This module turns the raw byte stream of an HTTP
//! response into a stream of parsed documents, handling buffering, CRLF line
//! endings, and multi-byte characters split across network chunks.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::client::ErrorEnvelope;
use crate::observability::{STREAM_BYTES, STREAM_ERRORS, STREAM_EVENTS};
use crate::{Error, Result};

struct SseState<S> {
    stream: S,
    buffer: Vec<u8>,
    done: bool,
}

/// Process a stream of bytes into a stream of decoded server-sent events.
///
/// Events without a `data:` field (comments, keep-alives) are skipped.  An
/// event whose payload is an API error envelope is surfaced as an error
/// item.  A final event that is not followed by a blank line is still
/// delivered when the byte stream ends.
pub fn process_sse<S, T>(byte_stream: S) -> impl Stream<Item = Result<T>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin + 'static,
    T: DeserializeOwned,
{
    // Convert reqwest errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let state = SseState {
        stream,
        buffer: Vec::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }

            // First check if we have a complete event in the buffer
            while let Some(event) = next_event(&mut state.buffer) {
                if let Some(item) = parse_event(&event) {
                    state.done = item.is_err();
                    return Some((item, state));
                }
            }

            // Read more data
            match state.stream.next().await {
                Some(Ok(bytes)) => {
                    STREAM_BYTES.count(bytes.len() as u64);
                    state
                        .buffer
                        .extend(bytes.iter().copied().filter(|b| *b != b'\r'));
                }
                Some(Err(e)) => {
                    STREAM_ERRORS.click();
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    // End of stream; flush a trailing unterminated event.
                    state.done = true;
                    let rest = std::mem::take(&mut state.buffer);
                    if let Some(item) = parse_event(&rest) {
                        return Some((item, state));
                    }
                    return None;
                }
            }
        }
    })
}

/// Split the next blank-line-terminated event off the front of `buffer`.
fn next_event(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let end = buffer.windows(2).position(|window| window == b"\n\n")?;
    let mut event: Vec<u8> = buffer.drain(..end + 2).collect();
    event.truncate(end);
    Some(event)
}

/// Decode one event.  Returns `None` for events that carry no data.
fn parse_event<T: DeserializeOwned>(event: &[u8]) -> Option<Result<T>> {
    let text = match std::str::from_utf8(event) {
        Ok(text) => text,
        Err(e) => {
            STREAM_ERRORS.click();
            return Some(Err(Error::encoding(
                format!("Invalid UTF-8 in stream: {e}"),
                Some(Box::new(e)),
            )));
        }
    };

    let mut data: Option<String> = None;
    for line in text.lines() {
        let Some(value) = line.strip_prefix("data:") else {
            continue;
        };
        let value = value.strip_prefix(' ').unwrap_or(value);
        match data.as_mut() {
            Some(data) => {
                data.push('\n');
                data.push_str(value);
            }
            None => data = Some(value.to_string()),
        }
    }
    let data = data?;
    STREAM_EVENTS.click();

    let value: serde_json::Value = match serde_json::from_str(&data) {
        Ok(value) => value,
        Err(e) => {
            STREAM_ERRORS.click();
            return Some(Err(Error::serialization(
                format!("Failed to parse event JSON: {e}"),
                Some(Box::new(e)),
            )));
        }
    };

    if value.get("error").is_some() {
        STREAM_ERRORS.click();
        let err = match serde_json::from_value::<ErrorEnvelope>(value) {
            Ok(envelope) => envelope.into_error(500),
            Err(_) => Error::streaming(format!("Error event in stream: {data}"), None),
        };
        return Some(Err(err));
    }

    Some(serde_json::from_value::<T>(value).map_err(|e| {
        STREAM_ERRORS.click();
        Error::serialization(
            format!("Failed to decode event payload: {e}"),
            Some(Box::new(e)),
        )
    }))
}
