//! Server-Sent Events (SSE) processing for streamed agent replies.
//!
//! The agent service emits newline-delimited lines; those prefixed `data:`
//! carry one JSON payload each. This module turns a raw byte stream into a
//! stream of classified lines, one [`LineOutcome`] per complete line.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_LINES};
use crate::{Error, Result, StreamPayload, TextUnit};

/// Prefix of lines that carry a payload.
const DATA_PREFIX: &str = "data:";

/// Sentinel some servers send after the last payload.
const DONE_SENTINEL: &str = "[DONE]";

/// The classification of one stream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// The line carried assistant text.
    Text(TextUnit),

    /// The line carried a payload that could not be decoded. The stream continues.
    Malformed {
        /// Why decoding failed.
        reason: String,
    },

    /// The end-of-stream sentinel. Informational only; the stream ends when the connection closes.
    Done,

    /// A comment, an event field, a blank line, or a payload without text.
    Ignored,
}

impl LineOutcome {
    /// Returns the text unit carried by this line, if any.
    pub fn into_text(self) -> Option<TextUnit> {
        match self {
            LineOutcome::Text(unit) => Some(unit),
            _ => None,
        }
    }

    /// Returns true if the line was a skipped malformed payload.
    pub fn is_malformed(&self) -> bool {
        matches!(self, LineOutcome::Malformed { .. })
    }
}

/// Classify a single line of the event stream.
pub fn classify_line(line: &str) -> LineOutcome {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let Some(payload) = line.strip_prefix(DATA_PREFIX).map(str::trim) else {
        return LineOutcome::Ignored;
    };
    if payload.is_empty() {
        return LineOutcome::Ignored;
    }
    if payload == DONE_SENTINEL {
        return LineOutcome::Done;
    }
    match serde_json::from_str::<StreamPayload>(payload) {
        Ok(payload) => match payload.text_unit() {
            Some(unit) => LineOutcome::Text(unit),
            None => LineOutcome::Ignored,
        },
        Err(e) => LineOutcome::Malformed {
            reason: e.to_string(),
        },
    }
}

/// Process a stream of bytes into a stream of classified lines.
///
/// Bytes are buffered until a `\n` arrives, so multi-byte characters split
/// across chunks decode intact. Invalid UTF-8 is replaced rather than fatal.
/// An unterminated fragment left when the stream closes is discarded.
pub fn process_sse<S>(byte_stream: S) -> impl Stream<Item = Result<LineOutcome>>
where
    S: Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Unpin,
{
    // Convert reqwest errors to our error type
    let stream = byte_stream.map(|result| {
        result
            .map_err(|e| Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e))))
    });

    let buffer: Vec<u8> = Vec::new();

    stream::unfold(
        (stream, buffer),
        move |(mut stream, mut buffer)| async move {
            loop {
                // First check if we have a complete line in the buffer
                if let Some(line) = extract_line(&mut buffer) {
                    STREAM_LINES.click();
                    return Some((Ok(classify_line(&line)), (stream, buffer)));
                }

                // Read more data
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        buffer.extend_from_slice(&bytes);
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, buffer)));
                    }
                    None => {
                        if !buffer.is_empty() {
                            tracing::debug!(
                                bytes = buffer.len(),
                                "discarding unterminated line at end of stream"
                            );
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Remove the first complete line from `buffer`, without its terminator.
fn extract_line(buffer: &mut Vec<u8>) -> Option<String> {
    let newline = buffer.iter().position(|b| *b == b'\n')?;
    let rest = buffer.split_off(newline + 1);
    let mut line = std::mem::replace(buffer, rest);
    line.truncate(newline);
    Some(String::from_utf8_lossy(&line).into_owned())
}
