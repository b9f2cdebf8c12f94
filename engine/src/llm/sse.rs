//! Server-sent events decoding
//!
//! Only `data:` fields are surfaced. Comments, `event:`/`id:`/`retry:`
//! fields and blank separators are dropped. Lines may be split across
//! network chunks at any byte, including inside a UTF-8 sequence.
//!
//! A body that stays silent longer than the idle timeout ends with
//! `LLMError::Timeout`; a long answer that keeps streaming is never cut off.

use super::{LLMError, Result};
use futures::stream::{self, BoxStream, Stream};
use futures::StreamExt;
use std::collections::VecDeque;
use std::time::Duration;

/// Longest silence allowed between two body chunks
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Incremental line decoder for an SSE byte stream
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the data payloads of every completed line
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line[..line.len() - 1]) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush a trailing line that was not newline-terminated
    pub fn finish(&mut self) -> Vec<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line).into_iter().collect()
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let rest = line.strip_prefix(b"data:")?;
    let rest = rest.strip_prefix(b" ").unwrap_or(rest);
    Some(String::from_utf8_lossy(rest).into_owned())
}

/// Turn a byte stream into a stream of SSE data payloads.
///
/// Waiting longer than `idle` for the next chunk yields `LLMError::Timeout`
/// and ends the stream.
pub fn data_events<S>(bytes: S, idle: Duration) -> BoxStream<'static, Result<String>>
where
    S: Stream<Item = Result<Vec<u8>>> + Send + 'static,
{
    let state = (Box::pin(bytes), SseDecoder::new(), VecDeque::new(), false);

    stream::unfold(
        state,
        move |(mut bytes, mut decoder, mut pending, mut ended)| async move {
            loop {
                if let Some(payload) = pending.pop_front() {
                    return Some((Ok(payload), (bytes, decoder, pending, ended)));
                }
                if ended {
                    return None;
                }
                let next = match tokio::time::timeout(idle, bytes.next()).await {
                    Ok(next) => next,
                    Err(_) => Some(Err(LLMError::Timeout)),
                };
                match next {
                    Some(Ok(chunk)) => pending.extend(decoder.push(&chunk)),
                    Some(Err(e)) => {
                        ended = true;
                        return Some((Err(e), (bytes, decoder, pending, ended)));
                    }
                    None => {
                        ended = true;
                        pending.extend(decoder.finish());
                    }
                }
            }
        },
    )
    .boxed()
}

/// SSE data payloads of an HTTP response body
pub fn response_events(
    response: reqwest::Response,
    idle: Duration,
) -> BoxStream<'static, Result<String>> {
    data_events(
        response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(LLMError::from)),
        idle,
    )
}
