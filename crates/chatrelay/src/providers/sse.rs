//! Server-sent event decoding for provider responses.
//!
//! Providers answer a streaming request with `data: <json>` events separated
//! by blank lines. Network chunks split events (and UTF-8 sequences) at
//! arbitrary points, so bytes are buffered until a full event is available.

use futures::stream::{BoxStream, StreamExt};

use crate::errors::ProviderError;

/// Upper bound on a single buffered event.
const MAX_EVENT_BYTES: usize = 16 * 1024 * 1024;

/// Incremental splitter from raw bytes to event `data` payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the `[DONE]` sentinel has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed bytes, returning every complete data payload
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, ProviderError> {
        self.buffer.extend_from_slice(bytes);
        if self.buffer.len() > MAX_EVENT_BYTES {
            self.buffer.clear();
            return Err(ProviderError::Decode(
                "event stream buffer exceeded 16 MiB".to_string(),
            ));
        }

        let mut payloads = Vec::new();
        while let Some((end, sep)) = find_event_end(&self.buffer) {
            let event: Vec<u8> = self.buffer.drain(..end + sep).collect();
            let text = String::from_utf8_lossy(&event[..end]);
            if let Some(data) = extract_data(&text) {
                if data == "[DONE]" {
                    self.done = true;
                    self.buffer.clear();
                    break;
                }
                payloads.push(data);
            }
        }
        Ok(payloads)
    }

    /// Flush whatever remains when the connection closes without a final blank line
    pub fn finish(&mut self) -> Option<String> {
        if self.done || self.buffer.is_empty() {
            return None;
        }
        let text = String::from_utf8_lossy(&self.buffer).to_string();
        self.buffer.clear();
        extract_data(&text).filter(|data| data != "[DONE]")
    }
}

fn find_event_end(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buffer
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// Join the `data:` lines of one event. Comments and `event:` lines are dropped.
fn extract_data(event: &str) -> Option<String> {
    let lines: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();
    if lines.is_empty() {
        return None;
    }
    let data = lines.join("\n");
    let data = data.trim();
    (!data.is_empty()).then(|| data.to_string())
}

/// Turn a streaming HTTP response into its sequence of data payloads.
pub fn data_stream(response: reqwest::Response) -> BoxStream<'static, Result<String, ProviderError>> {
    let stream = async_stream::try_stream! {
        let mut decoder = SseDecoder::new();
        let mut bytes = response.bytes_stream();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            for payload in decoder.push(&chunk)? {
                yield payload;
            }
            if decoder.is_done() {
                break;
            }
        }
        if let Some(payload) = decoder.finish() {
            yield payload;
        }
    };
    Box::pin(stream)
}
