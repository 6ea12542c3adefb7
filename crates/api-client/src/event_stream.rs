use crate::error::TransportError;
use crate::transport::{FrameStream, Transport};
use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use std::collections::VecDeque;

/// One dispatch of the server-sent events decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// The joined `data:` lines of one event.
    Data(String),
    /// A `:` comment line, sent by the backend to keep idle connections open.
    KeepAlive,
}

/// Upper bound on an unterminated line, and on the data of one event.
pub const MAX_EVENT_BYTES: usize = 1024 * 1024;

/// Incremental `text/event-stream` decoder.
///
/// Bytes can be pushed in arbitrary chunks; lines are only interpreted once
/// their terminating newline has arrived, so multi-byte characters split across
/// chunks survive.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
    data_len: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every event it completed.
    ///
    /// Fails once a line or an event grows past [`MAX_EVENT_BYTES`]; the
    /// decoder should not be used after that.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, TransportError> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let bytes: Vec<u8> = self.buffer.drain(..=pos).collect();
            let raw = String::from_utf8_lossy(&bytes[..bytes.len() - 1]);
            let line = raw.strip_suffix('\r').unwrap_or(raw.as_ref());
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
            if self.data_len > MAX_EVENT_BYTES {
                return Err(TransportError::EventTooLarge(MAX_EVENT_BYTES));
            }
        }
        if self.buffer.len() > MAX_EVENT_BYTES {
            return Err(TransportError::EventTooLarge(MAX_EVENT_BYTES));
        }
        Ok(events)
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            let data = self.data.join("\n");
            self.data.clear();
            self.data_len = 0;
            return Some(SseEvent::Data(data));
        }

        if line.starts_with(':') {
            return Some(SseEvent::KeepAlive);
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        // `event`, `id` and `retry` do not affect what the console shows.
        if field == "data" {
            self.data_len += value.len();
            self.data.push(value.to_string());
        }
        None
    }
}

/// Connects to the backend's server-push log stream (`/api/stream-logs`).
#[derive(Debug, Clone, Default)]
pub struct EventStreamTransport {
    client: reqwest::Client,
}

impl EventStreamTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for EventStreamTransport {
    async fn connect(&self, address: &str) -> Result<FrameStream, TransportError> {
        tracing::info!(%address, "[SSE-Logs] Connecting...");
        let response = self
            .client
            .get(address)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        tracing::info!(%address, "[SSE-Logs] Connection established.");

        let state = (response.bytes_stream().boxed(), SseDecoder::new(), VecDeque::new());
        let frames = stream::unfold(Some(state), |state| async move {
            let (mut body, mut decoder, mut pending) = state?;
            loop {
                if let Some(frame) = pending.pop_front() {
                    return Some((Ok(frame), Some((body, decoder, pending))));
                }
                let chunk = match body.next().await {
                    Some(Ok(chunk)) => chunk,
                    Some(Err(e)) => return Some((Err(TransportError::from(e)), None)),
                    None => return None,
                };
                match decoder.push(&chunk) {
                    Ok(events) => {
                        for event in events {
                            match event {
                                SseEvent::Data(data) => pending.push_back(data),
                                SseEvent::KeepAlive => tracing::trace!("[SSE-Logs] keep-alive"),
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "[SSE-Logs] Dropping oversized event stream.");
                        return Some((Err(e), None));
                    }
                }
            }
        });

        Ok(frames.boxed())
    }
}
