use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One delivery from the transport, before normalization.
///
/// Subscribers receive this value untouched. With `#[serde(untagged)]` it
/// serializes back to exactly what arrived: a JSON string for `PlainText`,
/// the document as received for `Structured`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawEvent {
    /// A frame that was not JSON, or a JSON string literal.
    PlainText(String),
    /// Any other JSON document. Usually an object carrying some of
    /// `type`, `message`, `data`, `ts` and `level`.
    Structured(Value),
}

impl RawEvent {
    /// Best-effort parse of one text frame. Never fails: anything that is not
    /// well-formed JSON is kept verbatim as plain text.
    pub fn from_frame(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::String(s)) => RawEvent::PlainText(s),
            Ok(value) => RawEvent::Structured(value),
            Err(e) => {
                tracing::trace!(error = %e, "Frame is not JSON; keeping it as plain text.");
                RawEvent::PlainText(text.to_string())
            }
        }
    }

    /// Falsy events (null, `false`, zero or an empty string) are dropped
    /// before they reach the buffer or any subscriber.
    pub fn is_empty(&self) -> bool {
        match self {
            RawEvent::PlainText(s) => s.is_empty(),
            RawEvent::Structured(value) => is_falsy(value),
        }
    }

    /// The `type` discriminator of a structured event, if any.
    pub fn event_type(&self) -> Option<&str> {
        match self {
            RawEvent::Structured(value) => value.get("type").and_then(Value::as_str),
            RawEvent::PlainText(_) => None,
        }
    }

    /// Reads a field of a structured event as display text.
    ///
    /// Missing and falsy fields count as absent. Non-string values are
    /// rendered as compact JSON.
    pub fn field_text(&self, key: &str) -> Option<String> {
        let RawEvent::Structured(value) = self else {
            return None;
        };
        match value.get(key)? {
            field if is_falsy(field) => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64().is_some_and(|n| n == 0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Where a frame goes once it has been read off the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    /// Keep-alive traffic. Dropped without normalization.
    KeepAlive,
    /// `{ "type": "payload", ... }`: routed to the payload sink, never the log.
    Payload(RawEvent),
    /// Everything else ends up as a line in the log buffer.
    Log(RawEvent),
}

impl FeedFrame {
    /// Classifies one text frame.
    ///
    /// `filter_keep_alive` is set for push streams, where a frame starting with
    /// `:` only keeps the connection warm.
    pub fn classify(text: &str, filter_keep_alive: bool) -> Self {
        if text.is_empty() || (filter_keep_alive && text.starts_with(':')) {
            return FeedFrame::KeepAlive;
        }

        let raw = RawEvent::from_frame(text);
        if raw.event_type() == Some("payload") {
            FeedFrame::Payload(raw)
        } else {
            FeedFrame::Log(raw)
        }
    }
}
