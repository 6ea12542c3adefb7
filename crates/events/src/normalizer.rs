use crate::messages::RawEvent;
use chrono::{DateTime, SecondsFormat, Utc};
use core_types::NormalizedRecord;

const DEFAULT_LEVEL: &str = "INFO";

/// Normalizes `raw`, stamping it with the current time when it carries no `ts`.
pub fn normalize(raw: &RawEvent) -> NormalizedRecord {
    normalize_at(raw, Utc::now())
}

/// Normalizes `raw` using `captured_at` as the fallback timestamp.
///
/// Text resolution, first match wins:
/// 1. the raw value is itself a string,
/// 2. a non-empty `message` field,
/// 3. a non-empty `data` field,
/// 4. the full compact JSON rendering of the event.
///
/// `ts` and `level` are resolved independently of the text.
pub fn normalize_at(raw: &RawEvent, captured_at: DateTime<Utc>) -> NormalizedRecord {
    let text = match raw {
        RawEvent::PlainText(s) => s.clone(),
        RawEvent::Structured(value) => raw
            .field_text("message")
            .or_else(|| raw.field_text("data"))
            .unwrap_or_else(|| value.to_string()),
    };

    let timestamp = raw
        .field_text("ts")
        .unwrap_or_else(|| captured_at.to_rfc3339_opts(SecondsFormat::Millis, true));
    let level = raw
        .field_text("level")
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string());

    NormalizedRecord::new(timestamp, &level, text)
}
