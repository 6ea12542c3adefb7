use serde::{Deserialize, Serialize};
use std::fmt;

/// The canonical, immutable form of one inbound event as shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub timestamp: String,
    /// Always uppercase.
    pub level: String,
    pub text: String,
    /// `"[{timestamp}] {level}: {text}"`
    pub display: String,
}

impl NormalizedRecord {
    pub fn new(timestamp: impl Into<String>, level: &str, text: impl Into<String>) -> Self {
        let timestamp = timestamp.into();
        let level = level.to_uppercase();
        let text = text.into();
        let display = format!("[{}] {}: {}", timestamp, level, text);
        Self {
            timestamp,
            level,
            text,
            display,
        }
    }
}

impl fmt::Display for NormalizedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
