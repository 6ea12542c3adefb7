use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifecycle of a single streaming channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closed,
    Errored,
}

impl ConnectionState {
    /// Returns true while a connection handle is held (connecting or open).
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::Errored => "errored",
        };
        f.write_str(label)
    }
}

/// What a channel does after the transport drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Return to `Idle`; the caller decides when to start again.
    Manual,
    /// Schedule exactly one new attempt after `delay`, forever, until stopped.
    FixedBackoff { delay: Duration },
}

impl ReconnectPolicy {
    pub fn backoff(&self) -> Option<Duration> {
        match self {
            ReconnectPolicy::Manual => None,
            ReconnectPolicy::FixedBackoff { delay } => Some(*delay),
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::FixedBackoff {
            delay: Duration::from_secs(3),
        }
    }
}

/// The wire protocol a channel speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Full-duplex socket, `ws://` or `wss://`.
    #[serde(rename = "websocket")]
    WebSocket,
    /// Server-push `text/event-stream` over `http://` or `https://`.
    EventStream,
}

impl TransportKind {
    /// Infers the transport from the scheme of a stream address.
    pub fn from_address(address: &str) -> Result<Self, CoreError> {
        let scheme = address
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .ok_or_else(|| CoreError::UnsupportedAddress(address.to_string()))?;

        match scheme.as_str() {
            "ws" | "wss" => Ok(TransportKind::WebSocket),
            "http" | "https" => Ok(TransportKind::EventStream),
            _ => Err(CoreError::UnsupportedAddress(address.to_string())),
        }
    }

    /// Push streams interleave `:`-prefixed keep-alive frames with real events.
    pub fn filters_keep_alive(&self) -> bool {
        matches!(self, TransportKind::EventStream)
    }
}
