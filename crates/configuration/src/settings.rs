use crate::error::ConfigError;
use core_types::{ReconnectPolicy, TransportKind};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STREAM_ADDRESS: &str = "ws://127.0.0.1:8000/ws/logs";
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub stream: StreamSettings,
    pub retention: RetentionSettings,
    pub mirror: MirrorSettings,
    pub api: ApiSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Rejects settings the provider cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stream.transport()?;
        if self.stream.reconnect == ReconnectMode::Fixed && self.stream.backoff_secs == 0 {
            return Err(ConfigError::ValidationError(
                "stream.backoff_secs must be greater than zero for fixed reconnects".to_string(),
            ));
        }
        if self.retention.max_messages == 0 {
            return Err(ConfigError::ValidationError(
                "retention.max_messages must be greater than zero".to_string(),
            ));
        }
        if self.retention.max_payloads == 0 {
            return Err(ConfigError::ValidationError(
                "retention.max_payloads must be greater than zero".to_string(),
            ));
        }
        if self.mirror.database_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "mirror.database_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// How a channel behaves after the transport drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ReconnectMode {
    /// Retry forever after a fixed delay.
    #[default]
    Fixed,
    /// Go idle and wait for the next explicit start.
    Manual,
}

/// Parameters for the streaming channel.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// `ws://`/`wss://` selects the WebSocket transport,
    /// `http://`/`https://` the server-push event stream.
    pub address: String,
    pub reconnect: ReconnectMode,
    /// Delay before each reconnect attempt when `reconnect = "fixed"`.
    pub backoff_secs: u64,
}

impl StreamSettings {
    pub fn transport(&self) -> Result<TransportKind, ConfigError> {
        TransportKind::from_address(&self.address)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        match self.reconnect {
            ReconnectMode::Manual => ReconnectPolicy::Manual,
            ReconnectMode::Fixed => ReconnectPolicy::FixedBackoff {
                delay: Duration::from_secs(self.backoff_secs),
            },
        }
    }
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_STREAM_ADDRESS.to_string(),
            reconnect: ReconnectMode::Fixed,
            backoff_secs: 3,
        }
    }
}

/// Bounds of the in-memory history.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionSettings {
    /// Log lines kept (and mirrored) before the oldest are evicted.
    pub max_messages: usize,
    /// `payload` events kept for the positions view.
    pub max_payloads: usize,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            max_messages: 1000,
            max_payloads: 200,
        }
    }
}

/// Where the log mirror lives and whose log it is.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MirrorSettings {
    /// sqlx connection string, e.g. `sqlite://tradefeed.db` or `sqlite::memory:`.
    pub database_url: String,
    /// The signed-in user. `None` means the shared guest scope.
    pub identity: Option<String>,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://tradefeed.db".to_string(),
            identity: None,
        }
    }
}

/// The REST backend the console talks to for broker and position actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive, overridden by `RUST_LOG` when set.
    pub filter: String,
    /// When set, logs also go to a daily rolling file in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            directory: None,
        }
    }
}
