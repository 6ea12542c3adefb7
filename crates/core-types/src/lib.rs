//! Shared vocabulary of the feed: connection lifecycle, reconnect policy,
//! transport kinds and the normalized log record. No I/O, no async.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{ConnectionState, ReconnectPolicy, TransportKind};
pub use error::CoreError;
pub use structs::NormalizedRecord;
