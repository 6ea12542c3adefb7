//! # Feed Engine Crate
//!
//! The realtime ingestion layer of the console. It keeps one streaming
//! connection to the trading backend alive, turns every frame into a log line,
//! and shares the result with any number of consumers.
//!
//! ## Architectural Principles
//!
//! - **Single Owner:** One driver task owns the connection, the buffers and the
//!   mirror. Consumers talk to it through `FeedProvider`, a cheap cloneable
//!   handle, so no state is ever shared behind a lock.
//! - **At Most One Connection:** `ConnectionManager` holds a single handle per
//!   channel. Every attempt has a generation number and late events from a
//!   replaced attempt are discarded.
//! - **Arrival Order:** Frames are normalized, buffered, mirrored and fanned out
//!   in exactly the order the transport delivered them.
//! - **Nothing Is Fatal:** Bad frames, failing subscribers, storage errors and
//!   dropped connections are logged and absorbed.
//!
//! ## Public API
//!
//! - `FeedProvider`: the shared facade (`start_logs`, `stop_logs`, `subscribe`,
//!   `messages`, `is_connected`, ...).
//! - `ConnectionManager`: the connection state machine.
//! - `RetentionBuffer`: the bounded FIFO history.
//! - `SubscriberRegistry` / `Subscription`: isolated fan-out.
//! - `EngineError`: the specific error types that can be returned from this crate.

pub mod connection;
pub mod error;
pub mod provider;
pub mod retention;
pub mod subscribers;

pub use connection::{ConnectionEvent, ConnectionManager};
pub use error::EngineError;
pub use provider::{FeedProvider, ProviderConfig};
pub use retention::RetentionBuffer;
pub use subscribers::{SubscriberRegistry, Subscription};
