//! # Feed Events
//!
//! This crate defines the realtime event shapes pushed by the trading backend
//! to the console, and the normalizer that turns each of them into the one
//! canonical log line users read.
//!
//! As a Layer 0 crate, it depends only on `core-types`. Nothing in here does
//! I/O: frames come in as text, records go out as values.

// Declare the modules that make up this crate.
pub mod messages;
pub mod normalizer;

// Re-export the core types to provide a clean public API.
pub use messages::{FeedFrame, RawEvent};
pub use normalizer::{normalize, normalize_at};
