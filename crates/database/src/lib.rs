//! # Log Mirror Database Crate
//!
//! This crate keeps the console's rolling log alive across restarts. It is the
//! system's "durable mirror" of the in-memory retention buffer.
//!
//! ## Architectural Principles
//!
//! - **Narrow Interface:** Backends implement `MirrorStore`, a two-method
//!   save/load contract over whole snapshots. The buffer logic never sees SQL.
//! - **Identity Scoping:** `DurableMirror` derives every key from the signed-in
//!   identity (or `guest`), so one user's log never leaks into another's.
//! - **Never Fatal:** Persistence errors are logged and swallowed by
//!   `DurableMirror`; the in-memory buffer stays the source of truth.
//!
//! ## Public API
//!
//! - `connect` / `run_migrations`: open and prepare the SQLite pool.
//! - `SqliteStore`: the durable `MirrorStore`.
//! - `MemoryStore`: a process-local `MirrorStore`.
//! - `DurableMirror`: the identity-scoped, write-through facade.
//! - `MirrorError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod mirror;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::MirrorError;
pub use mirror::{DurableMirror, GUEST_IDENTITY};
pub use store::{MemoryStore, MirrorStore, SqliteStore};
