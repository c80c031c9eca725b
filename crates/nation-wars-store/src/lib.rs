//! Nation Wars Storage Layer
//!
//! This crate persists the records the war engine reads and writes:
//! - **Entity Store**: a synchronous CRUD trait over nations, militaries,
//!   alliances, wars, battle logs and messages
//! - **Backends**: an in-memory store and a SQLite store
//! - **Resilience**: bounded exponential backoff around every store call
//!
//! # Modules
//!
//! - [`store`]: The [`EntityStore`] trait, filters and errors
//! - [`memory`]: Hash-map backed store for tests and local play
//! - [`sqlite`]: SQLite backend with JSON documents and indexed columns
//! - [`retry`]: Backoff configuration and the retry loop
//! - [`resilient`]: Async store decorator applying the retry policy

// Re-export core types
pub use nation_wars_core;

// Storage
pub mod memory;
pub mod sqlite;
pub mod store;

// Resilience
pub mod resilient;
pub mod retry;

// Re-exports for convenience
pub use memory::MemoryStore;
pub use resilient::ResilientStore;
pub use retry::{BackoffConfig, BackoffState, RetryPolicy};
pub use sqlite::SqliteStore;
pub use store::{EntityStore, StoreError, WarFilter};
