//! SQLite-backed store for generated extraction code.
//!
//! This module provides a persistent cache keyed by structural fingerprint,
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - One row per fingerprint with usage tracking
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Age-based cleanup and LRU capacity eviction

pub mod connection;
pub mod entries;
pub mod eviction;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
pub use store::EntryStore;
