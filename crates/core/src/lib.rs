//! Core types and shared functionality for uscrape.
//!
//! This crate provides:
//! - Structural fingerprinting of HTML documents
//! - Fingerprint cache with SQLite backend
//! - Request coalescing for concurrent generations
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod collaborators;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod fingerprint;
pub mod stats;

pub use cache::{CacheDb, CacheEntry, EntryStore};
pub use collaborators::{CodeGenerator, Document, ExtractionVerifier, Verdict};
pub use config::{AppConfig, ConfigError};
pub use controller::{CacheController, CacheSettings, Lookup, LookupSource, MaintenanceReport};
pub use error::{Error, GenerationError};
pub use fingerprint::{Fingerprint, fingerprint};
pub use stats::{CacheStats, TopEntry};
