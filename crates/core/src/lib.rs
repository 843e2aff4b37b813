//! Core types and shared functionality for aide-memoire.
//!
//! This crate provides:
//! - Versioned response cache with SQLite backend
//! - Quota-limited key-value persistence
//! - Anonymous usage tracking
//! - Scratchpad notes and drawing surface
//! - Unified error types and configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod scratchpad;
pub mod storage;
pub mod usage;

pub use cache::{CacheDb, GenerationInfo, Response, ResponseType};
pub use config::AppConfig;
pub use error::Error;
pub use scratchpad::{AlertQueue, Alerter, Scratchpad};
pub use storage::{KeyValueStore, SharedStore, SqliteStore};
pub use usage::{UsageStats, UsageTracker, Visit};
