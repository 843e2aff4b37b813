//! SQLite-backed cache storage for versioned cache generations.
//!
//! This module provides a persistent store of captured HTTP responses grouped
//! into named generations, using SQLite with async access via tokio-rusqlite.
//! It supports:
//!
//! - Generation lifecycle (open, enumerate, delete wholesale)
//! - Atomic batch population for precaching
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod response;

pub use crate::Error;

pub use connection::CacheDb;
pub use generations::GenerationInfo;
pub use response::{Response, ResponseType};
