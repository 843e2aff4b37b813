//! Durable key-value storage for page-local records.
//!
//! The store is synchronous and has a finite quota. There are no
//! transactional guarantees across keys: concurrent writers race and the
//! last write wins.

pub mod keys;
pub mod sqlite;

use std::sync::Arc;

use crate::Error;

pub use sqlite::SqliteStore;

/// Synchronous string key-value store with a byte quota.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Missing keys return `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>, Error>;

    /// Write a value, replacing any previous one.
    ///
    /// Fails with [`Error::QuotaExceeded`] when the write would push the
    /// store over its quota; the previous value is left untouched.
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), Error>;

    /// Bytes currently used (keys + values).
    fn usage_bytes(&self) -> Result<usize, Error>;
}

/// Store handle shared between the usage tracker and the scratchpad.
pub type SharedStore = Arc<dyn KeyValueStore>;
