//! Persisted key names.
//!
//! These match the keys the web page writes, so an existing store can be
//! read without migration.

/// Anonymous device identifier (UUID v4 string).
pub const USER_ID: &str = "a350_user_id";

/// Usage record collection and running visit total (JSON).
pub const ANALYTICS: &str = "a350_analytics";

/// Scratchpad notes (raw text).
pub const NOTES: &str = "scratchpadNotes";

/// Scratchpad drawing (PNG data URI).
pub const DRAWING: &str = "scratchpadDrawing";
