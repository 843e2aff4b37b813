//! Cache entry key generation.

use sha2::{Digest, Sha256};

/// Compute the primary key for a cached response.
///
/// The same URL stored in two generations gets two distinct keys, so a new
/// generation can be populated while the previous one is still live.
pub fn compute_entry_key(generation: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(generation.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
