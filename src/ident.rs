//! Chunk identifiers and content hashing.
//!
//! Chunk ids are ULIDs: 26 Crockford-Base32 characters with a 48-bit
//! millisecond timestamp prefix and 80 bits of randomness, so ids sort
//! lexicographically by creation time.

use sha2::{Digest, Sha256};
use ulid::Ulid;

/// Generate a fresh chunk id.
pub fn new_chunk_id() -> String {
    Ulid::new().to_string()
}

/// Hex SHA-256 of the content, used for verbatim memory dedup.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
