//! Hashing helpers

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of a string (used for migration checksums)
pub fn sha256_hex(data: &str) -> String {
    format!("{:x}", Sha256::digest(data.as_bytes()))
}
