// hasher.rs — SHA-256 hashing utilities.
//
// All hashes in Helm are SHA-256, hex-encoded: content addresses for blobs
// and identity hashes for commits. SHA-256 produces a 32-byte digest; we
// encode it as a 64-character lowercase hex string for readability and JSON
// compatibility.

use sha2::{Digest, Sha256};

/// Hash arbitrary bytes, returning a lowercase hex-encoded SHA-256 string.
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Hash a UTF-8 string, returning a lowercase hex-encoded SHA-256 string.
pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}
