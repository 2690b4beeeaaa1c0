//! Upload fingerprinting.
//!
//! The fingerprint is derived from the upload's file name and byte size, not from
//! its content: two different files sharing both collide.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `"<file_name>-<size>"`.
pub fn fingerprint(file_name: &str, size: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}-{}", file_name, size).as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether `value` has the shape produced by [`fingerprint`].
pub fn is_fingerprint(value: &str) -> bool {
    value.len() == 64
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
