//! Checksum calculation for migration files

use sha2::{Digest, Sha256};

/// Calculate the SHA-256 checksum of migration content
///
/// This is used to detect migration files that were edited after being
/// applied to the warehouse; an edited file re-enters the pending set.
///
/// # Returns
///
/// Returns the hexadecimal SHA-256 hash of the content
#[must_use]
pub fn checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let hash = hasher.finalize();

    format!("{:x}", hash)
}
