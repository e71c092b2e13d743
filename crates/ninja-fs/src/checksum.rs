//! Content checksums
//!
//! `sha256:<hex>` is the version cursor of file-backed sources: two reads
//! with equal checksums are the same revision.

use sha2::{Digest, Sha256};

const PREFIX: &str = "sha256:";

/// Checksum of `content` in the `sha256:<hex>` form.
pub fn compute_checksum(content: &[u8]) -> String {
    format!("{PREFIX}{:x}", Sha256::digest(content))
}
