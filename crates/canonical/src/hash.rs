//! Hashing utilities for eligibility text.
//!
//! # Content Hash
//!
//! ```text
//! SHA-256(version.to_be_bytes() || 0x00 || trial_id || 0x00 || raw_text)
//! ```
//!
//! The hash is computed over the raw input, not the normalized sentences, so
//! a cache lookup can happen before any normalization work. The version and
//! trial id are both mixed in: two trials sharing boilerplate criteria still
//! get distinct records, and a normalization change invalidates old keys.
//!
//! # Examples
//!
//! ```rust
//! use canonical::content_hash;
//!
//! let v1 = content_hash(1, "NCT01", "Age >= 18 years");
//! let v2 = content_hash(2, "NCT01", "Age >= 18 years");
//! assert_ne!(v1, v2);
//! assert_eq!(v1.len(), 64);
//! ```

use sha2::{Digest, Sha256};

/// Hash arbitrary text with SHA-256 and return a hex digest.
///
/// Version-agnostic; use [`content_hash`] for cache keys.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute the versioned content hash for one trial's eligibility text.
pub fn content_hash(version: u32, trial_id: &str, raw_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(version.to_be_bytes());
    hasher.update([0]);
    hasher.update(trial_id.as_bytes());
    hasher.update([0]);
    hasher.update(raw_text.as_bytes());
    hex::encode(hasher.finalize())
}
