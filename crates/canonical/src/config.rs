//! Configuration for eligibility text normalization.
//!
//! # Versioning
//!
//! The `version` field feeds the content hash. Any change to normalization
//! behavior that can alter extracted fields must come with a version bump so
//! parsed records cached under the old hash are not reused.
//!
//! # Examples
//!
//! ```rust
//! use canonical::NormalizeConfig;
//!
//! let config = NormalizeConfig::default();
//! assert_eq!(config.version, 1);
//! assert!(config.normalize_unicode);
//! assert!(config.join_continuations);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CanonicalError;

/// Configuration for [`normalize`](crate::normalize).
///
/// Cheap to clone and serde-friendly so it can be embedded in the YAML
/// pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Normalization behavior version, mixed into the content hash.
    ///
    /// Must be >= 1; version 0 is reserved and rejected by
    /// [`NormalizeConfig::validate`].
    pub version: u32,

    /// Apply Unicode NFKC folding before heading detection.
    ///
    /// Registry exports mix full-width digits, non-breaking spaces and
    /// ligatures; folding them keeps the extractor patterns ASCII-centric.
    /// Comparison operators such as `≥` and `≤` survive NFKC unchanged.
    pub normalize_unicode: bool,

    /// Join an unmarked line that starts lower-case to the previous list item.
    ///
    /// Registries hard-wrap long bullets; without joining, the tail of a
    /// wrapped bullet becomes its own sentence and loses its subject.
    pub join_continuations: bool,
}

impl NormalizeConfig {
    /// Reject configurations that cannot produce a stable content hash.
    pub fn validate(&self) -> Result<(), CanonicalError> {
        if self.version == 0 {
            return Err(CanonicalError::InvalidConfig(
                "normalize version must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            version: 1,
            normalize_unicode: true,
            join_continuations: true,
        }
    }
}
