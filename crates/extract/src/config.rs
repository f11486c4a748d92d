//! Configuration for record building.
//!
//! # Examples
//!
//! ```rust
//! use extract::ExtractConfig;
//!
//! let config = ExtractConfig::default();
//! assert_eq!(config.max_key_terms, 20);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExtractConfig {
    /// Cap on `key_inclusion_terms` and `key_exclusion_terms` each.
    pub max_key_terms: usize,

    /// Items shorter than this many characters are not key terms.
    pub min_key_term_chars: usize,

    /// Cap on `disease_stage_terms`.
    pub max_stage_terms: usize,

    /// Let inclusion-section allowance phrasing ("treated brain metastases
    /// are eligible") resolve a condition to allowed.
    pub scan_inclusion_for_allowance: bool,
}

impl ExtractConfig {
    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.max_stage_terms == 0 {
            return Err(ExtractError::InvalidConfig(
                "max_stage_terms must be > 0".into(),
            ));
        }
        if self.min_key_term_chars == 0 {
            return Err(ExtractError::InvalidConfig(
                "min_key_term_chars must be > 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_key_terms: 20,
            min_key_term_chars: 10,
            max_stage_terms: 10,
            scan_inclusion_for_allowance: true,
        }
    }
}
