//! Output of the normalization pass.
//!
//! # Determinism
//!
//! For a fixed [`NormalizeConfig`](crate::NormalizeConfig) version, trial id
//! and input text, every field of [`NormalizedCriteria`] is identical across
//! runs and machines.

use serde::{Deserialize, Serialize};

use crate::section::{CriteriaItem, CriteriaSentence, SectionKind};

/// Eligibility text split into ordered, section-tagged items and sentences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedCriteria {
    pub trial_id: String,
    /// Normalization version that produced this value.
    pub version: u32,
    /// Versioned hash of the raw input; see [`content_hash`](crate::content_hash).
    pub content_hash: String,
    pub items: Vec<CriteriaItem>,
    pub sentences: Vec<CriteriaSentence>,
}

impl NormalizedCriteria {
    /// True when the input held no usable text.
    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Sentences from one section, in source order.
    pub fn section_sentences(
        &self,
        section: SectionKind,
    ) -> impl Iterator<Item = &CriteriaSentence> + '_ {
        self.sentences.iter().filter(move |s| s.section == section)
    }

    /// Items from one section, in source order.
    pub fn section_items(&self, section: SectionKind) -> impl Iterator<Item = &CriteriaItem> + '_ {
        self.items.iter().filter(move |i| i.section == section)
    }

    pub fn has_section(&self, section: SectionKind) -> bool {
        self.items.iter().any(|i| i.section == section)
    }
}
