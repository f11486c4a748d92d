//! Section and sentence types.

use serde::{Deserialize, Serialize};

/// Which half of the eligibility criteria a piece of text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionKind {
    Inclusion,
    Exclusion,
}

impl SectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Inclusion => "inclusion",
            SectionKind::Exclusion => "exclusion",
        }
    }

    pub(crate) fn from_heading(label: &str) -> Self {
        if label.eq_ignore_ascii_case("exclusion") {
            SectionKind::Exclusion
        } else {
            SectionKind::Inclusion
        }
    }
}

/// One list item (bullet, numbered entry or paragraph) after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaItem {
    pub section: SectionKind,
    /// Lower-cased, whitespace-collapsed item text with the list marker removed.
    pub text: String,
}

/// One sentence of an item, the unit every extractor scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaSentence {
    pub section: SectionKind,
    /// Index into [`NormalizedCriteria::items`](crate::NormalizedCriteria::items).
    pub item: usize,
    /// Lower-cased, whitespace-collapsed text without the closing `.` or `;`.
    pub text: String,
}
