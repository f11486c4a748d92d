//! Field extractors, one module per record field.
//!
//! Each module owns its ordered rule tables and exposes a single `extract`
//! function over normalized sentences. Extractors never fail: an absent or
//! inconsistent value comes back as `None` with [`Confidence::Low`].

pub mod age;
pub mod biomarker;
pub mod ecog;
pub mod prior_therapy;
pub mod sex;
pub mod stage;
pub mod treatment_line;
pub mod washout;

use crate::record::Confidence;
use crate::rule::Extraction;

/// Value of one field plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome<T> {
    pub value: T,
    pub confidence: Confidence,
    /// Set when a value was found but dropped as inconsistent.
    pub degraded: Option<&'static str>,
}

impl<T> FieldOutcome<T> {
    pub fn found(value: T, confidence: Confidence) -> Self {
        Self {
            value,
            confidence,
            degraded: None,
        }
    }
}

impl<T> FieldOutcome<Option<T>> {
    pub fn missing() -> Self {
        Self::found(None, Confidence::Low)
    }

    pub fn degraded(reason: &'static str) -> Self {
        Self {
            value: None,
            confidence: Confidence::Low,
            degraded: Some(reason),
        }
    }

    pub(crate) fn from_extraction(hit: Option<Extraction<T>>) -> Self {
        match hit {
            Some(hit) => Self::found(Some(hit.value), hit.confidence),
            None => Self::missing(),
        }
    }
}

/// Lower of two confidences.
pub(crate) fn weakest(a: Confidence, b: Confidence) -> Confidence {
    a.max(b)
}
