//! Rule-based field extraction for clinical trial eligibility criteria.
//!
//! Takes the section-tagged sentences produced by `canonical::normalize` and
//! turns them into a [`CriteriaRecord`]: age bounds, sex, ECOG ceiling,
//! washout, biomarker requirements, prior-therapy limits, stage vocabulary,
//! treatment line, required tests and the comorbidity exclusion flags.
//!
//! ## How extraction works
//!
//! Every field owns an ordered [`RuleSet`]. The first rule that matches and
//! whose extractor accepts the value wins, even when a later rule would match
//! earlier in the text. Fallback phrasings sit at the end of each list with
//! [`Confidence::Low`].
//!
//! Comorbidity flags go through the two-pass resolver in [`exclusion`]:
//! allowance phrasing first, exclusion phrasing only when no allowance
//! exists.
//!
//! ## Never fails
//!
//! [`build_record`] always returns a record. Anything unknown, ambiguous or
//! inconsistent is `None` (or the neutral default) with low confidence, and
//! downstream matching treats it as "not a gate".
//!
//! ```rust
//! use canonical::{normalize, NormalizeConfig};
//! use extract::{build_record, Condition, ExclusionStatus, ExtractConfig};
//!
//! let doc = normalize(
//!     "NCT00000001",
//!     Some("Inclusion: Age 18 and older, ECOG 0-1. Exclusion: Brain metastases allowed if treated."),
//!     &NormalizeConfig::default(),
//! );
//! let record = build_record(&doc, &ExtractConfig::default());
//! assert_eq!(record.age_min, Some(18.0));
//! assert_eq!(record.ecog_max, Some(1));
//! assert_eq!(
//!     record.exclusion_status(Condition::BrainMetastases),
//!     ExclusionStatus::Allowed
//! );
//! ```

mod builder;
mod cache;
mod config;
mod error;
pub mod exclusion;
pub mod fields;
mod record;
pub mod rule;

pub use crate::builder::{build_record, build_record_with_hints};
pub use crate::cache::{MemoryCache, NoopCache, ParseCache};
pub use crate::config::ExtractConfig;
pub use crate::error::ExtractError;
pub use crate::exclusion::{Condition, ExclusionStatus};
pub use crate::fields::biomarker::{
    parse_patient_marker, Biomarker, BiomarkerRequirement, PatientMarker, Polarity,
};
pub use crate::fields::required_tests::RequiredTest;
pub use crate::fields::stage::{normalize_stage_label, overlapping_term, stage_equivalents};
pub use crate::fields::treatment_line::TreatmentLine;
pub use crate::fields::FieldOutcome;
pub use crate::record::{Confidence, CriteriaRecord, Field, Location, RegistryHints, Sex};
pub use crate::rule::{Extraction, Rule, RuleSet, Scope};
