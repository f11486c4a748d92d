//! # Trial Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` sits on top of the extraction layer (`extract`). It takes a
//! caller-supplied [`PatientProfile`] and one or more [`CriteriaRecord`]s and
//! produces a tiered, auditable [`MatchResult`] per trial.
//!
//! Evaluation is a three-step state machine:
//!
//! 1. **Hard gates**, in a fixed order: age, sex, ECOG, excluded
//!    comorbidities, required biomarkers, prior-therapy count. The first
//!    failure short-circuits with verdict `EXCLUDED` and exactly one
//!    disqualifying reason.
//! 2. **Scoring**: each soft criterion that holds adds its weight (cancer
//!    type, stage overlap, biomarker matches, confirmed ECOG, treatment-line
//!    fit, site proximity). The score is clamped to 0..=100.
//! 3. **Verdict**: the score is bucketed into `EXCELLENT`, `GOOD`, `FAIR` or
//!    `MARGINAL`.
//!
//! Unknown values on either side never disqualify. An unknown patient field
//! leaves a warning on the result; an unknown trial bound is simply not a
//! gate.
//!
//! ## Core Types
//!
//! - [`PatientProfile`]: age and cancer type are required; everything else
//!   is optional.
//! - [`MatchConfig`]: verdict thresholds, scoring weights, the
//!   `penalize_unmentioned` switch and `explain`.
//! - [`Matcher`]: validated policy plus `match_trial` / `match_batch`.
//! - [`MatchResult`], [`Verdict`], [`Gate`], [`Contribution`].
//! - [`ValidationError`]: the only error the engine raises.
//!
//! ## Example Usage
//!
//! ```
//! use extract::CriteriaRecord;
//! use matcher::{Matcher, PatientProfile, Verdict};
//!
//! let record = CriteriaRecord::new("NCT00000001")
//!     .with_age_range(Some(18.0), Some(75.0))
//!     .with_ecog_max(1);
//! let patient = PatientProfile::new(70.0, "NSCLC").with_ecog(2);
//!
//! let result = Matcher::default().match_trial(&patient, &record).unwrap();
//! assert_eq!(result.verdict, Verdict::Excluded);
//! assert_eq!(result.disqualifying_reasons, ["ECOG exceeds maximum (2 > 1)"]);
//! ```
//!
//! ## Observability
//!
//! Each evaluation emits a `match_complete` debug event with
//! `elapsed_micros`, and `gate_failed` when a gate disqualifies. Install a
//! [`MatchMetrics`] recorder with [`set_match_metrics`] to receive each
//! finished result with its latency, plus the gate behind every exclusion.

mod engine;
mod gate;
mod metrics;
mod score;
mod types;

pub use engine::{rank, Matcher};
pub use metrics::{set_match_metrics, MatchMetrics};
pub use types::{
    Contribution, Gate, MatchConfig, MatchResult, PatientProfile, ScoringWeights,
    ValidationError, Verdict, VerdictThresholds,
};

pub use extract::CriteriaRecord;
