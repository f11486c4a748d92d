//! The structured per-trial record and its value types.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::exclusion::{Condition, ExclusionStatus};
use crate::fields::biomarker::BiomarkerRequirement;
use crate::fields::required_tests::RequiredTest;
use crate::fields::treatment_line::TreatmentLine;

/// How much an extracted value should be trusted.
///
/// `High` comes from a primary phrasing or a structured registry field.
/// `Low` marks fallback phrasings, defaults and degraded fields; these are
/// the ones worth a human look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Low,
}

/// Keys of [`CriteriaRecord::extraction_confidence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Age,
    Sex,
    Ecog,
    Washout,
    Biomarkers,
    PriorTherapy,
    DiseaseStage,
    TreatmentLine,
    RequiredTests,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Age,
        Field::Sex,
        Field::Ecog,
        Field::Washout,
        Field::Biomarkers,
        Field::PriorTherapy,
        Field::DiseaseStage,
        Field::TreatmentLine,
        Field::RequiredTests,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sex {
    #[default]
    All,
    Male,
    Female,
}

impl Sex {
    /// Parse registry and patient spellings ("F", "female", "ALL", ...).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" | "both" | "any" => Some(Sex::All),
            "m" | "male" | "man" | "men" => Some(Sex::Male),
            "f" | "female" | "woman" | "women" => Some(Sex::Female),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sex::All => "ALL",
            Sex::Male => "MALE",
            Sex::Female => "FEMALE",
        }
    }
}

/// A city/state/country triple, used for trial sites and patient location.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl Location {
    pub fn new(
        city: impl Into<String>,
        state: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            city: Some(city.into()),
            state: Some(state.into()),
            country: Some(country.into()),
        }
    }
}

/// Structured eligibility fields some registries publish next to the free
/// text, e.g. `minimum_age = "18 Years"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistryHints {
    #[serde(default)]
    pub minimum_age: Option<String>,
    #[serde(default)]
    pub maximum_age: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
}

/// Structured eligibility for one trial.
///
/// Built once per (trial id, text) pair by
/// [`build_record`](crate::build_record) and shared read-only afterwards.
/// A `None` field means "unknown" and is never a gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaRecord {
    pub trial_id: String,
    /// Content hash of the text this record was parsed from.
    #[serde(default)]
    pub content_hash: String,
    /// Minimum age in years; fractional for month/week bounds.
    pub age_min: Option<f32>,
    pub age_max: Option<f32>,
    pub sex: Sex,
    /// Highest ECOG grade admitted, 0 to 4.
    pub ecog_max: Option<u8>,
    pub washout_days: Option<u32>,
    pub prior_therapy_min: Option<u32>,
    pub prior_therapy_max: Option<u32>,
    /// Deduplicated by (biomarker, polarity), in order of first mention.
    pub biomarker_requirements: Vec<BiomarkerRequirement>,
    pub disease_stage_terms: BTreeSet<String>,
    /// Always holds every [`Condition`]; absent mentions are `NotMentioned`.
    pub exclusion_flags: BTreeMap<Condition, ExclusionStatus>,
    pub treatment_line: TreatmentLine,
    pub required_tests: Vec<RequiredTest>,
    pub key_inclusion_terms: Vec<String>,
    pub key_exclusion_terms: Vec<String>,
    pub extraction_confidence: BTreeMap<Field, Confidence>,
    /// Registry condition names, attached by the caller.
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Registry site locations, attached by the caller.
    #[serde(default)]
    pub sites: Vec<Location>,
}

impl CriteriaRecord {
    /// A record with every field unknown: no gates, no soft signals.
    pub fn new(trial_id: impl Into<String>) -> Self {
        Self {
            trial_id: trial_id.into(),
            content_hash: String::new(),
            age_min: None,
            age_max: None,
            sex: Sex::All,
            ecog_max: None,
            washout_days: None,
            prior_therapy_min: None,
            prior_therapy_max: None,
            biomarker_requirements: Vec::new(),
            disease_stage_terms: BTreeSet::new(),
            exclusion_flags: Condition::ALL
                .iter()
                .map(|c| (*c, ExclusionStatus::NotMentioned))
                .collect(),
            treatment_line: TreatmentLine::AnyLine,
            required_tests: Vec::new(),
            key_inclusion_terms: Vec::new(),
            key_exclusion_terms: Vec::new(),
            extraction_confidence: Field::ALL.iter().map(|f| (*f, Confidence::Low)).collect(),
            conditions: Vec::new(),
            sites: Vec::new(),
        }
    }

    pub fn exclusion_status(&self, condition: Condition) -> ExclusionStatus {
        self.exclusion_flags
            .get(&condition)
            .copied()
            .unwrap_or_default()
    }

    pub fn confidence(&self, field: Field) -> Confidence {
        self.extraction_confidence
            .get(&field)
            .copied()
            .unwrap_or(Confidence::Low)
    }

    /// Fields flagged for review.
    pub fn low_confidence_fields(&self) -> Vec<Field> {
        self.extraction_confidence
            .iter()
            .filter(|(_, c)| **c == Confidence::Low)
            .map(|(f, _)| *f)
            .collect()
    }

    pub fn with_conditions<I, S>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions = conditions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sites(mut self, sites: impl IntoIterator<Item = Location>) -> Self {
        self.sites = sites.into_iter().collect();
        self
    }

    pub fn with_age_range(mut self, min: Option<f32>, max: Option<f32>) -> Self {
        self.age_min = min;
        self.age_max = max;
        self
    }

    pub fn with_ecog_max(mut self, ecog_max: u8) -> Self {
        self.ecog_max = Some(ecog_max);
        self
    }
}

impl AsRef<CriteriaRecord> for CriteriaRecord {
    fn as_ref(&self) -> &CriteriaRecord {
        self
    }
}
