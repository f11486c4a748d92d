use std::collections::BTreeSet;
use std::fmt;

use extract::{Location, Sex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by the matching layer.
///
/// Text ambiguity never surfaces here; it degrades to "unknown" inside the
/// criteria record instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A patient field the engine cannot work without is absent.
    #[error("missing required patient field `{0}`")]
    MissingField(&'static str),
    /// A patient field is present but outside its domain.
    #[error("invalid patient field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    /// Invalid matcher configuration.
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
}

/// One patient, as supplied by the caller. Never mutated by the engine.
///
/// `age` and `cancer_type` are required; every other field is optional and
/// an absent value makes its gate non-disqualifying.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatientProfile {
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub age: Option<f32>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub ecog: Option<u8>,
    #[serde(default)]
    pub cancer_type: Option<String>,
    /// Free-form stage label, e.g. `"Stage IIIB"` or `"metastatic"`.
    #[serde(default)]
    pub disease_stage: Option<String>,
    /// Free-form findings such as `"EGFR exon 19 deletion"` or `"PD-L1 80%"`.
    #[serde(default)]
    pub biomarkers: BTreeSet<String>,
    #[serde(default)]
    pub prior_therapy_count: Option<u32>,
    #[serde(default)]
    pub comorbidities: BTreeSet<String>,
    #[serde(default)]
    pub location: Option<Location>,
}

impl PatientProfile {
    pub fn new(age: f32, cancer_type: impl Into<String>) -> Self {
        Self {
            age: Some(age),
            cancer_type: Some(cancer_type.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = patient_id.into();
        self
    }

    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = Some(sex);
        self
    }

    pub fn with_ecog(mut self, ecog: u8) -> Self {
        self.ecog = Some(ecog);
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.disease_stage = Some(stage.into());
        self
    }

    pub fn with_biomarkers<I, S>(mut self, biomarkers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.biomarkers = biomarkers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_prior_therapies(mut self, count: u32) -> Self {
        self.prior_therapy_count = Some(count);
        self
    }

    pub fn with_comorbidities<I, S>(mut self, comorbidities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.comorbidities = comorbidities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Check the required fields and value domains.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let age = self.age.ok_or(ValidationError::MissingField("age"))?;
        if !age.is_finite() || age < 0.0 {
            return Err(ValidationError::InvalidField {
                field: "age",
                reason: format!("{age} is not a valid age in years"),
            });
        }
        match self.cancer_type.as_deref() {
            Some(cancer_type) if !cancer_type.trim().is_empty() => {}
            _ => return Err(ValidationError::MissingField("cancer_type")),
        }
        if let Some(ecog) = self.ecog {
            if ecog > 4 {
                return Err(ValidationError::InvalidField {
                    field: "ecog",
                    reason: format!("{ecog} is outside 0-4"),
                });
            }
        }
        Ok(())
    }
}

/// Tiered outcome of one patient/trial evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Excellent,
    Good,
    Fair,
    Marginal,
    Excluded,
}

impl Verdict {
    /// Sort key: lower is better.
    pub fn rank(self) -> u8 {
        match self {
            Verdict::Excellent => 0,
            Verdict::Good => 1,
            Verdict::Fair => 2,
            Verdict::Marginal => 3,
            Verdict::Excluded => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Excellent => "EXCELLENT",
            Verdict::Good => "GOOD",
            Verdict::Fair => "FAIR",
            Verdict::Marginal => "MARGINAL",
            Verdict::Excluded => "EXCLUDED",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hard gates, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Age,
    Sex,
    Ecog,
    Comorbidity,
    Biomarker,
    PriorTherapy,
}

impl Gate {
    pub fn as_str(self) -> &'static str {
        match self {
            Gate::Age => "age",
            Gate::Sex => "sex",
            Gate::Ecog => "ecog",
            Gate::Comorbidity => "comorbidity",
            Gate::Biomarker => "biomarker",
            Gate::PriorTherapy => "prior_therapy",
        }
    }
}

/// Points one criterion added to (or removed from) the score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    pub criterion: String,
    pub points: i32,
}

/// Result of evaluating one patient against one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub trial_id: String,
    pub verdict: Verdict,
    /// 0 to 100; always 0 when excluded.
    pub score: u8,
    /// Soft criteria that added points, in scoring order.
    pub matched_reasons: Vec<String>,
    /// Exactly one entry when excluded, empty otherwise.
    pub disqualifying_reasons: Vec<String>,
    /// Gates that could not be evaluated because the patient field was
    /// unknown, plus uncertainty notes.
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_gate: Option<Gate>,
    /// Per-criterion points; only populated when `explain` is enabled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributions: Vec<Contribution>,
}

impl MatchResult {
    pub fn is_excluded(&self) -> bool {
        self.verdict == Verdict::Excluded
    }
}

/// Score cutoffs for the non-excluded tiers. Anything below `fair` is
/// marginal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictThresholds {
    #[serde(default = "VerdictThresholds::default_excellent")]
    pub excellent: u8,
    #[serde(default = "VerdictThresholds::default_good")]
    pub good: u8,
    #[serde(default = "VerdictThresholds::default_fair")]
    pub fair: u8,
}

impl VerdictThresholds {
    pub(crate) fn default_excellent() -> u8 {
        70
    }

    pub(crate) fn default_good() -> u8 {
        50
    }

    pub(crate) fn default_fair() -> u8 {
        30
    }

    pub fn verdict_for(&self, score: u8) -> Verdict {
        if score >= self.excellent {
            Verdict::Excellent
        } else if score >= self.good {
            Verdict::Good
        } else if score >= self.fair {
            Verdict::Fair
        } else {
            Verdict::Marginal
        }
    }
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            excellent: Self::default_excellent(),
            good: Self::default_good(),
            fair: Self::default_fair(),
        }
    }
}

/// Points awarded per soft criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub cancer_type: u8,
    pub disease_stage: u8,
    /// Per satisfied biomarker requirement.
    pub biomarker_match: u8,
    /// Ceiling on the summed biomarker points.
    pub biomarker_cap: u8,
    pub ecog_confirmed: u8,
    pub treatment_line: u8,
    pub proximity_local: u8,
    pub proximity_regional: u8,
    pub proximity_national: u8,
    /// Subtracted per patient comorbidity the trial text is silent on, when
    /// `penalize_unmentioned` is set.
    pub unmentioned_penalty: u8,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            cancer_type: 30,
            disease_stage: 20,
            biomarker_match: 10,
            biomarker_cap: 20,
            ecog_confirmed: 10,
            treatment_line: 10,
            proximity_local: 20,
            proximity_regional: 10,
            proximity_national: 5,
            unmentioned_penalty: 5,
        }
    }
}

/// Matching policy.
///
/// Cheap to clone and serde-friendly so it can be embedded in higher-level
/// configs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default)]
    pub thresholds: VerdictThresholds,
    #[serde(default)]
    pub weights: ScoringWeights,
    /// Subtract points for patient comorbidities whose exclusion flag is
    /// `NOT_MENTIONED`. Off by default: silence is not evidence.
    #[serde(default)]
    pub penalize_unmentioned: bool,
    /// Populate [`MatchResult::contributions`].
    #[serde(default)]
    pub explain: bool,
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let VerdictThresholds {
            excellent,
            good,
            fair,
        } = self.thresholds;
        if excellent > 100 {
            return Err(ValidationError::InvalidConfig(format!(
                "thresholds.excellent must be <= 100 (got {excellent})"
            )));
        }
        if !(excellent > good && good > fair) {
            return Err(ValidationError::InvalidConfig(format!(
                "thresholds must be strictly descending (excellent {excellent}, good {good}, fair {fair})"
            )));
        }
        if self.weights.biomarker_match > self.weights.biomarker_cap {
            return Err(ValidationError::InvalidConfig(
                "weights.biomarker_match must not exceed weights.biomarker_cap".into(),
            ));
        }
        Ok(())
    }
}
