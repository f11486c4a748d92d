//! Soft scoring for patients that passed every gate.
//!
//! Criteria are checked in a fixed order and each one that holds adds its
//! configured weight. The running total is clamped to 0..=100 at the end.

use extract::{
    normalize_stage_label, overlapping_term, Condition, CriteriaRecord, ExclusionStatus, Location,
    TreatmentLine,
};

use crate::gate::{assess, Candidate, MarkerFit};
use crate::types::{Contribution, MatchConfig};

// Spellings treated as the same cancer type. A patient type that mentions
// any alias in a group is matched using every alias of that group.
const CANCER_ALIASES: &[&[&str]] = &[
    &[
        "nsclc",
        "non-small cell lung",
        "non-small-cell lung",
        "non small cell lung",
        "nonsmall cell lung",
    ],
    &["sclc", "small cell lung"],
    &["breast"],
    &["colorectal", "colon", "rectal", "crc"],
    &["prostate"],
    &["melanoma"],
    &["glioblastoma", "gbm"],
    &["pancreatic", "pancreas"],
    &["ovarian", "ovary"],
    &["hepatocellular", "hcc", "liver cancer"],
    &["renal cell", "rcc", "kidney cancer"],
    &["urothelial", "bladder"],
    &["head and neck", "hnscc"],
    &["gastric", "stomach"],
];

#[derive(Debug, Default)]
pub(crate) struct Scorecard {
    total: i32,
    pub(crate) reasons: Vec<String>,
    pub(crate) contributions: Vec<Contribution>,
}

impl Scorecard {
    fn award(&mut self, criterion: &str, points: u8, reason: String) {
        self.total += i32::from(points);
        self.reasons.push(reason);
        self.contributions.push(Contribution {
            criterion: criterion.to_string(),
            points: i32::from(points),
        });
    }

    fn deduct(&mut self, criterion: &str, points: u8) {
        self.total -= i32::from(points);
        self.contributions.push(Contribution {
            criterion: criterion.to_string(),
            points: -i32::from(points),
        });
    }

    pub(crate) fn score(&self) -> u8 {
        self.total.clamp(0, 100) as u8
    }
}

pub(crate) fn score(
    candidate: &Candidate<'_>,
    record: &CriteriaRecord,
    config: &MatchConfig,
    warnings: &mut Vec<String>,
) -> Scorecard {
    let weights = &config.weights;
    let patient = candidate.patient;
    let mut card = Scorecard::default();

    if let Some(matched) = patient
        .cancer_type
        .as_deref()
        .and_then(|cancer_type| cancer_type_match(cancer_type, record))
    {
        card.award(
            "cancer_type",
            weights.cancer_type,
            format!("Cancer type matches: {matched}"),
        );
    }

    if let Some(stage) = patient.disease_stage.as_deref() {
        let patient_terms = normalize_stage_label(stage);
        if let Some(term) = overlapping_term(&patient_terms, &record.disease_stage_terms) {
            card.award(
                "disease_stage",
                weights.disease_stage,
                format!("Disease stage matches: {term}"),
            );
        }
    }

    if !patient.biomarkers.is_empty() {
        let mut awarded = 0u8;
        for requirement in &record.biomarker_requirements {
            if assess(requirement, &candidate.markers) == MarkerFit::Satisfied {
                let points = weights
                    .biomarker_match
                    .min(weights.biomarker_cap.saturating_sub(awarded));
                awarded += points;
                card.award("biomarker", points, format!("Biomarker match: {requirement}"));
            }
        }
    }

    if let (Some(ecog), Some(max)) = (patient.ecog, record.ecog_max) {
        if ecog <= max {
            card.award(
                "ecog",
                weights.ecog_confirmed,
                format!("ECOG {ecog} within limit (≤ {max})"),
            );
        }
    }

    if let Some(prior) = patient.prior_therapy_count {
        if record.treatment_line != TreatmentLine::AnyLine && record.treatment_line.admits(prior) {
            card.award(
                "treatment_line",
                weights.treatment_line,
                format!("Treatment line fits: {}", record.treatment_line.as_str()),
            );
        }
    }

    if let Some(home) = patient.location.as_ref() {
        if let Some((band, site)) = nearest_site(home, &record.sites) {
            let (points, place) = match band {
                Band::Local => (weights.proximity_local, site.city.as_deref()),
                Band::Regional => (weights.proximity_regional, site.state.as_deref()),
                Band::National => (weights.proximity_national, site.country.as_deref()),
            };
            card.award(
                band.criterion(),
                points,
                format!("Trial site in {}", place.unwrap_or_default()),
            );
        }
    }

    for comorbidity in &patient.comorbidities {
        for condition in Condition::from_comorbidity(comorbidity) {
            if record.exclusion_status(condition) != ExclusionStatus::NotMentioned {
                continue;
            }
            warnings.push(format!(
                "Trial text does not mention {comorbidity} ({}); eligibility unverified",
                condition.as_str()
            ));
            if config.penalize_unmentioned {
                card.deduct("unmentioned_comorbidity", weights.unmentioned_penalty);
            }
        }
    }

    card
}

/// The first trial condition or inclusion term naming the patient's cancer
/// type.
fn cancer_type_match<'r>(cancer_type: &str, record: &'r CriteriaRecord) -> Option<&'r str> {
    let lowered = cancer_type.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    let mut needles: Vec<&str> = vec![lowered.as_str()];
    for group in CANCER_ALIASES {
        if group.iter().any(|alias| contains_term(&lowered, alias)) {
            needles.extend(group.iter().copied());
        }
    }
    record
        .conditions
        .iter()
        .chain(&record.key_inclusion_terms)
        .find(|candidate| {
            let candidate = candidate.to_lowercase();
            needles.iter().any(|needle| contains_term(&candidate, needle))
        })
        .map(String::as_str)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-'
}

/// Substring match that refuses to start or end inside a word, so "sclc"
/// does not match inside "nsclc" and "small cell lung" not inside
/// "non-small cell lung".
fn contains_term(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Band {
    Local,
    Regional,
    National,
}

impl Band {
    fn criterion(self) -> &'static str {
        match self {
            Band::Local => "proximity_local",
            Band::Regional => "proximity_regional",
            Band::National => "proximity_national",
        }
    }
}

fn same(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.trim().eq_ignore_ascii_case(b.trim()),
        _ => false,
    }
}

fn compatible(a: &Option<String>, b: &Option<String>) -> bool {
    a.is_none() || b.is_none() || same(a, b)
}

fn band(home: &Location, site: &Location) -> Option<Band> {
    if same(&home.city, &site.city)
        && compatible(&home.state, &site.state)
        && compatible(&home.country, &site.country)
    {
        Some(Band::Local)
    } else if same(&home.state, &site.state) && compatible(&home.country, &site.country) {
        Some(Band::Regional)
    } else if same(&home.country, &site.country) {
        Some(Band::National)
    } else {
        None
    }
}

/// Closest band over all sites; the first site wins among equals.
fn nearest_site<'s>(home: &Location, sites: &'s [Location]) -> Option<(Band, &'s Location)> {
    sites
        .iter()
        .filter_map(|site| band(home, site).map(|b| (b, site)))
        .min_by_key(|(b, _)| *b)
}
