//! Record assembly from one normalization pass.
//!
//! Every extractor runs independently over the same sentences. A degraded
//! field only affects itself: it lands as unknown with low confidence and a
//! debug event, and the rest of the record is built as usual.

use std::collections::BTreeMap;

use canonical::{NormalizedCriteria, SectionKind};
use tracing::debug;

use crate::config::ExtractConfig;
use crate::exclusion;
use crate::fields::{
    age, biomarker, ecog, prior_therapy, required_tests, sex, stage, treatment_line, washout,
    FieldOutcome,
};
use crate::record::{Confidence, CriteriaRecord, Field, RegistryHints, Sex};

/// Build the structured record for one normalized trial text.
pub fn build_record(doc: &NormalizedCriteria, cfg: &ExtractConfig) -> CriteriaRecord {
    let sentences = doc.sentences.as_slice();
    let mut confidence = BTreeMap::new();
    let mut settle = |field: Field, degraded: Option<&'static str>, level: Confidence| {
        if let Some(reason) = degraded {
            debug!(trial_id = %doc.trial_id, field = ?field, reason, "field_degraded");
        }
        confidence.insert(field, level);
    };

    let mut record = CriteriaRecord::new(doc.trial_id.clone());
    record.content_hash = doc.content_hash.clone();

    (record.age_min, record.age_max) = take(age::extract(sentences), Field::Age, &mut settle);
    record.sex = take(sex::extract(sentences), Field::Sex, &mut settle);
    record.ecog_max = take(ecog::extract(sentences), Field::Ecog, &mut settle);
    record.washout_days = take(washout::extract(sentences), Field::Washout, &mut settle);
    record.biomarker_requirements =
        take(biomarker::extract(sentences), Field::Biomarkers, &mut settle);
    (record.prior_therapy_min, record.prior_therapy_max) = take(
        prior_therapy::extract(sentences),
        Field::PriorTherapy,
        &mut settle,
    );
    record.disease_stage_terms = take(
        stage::extract(sentences, cfg.max_stage_terms),
        Field::DiseaseStage,
        &mut settle,
    );
    record.treatment_line = take(
        treatment_line::extract(sentences),
        Field::TreatmentLine,
        &mut settle,
    );
    record.required_tests = take(
        required_tests::extract(sentences),
        Field::RequiredTests,
        &mut settle,
    );

    record.exclusion_flags = exclusion::resolve_all(sentences, cfg.scan_inclusion_for_allowance);
    record.key_inclusion_terms = key_terms(doc, SectionKind::Inclusion, cfg);
    record.key_exclusion_terms = key_terms(doc, SectionKind::Exclusion, cfg);
    record.extraction_confidence = confidence;
    record
}

/// Like [`build_record`], with structured registry fields taking precedence
/// over the free text. Hints that do not parse are ignored.
pub fn build_record_with_hints(
    doc: &NormalizedCriteria,
    hints: &RegistryHints,
    cfg: &ExtractConfig,
) -> CriteriaRecord {
    let mut record = build_record(doc, cfg);

    let min = hints.minimum_age.as_deref().and_then(age::parse_registry_age);
    let max = hints.maximum_age.as_deref().and_then(age::parse_registry_age);
    if min.is_some() || max.is_some() {
        let age_min = min.or(record.age_min);
        let age_max = max.or(record.age_max);
        match (age_min, age_max) {
            (Some(low), Some(high)) if low > high => {
                debug!(
                    trial_id = %doc.trial_id,
                    field = ?Field::Age,
                    reason = "registry age bounds conflict",
                    "field_degraded"
                );
                record.age_min = None;
                record.age_max = None;
                record.extraction_confidence.insert(Field::Age, Confidence::Low);
            }
            _ => {
                record.age_min = age_min;
                record.age_max = age_max;
                record.extraction_confidence.insert(Field::Age, Confidence::High);
            }
        }
    }

    if let Some(sex) = hints.sex.as_deref().and_then(Sex::parse) {
        record.sex = sex;
        record.extraction_confidence.insert(Field::Sex, Confidence::High);
    }
    record
}

fn take<T>(
    outcome: FieldOutcome<T>,
    field: Field,
    settle: &mut impl FnMut(Field, Option<&'static str>, Confidence),
) -> T {
    settle(field, outcome.degraded, outcome.confidence);
    outcome.value
}

/// Leading list items of one section, long enough to carry meaning.
fn key_terms(doc: &NormalizedCriteria, section: SectionKind, cfg: &ExtractConfig) -> Vec<String> {
    doc.section_items(section)
        .filter(|item| item.text.chars().count() >= cfg.min_key_term_chars)
        .take(cfg.max_key_terms)
        .map(|item| item.text.clone())
        .collect()
}
