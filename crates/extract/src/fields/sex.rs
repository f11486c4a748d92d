//! Sex restriction. Defaults to `ALL` with low confidence when no
//! single-sex phrasing is present.

use std::sync::LazyLock;

use canonical::CriteriaSentence;
use regex::Captures;

use super::FieldOutcome;
use crate::record::{Confidence, Sex};
use crate::rule::{first_group, Rule, RuleSet, Scope};

static RULES: LazyLock<RuleSet<Sex>> = LazyLock::new(|| {
    RuleSet::new(vec![
        Rule::new(
            "sex_word_only",
            r"\b(female|women|woman|male|men|man)\b(?:\s+[a-z]+){0,2}?\s+only\b",
            Scope::Inclusion,
            Confidence::High,
            sex_word,
        ),
        Rule::new(
            "only_sex_word",
            r"\bonly\s+(female|women|male|men)\b",
            Scope::Inclusion,
            Confidence::High,
            sex_word,
        ),
        Rule::new(
            "menopausal_women",
            r"\b(?:pre|post|peri)-?\s?menopausal\s+(women|females?)\b",
            Scope::Inclusion,
            Confidence::High,
            sex_word,
        ),
        Rule::new(
            "excluded_sex",
            r"\b(male|men|female|women)\s+(?:patients|subjects|participants)\s+(?:are\s+)?(?:excluded|not\s+eligible)\b",
            Scope::Any,
            Confidence::Low,
            opposite_sex_word,
        ),
    ])
});

fn sex_word(caps: &Captures<'_>) -> Option<Sex> {
    Sex::parse(first_group(caps)?).filter(|s| *s != Sex::All)
}

fn opposite_sex_word(caps: &Captures<'_>) -> Option<Sex> {
    match sex_word(caps)? {
        Sex::Male => Some(Sex::Female),
        Sex::Female => Some(Sex::Male),
        Sex::All => None,
    }
}

pub fn extract(sentences: &[CriteriaSentence]) -> FieldOutcome<Sex> {
    match RULES.first_match(sentences) {
        Some(hit) => FieldOutcome::found(hit.value, hit.confidence),
        None => FieldOutcome::found(Sex::All, Confidence::Low),
    }
}

#[cfg(test)]
pub(crate) fn force_tables() -> usize {
    RULES.len()
}
