//! Washout period in days.
//!
//! Day phrasings always take precedence. Week phrasings are low confidence
//! fallbacks evaluated only after every day rule has missed, converted at
//! seven days per week.

use std::sync::LazyLock;

use canonical::CriteriaSentence;
use regex::Captures;

use super::FieldOutcome;
use crate::record::Confidence;
use crate::rule::{first_group, Rule, RuleSet, Scope};

const PRIOR_TREATMENT: &str = r"(?:dose|treatment|therapy|chemotherapy|regimen|systemic|anti-?cancer|radiotherapy|radiation|surgery|immunotherapy|agent)";
const TREATMENT_NOUN: &str = r"(?:therapy|treatment|chemotherapy|radiotherapy|radiation|immunotherapy|agents?|drugs?|surgery)";
const QUALIFIER: &str = r"(?:at\s+least\s+|minimum\s+of\s+|≥\s*|>=\s*)?";

const MAX_DAYS: u32 = 365;

static RULES: LazyLock<RuleSet<u32>> = LazyLock::new(|| {
    RuleSet::new(vec![
        days(
            "washout_period_days",
            format!(r"\bwashout\s+(?:period\s+)?(?:of\s+)?{QUALIFIER}(\d{{1,3}})\s*-?\s*days?\b"),
            Scope::Any,
        ),
        days(
            "days_washout",
            r"\b(\d{1,3})\s*-?\s*days?(?:'|’)?\s+(?:of\s+)?washout\b".to_string(),
            Scope::Any,
        ),
        days(
            "days_since_prior_treatment",
            format!(
                r"\b(\d{{1,3}})\s*days?\s+(?:must\s+have\s+elapsed\s+)?(?:since|after|from|following)\s+(?:the\s+|their\s+)?(?:last|prior|previous|most\s+recent|final|completion\s+of)?\s*(?:[a-z-]+\s+){{0,2}}?{PRIOR_TREATMENT}"
            ),
            Scope::Any,
        ),
        days(
            "treatment_days_before_first_dose",
            format!(
                r"{TREATMENT_NOUN}[^.;]{{0,40}}?{QUALIFIER}(\d{{1,3}})\s*days?\s+(?:prior\s+to|before)\s+(?:the\s+)?(?:first\s+dose|start|initiation|enrollment|randomization|registration|day\s+1)"
            ),
            Scope::Inclusion,
        ),
        days(
            "excluded_treatment_within_days",
            format!(r"{TREATMENT_NOUN}[^.;]{{0,60}}?\bwithin\s+(?:the\s+(?:last|past)\s+)?(\d{{1,3}})\s*days?\b"),
            Scope::Exclusion,
        ),
        weeks(
            "washout_period_weeks",
            format!(r"\bwashout\s+(?:period\s+)?(?:of\s+)?{QUALIFIER}(\d{{1,2}})\s*-?\s*weeks?\b"),
            Scope::Any,
        ),
        weeks(
            "weeks_washout",
            r"\b(\d{1,2})\s*-?\s*weeks?(?:'|’)?\s+(?:of\s+)?washout\b".to_string(),
            Scope::Any,
        ),
        weeks(
            "weeks_since_prior_treatment",
            format!(
                r"\b(\d{{1,2}})\s*weeks?\s+(?:must\s+have\s+elapsed\s+)?(?:since|after|from|following)\s+(?:the\s+|their\s+)?(?:last|prior|previous|most\s+recent|final|completion\s+of)?\s*(?:[a-z-]+\s+){{0,2}}?{PRIOR_TREATMENT}"
            ),
            Scope::Any,
        ),
        weeks(
            "excluded_treatment_within_weeks",
            format!(r"{TREATMENT_NOUN}[^.;]{{0,60}}?\bwithin\s+(?:the\s+(?:last|past)\s+)?(\d{{1,2}})\s*weeks?\b"),
            Scope::Exclusion,
        ),
    ])
});

fn days(name: &'static str, pattern: String, scope: Scope) -> Rule<u32> {
    Rule::new(name, &pattern, scope, Confidence::High, day_count)
}

fn weeks(name: &'static str, pattern: String, scope: Scope) -> Rule<u32> {
    Rule::new(name, &pattern, scope, Confidence::Low, week_count)
}

fn day_count(caps: &Captures<'_>) -> Option<u32> {
    let days: u32 = first_group(caps)?.parse().ok()?;
    (1..=MAX_DAYS).contains(&days).then_some(days)
}

fn week_count(caps: &Captures<'_>) -> Option<u32> {
    let weeks: u32 = first_group(caps)?.parse().ok()?;
    let days = weeks * 7;
    (1..=MAX_DAYS).contains(&days).then_some(days)
}

pub fn extract(sentences: &[CriteriaSentence]) -> FieldOutcome<Option<u32>> {
    FieldOutcome::from_extraction(RULES.first_match(sentences))
}

#[cfg(test)]
pub(crate) fn force_tables() -> usize {
    RULES.len()
}
