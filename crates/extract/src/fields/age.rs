//! Age bounds.
//!
//! Range phrasings ("between 18 and 75 years", "aged 18-70") are tried
//! first. Otherwise independent minimum and maximum tables run. Month, week
//! and day units convert to fractional years. A minimum above the maximum
//! drops both bounds.
//!
//! A bare comparison such as "> 5 years" only counts as an age when the
//! phrase itself says so ("of age", "old", "older than"). Sentences about
//! intervals (disease-free time, time since diagnosis, prior treatment) are
//! skipped unless they name age explicitly.

use std::sync::LazyLock;

use canonical::CriteriaSentence;
use regex::{Captures, Regex};

use super::{weakest, FieldOutcome};
use crate::record::Confidence;
use crate::rule::{Rule, RuleSet, Scope};

const NUM: &str = r"(\d{1,3}(?:\.\d+)?)";
const YEARS: &str = r"(years?|yrs?)";
const ANY_UNIT: &str = r"(years?|yrs?|months?|weeks?|days?)";
const AGE_CONTEXT: &str = r"\bage[ds]?\b[^.;\d]{0,20}?";
const OF_AGE: &str = r"\s*(?:of\s+age|old)\b";

const MAX_AGE_YEARS: f32 = 120.0;

/// Age bounds in years.
pub type AgeBounds = (Option<f32>, Option<f32>);

static RANGE_RULES: LazyLock<RuleSet<(f32, f32)>> = LazyLock::new(|| {
    RuleSet::new(vec![
        Rule::new(
            "age_context_unit_range",
            &format!(r"{AGE_CONTEXT}{NUM}\s*{ANY_UNIT}\s*(?:-|–|to)\s*{NUM}\s*{ANY_UNIT}"),
            Scope::Inclusion,
            Confidence::High,
            unit_range_value,
        ),
        range(
            "age_context_range",
            format!(r"{AGE_CONTEXT}{NUM}\s*(?:-|–|to)\s*{NUM}(?:\s*{ANY_UNIT})?"),
        ),
        range(
            "between_years",
            format!(r"\bbetween\s+{NUM}\s*(?:years?\s*)?and\s+{NUM}\s*{YEARS}"),
        ),
        range(
            "span_years_of_age",
            format!(r"\b{NUM}\s*(?:-|–|to)\s*{NUM}\s*{YEARS}\s*(?:of\s+age|old)"),
        ),
    ])
});

static MIN_RULES: LazyLock<RuleSet<f32>> = LazyLock::new(|| {
    RuleSet::new(vec![
        bound(
            "age_context_ge",
            format!(r"{AGE_CONTEXT}(?:≥|>=|=>)\s*{NUM}(?:\s*{ANY_UNIT})?"),
            Scope::Inclusion,
            Confidence::High,
        ),
        bound(
            "ge_years_of_age",
            format!(r"(?:≥|>=|=>)\s*{NUM}\s*{YEARS}{OF_AGE}"),
            Scope::Inclusion,
            Confidence::High,
        ),
        bound(
            "age_context_at_least",
            format!(r"{AGE_CONTEXT}(?:at\s+least|minimum(?:\s+of)?)\s+{NUM}(?:\s*{ANY_UNIT})?"),
            Scope::Inclusion,
            Confidence::High,
        ),
        bound(
            "minimum_age",
            format!(r"\bminimum\s+age(?:\s+of)?\s*:?\s*{NUM}(?:\s*{ANY_UNIT})?"),
            Scope::Inclusion,
            Confidence::High,
        ),
        bound(
            "at_least_years_of_age",
            format!(r"\bat\s+least\s+{NUM}\s*{YEARS}{OF_AGE}"),
            Scope::Inclusion,
            Confidence::High,
        ),
        bound(
            "years_and_older",
            format!(r"\b{NUM}\s*{YEARS}\s*(?:of\s+age\s*)?(?:and|or)\s+(?:older|over|above|greater)"),
            Scope::Inclusion,
            Confidence::High,
        ),
        bound(
            "age_context_and_older",
            format!(r"{AGE_CONTEXT}{NUM}\s*(?:and|or)\s+(?:older|over|above)"),
            Scope::Inclusion,
            Confidence::High,
        ),
        bound(
            "older_than_years",
            format!(r"\bolder\s+than\s*{NUM}\s*{YEARS}"),
            Scope::Inclusion,
            Confidence::Low,
        ),
        bound(
            "over_years_of_age",
            format!(r"(?:\bover|\babove|>)\s*{NUM}\s*{YEARS}{OF_AGE}"),
            Scope::Inclusion,
            Confidence::Low,
        ),
        bound(
            "excluded_younger_than",
            format!(r"\byounger\s+than\s*{NUM}\s*{YEARS}"),
            Scope::Exclusion,
            Confidence::Low,
        ),
        bound(
            "excluded_under_years_of_age",
            format!(r"(?:\bunder|\bbelow|\bless\s+than|<)\s*{NUM}\s*{YEARS}{OF_AGE}"),
            Scope::Exclusion,
            Confidence::Low,
        ),
        bound(
            "excluded_age_context_under",
            format!(r"{AGE_CONTEXT}(?:<|younger\s+than|under|below|less\s+than)\s*{NUM}"),
            Scope::Exclusion,
            Confidence::Low,
        ),
    ])
});

static MAX_RULES: LazyLock<RuleSet<f32>> = LazyLock::new(|| {
    RuleSet::new(vec![
        bound(
            "age_context_le",
            format!(r"{AGE_CONTEXT}(?:≤|<=|=<)\s*{NUM}(?:\s*{ANY_UNIT})?"),
            Scope::Inclusion,
            Confidence::High,
        ),
        bound(
            "le_years_of_age",
            format!(r"(?:≤|<=|=<)\s*{NUM}\s*{YEARS}{OF_AGE}"),
            Scope::Inclusion,
            Confidence::High,
        ),
        bound(
            "no_older_than",
            format!(r"\b(?:no|not)\s+older\s+than\s+{NUM}(?:\s*{YEARS})?"),
            Scope::Inclusion,
            Confidence::High,
        ),
        bound(
            "age_context_at_most",
            format!(r"{AGE_CONTEXT}(?:up\s+to|at\s+most|maximum(?:\s+of)?)\s+{NUM}(?:\s*{ANY_UNIT})?"),
            Scope::Inclusion,
            Confidence::High,
        ),
        bound(
            "years_and_younger",
            format!(r"\b{NUM}\s*{YEARS}\s*(?:of\s+age\s*)?(?:and|or)\s+(?:younger|under|below|less)"),
            Scope::Inclusion,
            Confidence::High,
        ),
        bound(
            "younger_than_years",
            format!(r"\byounger\s+than\s+{NUM}\s*{YEARS}"),
            Scope::Inclusion,
            Confidence::Low,
        ),
        bound(
            "under_years_of_age",
            format!(r"(?:\bunder|\bbelow)\s+{NUM}\s*{YEARS}{OF_AGE}"),
            Scope::Inclusion,
            Confidence::Low,
        ),
        bound(
            "excluded_older_than",
            format!(r"\bolder\s+than\s*{NUM}\s*{YEARS}"),
            Scope::Exclusion,
            Confidence::Low,
        ),
        bound(
            "excluded_over_years_of_age",
            format!(r"(?:\bover|\babove|>)\s*{NUM}\s*{YEARS}{OF_AGE}"),
            Scope::Exclusion,
            Confidence::Low,
        ),
        bound(
            "excluded_age_context_over",
            format!(r"{AGE_CONTEXT}(?:>|older\s+than|over|above)\s*{NUM}"),
            Scope::Exclusion,
            Confidence::Low,
        ),
    ])
});

// Phrases whose durations are intervals, not ages.
static INTERVAL_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bdisease[- ]free\b|\bsince\b|\bago\b|\bfrom\s+(?:initial\s+|first\s+)?diagnosis\b|\bprior\b|\blife\s+expectancy\b|\bsurvival\b|\bremission\b",
    )
    .expect("interval context pattern compiles")
});

static EXPLICIT_AGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bage[ds]?\b|\b(?:years?|yrs?)\s+(?:of\s+age|old)\b|\b(?:older|younger)\s+than\b")
        .expect("explicit age pattern compiles")
});

static REGISTRY_AGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d{1,3}(?:\.\d+)?)\s*(years?|months?|weeks?|days?|hours?|minutes?)?\s*$")
        .expect("registry age pattern compiles")
});

fn range(name: &'static str, pattern: String) -> Rule<(f32, f32)> {
    Rule::new(name, &pattern, Scope::Inclusion, Confidence::High, range_value)
}

fn bound(name: &'static str, pattern: String, scope: Scope, confidence: Confidence) -> Rule<f32> {
    Rule::new(name, &pattern, scope, confidence, bound_value)
}

fn range_value(caps: &Captures<'_>) -> Option<(f32, f32)> {
    let unit = caps.get(3).map(|m| m.as_str());
    let low = to_years(caps.get(1)?.as_str().parse().ok()?, unit);
    let high = to_years(caps.get(2)?.as_str().parse().ok()?, unit);
    (low <= high && high <= MAX_AGE_YEARS).then_some((low, high))
}

fn unit_range_value(caps: &Captures<'_>) -> Option<(f32, f32)> {
    let low = to_years(caps.get(1)?.as_str().parse().ok()?, caps.get(2).map(|m| m.as_str()));
    let high = to_years(caps.get(3)?.as_str().parse().ok()?, caps.get(4).map(|m| m.as_str()));
    (low <= high && high <= MAX_AGE_YEARS).then_some((low, high))
}

fn bound_value(caps: &Captures<'_>) -> Option<f32> {
    let years = to_years(caps.get(1)?.as_str().parse().ok()?, caps.get(2).map(|m| m.as_str()));
    (years <= MAX_AGE_YEARS).then_some(years)
}

/// Convert a value with an optional unit word to years.
pub fn to_years(value: f32, unit: Option<&str>) -> f32 {
    let unit = unit.unwrap_or("years").to_ascii_lowercase();
    if unit.starts_with("month") {
        value / 12.0
    } else if unit.starts_with("week") {
        value / 52.0
    } else if unit.starts_with("day") {
        value / 365.0
    } else if unit.starts_with("hour") {
        value / (365.0 * 24.0)
    } else if unit.starts_with("minute") {
        value / (365.0 * 24.0 * 60.0)
    } else {
        value
    }
}

/// Parse a structured registry age such as `"18 Years"` or `"6 Months"`.
///
/// `"N/A"`, empty strings and unknown units yield `None`.
pub fn parse_registry_age(value: &str) -> Option<f32> {
    let caps = REGISTRY_AGE.captures(value)?;
    let amount: f32 = caps.get(1)?.as_str().parse().ok()?;
    Some(to_years(amount, caps.get(2).map(|m| m.as_str())))
}

/// Sentences that may state an age: interval phrasings are dropped unless
/// they also name age outright.
fn age_sentences(sentences: &[CriteriaSentence]) -> Vec<CriteriaSentence> {
    sentences
        .iter()
        .filter(|s| !INTERVAL_CONTEXT.is_match(&s.text) || EXPLICIT_AGE.is_match(&s.text))
        .cloned()
        .collect()
}

pub fn extract(sentences: &[CriteriaSentence]) -> FieldOutcome<AgeBounds> {
    let sentences = &age_sentences(sentences);
    if let Some(hit) = RANGE_RULES.first_match(sentences) {
        let (low, high) = hit.value;
        return FieldOutcome::found((Some(low), Some(high)), hit.confidence);
    }

    let min = MIN_RULES.first_match(sentences);
    let max = MAX_RULES.first_match(sentences);
    let confidence = match (&min, &max) {
        (None, None) => Confidence::Low,
        (Some(a), Some(b)) => weakest(a.confidence, b.confidence),
        (Some(hit), None) | (None, Some(hit)) => hit.confidence,
    };
    let bounds = (min.map(|h| h.value), max.map(|h| h.value));

    match bounds {
        (Some(low), Some(high)) if low > high => FieldOutcome {
            value: (None, None),
            confidence: Confidence::Low,
            degraded: Some("age minimum exceeds maximum"),
        },
        _ => FieldOutcome::found(bounds, confidence),
    }
}

#[cfg(test)]
pub(crate) fn force_tables() -> usize {
    RANGE_RULES.len() + MIN_RULES.len() + MAX_RULES.len()
}
