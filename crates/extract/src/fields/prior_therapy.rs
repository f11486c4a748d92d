//! Bounds on the number of prior lines of therapy.
//!
//! Counts are only read when followed by a therapy noun phrase ("2 prior
//! lines", "one previous regimen"), which keeps durations such as
//! "4 weeks since prior therapy" out. Counts may be written as words up to
//! ten.

use std::sync::LazyLock;

use canonical::CriteriaSentence;
use regex::Captures;

use super::{weakest, FieldOutcome};
use crate::record::Confidence;
use crate::rule::{first_group, parse_count, Rule, RuleSet, Scope, COUNT};

/// Either "prior/previous ... therapy noun" or "... lines/regimens".
const NOUN: &str = r"\s+(?:(?:prior|previous)\s+(?:[a-z-]+\s+){0,3}?(?:lines?|regimens?|therap(?:y|ies)|treatments?|chemotherap(?:y|ies)|agents?)|(?:[a-z-]+\s+){0,2}?(?:lines?|regimens?))\b";

const AT_MOST: &str = r"(?:\bno\s+more\s+than|\bnot\s+more\s+than|\bmaximum\s+of|\bmax\.?|\bup\s+to|\bat\s+most|≤|<=)";
const AT_LEAST: &str = r"(?:\bat\s+least|\bminimum\s+of|≥|>=)";

pub type TherapyBounds = (Option<u32>, Option<u32>);

static RANGE_RULES: LazyLock<RuleSet<(u32, u32)>> = LazyLock::new(|| {
    RuleSet::new(vec![
        Rule::new(
            "count_range",
            &format!(r"\b{COUNT}\s*(?:-|–|to)\s*{COUNT}{NOUN}"),
            Scope::Inclusion,
            Confidence::High,
            ordered_pair,
        ),
        Rule::new(
            "between_counts",
            &format!(r"\bbetween\s+{COUNT}\s+and\s+{COUNT}{NOUN}"),
            Scope::Inclusion,
            Confidence::High,
            ordered_pair,
        ),
        Rule::new(
            "at_least_and_at_most",
            &format!(r"{AT_LEAST}\s*{COUNT}\s+(?:and|but)\s+{AT_MOST}\s*{COUNT}{NOUN}"),
            Scope::Inclusion,
            Confidence::High,
            ordered_pair,
        ),
    ])
});

static MAX_RULES: LazyLock<RuleSet<u32>> = LazyLock::new(|| {
    RuleSet::new(vec![
        Rule::new(
            "at_most",
            &format!(r"{AT_MOST}\s*{COUNT}{NOUN}"),
            Scope::Any,
            Confidence::High,
            count,
        ),
        Rule::new(
            "or_fewer",
            &format!(
                r"\b{COUNT}\s+or\s+(?:fewer|less)\s+(?:[a-z-]+\s+){{0,3}}?(?:prior|previous|lines?|regimens?|therap(?:y|ies))\b"
            ),
            Scope::Any,
            Confidence::High,
            count,
        ),
        Rule::new(
            "excluded_more_than",
            &format!(r"(\bno\s+|\bnot\s+)?(?:\bmore\s+than|\bgreater\s+than|>)\s*{COUNT}{NOUN}"),
            Scope::Exclusion,
            Confidence::High,
            unnegated_count,
        ),
        Rule::new(
            "excluded_or_more",
            &format!(r"\b{COUNT}\s+or\s+more{NOUN}"),
            Scope::Exclusion,
            Confidence::High,
            count_below,
        ),
        Rule::new(
            "excluded_at_least",
            &format!(r"{AT_LEAST}\s*{COUNT}{NOUN}"),
            Scope::Exclusion,
            Confidence::High,
            count_below,
        ),
    ])
});

static MIN_RULES: LazyLock<RuleSet<u32>> = LazyLock::new(|| {
    RuleSet::new(vec![
        Rule::new(
            "at_least",
            &format!(r"{AT_LEAST}\s*{COUNT}{NOUN}"),
            Scope::Inclusion,
            Confidence::High,
            count,
        ),
        Rule::new(
            "or_more",
            &format!(r"\b{COUNT}\s+or\s+more{NOUN}"),
            Scope::Inclusion,
            Confidence::High,
            count,
        ),
        Rule::new(
            "more_than",
            &format!(r"(\bno\s+|\bnot\s+)?(?:\bmore\s+than|\bgreater\s+than|>)\s*{COUNT}{NOUN}"),
            Scope::Inclusion,
            Confidence::Low,
            unnegated_count_above,
        ),
        // A bare "2 prior lines" reads as a minimum, unless a bound word
        // sits right before it and another rule owns the phrase.
        Rule::new(
            "n_prior",
            &format!(
                r"(no\s+more\s+than|not\s+more\s+than|up\s+to|maximum(?:\s+of)?|max\.?|at\s+most|≤|<=|[-–]|\bto|than|least|between|and)?\s*\b{COUNT}\s+(?:prior|previous)\s+(?:[a-z-]+\s+){{0,3}}?(?:lines?|regimens?|therap(?:y|ies)|treatments?|chemotherap(?:y|ies))\b"
            ),
            Scope::Inclusion,
            Confidence::Low,
            unnegated_count,
        ),
    ])
});

fn count(caps: &Captures<'_>) -> Option<u32> {
    parse_count(first_group(caps)?)
}

fn ordered_pair(caps: &Captures<'_>) -> Option<(u32, u32)> {
    let low = parse_count(caps.get(1)?.as_str())?;
    let high = parse_count(caps.get(2)?.as_str())?;
    (low <= high).then_some((low, high))
}

/// Group 1 is a bound word or negation that belongs to another rule.
fn unnegated_count(caps: &Captures<'_>) -> Option<u32> {
    if caps.get(1).is_some() {
        return None;
    }
    parse_count(caps.get(2)?.as_str())
}

fn unnegated_count_above(caps: &Captures<'_>) -> Option<u32> {
    unnegated_count(caps).map(|n| n + 1)
}

/// "3 or more prior lines" excluded means at most 2.
fn count_below(caps: &Captures<'_>) -> Option<u32> {
    count(caps)?.checked_sub(1)
}

pub fn extract(sentences: &[CriteriaSentence]) -> FieldOutcome<TherapyBounds> {
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
            degraded: Some("prior therapy minimum exceeds maximum"),
        },
        _ => FieldOutcome::found(bounds, confidence),
    }
}

#[cfg(test)]
pub(crate) fn force_tables() -> usize {
    RANGE_RULES.len() + MAX_RULES.len() + MIN_RULES.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::testing::sentences;

    fn bounds(text: &str) -> TherapyBounds {
        extract(&sentences(text)).value
    }

    #[test]
    fn upper_bounds() {
        assert_eq!(bounds("No more than 2 prior lines of systemic therapy"), (None, Some(2)));
        assert_eq!(bounds("Up to three prior regimens are allowed"), (None, Some(3)));
        assert_eq!(bounds("2 or fewer prior therapies"), (None, Some(2)));
    }

    #[test]
    fn lower_bounds() {
        assert_eq!(
            bounds("At least one prior platinum-based chemotherapy regimen"),
            (Some(1), None)
        );
        assert_eq!(bounds("2 or more prior lines of therapy"), (Some(2), None));
    }

    #[test]
    fn ranges() {
        assert_eq!(bounds("Received 1-3 prior regimens"), (Some(1), Some(3)));
        assert_eq!(
            bounds("At least 1 and no more than 3 prior lines of therapy"),
            (Some(1), Some(3))
        );
    }

    #[test]
    fn exclusion_phrasings_become_maximums() {
        assert_eq!(
            bounds("Exclusion Criteria:\n- More than 3 prior lines of therapy"),
            (None, Some(3))
        );
        assert_eq!(
            bounds("Exclusion Criteria:\n- 3 or more prior lines of therapy"),
            (None, Some(2))
        );
    }

    #[test]
    fn weak_phrasings_are_low_confidence() {
        let outcome = extract(&sentences("Received more than 1 prior regimen"));
        assert_eq!(outcome.value, (Some(2), None));
        assert_eq!(outcome.confidence, Confidence::Low);

        let outcome = extract(&sentences("Patients with 2 prior lines of therapy"));
        assert_eq!(outcome.value, (Some(2), None));
        assert_eq!(outcome.confidence, Confidence::Low);
    }

    #[test]
    fn durations_are_not_counts() {
        assert_eq!(bounds("At least 4 weeks since prior therapy"), (None, None));
    }

    #[test]
    fn inverted_bounds_degrade() {
        let outcome = extract(&sentences(
            "At least 3 prior lines of therapy; no more than 1 prior line of therapy",
        ));
        assert_eq!(outcome.value, (None, None));
        assert!(outcome.degraded.is_some());
    }
}
