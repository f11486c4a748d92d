//! ECOG performance-status ceiling.
//!
//! Several rules capture more than one digit group, one per phrasing in an
//! alternation. The extractor takes the first group that participated and
//! holds a valid grade (0 to 4), not the first digit by text position. This
//! prefers the intended upper bound and is a heuristic, pinned down by the
//! regression corpus in `tests/corpus.rs`. Karnofsky scores are a low
//! confidence fallback.

use std::sync::LazyLock;

use canonical::CriteriaSentence;
use regex::Captures;

use super::FieldOutcome;
use crate::record::Confidence;
use crate::rule::{first_group, Rule, RuleSet, Scope};

const ECOG_CONTEXT: &str = r"(?:\becog\b|\bperformance\s+status\b|\bps\b)[^.;\d]{0,30}?";

pub const MAX_GRADE: u8 = 4;

static RULES: LazyLock<RuleSet<u8>> = LazyLock::new(|| {
    RuleSet::new(vec![
        ecog(
            "ecog_le",
            r"(?:≤|<=|=<|less\s+than\s+or\s+equal\s+to)\s*(\d)\b",
            Scope::Inclusion,
            Confidence::High,
            first_valid_grade,
        ),
        ecog(
            "ecog_upper_bound",
            r"(?:\b0\s*(?:-|–|—|to)\s*(\d)\b|\bbetween\s+0\s+and\s+(\d)\b|\b0\s*(?:,\s*1\s*,?\s*)?(?:or|and)\s+(\d)\b)",
            Scope::Inclusion,
            Confidence::High,
            first_valid_grade,
        ),
        ecog(
            "ecog_or_less",
            r"\b(\d)\s+or\s+(?:less|lower|below|better)\b",
            Scope::Inclusion,
            Confidence::High,
            first_valid_grade,
        ),
        ecog(
            "ecog_lt",
            r"(?:<|\bless\s+than)\s*(\d)\b",
            Scope::Inclusion,
            Confidence::High,
            grade_below,
        ),
        ecog(
            "excluded_ecog_ge",
            r"(?:≥|>=|=>)\s*(\d)\b",
            Scope::Exclusion,
            Confidence::High,
            grade_below,
        ),
        ecog(
            "excluded_ecog_gt",
            r"(?:>|\bgreater\s+than)\s*(\d)\b",
            Scope::Exclusion,
            Confidence::High,
            first_valid_grade,
        ),
        ecog(
            "excluded_ecog_or_higher",
            r"\b(\d)\s+or\s+(?:higher|greater|more|worse|above)\b",
            Scope::Exclusion,
            Confidence::High,
            grade_below,
        ),
        Rule::new(
            "ecog_single_grade",
            r"\becog(?:\s+performance\s+status)?(?:\s+ps)?(?:\s+score)?\s*(?:of\s+)?(\d)\b",
            Scope::Inclusion,
            Confidence::Low,
            first_valid_grade,
        ),
        Rule::new(
            "karnofsky",
            r"(?:\bkarnofsky\b|\bkps\b)[^.;\d]{0,30}?(?:≥|>=|>|\bat\s+least|\bof\s+at\s+least)?\s*(\d{2,3})\s*%?",
            Scope::Inclusion,
            Confidence::Low,
            karnofsky_to_ecog,
        ),
    ])
});

fn ecog(
    name: &'static str,
    tail: &str,
    scope: Scope,
    confidence: Confidence,
    extract: fn(&Captures<'_>) -> Option<u8>,
) -> Rule<u8> {
    Rule::new(name, &format!("{ECOG_CONTEXT}{tail}"), scope, confidence, extract)
}

/// First participating capture group that parses as a valid grade.
fn first_valid_grade(caps: &Captures<'_>) -> Option<u8> {
    caps.iter()
        .skip(1)
        .flatten()
        .filter_map(|m| m.as_str().parse::<u8>().ok())
        .find(|grade| *grade <= MAX_GRADE)
}

/// Strict bound: "< 2" admits up to 1.
fn grade_below(caps: &Captures<'_>) -> Option<u8> {
    let grade: u8 = first_group(caps)?.parse().ok()?;
    (1..=MAX_GRADE + 1).contains(&grade).then(|| grade - 1)
}

fn karnofsky_to_ecog(caps: &Captures<'_>) -> Option<u8> {
    let score: u8 = first_group(caps)?.parse().ok()?;
    match score {
        90..=100 => Some(0),
        70..=89 => Some(1),
        50..=69 => Some(2),
        30..=49 => Some(3),
        10..=29 => Some(4),
        _ => None,
    }
}

pub fn extract(sentences: &[CriteriaSentence]) -> FieldOutcome<Option<u8>> {
    FieldOutcome::from_extraction(RULES.first_match(sentences))
}

#[cfg(test)]
pub(crate) fn force_tables() -> usize {
    RULES.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::testing::sentences;

    fn ecog_max(text: &str) -> Option<u8> {
        extract(&sentences(text)).value
    }

    #[test]
    fn upper_bound_phrasings() {
        assert_eq!(ecog_max("ECOG performance status 0-1"), Some(1));
        assert_eq!(ecog_max("ECOG PS ≤2"), Some(2));
        assert_eq!(ecog_max("ECOG performance status ≤ 1"), Some(1));
        assert_eq!(ecog_max("ECOG 0 or 1"), Some(1));
        assert_eq!(ecog_max("Performance status of 0 or 1"), Some(1));
        assert_eq!(ecog_max("ECOG performance status between 0 and 2"), Some(2));
        assert_eq!(ecog_max("ECOG 0, 1, or 2"), Some(2));
        assert_eq!(ecog_max("ECOG 2 or less"), Some(2));
        assert_eq!(ecog_max("ECOG < 2"), Some(1));
    }

    #[test]
    fn invalid_grades_are_declined() {
        // Grade 7 is not an ECOG grade: the first match is declined and the
        // next match in the same sentence supplies the bound.
        assert_eq!(ecog_max("ECOG 0-7 or ECOG 0-2"), Some(2));
    }

    #[test]
    fn exclusion_section_phrasings() {
        assert_eq!(ecog_max("Exclusion Criteria:\n- ECOG ≥ 2"), Some(1));
        assert_eq!(ecog_max("Exclusion Criteria:\n- ECOG performance status > 2"), Some(2));
        assert_eq!(ecog_max("Exclusion Criteria:\n- ECOG 3 or higher"), Some(2));
    }

    #[test]
    fn karnofsky_fallback_is_low_confidence() {
        let outcome = extract(&sentences("Karnofsky performance status ≥ 70%"));
        assert_eq!(outcome.value, Some(1));
        assert_eq!(outcome.confidence, Confidence::Low);
    }

    #[test]
    fn unrelated_digits_are_ignored() {
        assert_eq!(ecog_max("Adequate organ function within 14 days"), None);
    }
}
