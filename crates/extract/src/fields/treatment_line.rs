//! Line-of-therapy setting.

use std::sync::LazyLock;

use canonical::CriteriaSentence;
use regex::Captures;
use serde::{Deserialize, Serialize};

use super::FieldOutcome;
use crate::record::Confidence;
use crate::rule::{Rule, RuleSet, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TreatmentLine {
    FirstLine,
    SecondLine,
    ThirdLinePlus,
    PreviouslyTreated,
    #[default]
    AnyLine,
}

impl TreatmentLine {
    /// Whether a patient with `prior_lines` completed lines fits the setting.
    pub fn admits(self, prior_lines: u32) -> bool {
        match self {
            TreatmentLine::FirstLine => prior_lines == 0,
            TreatmentLine::SecondLine => prior_lines == 1,
            TreatmentLine::ThirdLinePlus => prior_lines >= 2,
            TreatmentLine::PreviouslyTreated => prior_lines >= 1,
            TreatmentLine::AnyLine => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TreatmentLine::FirstLine => "first-line",
            TreatmentLine::SecondLine => "second-line",
            TreatmentLine::ThirdLinePlus => "third-line or later",
            TreatmentLine::PreviouslyTreated => "previously treated",
            TreatmentLine::AnyLine => "any line",
        }
    }
}

static RULES: LazyLock<RuleSet<TreatmentLine>> = LazyLock::new(|| {
    RuleSet::new(vec![
        Rule::new(
            "progressed_after_first_line",
            r"\b(?:progress\w*|relapsed?|recurr\w*)\s+(?:on|after|following|during)\s+(?:one\s+|1\s+)?(?:prior\s+)?(?:first[- ]line|1st[- ]line|frontline|front[- ]line)\b",
            Scope::Inclusion,
            Confidence::High,
            second_line,
        ),
        Rule::new(
            "third_line_or_later",
            r"\b(?:third|3rd|fourth|4th)[- ]line\b|\bheavily\s+pre-?treated\b|\b(?:at\s+least|≥|>=)\s*(?:two|2)\s+prior\b|\bmultiple\s+prior\b|\bsalvage\b|\brelapsed\s+(?:or|and/or|/)\s+refractory\b",
            Scope::Inclusion,
            Confidence::High,
            third_line_plus,
        ),
        Rule::new(
            "first_line",
            r"\b(?:first|1st)[- ]line\b|\bfrontline\b|\btreatment[- ]na[iï]ve\b|\bpreviously\s+untreated\b|\bno\s+prior\s+(?:systemic\s+)?(?:therapy|treatment|chemotherapy)\b|\bchemotherapy[- ]na[iï]ve\b",
            Scope::Inclusion,
            Confidence::High,
            first_line,
        ),
        Rule::new(
            "second_line",
            r"\b(?:second|2nd)[- ]line\b",
            Scope::Inclusion,
            Confidence::High,
            second_line,
        ),
        Rule::new(
            "previously_treated",
            r"\bpreviously\s+treated\b|\bpretreated\b|\bprogress\w*\s+(?:on|after|following)\s+(?:at\s+least\s+(?:one|1)\s+)?(?:prior|previous|standard)\b|\brefractory\s+to\b",
            Scope::Inclusion,
            Confidence::High,
            previously_treated,
        ),
    ])
});

fn first_line(_: &Captures<'_>) -> Option<TreatmentLine> {
    Some(TreatmentLine::FirstLine)
}

fn second_line(_: &Captures<'_>) -> Option<TreatmentLine> {
    Some(TreatmentLine::SecondLine)
}

fn third_line_plus(_: &Captures<'_>) -> Option<TreatmentLine> {
    Some(TreatmentLine::ThirdLinePlus)
}

fn previously_treated(_: &Captures<'_>) -> Option<TreatmentLine> {
    Some(TreatmentLine::PreviouslyTreated)
}

pub fn extract(sentences: &[CriteriaSentence]) -> FieldOutcome<TreatmentLine> {
    match RULES.first_match(sentences) {
        Some(hit) => FieldOutcome::found(hit.value, hit.confidence),
        None => FieldOutcome::found(TreatmentLine::AnyLine, Confidence::Low),
    }
}

#[cfg(test)]
pub(crate) fn force_tables() -> usize {
    RULES.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::testing::sentences;

    fn setting(text: &str) -> TreatmentLine {
        extract(&sentences(text)).value
    }

    #[test]
    fn settings() {
        assert_eq!(setting("Treatment-naive advanced NSCLC"), TreatmentLine::FirstLine);
        assert_eq!(
            setting("No prior systemic therapy for metastatic disease"),
            TreatmentLine::FirstLine
        );
        assert_eq!(setting("Candidates for second-line therapy"), TreatmentLine::SecondLine);
        assert_eq!(setting("Heavily pretreated patients"), TreatmentLine::ThirdLinePlus);
        assert_eq!(
            setting("Disease progression after at least one prior regimen"),
            TreatmentLine::PreviouslyTreated
        );
    }

    #[test]
    fn progression_after_first_line_is_second_line() {
        assert_eq!(
            setting("Disease progression after first-line platinum chemotherapy"),
            TreatmentLine::SecondLine
        );
    }

    #[test]
    fn unmentioned_setting_is_any_line() {
        let outcome = extract(&sentences("Age 18 or older"));
        assert_eq!(outcome.value, TreatmentLine::AnyLine);
        assert_eq!(outcome.confidence, Confidence::Low);
    }

    #[test]
    fn admits_prior_line_counts() {
        assert!(TreatmentLine::FirstLine.admits(0));
        assert!(!TreatmentLine::FirstLine.admits(1));
        assert!(TreatmentLine::ThirdLinePlus.admits(3));
        assert!(TreatmentLine::PreviouslyTreated.admits(1));
        assert!(TreatmentLine::AnyLine.admits(7));
    }
}
