//! Exclusion resolver for the fixed comorbidity catalog.
//!
//! Resolution is two explicit passes per condition over clauses that mention
//! it. The allowance pass runs first and wins outright: "brain metastases
//! allowed if treated" beats any later, more general exclusion of brain
//! metastases. Only when no un-negated allowance exists does the exclusion
//! pass run. Sentences are split into clauses on contrast words ("but",
//! "however") so an allowance and an exclusion in one sentence are judged
//! separately.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use canonical::{CriteriaSentence, SectionKind};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    BrainMetastases,
    Hiv,
    HepatitisB,
    HepatitisC,
    PriorImmunotherapy,
    AutoimmuneDisease,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::BrainMetastases,
        Condition::Hiv,
        Condition::HepatitisB,
        Condition::HepatitisC,
        Condition::PriorImmunotherapy,
        Condition::AutoimmuneDisease,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::BrainMetastases => "brain_metastases",
            Condition::Hiv => "hiv",
            Condition::HepatitisB => "hepatitis_b",
            Condition::HepatitisC => "hepatitis_c",
            Condition::PriorImmunotherapy => "prior_immunotherapy",
            Condition::AutoimmuneDisease => "autoimmune_disease",
        }
    }

    /// Catalog conditions named by a free-form patient comorbidity, e.g.
    /// `"Hepatitis B"`, `"brain_metastases"` or `"received pembrolizumab"`.
    /// Unknown comorbidities map to nothing.
    pub fn from_comorbidity(comorbidity: &str) -> Vec<Condition> {
        let lowered = comorbidity.trim().to_lowercase();
        if let Some(condition) = Condition::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered.replace([' ', '-'], "_"))
        {
            return vec![condition];
        }
        Condition::ALL
            .into_iter()
            .filter(|c| {
                MENTIONS[c.index()].is_match(&lowered)
                    || (*c == Condition::PriorImmunotherapy && IMMUNOTHERAPY_AGENT.is_match(&lowered))
            })
            .collect()
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExclusionStatus {
    Excluded,
    Allowed,
    /// Not the same as allowed: the text is silent.
    #[default]
    NotMentioned,
}

impl ExclusionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExclusionStatus::Excluded => "EXCLUDED",
            ExclusionStatus::Allowed => "ALLOWED",
            ExclusionStatus::NotMentioned => "NOT_MENTIONED",
        }
    }
}

const IMMUNOTHERAPY_AGENTS: &str = r"(?:immunotherap\w*|immune\s+checkpoint\s+inhibitors?|checkpoint\s+inhibitors?|anti-?pd-?l?1|anti-?ctla-?4|pd-?l?1\s+(?:inhibitors?|blockade|antibod\w*)|nivolumab|pembrolizumab|atezolizumab|durvalumab|avelumab|ipilimumab|cemiplimab|tremelimumab)";

// Indexed by `Condition as usize`.
static MENTIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let immunotherapy = format!(
        r"\b(?:prior|previous|previously|received|receipt\s+of|treatment\s+with|therapy\s+with|exposure\s+to|history\s+of)\b[^.;]{{0,40}}?{IMMUNOTHERAPY_AGENTS}"
    );
    [
        r"\b(?:brain|cns|central\s+nervous\s+system|intracranial|cerebral)\s+(?:metasta\w*|mets|lesions?|involvement)\b|\bleptomeningeal\b",
        r"\bhiv\b|\bhuman\s+immunodeficiency\s+virus\b|\baids\b",
        r"\bhepatitis\s+b\b|\bhbv\b|\bhbsag\b|\bviral\s+hepatitis\b",
        r"\bhepatitis\s+c\b|\bhcv\b|\bhepatitis\s+b\s*(?:,|/|or|and|and/or)\s*(?:hepatitis\s+)?c\b|\bviral\s+hepatitis\b",
        immunotherapy.as_str(),
        r"\bauto-?immune\b|\blupus\b|\brheumatoid\s+arthritis\b|\binflammatory\s+bowel\s+disease\b|\bcrohn|\bulcerative\s+colitis\b|\bmultiple\s+sclerosis\b|\bpsoriasis\b|\bsarcoidosis\b",
    ]
    .iter()
    .map(|pattern| {
        Regex::new(pattern)
            .unwrap_or_else(|err| panic!("condition pattern is invalid: {err}"))
    })
    .collect()
});

static IMMUNOTHERAPY_AGENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(IMMUNOTHERAPY_AGENTS).expect("immunotherapy agent pattern compiles")
});

static CLAUSE_SPLIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:but|however|whereas|although|though|except)\b").expect("clause pattern compiles")
});

static PARENTHETICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([^()]*)\)|\[([^\[\]]*)\]").expect("parenthetical pattern compiles")
});

static ALLOWANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:allowed|permitted|eligible|acceptable|unless|(?:may|can)\s+(?:be\s+)?(?:enroll(?:ed)?|participate|included|considered)|(?:are|is)\s+not\s+excluded)\b",
    )
    .expect("allowance pattern compiles")
});

static NEGATED_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\bnot|\bno|n't|\bnever|\bnor|\bcannot)\s+(?:\w+\s+)?$")
        .expect("negation pattern compiles")
});

static EXPLICIT_EXCLUSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:excluded|ineligible|prohibited|not\s+(?:be\s+)?(?:eligible|allowed|permitted)|must\s+not|without|free\s+of|negative\s+for|absence\s+of|no\s+(?:known|active|history|evidence|prior|previous|current|untreated|symptomatic))\b",
    )
    .expect("exclusion pattern compiles")
});

/// Contrast words split clauses. A parenthetical is its own clause unless it
/// opens with an allowance ("(allowed if treated)"), which qualifies the
/// surrounding text instead.
fn clauses(text: &str) -> Vec<String> {
    let mut main = String::with_capacity(text.len());
    let mut asides = Vec::new();
    let mut last = 0;
    for caps in PARENTHETICAL.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
            continue;
        };
        let inner = inner.as_str();
        main.push_str(&text[last..whole.start()]);
        let qualifies_outer = ALLOWANCE
            .find(inner)
            .is_some_and(|m| inner[..m.start()].trim().is_empty());
        if qualifies_outer {
            main.push(' ');
            main.push_str(inner);
            main.push(' ');
        } else {
            main.push(' ');
            asides.push(inner);
        }
        last = whole.end();
    }
    main.push_str(&text[last..]);

    std::iter::once(main.as_str())
        .chain(asides)
        .flat_map(|part| CLAUSE_SPLIT.split(part))
        .map(str::trim)
        .filter(|clause| !clause.is_empty())
        .map(String::from)
        .collect()
}

fn mentions(condition: Condition, clause: &str) -> bool {
    MENTIONS[condition.index()].is_match(clause)
}

/// An allowance phrase whose preceding words do not negate it.
fn has_allowance(clause: &str) -> bool {
    ALLOWANCE
        .find_iter(clause)
        .any(|m| !NEGATED_TAIL.is_match(&clause[..m.start()]))
}

/// Pass 1: exclusion-section clauses first, then inclusion-section ones.
fn allowance_pass(condition: Condition, sentences: &[CriteriaSentence], scan_inclusion: bool) -> bool {
    let mut sections = vec![SectionKind::Exclusion];
    if scan_inclusion {
        sections.push(SectionKind::Inclusion);
    }
    sections.into_iter().any(|section| {
        sentences
            .iter()
            .filter(|s| s.section == section)
            .flat_map(|s| clauses(&s.text))
            .any(|clause| mentions(condition, &clause) && has_allowance(&clause))
    })
}

/// Pass 2: any exclusion-section mention, or an inclusion-section mention
/// phrased as an exclusion ("no known brain metastases").
fn exclusion_pass(condition: Condition, sentences: &[CriteriaSentence]) -> bool {
    sentences.iter().any(|s| {
        clauses(&s.text).iter().any(|clause| {
            mentions(condition, clause)
                && (s.section == SectionKind::Exclusion || EXPLICIT_EXCLUSION.is_match(clause))
        })
    })
}

pub fn resolve(
    condition: Condition,
    sentences: &[CriteriaSentence],
    scan_inclusion_for_allowance: bool,
) -> ExclusionStatus {
    if allowance_pass(condition, sentences, scan_inclusion_for_allowance) {
        ExclusionStatus::Allowed
    } else if exclusion_pass(condition, sentences) {
        ExclusionStatus::Excluded
    } else {
        ExclusionStatus::NotMentioned
    }
}

/// Status of every catalog condition.
pub fn resolve_all(
    sentences: &[CriteriaSentence],
    scan_inclusion_for_allowance: bool,
) -> BTreeMap<Condition, ExclusionStatus> {
    Condition::ALL
        .into_iter()
        .map(|c| (c, resolve(c, sentences, scan_inclusion_for_allowance)))
        .collect()
}

#[cfg(test)]
pub(crate) fn force_tables() -> usize {
    MENTIONS.len()
        + [
            &*IMMUNOTHERAPY_AGENT,
            &*CLAUSE_SPLIT,
            &*PARENTHETICAL,
            &*ALLOWANCE,
            &*NEGATED_TAIL,
            &*EXPLICIT_EXCLUSION,
        ]
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::testing::sentences;

    fn status(condition: Condition, text: &str) -> ExclusionStatus {
        resolve(condition, &sentences(text), true)
    }

    #[test]
    fn mentions_are_indexed_by_condition() {
        assert_eq!(MENTIONS.len(), Condition::ALL.len());
    }

    #[test]
    fn allowance_beats_exclusion() {
        let text = "Exclusion Criteria:\n- Brain metastases allowed if treated and stable, \
                    otherwise patients with brain metastases are excluded";
        assert_eq!(status(Condition::BrainMetastases, text), ExclusionStatus::Allowed);
    }

    #[test]
    fn allowance_in_another_sentence_still_wins() {
        let text = "Exclusion Criteria:\n- Active brain metastases\n\
                    - Treated brain metastases are permitted";
        assert_eq!(status(Condition::BrainMetastases, text), ExclusionStatus::Allowed);
    }

    #[test]
    fn negated_allowance_does_not_count() {
        let text = "Exclusion Criteria:\n- Patients with HIV are not eligible";
        assert_eq!(status(Condition::Hiv, text), ExclusionStatus::Excluded);
        let text = "Exclusion Criteria:\n- Leptomeningeal disease is not allowed";
        assert_eq!(status(Condition::BrainMetastases, text), ExclusionStatus::Excluded);
    }

    #[test]
    fn contrast_words_split_clauses() {
        let text = "Exclusion Criteria:\n- Hepatitis B is excluded but HIV is permitted";
        let flags = resolve_all(&sentences(text), true);
        assert_eq!(flags[&Condition::HepatitisB], ExclusionStatus::Excluded);
        assert_eq!(flags[&Condition::Hiv], ExclusionStatus::Allowed);
    }

    #[test]
    fn allowance_about_another_subject_stays_in_its_parenthetical() {
        let text = "Exclusion Criteria:\n- Prior anti-PD-1 therapy (prior chemotherapy is allowed)";
        assert_eq!(status(Condition::PriorImmunotherapy, text), ExclusionStatus::Excluded);

        let text = "Exclusion Criteria:\n- Known HIV infection, though hepatitis B carriers are eligible";
        let flags = resolve_all(&sentences(text), true);
        assert_eq!(flags[&Condition::Hiv], ExclusionStatus::Excluded);
        assert_eq!(flags[&Condition::HepatitisB], ExclusionStatus::Allowed);
    }

    #[test]
    fn parenthetical_allowance_qualifies_its_subject() {
        let text = "Exclusion Criteria:\n- Brain metastases (allowed if treated and stable)";
        assert_eq!(status(Condition::BrainMetastases, text), ExclusionStatus::Allowed);

        let text = "Exclusion Criteria:\n- Brain metastases (if treated and stable) are permitted";
        assert_eq!(status(Condition::BrainMetastases, text), ExclusionStatus::Allowed);

        let text = "Exclusion Criteria:\n- Active infection (HIV, hepatitis C)";
        let flags = resolve_all(&sentences(text), true);
        assert_eq!(flags[&Condition::Hiv], ExclusionStatus::Excluded);
        assert_eq!(flags[&Condition::HepatitisC], ExclusionStatus::Excluded);
    }

    #[test]
    fn hepatitis_b_or_c_covers_both() {
        let flags = resolve_all(
            &sentences("Exclusion Criteria:\n- Active hepatitis B or C infection"),
            true,
        );
        assert_eq!(flags[&Condition::HepatitisB], ExclusionStatus::Excluded);
        assert_eq!(flags[&Condition::HepatitisC], ExclusionStatus::Excluded);
        assert_eq!(flags[&Condition::Hiv], ExclusionStatus::NotMentioned);
    }

    #[test]
    fn immunotherapy_needs_treatment_context() {
        let text = "Exclusion Criteria:\n- Prior anti-PD-1 therapy";
        assert_eq!(status(Condition::PriorImmunotherapy, text), ExclusionStatus::Excluded);
        let text = "Exclusion Criteria:\n- Hypersensitivity to pembrolizumab excipients";
        assert_eq!(status(Condition::PriorImmunotherapy, text), ExclusionStatus::NotMentioned);
    }

    #[test]
    fn inclusion_mentions_need_exclusion_phrasing() {
        assert_eq!(
            status(Condition::BrainMetastases, "No known brain metastases"),
            ExclusionStatus::Excluded
        );
        assert_eq!(
            status(
                Condition::PriorImmunotherapy,
                "Progression after prior checkpoint inhibitor therapy"
            ),
            ExclusionStatus::NotMentioned
        );
    }

    #[test]
    fn inclusion_allowance_scan_can_be_disabled() {
        let text = "Patients with treated brain metastases are eligible";
        assert_eq!(status(Condition::BrainMetastases, text), ExclusionStatus::Allowed);
        assert_eq!(
            resolve(Condition::BrainMetastases, &sentences(text), false),
            ExclusionStatus::NotMentioned
        );
    }

    #[test]
    fn silence_is_not_allowance() {
        let flags = resolve_all(&sentences("Age 18 or older"), true);
        assert!(flags.values().all(|s| *s == ExclusionStatus::NotMentioned));
        assert_eq!(flags.len(), Condition::ALL.len());
    }

    #[test]
    fn comorbidity_names() {
        assert_eq!(Condition::from_comorbidity("Brain metastases"), vec![Condition::BrainMetastases]);
        assert_eq!(Condition::from_comorbidity("hepatitis_c"), vec![Condition::HepatitisC]);
        assert_eq!(Condition::from_comorbidity("HIV"), vec![Condition::Hiv]);
        assert_eq!(
            Condition::from_comorbidity("Pembrolizumab 2022"),
            vec![Condition::PriorImmunotherapy]
        );
        assert_eq!(Condition::from_comorbidity("Lupus"), vec![Condition::AutoimmuneDisease]);
        assert!(Condition::from_comorbidity("hypertension").is_empty());
    }
}
