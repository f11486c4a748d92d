//! Disease stage vocabulary.
//!
//! Terms are read from the inclusion section only, in sentence order, and
//! capped. Numeric stages are normalized to roman numerals ("stage 4" becomes
//! "stage iv"); ranges such as "stage ii-iv" expand to every stage they span.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use canonical::{CriteriaSentence, SectionKind};
use regex::Regex;

use super::FieldOutcome;
use crate::record::Confidence;

const ROMAN: [&str; 5] = ["", "i", "ii", "iii", "iv"];

static STAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bstage\s+(iv|iii|ii|i|4|3|2|1)([abc])?(?:\s*(-|–|to|or|/|and|through)\s*(?:stage\s+)?(iv|iii|ii|i|4|3|2|1)([abc])?)?\b",
    )
    .expect("stage pattern compiles")
});

static BARE_STAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(iv|iii|ii|i|4|3|2|1)([abc])?\s*$").expect("bare stage pattern compiles")
});

static ADVANCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(locally\s+)?advanced\b").expect("advanced pattern compiles")
});

static TERMS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("metastatic", r"\bmetastatic\b"),
        (
            "unresectable",
            r"\bunresectable\b|\binoperable\b|\bnot\s+amenable\s+to\s+(?:curative\s+)?(?:surgery|resection)\b",
        ),
        ("recurrent", r"\brecurrent\b|\brecurrence\b"),
        ("refractory", r"\brefractory\b"),
        ("relapsed", r"\brelapsed\b"),
        ("early stage", r"\bearly[- ]stage\b"),
        ("limited stage", r"\blimited[- ]stage\b"),
        ("extensive stage", r"\bextensive[- ]stage\b"),
    ]
    .into_iter()
    .map(|(label, pattern)| {
        let regex = Regex::new(pattern)
            .unwrap_or_else(|err| panic!("stage term `{label}` has an invalid pattern: {err}"));
        (label, regex)
    })
    .collect()
});

fn stage_rank(token: &str) -> Option<usize> {
    match token {
        "i" | "1" => Some(1),
        "ii" | "2" => Some(2),
        "iii" | "3" => Some(3),
        "iv" | "4" => Some(4),
        _ => None,
    }
}

fn stage_label(rank: usize, substage: &str) -> String {
    format!("stage {}{}", ROMAN[rank], substage)
}

fn push_unique(out: &mut Vec<String>, term: String) {
    if !out.contains(&term) {
        out.push(term);
    }
}

fn terms_in(text: &str, out: &mut Vec<String>) {
    for caps in STAGE.captures_iter(text) {
        let Some(first) = caps.get(1).and_then(|m| stage_rank(m.as_str())) else {
            continue;
        };
        let first_sub = caps.get(2).map_or("", |m| m.as_str());
        push_unique(out, stage_label(first, first_sub));

        let last = caps.get(4).and_then(|m| stage_rank(m.as_str()));
        if let (Some(sep), Some(last)) = (caps.get(3), last) {
            if matches!(sep.as_str(), "-" | "–" | "to" | "through") {
                for rank in first + 1..last {
                    push_unique(out, stage_label(rank, ""));
                }
            }
            let last_sub = caps.get(5).map_or("", |m| m.as_str());
            push_unique(out, stage_label(last, last_sub));
        }
    }
    for caps in ADVANCED.captures_iter(text) {
        let term = if caps.get(1).is_some() {
            "locally advanced"
        } else {
            "advanced"
        };
        push_unique(out, term.to_string());
    }
    for (label, regex) in TERMS.iter() {
        if regex.is_match(text) {
            push_unique(out, (*label).to_string());
        }
    }
}

pub fn extract(sentences: &[CriteriaSentence], max_terms: usize) -> FieldOutcome<BTreeSet<String>> {
    let mut found = Vec::new();
    for sentence in sentences
        .iter()
        .filter(|s| s.section == SectionKind::Inclusion)
    {
        terms_in(&sentence.text, &mut found);
    }
    found.truncate(max_terms);

    let confidence = if found.is_empty() {
        Confidence::Low
    } else {
        Confidence::High
    };
    FieldOutcome::found(found.into_iter().collect(), confidence)
}

/// Terms a stage label is interchangeable with for matching purposes.
/// Substages collapse to their stage ("stage iiib" also counts as
/// "stage iii"); "advanced" spans stages iii and iv.
pub fn stage_equivalents(term: &str) -> BTreeSet<String> {
    let mut set = BTreeSet::from([term.to_string()]);
    let base = match term.strip_prefix("stage ") {
        Some(rest) if rest.len() > 1 && rest.ends_with(['a', 'b', 'c']) => {
            format!("stage {}", &rest[..rest.len() - 1])
        }
        _ => term.to_string(),
    };
    let extra: &[&str] = match base.as_str() {
        "stage iv" => &["metastatic"],
        "metastatic" => &["stage iv"],
        "stage iii" => &["locally advanced"],
        "locally advanced" => &["stage iii"],
        "advanced" => &["stage iii", "stage iv", "metastatic", "locally advanced"],
        _ => &[],
    };
    set.extend(extra.iter().map(|s| s.to_string()));
    set.insert(base);
    set
}

/// Normalize a free-form patient stage ("Stage IIIB", "IV", "metastatic")
/// to the same vocabulary the extractor produces.
pub fn normalize_stage_label(label: &str) -> BTreeSet<String> {
    let lowered = label.to_lowercase();
    if let Some(caps) = BARE_STAGE.captures(&lowered) {
        if let Some(rank) = caps.get(1).and_then(|m| stage_rank(m.as_str())) {
            let sub = caps.get(2).map_or("", |m| m.as_str());
            return BTreeSet::from([stage_label(rank, sub)]);
        }
    }
    let mut found = Vec::new();
    terms_in(&lowered, &mut found);
    found.into_iter().collect()
}

/// First trial term that overlaps any patient term once both sides are
/// expanded to their equivalents.
pub fn overlapping_term<'a>(
    patient_terms: &BTreeSet<String>,
    trial_terms: &'a BTreeSet<String>,
) -> Option<&'a str> {
    let patient: BTreeSet<String> = patient_terms
        .iter()
        .flat_map(|t| stage_equivalents(t))
        .collect();
    trial_terms
        .iter()
        .find(|term| stage_equivalents(term).iter().any(|t| patient.contains(t)))
        .map(String::as_str)
}

#[cfg(test)]
pub(crate) fn force_tables() -> usize {
    TERMS.len() + [&*STAGE, &*BARE_STAGE, &*ADVANCED].len()
}
