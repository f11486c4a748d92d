//! Biomarker requirements.
//!
//! Each sentence is scanned for vocabulary mentions. A mention's polarity
//! comes from, in order: a `+`/`-` sign glued to it, the ordered polarity
//! word rules applied to the text up to the next clause break, the polarity
//! of the next mention when only a connector separates them
//! ("EGFR, ALK or ROS1 negative"), a "positive for"/"mutations in" phrase
//! just before it, and finally the vocabulary entry's implied polarity
//! (MSI-H is positive by definition). Mentions without any polarity are not
//! requirements.
//!
//! Positive or mutated mentions in the exclusion section become negative
//! requirements: "Exclusion: known EGFR mutation" means the patient must not
//! carry one.
//!
//! A ceiling on PD-L1 or TMB ("PD-L1 expression < 1%") describes
//! marker-low tumours. In the inclusion section that is a negative
//! requirement; in the exclusion section the trial wants the marker present
//! at or above the ceiling.
//!
//! A vocabulary pattern may wrap the gene token in capture group 1 when it
//! needs trailing context to tell a gene from an ordinary word ("MET
//! amplification" versus "criteria met"). The mention then ends at the gene.

use std::fmt;
use std::sync::LazyLock;

use canonical::{CriteriaSentence, SectionKind};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::FieldOutcome;
use crate::record::Confidence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Biomarker {
    #[serde(rename = "EGFR")]
    Egfr,
    #[serde(rename = "ALK")]
    Alk,
    #[serde(rename = "ROS1")]
    Ros1,
    #[serde(rename = "PD-L1")]
    PdL1,
    #[serde(rename = "HER2")]
    Her2,
    #[serde(rename = "BRCA1")]
    Brca1,
    #[serde(rename = "BRCA2")]
    Brca2,
    /// "BRCA" or "BRCA1/2": either gene.
    #[serde(rename = "BRCA")]
    Brca,
    #[serde(rename = "MSI-H")]
    MsiH,
    #[serde(rename = "KRAS")]
    Kras,
    #[serde(rename = "BRAF")]
    Braf,
    #[serde(rename = "MET")]
    Met,
    #[serde(rename = "RET")]
    Ret,
    #[serde(rename = "NTRK")]
    Ntrk,
    #[serde(rename = "IDH")]
    Idh,
    #[serde(rename = "MGMT")]
    Mgmt,
    #[serde(rename = "TMB")]
    Tmb,
}

impl Biomarker {
    pub fn as_str(self) -> &'static str {
        match self {
            Biomarker::Egfr => "EGFR",
            Biomarker::Alk => "ALK",
            Biomarker::Ros1 => "ROS1",
            Biomarker::PdL1 => "PD-L1",
            Biomarker::Her2 => "HER2",
            Biomarker::Brca1 => "BRCA1",
            Biomarker::Brca2 => "BRCA2",
            Biomarker::Brca => "BRCA",
            Biomarker::MsiH => "MSI-H",
            Biomarker::Kras => "KRAS",
            Biomarker::Braf => "BRAF",
            Biomarker::Met => "MET",
            Biomarker::Ret => "RET",
            Biomarker::Ntrk => "NTRK",
            Biomarker::Idh => "IDH",
            Biomarker::Mgmt => "MGMT",
            Biomarker::Tmb => "TMB",
        }
    }

    /// Whether a patient finding for `other` speaks to a requirement on
    /// `self`. Generic BRCA covers either gene in both directions.
    pub fn covers(self, other: Biomarker) -> bool {
        use Biomarker::{Brca, Brca1, Brca2};
        self == other
            || (self == Brca && matches!(other, Brca1 | Brca2))
            || (matches!(self, Brca1 | Brca2) && other == Brca)
    }

    /// Numeric cutoffs are only tracked for these.
    pub fn takes_threshold(self) -> bool {
        matches!(self, Biomarker::PdL1 | Biomarker::Tmb)
    }
}

impl fmt::Display for Biomarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Polarity {
    Positive,
    Negative,
    Mutated,
    WildType,
}

impl Polarity {
    /// Positive and mutated findings both mean the marker is present.
    pub fn is_present(self) -> bool {
        matches!(self, Polarity::Positive | Polarity::Mutated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
            Polarity::Mutated => "mutated",
            Polarity::WildType => "wild-type",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomarkerRequirement {
    pub biomarker: Biomarker,
    pub polarity: Polarity,
    /// Minimum value, e.g. PD-L1 TPS 50 (%) or TMB 10 (mut/Mb).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f32>,
}

impl fmt::Display for BiomarkerRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.biomarker, self.polarity)?;
        if let Some(threshold) = self.threshold {
            write!(f, " (≥ {threshold})")?;
        }
        Ok(())
    }
}

/// One biomarker finding from a patient profile, e.g. `"EGFR exon 19 del"`
/// or `"PD-L1 80%"`.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientMarker {
    pub biomarker: Biomarker,
    pub polarity: Polarity,
    pub value: Option<f32>,
}

struct Vocabulary {
    biomarker: Biomarker,
    regex: Regex,
    implied: Option<Polarity>,
}

fn entry(biomarker: Biomarker, pattern: &str, implied: Option<Polarity>) -> Vocabulary {
    Vocabulary {
        biomarker,
        regex: Regex::new(pattern)
            .unwrap_or_else(|err| panic!("{biomarker} vocabulary pattern is invalid: {err}")),
        implied,
    }
}

static VOCABULARY: LazyLock<Vec<Vocabulary>> = LazyLock::new(|| {
    use Biomarker::*;
    vec![
        entry(Egfr, r"\begfr\b", None),
        entry(Alk, r"\balk\b", None),
        entry(Ros1, r"\bros-?1\b", None),
        entry(PdL1, r"\bpd-?l1\b", None),
        entry(Her2, r"\bher-?2(?:/neu)?\b|\berbb-?2\b", None),
        entry(Brca, r"\bbrca(?:\s*1\s*/\s*2)?\b", None),
        entry(Brca1, r"\bbrca-?1\b", None),
        entry(Brca2, r"\bbrca-?2\b", None),
        entry(
            MsiH,
            r"\bmsi-?h(?:igh)?\b|\bmsi\s+high\b|\bdmmr\b|\bmmr[- ]deficien\w*|\bmismatch\s+repair[- ]deficien\w*|\bdeficient\s+mismatch\s+repair\b|\bmicrosatellite\s+instability[- ]high\b|\bhigh\s+microsatellite\s+instability\b",
            Some(Polarity::Positive),
        ),
        entry(
            MsiH,
            r"\bmss\b|\bmicrosatellite[- ]stable\b|\bpmmr\b|\bmismatch\s+repair[- ]proficient\b",
            Some(Polarity::Negative),
        ),
        entry(Kras, r"\bkras\b", None),
        entry(Braf, r"\bbraf\b", None),
        entry(
            Met,
            r"\bc-?met\b|\b(met)\b\s*(?:\+|\(\+\)|-\s*(?:positive|amplif)|ex(?:on)?\s*14|amplif|fusion|alteration|aberration|overexpress|mutat|positiv|negativ|gene\b)",
            None,
        ),
        entry(Ret, r"\bret\b", None),
        entry(Ntrk, r"\bntrk[1-3]?\b", None),
        entry(Idh, r"\bidh[12]?\b", None),
        entry(Mgmt, r"\bmgmt\b", None),
        entry(
            Tmb,
            r"\btmb-?h(?:igh)?\b|\bhigh\s+(?:tmb|tumou?r\s+mutation(?:al)?\s+burden)\b",
            Some(Polarity::Positive),
        ),
        entry(Tmb, r"\btmb\b|\btumou?r\s+mutation(?:al)?\s+burden\b", None),
    ]
});

// Ordered: the first rule that matches the window decides.
static POLARITY_WORDS: LazyLock<Vec<(Polarity, Regex)>> = LazyLock::new(|| {
    [
        (
            Polarity::WildType,
            r"\bwild[- ]?type\b|\bwt\b|\bnon-?mutated\b|\bunmutated\b",
        ),
        (
            Polarity::Negative,
            r"\bnegative\b|\bneg\b|\bnot\s+(?:[a-z]+\s+)?(?:detected|present|amplified|expressed|overexpressed)\b|\babsent\b|\bunmethylated\b|\bnull\b",
        ),
        (
            Polarity::Mutated,
            r"mutat|\bmutant\b|\bexon\s*\d+|\bdeletion|\binsertion|\bl858r\b|\bt790m\b|\bv600[ek]?\b|\bg12[cdv]\b|\bsubstitution",
        ),
        (
            Polarity::Positive,
            r"\bpositiv|\bpos\b|overexpress|amplif|rearrange|fusion|translocat|\bexpress|\bhigh\b|\bdeficien|\balteration|\baberration|methylat|≥|>=|>",
        ),
    ]
    .into_iter()
    .map(|(polarity, pattern)| {
        let regex = Regex::new(pattern)
            .unwrap_or_else(|err| panic!("{polarity} polarity pattern is invalid: {err}"));
        (polarity, regex)
    })
    .collect()
});

static CONNECTOR_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\s,/]*(?:(?:or|and|and/or)[\s,/]*)?$").expect("connector pattern compiles")
});

static POLARITY_BEFORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\b(positive|negative)\s+for|\b(mutations?|alterations?|mutated)\s+(?:in|of)|\b(wild[- ]?type))\s+(?:[a-z]+\s+)?$",
    )
    .expect("backward polarity pattern compiles")
});

static PDL1_CUTOFF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bpd-?l1\b[^.;]{0,40}?(?:≥|>=|>|\bat\s+least|\bof\s+at\s+least)\s*(\d{1,3}(?:\.\d+)?)\s*%",
    )
    .expect("pd-l1 cutoff pattern compiles")
});

static TMB_CUTOFF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\btmb\b|\btumou?r\s+mutation(?:al)?\s+burden\b)[^.;]{0,30}?(?:≥|>=|>|\bat\s+least)\s*(\d{1,3}(?:\.\d+)?)",
    )
    .expect("tmb cutoff pattern compiles")
});

static UPPER_BOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:<|≤|=<|\bless\s+than\b|\bbelow\b|\bunder\b|\blow\b)\s*(\d{1,3}(?:\.\d+)?)?")
        .expect("upper bound pattern compiles")
});

static LOWER_BOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"≥|>|\bat\s+least\b|\bhigh\b").expect("lower bound pattern compiles")
});

static PATIENT_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)").expect("value pattern compiles"));

const CLAUSE_BREAKS: &[&str] = &[",", ";", " and ", " or ", " but ", " with ", " who "];
const WINDOW_BYTES: usize = 48;

#[derive(Debug, Clone, Copy)]
struct Mention {
    biomarker: Biomarker,
    implied: Option<Polarity>,
    start: usize,
    end: usize,
}

/// Vocabulary hits in text order; overlapping hits keep the longest one
/// starting first ("brca1/2" over "brca1").
fn find_mentions(text: &str) -> Vec<Mention> {
    let mut hits: Vec<Mention> = VOCABULARY
        .iter()
        .flat_map(|entry| {
            entry.regex.captures_iter(text).filter_map(move |caps| {
                let gene = caps.get(1).or_else(|| caps.get(0))?;
                Some(Mention {
                    biomarker: entry.biomarker,
                    implied: entry.implied,
                    start: gene.start(),
                    end: gene.end(),
                })
            })
        })
        .collect();
    hits.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut mentions: Vec<Mention> = Vec::with_capacity(hits.len());
    for hit in hits {
        if mentions.last().is_none_or(|last| hit.start >= last.end) {
            mentions.push(hit);
        }
    }
    mentions
}

fn char_floor(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Text after a mention up to the next mention, a clause break or the
/// window limit.
fn forward_window(text: &str, from: usize, next_start: usize) -> &str {
    let limit = char_floor(text, (from + WINDOW_BYTES).min(next_start));
    let window = &text[from..limit.max(from)];
    let cut = CLAUSE_BREAKS
        .iter()
        .filter_map(|brk| window.find(brk))
        .min()
        .unwrap_or(window.len());
    &window[..cut]
}

fn sign_polarity(window: &str) -> Option<Polarity> {
    if window.starts_with('+') || window.starts_with("(+)") {
        return Some(Polarity::Positive);
    }
    if window.starts_with("(-)") {
        return Some(Polarity::Negative);
    }
    let mut chars = window.chars();
    if chars.next() == Some('-') && chars.next().is_none_or(|c| !c.is_alphanumeric()) {
        return Some(Polarity::Negative);
    }
    None
}

fn word_polarity(window: &str) -> Option<Polarity> {
    POLARITY_WORDS
        .iter()
        .find(|(_, regex)| regex.is_match(window))
        .map(|(polarity, _)| *polarity)
}

fn backward_polarity(before: &str) -> Option<Polarity> {
    let caps = POLARITY_BEFORE.captures(before)?;
    if let Some(word) = caps.get(1) {
        return Some(if word.as_str() == "positive" {
            Polarity::Positive
        } else {
            Polarity::Negative
        });
    }
    if caps.get(2).is_some() {
        return Some(Polarity::Mutated);
    }
    caps.get(3).map(|_| Polarity::WildType)
}

/// `Some(ceiling)` when the window caps a thresholded marker from above;
/// the ceiling value itself may be absent ("PD-L1 low").
fn upper_bound(biomarker: Biomarker, window: &str) -> Option<Option<f32>> {
    if !biomarker.takes_threshold() {
        return None;
    }
    let caps = UPPER_BOUND.captures(window)?;
    let start = caps.get(0)?.start();
    if LOWER_BOUND.find(window).is_some_and(|lower| lower.start() < start) {
        return None;
    }
    Some(caps.get(1).and_then(|m| m.as_str().parse().ok()))
}

fn cutoff(regex: &Regex, text: &str) -> Option<f32> {
    regex.captures(text)?.get(1)?.as_str().parse().ok()
}

fn sentence_requirements(sentence: &CriteriaSentence) -> Vec<BiomarkerRequirement> {
    let text = sentence.text.as_str();
    let mentions = find_mentions(text);
    if mentions.is_empty() {
        return Vec::new();
    }

    let windows: Vec<&str> = mentions
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let next_start = mentions.get(i + 1).map_or(text.len(), |n| n.start);
            forward_window(text, m.end, next_start)
        })
        .collect();
    let mut polarities: Vec<Option<Polarity>> = windows
        .iter()
        .map(|window| sign_polarity(window).or_else(|| word_polarity(window)))
        .collect();

    for i in (0..mentions.len().saturating_sub(1)).rev() {
        if polarities[i].is_none() {
            let gap = &text[mentions[i].end..mentions[i + 1].start];
            if CONNECTOR_ONLY.is_match(gap) {
                polarities[i] = polarities[i + 1];
            }
        }
    }

    let pdl1_cutoff = cutoff(&PDL1_CUTOFF, text);
    let tmb_cutoff = cutoff(&TMB_CUTOFF, text);

    let mut requirements = Vec::new();
    for (i, mention) in mentions.iter().enumerate() {
        if let Some(ceiling) = upper_bound(mention.biomarker, windows[i]) {
            requirements.push(match sentence.section {
                SectionKind::Inclusion => BiomarkerRequirement {
                    biomarker: mention.biomarker,
                    polarity: Polarity::Negative,
                    threshold: None,
                },
                SectionKind::Exclusion => BiomarkerRequirement {
                    biomarker: mention.biomarker,
                    polarity: Polarity::Positive,
                    threshold: ceiling,
                },
            });
            continue;
        }
        let threshold = match mention.biomarker {
            Biomarker::PdL1 => pdl1_cutoff,
            Biomarker::Tmb => tmb_cutoff,
            _ => None,
        };
        let previous_end = if i == 0 { 0 } else { mentions[i - 1].end };
        let polarity = polarities[i]
            .or_else(|| backward_polarity(&text[previous_end..mention.start]))
            .or(mention.implied)
            .or_else(|| threshold.map(|_| Polarity::Positive));
        let Some(polarity) = polarity else { continue };

        let requirement = match sentence.section {
            SectionKind::Inclusion => BiomarkerRequirement {
                biomarker: mention.biomarker,
                polarity,
                threshold: threshold.filter(|_| polarity.is_present()),
            },
            SectionKind::Exclusion if polarity.is_present() => BiomarkerRequirement {
                biomarker: mention.biomarker,
                polarity: Polarity::Negative,
                threshold: None,
            },
            SectionKind::Exclusion => continue,
        };
        requirements.push(requirement);
    }
    requirements
}

/// Deduplicate by (biomarker, polarity), keeping first-mention order and the
/// first threshold seen.
fn merge(requirements: impl IntoIterator<Item = BiomarkerRequirement>) -> Vec<BiomarkerRequirement> {
    let mut merged: Vec<BiomarkerRequirement> = Vec::new();
    for requirement in requirements {
        match merged
            .iter_mut()
            .find(|r| r.biomarker == requirement.biomarker && r.polarity == requirement.polarity)
        {
            Some(existing) => {
                if existing.threshold.is_none() {
                    existing.threshold = requirement.threshold;
                }
            }
            None => merged.push(requirement),
        }
    }
    merged
}

pub fn extract(sentences: &[CriteriaSentence]) -> FieldOutcome<Vec<BiomarkerRequirement>> {
    let requirements = merge(sentences.iter().flat_map(sentence_requirements));
    let confidence = if requirements.is_empty() {
        Confidence::Low
    } else {
        Confidence::High
    };
    FieldOutcome::found(requirements, confidence)
}

/// Parse one free-form patient biomarker string.
///
/// A bare gene name counts as positive; `"KRAS wild-type"`, `"ALK-"` and
/// `"HER2 negative"` carry their polarity. Numeric values are kept for
/// PD-L1 and TMB only.
pub fn parse_patient_marker(text: &str) -> Option<PatientMarker> {
    let lowered = text.to_lowercase();
    let mention = find_mentions(&lowered).into_iter().next()?;
    let window = forward_window(&lowered, mention.end, lowered.len());
    let polarity = sign_polarity(window)
        .or_else(|| upper_bound(mention.biomarker, window).map(|_| Polarity::Negative))
        .or_else(|| word_polarity(window))
        .or_else(|| backward_polarity(&lowered[..mention.start]))
        .or(mention.implied)
        .unwrap_or(Polarity::Positive);
    let value = if mention.biomarker.takes_threshold() {
        PATIENT_VALUE
            .captures(window)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    } else {
        None
    };
    Some(PatientMarker {
        biomarker: mention.biomarker,
        polarity,
        value,
    })
}

#[cfg(test)]
pub(crate) fn force_tables() -> usize {
    VOCABULARY.len()
        + POLARITY_WORDS.len()
        + [
            &*CONNECTOR_ONLY,
            &*POLARITY_BEFORE,
            &*PDL1_CUTOFF,
            &*TMB_CUTOFF,
            &*UPPER_BOUND,
            &*LOWER_BOUND,
            &*PATIENT_VALUE,
        ]
        .len()
}
