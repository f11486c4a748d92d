use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::NormalizeConfig;
use crate::document::NormalizedCriteria;
use crate::hash::content_hash;
use crate::section::{CriteriaItem, CriteriaSentence, SectionKind};
use crate::whitespace::collapse_whitespace;

// Inline "Inclusion:" / "Exclusion Criteria:" anywhere, or a bare
// "Inclusion Criteria" heading on its own line.
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)\b(inclusion|exclusion)(?:\s+criteria)?\s*:|^[ \t]*(inclusion|exclusion)\s+criteria[ \t]*$",
    )
    .expect("heading pattern compiles")
});

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[-–—•*·▪◦‣]+\s*|\(?\d{1,2}[.)]\s+|\(?[a-z][.)]\s+)")
        .expect("list marker pattern compiles")
});

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.;](?:\s+|$)").expect("sentence break pattern compiles"));

const ABBREVIATIONS: &[&str] = &["e.g", "i.e", "vs", "etc", "approx", "incl"];

/// Main entry point. Splits raw eligibility text into section-tagged items
/// and sentences.
///
/// Never fails: `None`, empty and whitespace-only input produce a value with
/// no sentences. Text before the first recognized heading is inclusion text.
pub fn normalize(trial_id: &str, raw_text: Option<&str>, cfg: &NormalizeConfig) -> NormalizedCriteria {
    let raw = raw_text.unwrap_or_default();
    let hash = content_hash(cfg.version, trial_id, raw);

    let folded: Cow<str> = if cfg.normalize_unicode {
        Cow::Owned(raw.nfkc().collect::<String>())
    } else {
        Cow::Borrowed(raw)
    };
    let text = folded.replace("\r\n", "\n").replace('\r', "\n");

    let mut items = Vec::new();
    for (section, segment) in split_sections(&text) {
        collect_items(section, segment, cfg, &mut items);
    }

    let mut sentences = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        for text in split_sentences(&item.text) {
            sentences.push(CriteriaSentence {
                section: item.section,
                item: index,
                text,
            });
        }
    }

    NormalizedCriteria {
        trial_id: trial_id.to_string(),
        version: cfg.version,
        content_hash: hash,
        items,
        sentences,
    }
}

/// Cut the text at every heading; each piece inherits the kind of the
/// heading before it.
fn split_sections(text: &str) -> Vec<(SectionKind, &str)> {
    let mut sections = Vec::new();
    let mut current = SectionKind::Inclusion;
    let mut cursor = 0;

    for caps in HEADING.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let label = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("inclusion", |m| m.as_str());

        if whole.start() > cursor {
            sections.push((current, &text[cursor..whole.start()]));
        }
        current = SectionKind::from_heading(label);
        cursor = whole.end();
    }
    if cursor < text.len() {
        sections.push((current, &text[cursor..]));
    }
    sections
}

fn collect_items(
    section: SectionKind,
    segment: &str,
    cfg: &NormalizeConfig,
    items: &mut Vec<CriteriaItem>,
) {
    let mut current: Option<String> = None;

    for line in segment.split('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush_item(section, current.take(), items);
            continue;
        }

        let (marked, body) = match LIST_MARKER.find(trimmed) {
            Some(m) => (true, trimmed[m.end()..].trim()),
            None => (false, trimmed),
        };
        if body.is_empty() {
            continue;
        }

        let continues = cfg.join_continuations
            && !marked
            && body.chars().next().is_some_and(char::is_lowercase);
        match current.as_mut() {
            Some(open) if continues => {
                open.push(' ');
                open.push_str(body);
            }
            _ => {
                flush_item(section, current.take(), items);
                current = Some(body.to_string());
            }
        }
    }
    flush_item(section, current, items);
}

fn flush_item(section: SectionKind, text: Option<String>, items: &mut Vec<CriteriaItem>) {
    let Some(text) = text else { return };
    let text = collapse_whitespace(&text.to_lowercase());
    if text.is_empty() {
        return;
    }
    items.push(CriteriaItem { section, text });
}

fn split_sentences(item: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for brk in SENTENCE_BREAK.find_iter(item) {
        let piece = &item[start..brk.start()];
        if ABBREVIATIONS.iter().any(|abbr| ends_with_word(piece, abbr)) {
            continue;
        }
        push_sentence(piece, &mut sentences);
        start = brk.end();
    }
    push_sentence(&item[start..], &mut sentences);
    sentences
}

fn ends_with_word(piece: &str, word: &str) -> bool {
    piece.strip_suffix(word).is_some_and(|head| {
        head.chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric())
    })
}

fn push_sentence(piece: &str, sentences: &mut Vec<String>) {
    let text = piece
        .trim()
        .trim_start_matches([',', ';', ':'])
        .trim_end_matches(['.', ';', ',', ':'])
        .trim();
    if !text.is_empty() {
        sentences.push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviations_do_not_end_sentences() {
        assert_eq!(
            split_sentences("prior targeted therapy (e.g. erlotinib) is allowed. no hiv"),
            vec!["prior targeted therapy (e.g. erlotinib) is allowed", "no hiv"]
        );
    }

    #[test]
    fn headings_are_case_insensitive() {
        let sections = split_sections("intro\nINCLUSION CRITERIA\nfoo\nExclusion criteria: bar");
        let kinds: Vec<SectionKind> = sections.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::Inclusion,
                SectionKind::Inclusion,
                SectionKind::Exclusion
            ]
        );
        assert_eq!(sections[2].1.trim(), "bar");
    }

    #[test]
    fn continuation_joining_can_be_disabled() {
        let cfg = NormalizeConfig {
            join_continuations: false,
            ..Default::default()
        };
        let doc = normalize("t", Some("- first part\nsecond part"), &cfg);
        assert_eq!(doc.items.len(), 2);
    }

    #[test]
    fn crlf_line_endings_are_handled() {
        let doc = normalize(
            "t",
            Some("Inclusion Criteria:\r\n- ECOG 0-1\r\nExclusion Criteria:\r\n- HIV"),
            &NormalizeConfig::default(),
        );
        assert_eq!(doc.items.len(), 2);
        assert_eq!(doc.items[1].section, SectionKind::Exclusion);
    }

    #[test]
    fn full_width_digits_fold_under_nfkc() {
        let doc = normalize("t", Some("ＥＣＯＧ ０-１"), &NormalizeConfig::default());
        assert_eq!(doc.sentences[0].text, "ecog 0-1");
    }
}
