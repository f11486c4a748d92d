//! Ordered pattern rules.
//!
//! Every field extractor is a [`RuleSet`]: an ordered list of
//! (pattern, extractor) pairs. Evaluation is first-match, not longest-match:
//! rules are tried in list order, each against every admitted sentence in
//! source order, and the first capture whose extractor returns `Some` wins.
//! An extractor that declines (out-of-range value, unparseable number) does
//! not count as a match, so evaluation moves on.

use canonical::{CriteriaSentence, SectionKind};
use regex::{Captures, Regex};

use crate::record::Confidence;

/// Which sections a rule is allowed to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Any,
    Inclusion,
    Exclusion,
}

impl Scope {
    pub fn admits(self, section: SectionKind) -> bool {
        match self {
            Scope::Any => true,
            Scope::Inclusion => section == SectionKind::Inclusion,
            Scope::Exclusion => section == SectionKind::Exclusion,
        }
    }
}

/// Turns one regex match into a typed value, or declines.
pub type Extractor<T> = fn(&Captures<'_>) -> Option<T>;

pub struct Rule<T> {
    pub name: &'static str,
    pub scope: Scope,
    pub confidence: Confidence,
    regex: Regex,
    extract: Extractor<T>,
}

impl<T> Rule<T> {
    /// Build a rule from a literal pattern.
    ///
    /// Rule tables are process-wide statics compiled once from string
    /// literals, so an invalid pattern is a programming error; the
    /// `every_rule_table_compiles` test forces each table.
    pub fn new(
        name: &'static str,
        pattern: &str,
        scope: Scope,
        confidence: Confidence,
        extract: Extractor<T>,
    ) -> Self {
        let regex = Regex::new(pattern)
            .unwrap_or_else(|err| panic!("rule `{name}` has an invalid pattern: {err}"));
        Self {
            name,
            scope,
            confidence,
            regex,
            extract,
        }
    }

    /// First accepted value of this rule within one sentence.
    pub fn apply(&self, text: &str) -> Option<T> {
        self.regex
            .captures_iter(text)
            .find_map(|caps| (self.extract)(&caps))
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// A value together with the rule that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<T> {
    pub value: T,
    pub confidence: Confidence,
    pub rule: &'static str,
}

pub struct RuleSet<T> {
    rules: Vec<Rule<T>>,
}

impl<T> RuleSet<T> {
    pub fn new(rules: Vec<Rule<T>>) -> Self {
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule order beats text order: a later rule never wins over an earlier
    /// one, even when it matches earlier in the text.
    pub fn first_match(&self, sentences: &[CriteriaSentence]) -> Option<Extraction<T>> {
        self.rules.iter().find_map(|rule| {
            sentences
                .iter()
                .filter(|s| rule.scope.admits(s.section))
                .find_map(|s| rule.apply(&s.text))
                .map(|value| Extraction {
                    value,
                    confidence: rule.confidence,
                    rule: rule.name,
                })
        })
    }

    /// Every accepted value of every rule, in rule order then text order.
    /// Used by multi-valued fields.
    pub fn collect_all(&self, sentences: &[CriteriaSentence]) -> Vec<Extraction<T>> {
        let mut out = Vec::new();
        for rule in &self.rules {
            for sentence in sentences.iter().filter(|s| rule.scope.admits(s.section)) {
                for caps in rule.regex.captures_iter(&sentence.text) {
                    if let Some(value) = (rule.extract)(&caps) {
                        out.push(Extraction {
                            value,
                            confidence: rule.confidence,
                            rule: rule.name,
                        });
                    }
                }
            }
        }
        out
    }
}

/// First capture group (after group 0) that participated in the match.
pub fn first_group<'t>(caps: &Captures<'t>) -> Option<&'t str> {
    caps.iter().skip(1).flatten().next().map(|m| m.as_str())
}

/// Parse a cardinal written as digits or as a word from "one" to "ten".
pub fn parse_count(token: &str) -> Option<u32> {
    let word = match token {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        other => return other.parse().ok(),
    };
    Some(word)
}

/// Pattern fragment matching what [`parse_count`] accepts.
pub const COUNT: &str = r"(\d{1,2}|one|two|three|four|five|six|seven|eight|nine|ten)";
