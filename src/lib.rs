//! Workspace umbrella crate for clinical trial eligibility matching.
//!
//! This crate stitches together text normalization (`canonical`), rule-based
//! field extraction (`extract`) and patient matching (`matcher`) so callers
//! can go from registry free text to ranked verdicts with a single API:
//!
//! ```
//! use trialmatch::{match_trial, parse, PatientProfile, Verdict};
//!
//! let record = parse(
//!     "NCT00000001",
//!     "Inclusion: Age 18 and older, ECOG 0-1. Exclusion: Prior anti-PD-1 therapy excluded.",
//! );
//! let patient = PatientProfile::new(70.0, "NSCLC").with_ecog(2);
//! let result = match_trial(&patient, &record).expect("patient has age and cancer type");
//! assert_eq!(result.verdict, Verdict::Excluded);
//! ```
//!
//! Parsing never fails; anything the rules cannot read is left unknown with
//! low confidence. Matching fails only on a patient without age or cancer
//! type.

pub mod config;

pub use canonical::{
    CanonicalError, CriteriaSentence, NormalizeConfig, NormalizedCriteria, SectionKind,
    content_hash, normalize,
};
pub use extract::{
    Biomarker, BiomarkerRequirement, Condition, Confidence, CriteriaRecord, ExclusionStatus,
    ExtractConfig, ExtractError, Field, Location, MemoryCache, NoopCache, ParseCache, Polarity,
    RegistryHints, RequiredTest, Sex, TreatmentLine, build_record, build_record_with_hints,
};
pub use matcher::{
    Contribution, Gate, MatchConfig, MatchMetrics, MatchResult, Matcher, PatientProfile,
    ScoringWeights, ValidationError, Verdict, VerdictThresholds, rank, set_match_metrics,
};

pub use crate::config::{CacheYamlConfig, ConfigLoadError, TrialMatchConfig};

use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{Level, debug, info};

/// Normalization and extraction settings for the `parse_*` entry points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

/// Metrics observer for parsing.
pub trait PipelineMetrics: Send + Sync {
    /// `cache_hit` is always `false` outside [`parse_cached`];
    /// `low_confidence_fields` counts fields flagged for review.
    fn record_parse(
        &self,
        trial_id: &str,
        latency: Duration,
        cache_hit: bool,
        low_confidence_fields: usize,
    );
}

/// Install or clear the global pipeline metrics recorder.
pub fn set_pipeline_metrics(recorder: Option<Arc<dyn PipelineMetrics>>) {
    let mut guard = metrics_lock()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn PipelineMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn PipelineMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn PipelineMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn PipelineMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_parse(self, record: &CriteriaRecord, cache_hit: bool) {
        self.recorder.record_parse(
            &record.trial_id,
            self.start.elapsed(),
            cache_hit,
            record.low_confidence_fields().len(),
        );
    }
}

fn build(
    trial_id: &str,
    raw_text: &str,
    hints: Option<&RegistryHints>,
    cfg: &ParserConfig,
) -> CriteriaRecord {
    let start = Instant::now();
    let span = tracing::span!(Level::INFO, "extract.parse", trial_id = %trial_id);
    let _guard = span.enter();

    let doc = normalize(trial_id, Some(raw_text), &cfg.normalize);
    let record = match hints {
        Some(hints) => build_record_with_hints(&doc, hints, &cfg.extract),
        None => build_record(&doc, &cfg.extract),
    };

    let elapsed_micros = start.elapsed().as_micros();
    info!(
        sentences = doc.sentences.len(),
        low_confidence_fields = record.low_confidence_fields().len(),
        elapsed_micros,
        "parse_success"
    );
    record
}

/// Parse one trial's eligibility text with default configuration.
pub fn parse(trial_id: &str, raw_text: &str) -> CriteriaRecord {
    parse_with_config(trial_id, raw_text, &ParserConfig::default())
}

/// Parse one trial's eligibility text with explicit configuration.
pub fn parse_with_config(trial_id: &str, raw_text: &str, cfg: &ParserConfig) -> CriteriaRecord {
    let metrics = MetricsSpan::start();
    let record = build(trial_id, raw_text, None, cfg);
    if let Some(span) = metrics {
        span.record_parse(&record, false);
    }
    record
}

/// Parse with structured registry fields (minimum/maximum age, sex) taking
/// precedence over the free text.
pub fn parse_with_registry(
    trial_id: &str,
    raw_text: &str,
    hints: &RegistryHints,
    cfg: &ParserConfig,
) -> CriteriaRecord {
    let metrics = MetricsSpan::start();
    let record = build(trial_id, raw_text, Some(hints), cfg);
    if let Some(span) = metrics {
        span.record_parse(&record, false);
    }
    record
}

/// Parse through `cache`, keyed by the versioned content hash of
/// (trial id, text).
///
/// The key does not cover [`ExtractConfig`]; use one cache per extraction
/// configuration.
pub fn parse_cached(
    trial_id: &str,
    raw_text: &str,
    cfg: &ParserConfig,
    cache: &dyn ParseCache,
) -> Arc<CriteriaRecord> {
    let metrics = MetricsSpan::start();
    let key = content_hash(cfg.normalize.version, trial_id, raw_text);
    let (record, cache_hit) =
        cache.get_or_compute(&key, &mut || build(trial_id, raw_text, None, cfg));
    debug!(trial_id = %trial_id, cache_hit, "parse_cache_lookup");
    if let Some(span) = metrics {
        span.record_parse(&record, cache_hit);
    }
    record
}

/// Evaluate one patient against one trial with the default policy.
pub fn match_trial(
    patient: &PatientProfile,
    record: &CriteriaRecord,
) -> Result<MatchResult, ValidationError> {
    Matcher::default().match_trial(patient, record)
}

/// Evaluate one patient against many trials with the default policy.
/// Results are in input order; see [`rank`].
pub fn match_batch<R: AsRef<CriteriaRecord>>(
    patient: &PatientProfile,
    records: &[R],
) -> Result<Vec<MatchResult>, ValidationError> {
    Matcher::default().match_batch(patient, records)
}
