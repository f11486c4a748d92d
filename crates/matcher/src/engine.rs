use std::time::Instant;

use extract::CriteriaRecord;
use tracing::{debug, Level};

use crate::gate::{run_gates, Candidate, GateFailure};
use crate::metrics::metrics_recorder;
use crate::score::score;
use crate::types::{MatchConfig, MatchResult, PatientProfile, ValidationError, Verdict};


/// Evaluates patients against criteria records under one [`MatchConfig`].
///
/// Stateless apart from its configuration, so one instance can be shared
/// across threads.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    /// Construct a matcher, rejecting invalid policies up front.
    pub fn new(config: MatchConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Evaluate one patient against one trial.
    ///
    /// Fails only when the patient is missing a required field.
    pub fn match_trial(
        &self,
        patient: &PatientProfile,
        record: &CriteriaRecord,
    ) -> Result<MatchResult, ValidationError> {
        patient.validate()?;
        Ok(self.evaluate(&Candidate::new(patient), record))
    }

    /// Evaluate one patient against many trials. Results are in input
    /// order; use [`rank`] to sort them.
    pub fn match_batch<R>(
        &self,
        patient: &PatientProfile,
        records: &[R],
    ) -> Result<Vec<MatchResult>, ValidationError>
    where
        R: AsRef<CriteriaRecord>,
    {
        patient.validate()?;
        let _span = tracing::span!(Level::DEBUG, "matcher.match_batch", trials = records.len()).entered();
        let candidate = Candidate::new(patient);
        Ok(records
            .iter()
            .map(|record| self.evaluate(&candidate, record.as_ref()))
            .collect())
    }

    fn evaluate(&self, candidate: &Candidate<'_>, record: &CriteriaRecord) -> MatchResult {
        let start = Instant::now();
        let recorder = metrics_recorder();
        let mut warnings = Vec::new();

        let result = match run_gates(candidate, record, &mut warnings) {
            Err(GateFailure { gate, reason }) => {
                debug!(
                    trial_id = %record.trial_id,
                    gate = gate.as_str(),
                    reason = %reason,
                    "gate_failed"
                );
                if let Some(recorder) = &recorder {
                    recorder.record_gate_failure(&record.trial_id, gate);
                }
                MatchResult {
                    trial_id: record.trial_id.clone(),
                    verdict: Verdict::Excluded,
                    score: 0,
                    matched_reasons: Vec::new(),
                    disqualifying_reasons: vec![reason],
                    warnings,
                    failed_gate: Some(gate),
                    contributions: Vec::new(),
                }
            }
            Ok(()) => {
                let card = score(candidate, record, &self.config, &mut warnings);
                let score = card.score();
                MatchResult {
                    trial_id: record.trial_id.clone(),
                    verdict: self.config.thresholds.verdict_for(score),
                    score,
                    matched_reasons: card.reasons,
                    disqualifying_reasons: Vec::new(),
                    warnings,
                    failed_gate: None,
                    contributions: if self.config.explain {
                        card.contributions
                    } else {
                        Vec::new()
                    },
                }
            }
        };

        let latency = start.elapsed();
        debug!(
            trial_id = %result.trial_id,
            verdict = result.verdict.as_str(),
            score = result.score,
            elapsed_micros = latency.as_micros() as u64,
            "match_complete"
        );
        if let Some(recorder) = recorder {
            recorder.record_match(&result, latency);
        }
        result
    }
}

/// Order results best first: by verdict tier, then score descending.
/// The sort is stable, so ties keep their input order.
pub fn rank(results: &mut [MatchResult]) {
    results.sort_by(|a, b| {
        a.verdict
            .rank()
            .cmp(&b.verdict.rank())
            .then_with(|| b.score.cmp(&a.score))
    });
}
