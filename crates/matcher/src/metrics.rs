//! Observer hooks for matching.
//!
//! A recorder installed with [`set_match_metrics`] sees two events per
//! evaluation: the gate that disqualified a patient (if any), then the
//! finished [`MatchResult`] with its wall-clock latency. Unknown patient
//! fields surface as `result.warnings`, so a recorder can count how often a
//! verdict rests on missing data.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::types::{Gate, MatchResult};

pub trait MatchMetrics: Send + Sync {
    /// One evaluation finished. `latency` covers gating and scoring.
    fn record_match(&self, result: &MatchResult, latency: Duration);

    /// A hard gate disqualified the patient for `trial_id`.
    fn record_gate_failure(&self, _trial_id: &str, _gate: Gate) {}
}

type Slot = RwLock<Option<Arc<dyn MatchMetrics>>>;

fn slot() -> &'static Slot {
    static RECORDER: OnceCell<Slot> = OnceCell::new();
    RECORDER.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn MatchMetrics>> {
    slot()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Install or clear the recorder shared by every [`Matcher`](crate::Matcher).
pub fn set_match_metrics(recorder: Option<Arc<dyn MatchMetrics>>) {
    *slot()
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = recorder;
}
