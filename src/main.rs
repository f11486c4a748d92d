use std::env;
use std::error::Error;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use trialmatch::{Location, PatientProfile, TrialMatchConfig, parse_cached, rank};

const DEMO_TRIALS: &[(&str, &str)] = &[
    (
        "NCT-DEMO-0001",
        "Inclusion Criteria:
- Age 18 years and older
- ECOG performance status 0-1
- Stage IIIB-IV non-small cell lung cancer with a documented EGFR mutation
- Progressed after first-line platinum-based chemotherapy

Exclusion Criteria:
- Untreated brain metastases; treated and stable brain metastases are allowed
- Known HIV infection or active hepatitis B or C",
    ),
    (
        "NCT-DEMO-0002",
        "Inclusion Criteria:
- Age between 18 and 75 years
- Metastatic NSCLC, previously untreated
- PD-L1 expression >= 50%

Exclusion Criteria:
- Prior treatment with anti-PD-1 or anti-PD-L1 therapy
- Active autoimmune disease requiring systemic treatment in the past 2 years",
    ),
];

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = match env::args().nth(1) {
        Some(path) => TrialMatchConfig::from_file(path)?,
        None => TrialMatchConfig::default(),
    };
    let parser = config.parser();
    let cache = config.build_cache();
    let matcher = config.build_matcher()?;

    let records: Vec<_> = DEMO_TRIALS
        .iter()
        .map(|(trial_id, text)| {
            Arc::unwrap_or_clone(parse_cached(trial_id, text, &parser, cache.as_ref()))
                .with_conditions(["Non-Small Cell Lung Cancer"])
                .with_sites([Location::new("Boston", "MA", "USA")])
        })
        .collect();

    let patient = PatientProfile::new(62.0, "NSCLC")
        .with_id("demo-patient")
        .with_ecog(1)
        .with_stage("Stage IV")
        .with_biomarkers(["EGFR exon 19 deletion"])
        .with_prior_therapies(1)
        .with_comorbidities(["brain metastases"])
        .with_location(Location::new("Boston", "MA", "USA"));

    let mut results = matcher.match_batch(&patient, &records)?;
    rank(&mut results);

    println!("{}", serde_json::to_string_pretty(&records)?);
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
