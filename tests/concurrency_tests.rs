//! Concurrency and thread safety tests for parsing and matching.

use std::sync::Arc;
use std::thread;

use trialmatch::{Matcher, MemoryCache, ParseCache, ParserConfig, PatientProfile, parse, parse_cached};

const TRIAL: &str = "Inclusion Criteria:
- Adults aged 18 to 75 years
- ECOG 0 or 1
- HER2-positive metastatic breast cancer
Exclusion Criteria:
- Untreated brain metastases
- Known HIV infection";

#[test]
fn concurrent_parse_matches_sequential() {
    let expected = parse("NCT-CONC", TRIAL);

    let handles: Vec<_> = (0..8)
        .map(|_| thread::spawn(|| parse("NCT-CONC", TRIAL)))
        .collect();

    for handle in handles {
        let record = handle.join().expect("thread panicked");
        assert_eq!(record, expected);
    }
}

#[test]
fn shared_cache_serves_every_thread_the_same_record() {
    let cache: Arc<dyn ParseCache> = Arc::new(MemoryCache::new(16));
    let cfg = Arc::new(ParserConfig::default());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let cfg = Arc::clone(&cfg);
            thread::spawn(move || parse_cached("NCT-CONC", TRIAL, &cfg, cache.as_ref()))
        })
        .collect();
    let records: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread panicked"))
        .collect();

    let expected = parse("NCT-CONC", TRIAL);
    for record in &records {
        assert_eq!(**record, expected);
    }
    let cached = cache.get(&expected.content_hash).expect("record is cached");
    assert_eq!(*cached, expected);
}

#[test]
fn shared_matcher_across_threads() {
    let matcher = Arc::new(Matcher::default());
    let record = Arc::new(parse("NCT-CONC", TRIAL).with_conditions(["Breast Cancer"]));

    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            let matcher = Arc::clone(&matcher);
            let record = Arc::clone(&record);
            thread::spawn(move || {
                let patient = PatientProfile::new(40.0 + f32::from(i), "breast cancer")
                    .with_ecog(i % 3)
                    .with_biomarkers(["HER2 positive"]);
                let result = matcher.match_trial(&patient, &record).expect("valid patient");
                (i, result)
            })
        })
        .collect();

    for handle in handles {
        let (i, result) = handle.join().expect("thread panicked");
        assert_eq!(result.is_excluded(), i % 3 == 2, "patient {i}");
    }
}
