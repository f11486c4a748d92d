use canonical::{normalize, NormalizeConfig};
use extract::{
    build_record, Biomarker, BiomarkerRequirement, Condition, Confidence, CriteriaRecord,
    ExclusionStatus, ExtractConfig, Field, Polarity, RequiredTest, TreatmentLine,
};

fn parse(text: &str) -> CriteriaRecord {
    let doc = normalize("NCT-CORPUS", Some(text), &NormalizeConfig::default());
    build_record(&doc, &ExtractConfig::default())
}

struct Case<T> {
    input: &'static str,
    expected: T,
}

/// Phrasings seen in registry text. The ECOG ones pin down the
/// first-valid-grade behavior; add new phrasings here when they turn up.
#[test]
fn ecog_regression_corpus() {
    let cases = [
        Case { input: "ECOG performance status 0-1", expected: Some(1) },
        Case { input: "ECOG PS 0, 1 or 2", expected: Some(2) },
        Case { input: "Performance status (ECOG) ≤ 2", expected: Some(2) },
        Case { input: "ECOG performance status of 0 to 2", expected: Some(2) },
        Case {
            input: "Eastern Cooperative Oncology Group (ECOG) performance status 0 or 1",
            expected: Some(1),
        },
        Case { input: "ECOG 0-7 or ECOG 0-2", expected: Some(2) },
        Case { input: "Exclusion Criteria:\n- ECOG ≥ 3", expected: Some(2) },
        Case { input: "Karnofsky ≥ 60%", expected: Some(2) },
        Case { input: "Life expectancy of at least 12 weeks", expected: None },
    ];

    for case in cases {
        assert_eq!(parse(case.input).ecog_max, case.expected, "input: {}", case.input);
    }
}

#[test]
fn ecog_extraction_is_idempotent() {
    let text = "Inclusion Criteria:\n- ECOG performance status 0, 1 or 2";
    let first = parse(text);
    for _ in 0..10 {
        assert_eq!(parse(text).ecog_max, first.ecog_max);
    }
}

#[test]
fn washout_corpus() {
    let cases = [
        Case { input: "14 day washout", expected: Some(14) },
        Case { input: "washout period of 30 days", expected: Some(30) },
        Case {
            input: "Washout of at least 21 days from prior chemotherapy",
            expected: Some(21),
        },
        Case { input: "4 weeks washout", expected: Some(28) },
        Case { input: "Adequate bone marrow function", expected: None },
    ];

    for case in cases {
        assert_eq!(parse(case.input).washout_days, case.expected, "input: {}", case.input);
    }
}

/// Durations that are not ages must never turn into age bounds.
#[test]
fn age_corpus() {
    let cases = [
        Case { input: "Age ≥ 18 years", expected: (Some(18.0), None) },
        Case { input: "Patients 18 years of age or older", expected: (Some(18.0), None) },
        Case {
            input: "Exclusion Criteria:\n- Prior malignancy unless disease-free > 5 years",
            expected: (None, None),
        },
        Case {
            input: "Exclusion Criteria:\n- Other cancer diagnosed less than 3 years ago",
            expected: (None, None),
        },
        Case {
            input: "Exclusion Criteria:\n- Prior therapy completed more than 2 years since enrollment",
            expected: (None, None),
        },
        Case { input: "Time from diagnosis ≤ 5 years", expected: (None, None) },
        Case { input: "Life expectancy of at least 1 year", expected: (None, None) },
        Case {
            input: "Inclusion Criteria:\n- Age ≥ 18 years\nExclusion Criteria:\n- Prior malignancy unless disease-free for > 3 years",
            expected: (Some(18.0), None),
        },
    ];

    for case in cases {
        let record = parse(case.input);
        assert_eq!((record.age_min, record.age_max), case.expected, "input: {}", case.input);
    }
}

#[test]
fn prior_therapy_corpus() {
    let cases = [
        Case { input: "1-2 prior therapies", expected: (Some(1), Some(2)) },
        Case { input: "Between 1 and 3 prior regimens", expected: (Some(1), Some(3)) },
        Case {
            input: "No more than two prior lines of chemotherapy",
            expected: (None, Some(2)),
        },
        Case {
            input: "Exclusion Criteria:\n- More than 3 prior systemic regimens",
            expected: (None, Some(3)),
        },
    ];

    for case in cases {
        let record = parse(case.input);
        assert_eq!(
            (record.prior_therapy_min, record.prior_therapy_max),
            case.expected,
            "input: {}",
            case.input
        );
    }
}

const NSCLC_TRIAL: &str = "Inclusion Criteria:
- Age ≥ 18 years
- Histologically confirmed stage IIIB-IV non-small cell lung cancer
- EGFR mutation (exon 19 deletion or L858R)
- ECOG performance status 0-1
- Progression after first-line platinum-based chemotherapy
- Willing to provide archival tumor tissue
Exclusion Criteria:
- Symptomatic brain metastases; treated and stable brain metastases are permitted
- Known HIV infection
- Active hepatitis B or C
- Prior treatment with an EGFR tyrosine kinase inhibitor
- Any anticancer therapy within 21 days of the first dose";

#[test]
fn nsclc_second_line_trial() {
    let record = parse(NSCLC_TRIAL);

    assert_eq!(record.age_min, Some(18.0));
    assert_eq!(record.age_max, None);
    assert_eq!(record.ecog_max, Some(1));
    assert_eq!(record.washout_days, Some(21));
    assert_eq!(
        record.biomarker_requirements,
        vec![BiomarkerRequirement {
            biomarker: Biomarker::Egfr,
            polarity: Polarity::Mutated,
            threshold: None,
        }]
    );
    assert_eq!(
        record.disease_stage_terms.iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["stage iiib", "stage iv"]
    );
    assert_eq!(record.treatment_line, TreatmentLine::SecondLine);
    assert_eq!(record.required_tests, vec![RequiredTest::ArchivalTissue]);

    assert_eq!(record.exclusion_status(Condition::BrainMetastases), ExclusionStatus::Allowed);
    assert_eq!(record.exclusion_status(Condition::Hiv), ExclusionStatus::Excluded);
    assert_eq!(record.exclusion_status(Condition::HepatitisB), ExclusionStatus::Excluded);
    assert_eq!(record.exclusion_status(Condition::HepatitisC), ExclusionStatus::Excluded);
    assert_eq!(
        record.exclusion_status(Condition::PriorImmunotherapy),
        ExclusionStatus::NotMentioned
    );
    assert_eq!(record.key_exclusion_terms.len(), 5);
}

const FIRST_LINE_IO_TRIAL: &str = "Inclusion Criteria:
- Adults aged 18 to 75 years
- PD-L1 TPS ≥ 50%
- No prior systemic therapy for metastatic disease
- ECOG 0 or 1
Exclusion Criteria:
- Prior anti-PD-1, anti-PD-L1 or anti-CTLA-4 therapy
- Active autoimmune disease requiring systemic treatment in the past 2 years
- Untreated brain metastases";

#[test]
fn first_line_immunotherapy_trial() {
    let record = parse(FIRST_LINE_IO_TRIAL);

    assert_eq!((record.age_min, record.age_max), (Some(18.0), Some(75.0)));
    assert_eq!(record.ecog_max, Some(1));
    assert_eq!(
        record.biomarker_requirements,
        vec![BiomarkerRequirement {
            biomarker: Biomarker::PdL1,
            polarity: Polarity::Positive,
            threshold: Some(50.0),
        }]
    );
    assert_eq!(record.treatment_line, TreatmentLine::FirstLine);
    assert!(record.disease_stage_terms.contains("metastatic"));

    assert_eq!(
        record.exclusion_status(Condition::PriorImmunotherapy),
        ExclusionStatus::Excluded
    );
    assert_eq!(
        record.exclusion_status(Condition::AutoimmuneDisease),
        ExclusionStatus::Excluded
    );
    assert_eq!(record.exclusion_status(Condition::BrainMetastases), ExclusionStatus::Excluded);
    assert_eq!(record.exclusion_status(Condition::Hiv), ExclusionStatus::NotMentioned);
    assert_eq!(record.washout_days, None);
}

const GLIOBLASTOMA_TRIAL: &str = "Inclusion Criteria:
- Newly diagnosed glioblastoma, IDH wild-type
- Tumor tissue available for MGMT testing
- Karnofsky performance status ≥ 70
- Age 18 years and older
Exclusion Criteria:
- Prior radiotherapy to the brain
- Women who are pregnant or breastfeeding";

#[test]
fn glioblastoma_trial_with_fallbacks() {
    let record = parse(GLIOBLASTOMA_TRIAL);

    assert_eq!(record.age_min, Some(18.0));
    assert_eq!(record.ecog_max, Some(1));
    assert_eq!(record.confidence(Field::Ecog), Confidence::Low);
    assert_eq!(
        record.biomarker_requirements,
        vec![BiomarkerRequirement {
            biomarker: Biomarker::Idh,
            polarity: Polarity::WildType,
            threshold: None,
        }]
    );
    assert_eq!(record.treatment_line, TreatmentLine::AnyLine);
    assert_eq!(record.confidence(Field::TreatmentLine), Confidence::Low);
    assert!(record.low_confidence_fields().contains(&Field::Washout));
}

#[test]
fn records_serialize_with_registry_spellings() {
    let record = parse(FIRST_LINE_IO_TRIAL);
    let json = serde_json::to_value(&record).expect("record serializes");

    assert_eq!(json["sex"], "ALL");
    assert_eq!(json["treatment_line"], "FIRST_LINE");
    assert_eq!(json["exclusion_flags"]["prior_immunotherapy"], "EXCLUDED");
    assert_eq!(json["exclusion_flags"]["hiv"], "NOT_MENTIONED");
    assert_eq!(json["biomarker_requirements"][0]["biomarker"], "PD-L1");
    assert_eq!(json["extraction_confidence"]["ecog"], "HIGH");

    let back: CriteriaRecord = serde_json::from_value(json).expect("record deserializes");
    assert_eq!(back, record);
}
