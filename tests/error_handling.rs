use trialmatch::{
    ConfigLoadError, CriteriaRecord, Field, MatchConfig, Matcher, PatientProfile,
    TrialMatchConfig, ValidationError, Verdict, VerdictThresholds, match_batch, match_trial,
    parse,
};

#[test]
fn patient_without_age_is_rejected() {
    let patient = PatientProfile {
        cancer_type: Some("NSCLC".into()),
        ecog: Some(1),
        ..PatientProfile::default()
    };
    let result = match_trial(&patient, &CriteriaRecord::new("NCT-ERR"));
    assert_eq!(result, Err(ValidationError::MissingField("age")));
}

#[test]
fn patient_without_cancer_type_is_rejected_for_batches() {
    let patient = PatientProfile {
        age: Some(44.0),
        ..PatientProfile::default()
    };
    let records = [CriteriaRecord::new("NCT-A"), CriteriaRecord::new("NCT-B")];
    let err = match_batch(&patient, &records).unwrap_err();
    assert_eq!(err, ValidationError::MissingField("cancer_type"));
    assert_eq!(
        err.to_string(),
        "missing required patient field `cancer_type`"
    );
}

#[test]
fn negative_age_is_invalid() {
    let patient = PatientProfile::new(-3.0, "NSCLC");
    assert!(matches!(
        match_trial(&patient, &CriteriaRecord::new("NCT-ERR")),
        Err(ValidationError::InvalidField { field: "age", .. })
    ));
}

#[test]
fn unreadable_text_degrades_instead_of_failing() {
    for text in ["", "   \n\t", "%%%% ---- ****", "Inclusion Criteria:\nExclusion Criteria:"] {
        let record = parse("NCT-NOISE", text);
        assert_eq!(record.age_min, None);
        assert_eq!(record.ecog_max, None);
        assert!(record.biomarker_requirements.is_empty());
        assert_eq!(record.low_confidence_fields().len(), Field::ALL.len());
    }
}

#[test]
fn contradictory_age_bounds_are_dropped() {
    let record = parse("NCT-CONFLICT", "Inclusion: Age at least 65 years; age up to 40 years");
    assert_eq!((record.age_min, record.age_max), (None, None));

    let result = match_trial(&PatientProfile::new(50.0, "NSCLC"), &record).expect("valid patient");
    assert_ne!(result.verdict, Verdict::Excluded);
}

#[test]
fn invalid_policy_is_rejected() {
    let config = MatchConfig {
        thresholds: VerdictThresholds {
            excellent: 30,
            good: 30,
            fair: 30,
        },
        ..MatchConfig::default()
    };
    assert!(matches!(
        Matcher::new(config),
        Err(ValidationError::InvalidConfig(_))
    ));
}

#[test]
fn config_errors_are_typed() {
    assert!(matches!(
        TrialMatchConfig::from_yaml("version: \"9\""),
        Err(ConfigLoadError::UnsupportedVersion(_))
    ));
    assert!(matches!(
        TrialMatchConfig::from_yaml("version: \"1.0\"\nextract:\n  max_stage_terms: 0\n"),
        Err(ConfigLoadError::Validation(msg)) if msg.contains("max_stage_terms")
    ));
    assert!(matches!(
        TrialMatchConfig::from_file("does/not/exist.yaml"),
        Err(ConfigLoadError::FileRead(_))
    ));
}
