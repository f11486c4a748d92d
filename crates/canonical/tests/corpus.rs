use canonical::{normalize, NormalizeConfig, SectionKind};

use SectionKind::{Exclusion, Inclusion};

struct Case {
    name: &'static str,
    input: &'static str,
    expected: &'static [(SectionKind, &'static str)],
}

#[test]
fn golden_corpus_regression() {
    let cases = [
        Case {
            name: "registry_block_layout",
            input: "Inclusion Criteria:\n\n  * Age ≥ 18 years\n  * ECOG performance status 0-1\n\n\
                    Exclusion Criteria:\n\n  * Known HIV infection\n  * Prior anti-PD-1 therapy",
            expected: &[
                (Inclusion, "age ≥ 18 years"),
                (Inclusion, "ecog performance status 0-1"),
                (Exclusion, "known hiv infection"),
                (Exclusion, "prior anti-pd-1 therapy"),
            ],
        },
        Case {
            name: "inline_paragraph",
            input: "Inclusion: Age 18 and older, ECOG 0-1. Exclusion: Brain metastases allowed if \
                    treated and stable. Prior anti-PD-1 therapy excluded.",
            expected: &[
                (Inclusion, "age 18 and older, ecog 0-1"),
                (Exclusion, "brain metastases allowed if treated and stable"),
                (Exclusion, "prior anti-pd-1 therapy excluded"),
            ],
        },
        Case {
            name: "preamble_defaults_to_inclusion",
            input: "Washout period of 30 days.\nExclusion Criteria\n1) Active hepatitis B",
            expected: &[
                (Inclusion, "washout period of 30 days"),
                (Exclusion, "active hepatitis b"),
            ],
        },
        Case {
            name: "wrapped_bullet",
            input: "Exclusion Criteria:\n- Patients with more than 5 prior lines\n  of systemic therapy",
            expected: &[(
                Exclusion,
                "patients with more than 5 prior lines of systemic therapy",
            )],
        },
        Case {
            name: "numbered_with_semicolons",
            input: "1. ECOG 0 or 1; life expectancy ≥ 12 weeks\n2. Adequate organ function",
            expected: &[
                (Inclusion, "ecog 0 or 1"),
                (Inclusion, "life expectancy ≥ 12 weeks"),
                (Inclusion, "adequate organ function"),
            ],
        },
        Case {
            name: "nbsp_and_tabs",
            input: "Inclusion Criteria:\n-\tAge\u{00A0}18\u{00A0}to 75 years",
            expected: &[(Inclusion, "age 18 to 75 years")],
        },
    ];

    for case in cases {
        let doc = normalize(case.name, Some(case.input), &NormalizeConfig::default());
        let actual: Vec<(SectionKind, &str)> = doc
            .sentences
            .iter()
            .map(|s| (s.section, s.text.as_str()))
            .collect();
        assert_eq!(actual, case.expected, "sentence mismatch for {}", case.name);
    }
}

#[test]
fn normalization_is_deterministic() {
    let input = "Inclusion Criteria:\n- EGFR mutation positive\nExclusion Criteria:\n- HIV";
    let cfg = NormalizeConfig::default();
    let first = normalize("NCT1", Some(input), &cfg);
    for _ in 0..10 {
        assert_eq!(normalize("NCT1", Some(input), &cfg), first);
    }
}

#[test]
fn version_bump_changes_hash_only() {
    let input = "ECOG 0-2";
    let v1 = normalize("NCT1", Some(input), &NormalizeConfig::default());
    let v2 = normalize(
        "NCT1",
        Some(input),
        &NormalizeConfig {
            version: 2,
            ..Default::default()
        },
    );
    assert_ne!(v1.content_hash, v2.content_hash);
    assert_eq!(v1.sentences, v2.sentences);
}
