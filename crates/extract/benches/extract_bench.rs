use canonical::{normalize, NormalizeConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use extract::{build_record, ExtractConfig};

const TRIAL: &str = "Inclusion Criteria:
- Age ≥ 18 years
- Histologically confirmed stage IIIB-IV non-small cell lung cancer
- EGFR mutation (exon 19 deletion or L858R); PD-L1 TPS ≥ 50%
- ECOG performance status 0-1
- No more than 2 prior lines of systemic therapy
Exclusion Criteria:
- Symptomatic brain metastases; treated and stable brain metastases are permitted
- Known HIV infection or active hepatitis B or C
- Prior anti-PD-1 therapy
- Any anticancer therapy within 21 days of the first dose";

fn bench_build_record(c: &mut Criterion) {
    let doc = normalize("NCT0", Some(TRIAL), &NormalizeConfig::default());
    let config = ExtractConfig::default();

    c.bench_function("build_record", |b| {
        b.iter(|| build_record(black_box(&doc), black_box(&config)))
    });

    c.bench_function("normalize_and_build", |b| {
        b.iter(|| {
            let doc = normalize(black_box("NCT0"), Some(black_box(TRIAL)), &NormalizeConfig::default());
            build_record(&doc, &config)
        })
    });
}

criterion_group!(benches, bench_build_record);
criterion_main!(benches);
