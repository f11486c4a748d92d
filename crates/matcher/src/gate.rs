//! Hard gates.
//!
//! Gates run in a fixed order and the first failure short-circuits with one
//! reason. A gate whose patient-side input is unknown passes and leaves a
//! warning instead; so does a gate whose trial-side bound is unknown, but
//! silently.

use extract::{
    parse_patient_marker, BiomarkerRequirement, Condition, CriteriaRecord, ExclusionStatus,
    PatientMarker, Sex,
};

use crate::types::{Gate, PatientProfile};

/// A validated patient plus the findings parsed once per evaluation batch.
pub(crate) struct Candidate<'a> {
    pub(crate) patient: &'a PatientProfile,
    pub(crate) markers: Vec<PatientMarker>,
    pub(crate) unrecognized_markers: Vec<&'a str>,
}

impl<'a> Candidate<'a> {
    pub(crate) fn new(patient: &'a PatientProfile) -> Self {
        let mut markers = Vec::new();
        let mut unrecognized_markers = Vec::new();
        for finding in &patient.biomarkers {
            match parse_patient_marker(finding) {
                Some(marker) => markers.push(marker),
                None => unrecognized_markers.push(finding.as_str()),
            }
        }
        Self {
            patient,
            markers,
            unrecognized_markers,
        }
    }
}

#[derive(Debug)]
pub(crate) struct GateFailure {
    pub(crate) gate: Gate,
    pub(crate) reason: String,
}

type GateCheck = fn(&Candidate<'_>, &CriteriaRecord, &mut Vec<String>) -> Option<String>;

const GATES: [(Gate, GateCheck); 6] = [
    (Gate::Age, age_gate),
    (Gate::Sex, sex_gate),
    (Gate::Ecog, ecog_gate),
    (Gate::Comorbidity, comorbidity_gate),
    (Gate::Biomarker, biomarker_gate),
    (Gate::PriorTherapy, prior_therapy_gate),
];

pub(crate) fn run_gates(
    candidate: &Candidate<'_>,
    record: &CriteriaRecord,
    warnings: &mut Vec<String>,
) -> Result<(), GateFailure> {
    for (gate, check) in GATES {
        if let Some(reason) = check(candidate, record, warnings) {
            return Err(GateFailure { gate, reason });
        }
    }
    Ok(())
}

fn age_gate(c: &Candidate<'_>, record: &CriteriaRecord, _: &mut Vec<String>) -> Option<String> {
    let age = c.patient.age?;
    if let Some(min) = record.age_min {
        if age < min {
            return Some(format!("Age below minimum ({age} < {min})"));
        }
    }
    if let Some(max) = record.age_max {
        if age > max {
            return Some(format!("Age above maximum ({age} > {max})"));
        }
    }
    None
}

fn sex_gate(c: &Candidate<'_>, record: &CriteriaRecord, warnings: &mut Vec<String>) -> Option<String> {
    if record.sex == Sex::All {
        return None;
    }
    match c.patient.sex {
        None | Some(Sex::All) => {
            warnings.push(format!(
                "Sex unknown; trial enrolls {} patients only",
                record.sex.as_str()
            ));
            None
        }
        Some(sex) if sex != record.sex => Some(format!(
            "Trial enrolls {} patients only",
            record.sex.as_str()
        )),
        Some(_) => None,
    }
}

fn ecog_gate(c: &Candidate<'_>, record: &CriteriaRecord, warnings: &mut Vec<String>) -> Option<String> {
    let max = record.ecog_max?;
    match c.patient.ecog {
        None => {
            warnings.push(format!("ECOG unknown; trial requires ECOG ≤ {max}"));
            None
        }
        Some(ecog) if ecog > max => Some(format!("ECOG exceeds maximum ({ecog} > {max})")),
        Some(_) => None,
    }
}

fn comorbidity_gate(c: &Candidate<'_>, record: &CriteriaRecord, _: &mut Vec<String>) -> Option<String> {
    c.patient.comorbidities.iter().find_map(|comorbidity| {
        Condition::from_comorbidity(comorbidity)
            .into_iter()
            .find(|condition| record.exclusion_status(*condition) == ExclusionStatus::Excluded)
            .map(|condition| format!("Excluded condition: {comorbidity} ({})", condition.as_str()))
    })
}

fn biomarker_gate(c: &Candidate<'_>, record: &CriteriaRecord, warnings: &mut Vec<String>) -> Option<String> {
    if record.biomarker_requirements.is_empty() {
        return None;
    }
    if c.patient.biomarkers.is_empty() {
        let required: Vec<String> = record
            .biomarker_requirements
            .iter()
            .map(ToString::to_string)
            .collect();
        warnings.push(format!(
            "Biomarker status unknown; trial requires {}",
            required.join(", ")
        ));
        return None;
    }
    for finding in &c.unrecognized_markers {
        warnings.push(format!("Unrecognized biomarker finding: {finding}"));
    }
    for requirement in &record.biomarker_requirements {
        match assess(requirement, &c.markers) {
            MarkerFit::Unmet(reason) => return Some(reason),
            MarkerFit::Unconfirmed(note) => warnings.push(note),
            MarkerFit::Satisfied => {}
        }
    }
    None
}

fn prior_therapy_gate(
    c: &Candidate<'_>,
    record: &CriteriaRecord,
    warnings: &mut Vec<String>,
) -> Option<String> {
    if record.prior_therapy_min.is_none() && record.prior_therapy_max.is_none() {
        return None;
    }
    let Some(count) = c.patient.prior_therapy_count else {
        warnings.push("Prior therapy count unknown; trial limits prior therapies".into());
        return None;
    };
    if let Some(min) = record.prior_therapy_min {
        if count < min {
            return Some(format!("Prior therapies below minimum ({count} < {min})"));
        }
    }
    if let Some(max) = record.prior_therapy_max {
        if count > max {
            return Some(format!("Prior therapies exceed maximum ({count} > {max})"));
        }
    }
    None
}

/// How a patient's findings stand against one requirement.
#[derive(Debug, PartialEq)]
pub(crate) enum MarkerFit {
    Satisfied,
    /// Not decidable from the findings; never disqualifying.
    Unconfirmed(String),
    Unmet(String),
}

/// Judge one requirement against parsed findings. Callers handle the
/// "patient reported no biomarkers at all" case before this.
pub(crate) fn assess(requirement: &BiomarkerRequirement, markers: &[PatientMarker]) -> MarkerFit {
    let findings: Vec<&PatientMarker> = markers
        .iter()
        .filter(|m| requirement.biomarker.covers(m.biomarker))
        .collect();

    if !requirement.polarity.is_present() {
        return match findings.iter().find(|m| m.polarity.is_present()) {
            Some(found) => MarkerFit::Unmet(format!(
                "{} must be {} (patient: {})",
                requirement.biomarker, requirement.polarity, found.polarity
            )),
            None if findings.is_empty() => MarkerFit::Unconfirmed(format!(
                "{} status unknown; trial requires {}",
                requirement.biomarker, requirement.polarity
            )),
            None => MarkerFit::Satisfied,
        };
    }

    let present: Vec<&PatientMarker> = findings
        .iter()
        .copied()
        .filter(|m| m.polarity.is_present())
        .collect();
    if present.is_empty() {
        return MarkerFit::Unmet(format!("Required biomarker missing: {requirement}"));
    }
    let Some(threshold) = requirement.threshold else {
        return MarkerFit::Satisfied;
    };
    let values: Vec<f32> = present.iter().filter_map(|m| m.value).collect();
    if values.iter().any(|v| *v >= threshold) {
        MarkerFit::Satisfied
    } else if values.len() < present.len() {
        MarkerFit::Unconfirmed(format!(
            "{} level unknown; trial requires ≥ {threshold}",
            requirement.biomarker
        ))
    } else {
        let best = values.iter().copied().fold(f32::MIN, f32::max);
        MarkerFit::Unmet(format!(
            "{} below required threshold ({best} < {threshold})",
            requirement.biomarker
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{Biomarker, Polarity};

    fn requirement(biomarker: Biomarker, polarity: Polarity, threshold: Option<f32>) -> BiomarkerRequirement {
        BiomarkerRequirement {
            biomarker,
            polarity,
            threshold,
        }
    }

    fn markers(findings: &[&str]) -> Vec<PatientMarker> {
        findings
            .iter()
            .filter_map(|f| parse_patient_marker(f))
            .collect()
    }

    #[test]
    fn presence_requirement() {
        let egfr = requirement(Biomarker::Egfr, Polarity::Mutated, None);
        assert_eq!(assess(&egfr, &markers(&["EGFR exon 19 deletion"])), MarkerFit::Satisfied);
        assert!(matches!(
            assess(&egfr, &markers(&["ALK positive"])),
            MarkerFit::Unmet(reason) if reason.starts_with("Required biomarker missing")
        ));
        assert!(matches!(
            assess(&egfr, &markers(&["EGFR wild-type"])),
            MarkerFit::Unmet(_)
        ));
    }

    #[test]
    fn absence_requirement() {
        let kras = requirement(Biomarker::Kras, Polarity::WildType, None);
        assert_eq!(assess(&kras, &markers(&["KRAS wild-type"])), MarkerFit::Satisfied);
        assert!(matches!(
            assess(&kras, &markers(&["KRAS G12C"])),
            MarkerFit::Unmet(reason) if reason.contains("must be wild-type")
        ));
        assert!(matches!(
            assess(&kras, &markers(&["EGFR positive"])),
            MarkerFit::Unconfirmed(_)
        ));
    }

    #[test]
    fn threshold_only_fails_when_both_values_known() {
        let pdl1 = requirement(Biomarker::PdL1, Polarity::Positive, Some(50.0));
        assert_eq!(assess(&pdl1, &markers(&["PD-L1 80%"])), MarkerFit::Satisfied);
        assert!(matches!(
            assess(&pdl1, &markers(&["PD-L1 20%"])),
            MarkerFit::Unmet(reason) if reason.contains("below required threshold")
        ));
        assert!(matches!(
            assess(&pdl1, &markers(&["PD-L1 positive"])),
            MarkerFit::Unconfirmed(_)
        ));
    }

    #[test]
    fn generic_brca_requirement_accepts_either_gene() {
        let brca = requirement(Biomarker::Brca, Polarity::Mutated, None);
        assert_eq!(assess(&brca, &markers(&["BRCA2 mutation"])), MarkerFit::Satisfied);
    }

    #[test]
    fn gates_run_in_order() {
        let patient = PatientProfile::new(90.0, "NSCLC")
            .with_sex(Sex::Male)
            .with_ecog(3);
        let mut record = CriteriaRecord::new("NCT1")
            .with_age_range(Some(18.0), Some(75.0))
            .with_ecog_max(1);
        record.sex = Sex::Female;

        let mut warnings = Vec::new();
        let failure = run_gates(&Candidate::new(&patient), &record, &mut warnings)
            .expect_err("patient should be excluded");
        assert_eq!(failure.gate, Gate::Age);
        assert_eq!(failure.reason, "Age above maximum (90 > 75)");
    }

    #[test]
    fn unknown_patient_fields_warn_instead_of_gating() {
        let patient = PatientProfile::new(60.0, "NSCLC");
        let mut record = CriteriaRecord::new("NCT1").with_ecog_max(1);
        record.sex = Sex::Female;
        record.prior_therapy_max = Some(2);
        record.biomarker_requirements = vec![requirement(Biomarker::Alk, Polarity::Positive, None)];

        let mut warnings = Vec::new();
        assert!(run_gates(&Candidate::new(&patient), &record, &mut warnings).is_ok());
        assert_eq!(warnings.len(), 4);
        assert!(warnings[0].starts_with("Sex unknown"));
        assert!(warnings[1].starts_with("ECOG unknown"));
        assert!(warnings[2].starts_with("Biomarker status unknown"));
        assert!(warnings[3].starts_with("Prior therapy count unknown"));
    }
}
