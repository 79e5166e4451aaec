//! Built-in reference data for the demo shell.

use arm_core::models::{ActivePrescription, Gender, Patient, PrescribedMedication, Prescription};
use arm_core::{CatalogError, MedicationCatalog};

use super::ProfileRecord;

const MEDICATIONS_JSON: &str = include_str!("../../data/medications.json");

/// Catalog of the bundled monographs.
pub fn catalog() -> Result<MedicationCatalog, CatalogError> {
    MedicationCatalog::from_json(MEDICATIONS_JSON)
}

/// Patient shown before any profile is selected.
pub fn demo_patient() -> Patient {
    Patient {
        sns: None,
        name: "João Silva".into(),
        age: 67,
        weight: 78.0,
        gender: Gender::Male,
        conditions: strings(&["Fibrilhação Auricular", "Diabetes Tipo 2"]),
        creatinine: 1.2,
        creatinine_clearance: Some(65.0),
        current_medications: strings(&["apixabano", "metformina"]),
    }
}

/// Prescription open in the prescribing system.
pub fn active_prescription() -> Prescription {
    Prescription {
        prescriber: "Dr. Maria Santos".into(),
        date: "2025-01-08".into(),
        medications: vec![
            PrescribedMedication {
                id: "apixabano".into(),
                dose: "5mg".into(),
                frequency: "2x/dia".into(),
            },
            PrescribedMedication {
                id: "metformina".into(),
                dose: "850mg".into(),
                frequency: "2x/dia".into(),
            },
        ],
    }
}

/// Patients known to the demo endpoint.
pub fn demo_patient_records() -> Vec<ProfileRecord> {
    vec![
        ProfileRecord {
            sns: "123456789".into(),
            name: "Maria Silva Santos".into(),
            age: 65,
            weight: 70.0,
            gender: Gender::Female,
            conditions: Some(strings(&["Hipertensão", "Diabetes Tipo 2", "Dislipidemia"])),
            creatinine: Some(1.4),
            creatinine_clearance: Some(45.0),
            current_medications: Some(strings(&[
                "Lisinopril 10mg",
                "Metformina 850mg",
                "Atorvastatina 20mg",
            ])),
            active_prescriptions: Some(vec![
                line("1", "Lisinopril", "10mg", "1x/dia"),
                line("2", "Metformina", "850mg", "2x/dia"),
                line("3", "Atorvastatina", "20mg", "1x/dia"),
            ]),
        },
        ProfileRecord {
            sns: "987654321".into(),
            name: "João Pedro Costa".into(),
            age: 78,
            weight: 82.0,
            gender: Gender::Male,
            conditions: Some(strings(&[
                "Fibrilação Atrial",
                "Insuficiência Cardíaca",
                "Hipertensão",
            ])),
            creatinine: Some(1.8),
            creatinine_clearance: Some(38.0),
            current_medications: Some(strings(&[
                "Apixabano 5mg",
                "Furosemida 40mg",
                "Carvedilol 6.25mg",
            ])),
            active_prescriptions: Some(vec![
                line("1", "Apixabano", "5mg", "2x/dia"),
                line("2", "Furosemida", "40mg", "1x/dia"),
                line("3", "Carvedilol", "6.25mg", "2x/dia"),
            ]),
        },
        ProfileRecord {
            sns: "456789123".into(),
            name: "Ana Luísa Ferreira".into(),
            age: 52,
            weight: 68.0,
            gender: Gender::Female,
            conditions: Some(strings(&["Depressão", "Ansiedade"])),
            creatinine: Some(0.9),
            creatinine_clearance: Some(85.0),
            current_medications: Some(strings(&["Sertralina 50mg", "Lorazepam 1mg"])),
            active_prescriptions: Some(vec![
                line("1", "Sertralina", "50mg", "1x/dia"),
                line("2", "Lorazepam", "1mg", "SOS"),
            ]),
        },
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn line(id: &str, name: &str, dose: &str, frequency: &str) -> ActivePrescription {
    ActivePrescription {
        id: id.into(),
        name: name.into(),
        dose: dose.into(),
        frequency: frequency.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_core::clinical::AlertEvaluator;
    use arm_core::models::AlertKind;

    #[test]
    fn test_bundled_catalog_parses() {
        let catalog = catalog().unwrap();
        assert_eq!(catalog.len(), 3);

        let apixabano = catalog.get("apixabano").unwrap();
        assert_eq!(apixabano.atc_code, "B01AF02");
        assert!(apixabano.sections.renal_impairment.is_some());
        assert_eq!(apixabano.applicable_calculators().count(), 1);
        assert_eq!(apixabano.source_urls().len(), 1);
    }

    #[test]
    fn test_prescription_resolves_against_catalog() {
        let catalog = catalog().unwrap();
        let prescription = active_prescription();
        assert!(prescription.medication_ids().iter().all(|id| catalog.contains(id)));
        assert_eq!(prescription.date, "2025-01-08");
    }

    #[test]
    fn test_demo_patient_has_no_contextual_alerts() {
        let catalog = catalog().unwrap();
        let evaluator = AlertEvaluator::default();
        let patient = demo_patient();

        for medication in catalog.iter() {
            assert!(evaluator.evaluate(&patient, &medication.alerts).is_empty());
        }
        // Bleeding rules exist but are not evaluated
        let apixabano = catalog.get("apixabano").unwrap();
        assert!(apixabano.alerts.iter().any(|a| a.kind == AlertKind::Bleeding));
    }

    #[test]
    fn test_demo_records_are_valid() {
        let records = demo_patient_records();
        assert_eq!(records.len(), 3);
        for record in records {
            assert!(record.into_profile(&Default::default()).is_ok());
        }
    }
}
