//! Patient profile collaborators.
//!
//! - [`profile_file`]: the `patient_profiles_rxchecker.json` export on disk
//! - [`mock_endpoint`]: demo lookup endpoint answering with JSON envelopes
//! - [`reference_data`]: built-in medications, demo patient and prescription

mod mock_endpoint;
mod profile_file;
pub mod reference_data;

pub use mock_endpoint::*;
pub use profile_file::*;

use serde::{Deserialize, Serialize};

use arm_core::models::{ActivePrescription, Gender, PatientProfile, Sns};
use arm_core::profiles::{SourceError, SourceResult};
use arm_core::ProfileDefaults;

/// Patient record as found in exports and endpoint payloads.
///
/// Clinical fields may be missing; [`ProfileRecord::into_profile`] fills them
/// from [`ProfileDefaults`]. A missing clearance is left for the core to derive
/// unless creatinine is missing too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub sns: String,
    pub name: String,
    pub age: u32,
    pub weight: f64,
    pub gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creatinine: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creatinine_clearance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_medications: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_prescriptions: Option<Vec<ActivePrescription>>,
}

impl ProfileRecord {
    /// Validate the identifier and fill missing clinical values.
    ///
    /// Zero or negative lab values count as missing. The default clearance is
    /// only used when the record carries neither clearance nor creatinine.
    pub fn into_profile(self, defaults: &ProfileDefaults) -> SourceResult<PatientProfile> {
        let sns = Sns::parse(&self.sns).map_err(|e| {
            SourceError::Format(format!("profile '{}' has SNS {:?}: {}", self.name, self.sns, e))
        })?;

        let creatinine = positive(self.creatinine);
        let creatinine_clearance = match (positive(self.creatinine_clearance), creatinine) {
            (Some(supplied), _) => Some(supplied),
            (None, Some(_)) => None,
            (None, None) => Some(defaults.creatinine_clearance),
        };

        Ok(PatientProfile {
            sns,
            name: self.name,
            age: self.age,
            weight: self.weight,
            gender: self.gender,
            conditions: self
                .conditions
                .unwrap_or_else(|| defaults.conditions.clone()),
            creatinine: creatinine.unwrap_or(defaults.creatinine),
            creatinine_clearance,
            current_medications: self
                .current_medications
                .unwrap_or_else(|| defaults.current_medications.clone()),
            active_prescriptions: self.active_prescriptions.unwrap_or_default(),
        })
    }
}

impl From<&PatientProfile> for ProfileRecord {
    fn from(profile: &PatientProfile) -> Self {
        Self {
            sns: profile.sns.to_string(),
            name: profile.name.clone(),
            age: profile.age,
            weight: profile.weight,
            gender: profile.gender,
            conditions: Some(profile.conditions.clone()),
            creatinine: Some(profile.creatinine),
            creatinine_clearance: profile.creatinine_clearance,
            current_medications: Some(profile.current_medications.clone()),
            active_prescriptions: Some(profile.active_prescriptions.clone()),
        }
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

/// Convert records, skipping the ones with an invalid identifier.
pub(crate) fn into_profiles(
    records: Vec<ProfileRecord>,
    defaults: &ProfileDefaults,
) -> Vec<PatientProfile> {
    records
        .into_iter()
        .filter_map(|record| match record.into_profile(defaults) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!("Skipping patient profile: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse(sns: &str) -> ProfileRecord {
        serde_json::from_value(serde_json::json!({
            "sns": sns,
            "name": "Ana Luísa Ferreira",
            "age": 52,
            "weight": 68,
            "gender": "F"
        }))
        .unwrap()
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let profile = sparse("456789123").into_profile(&ProfileDefaults::default()).unwrap();
        assert_eq!(profile.conditions, vec!["Hipertensão", "Diabetes Tipo 2"]);
        assert_eq!(profile.creatinine, 1.2);
        assert_eq!(profile.creatinine_clearance, Some(65.0));
        assert_eq!(profile.current_medications, vec!["Lisinopril", "Metformina"]);
        assert!(profile.active_prescriptions.is_empty());
    }

    #[test]
    fn test_present_fields_win() {
        let mut record = sparse("456789123");
        record.creatinine = Some(0.9);
        record.creatinine_clearance = Some(0.0);
        record.conditions = Some(vec![]);

        let profile = record.into_profile(&ProfileDefaults::default()).unwrap();
        assert_eq!(profile.creatinine, 0.9);
        // Creatinine present: clearance is derived downstream
        assert_eq!(profile.creatinine_clearance, None);
        assert!(profile.conditions.is_empty());
    }

    #[test]
    fn test_supplied_clearance_is_kept() {
        let mut record = sparse("456789123");
        record.creatinine = Some(3.0);
        record.creatinine_clearance = Some(12.0);

        let profile = record.into_profile(&ProfileDefaults::default()).unwrap();
        assert_eq!(profile.creatinine_clearance, Some(12.0));
    }

    #[test]
    fn test_bad_sns_is_a_format_error() {
        let result = sparse("4567").into_profile(&ProfileDefaults::default());
        assert!(matches!(result, Err(SourceError::Format(_))));
    }

    #[test]
    fn test_invalid_records_are_skipped() {
        let profiles = into_profiles(
            vec![sparse("456789123"), sparse("12AB"), sparse("987654321")],
            &ProfileDefaults::default(),
        );
        let sns: Vec<String> = profiles.iter().map(|p| p.sns.to_string()).collect();
        assert_eq!(sns, vec!["456789123", "987654321"]);
    }
}
