//! Patient models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clinical::{cockcroft_gault, ClinicalResult};

/// Number of digits in an SNS identifier.
pub const SNS_LENGTH: usize = 9;

/// Rejection reasons for a candidate SNS identifier.
///
/// The display text is user-facing and shown inline next to the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnsError {
    #[error("SNS number is required")]
    Missing,

    #[error("SNS number must be exactly 9 digits")]
    Malformed,
}

/// National health-service patient identifier (exactly nine ASCII digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sns(String);

impl Sns {
    /// Validate a raw identifier. No trimming is applied.
    pub fn parse(raw: &str) -> Result<Self, SnsError> {
        if raw.is_empty() {
            return Err(SnsError::Missing);
        }
        if raw.len() != SNS_LENGTH || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SnsError::Malformed);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Sns {
    type Err = SnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Sns {
    type Error = SnsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Sns> for String {
    fn from(sns: Sns) -> Self {
        sns.0
    }
}

impl fmt::Display for Sns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Biological sex as used by the Cockcroft-Gault formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    /// Cockcroft-Gault correction factor.
    pub fn clearance_factor(self) -> f64 {
        match self {
            Gender::Male => 1.0,
            Gender::Female => 0.85,
        }
    }
}

/// The patient the clinician is currently prescribing for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// SNS identifier, absent for manually entered patients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sns: Option<Sns>,
    pub name: String,
    /// Age in whole years
    pub age: u32,
    /// Weight in kg
    pub weight: f64,
    pub gender: Gender,
    /// Free-text condition labels
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Serum creatinine in mg/dL
    pub creatinine: f64,
    /// Creatinine clearance in mL/min, when supplied by the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creatinine_clearance: Option<f64>,
    /// Free-text labels of current medications
    #[serde(default)]
    pub current_medications: Vec<String>,
}

impl Patient {
    /// Clearance used for clinical decisions.
    ///
    /// A supplied value is trusted as-is; otherwise it is derived with
    /// Cockcroft-Gault. `None` when nothing was supplied and the derivation
    /// inputs are not physiological.
    pub fn effective_clearance(&self) -> Option<f64> {
        self.creatinine_clearance
            .or_else(|| self.derived_clearance().ok())
    }

    /// Clearance recomputed from age, weight, creatinine and gender.
    pub fn derived_clearance(&self) -> ClinicalResult<f64> {
        cockcroft_gault(self.age, self.weight, self.creatinine, self.gender)
    }

    /// Absolute gap between the supplied and the derived clearance, if both exist.
    pub fn clearance_discrepancy(&self) -> Option<f64> {
        let supplied = self.creatinine_clearance?;
        let derived = self.derived_clearance().ok()?;
        Some((supplied - derived).abs())
    }
}

/// A prescription line currently active for a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivePrescription {
    pub id: String,
    pub name: String,
    pub dose: String,
    pub frequency: String,
}

/// Full patient record as delivered by profile sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientProfile {
    pub sns: Sns,
    pub name: String,
    pub age: u32,
    pub weight: f64,
    pub gender: Gender,
    #[serde(default)]
    pub conditions: Vec<String>,
    pub creatinine: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creatinine_clearance: Option<f64>,
    #[serde(default)]
    pub current_medications: Vec<String>,
    #[serde(default)]
    pub active_prescriptions: Vec<ActivePrescription>,
}

impl PatientProfile {
    /// Project the profile onto the clinical patient record.
    pub fn to_patient(&self) -> Patient {
        Patient {
            sns: Some(self.sns.clone()),
            name: self.name.clone(),
            age: self.age,
            weight: self.weight,
            gender: self.gender,
            conditions: self.conditions.clone(),
            creatinine: self.creatinine,
            creatinine_clearance: self.creatinine_clearance,
            current_medications: self.current_medications.clone(),
        }
    }

    /// Selector entry for this profile.
    pub fn option(&self) -> ProfileOption {
        ProfileOption {
            sns: self.sns.clone(),
            name: self.name.clone(),
        }
    }
}

/// Identifier/name pair used to populate a patient picker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileOption {
    pub sns: Sns,
    pub name: String,
}
