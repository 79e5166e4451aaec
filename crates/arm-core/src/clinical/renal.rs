//! Renal function estimation.

use serde::{Deserialize, Serialize};

use super::{ClinicalError, ClinicalResult};
use crate::models::{Gender, Patient};

/// Clearance at or below which renal alerts fire (mL/min).
pub const SEVERE_RENAL_IMPAIRMENT_CLEARANCE: f64 = 30.0;

/// Age from which a patient is flagged as elderly.
pub const ADVANCED_AGE_YEARS: u32 = 80;

/// Weight at or below which an elderly patient triggers age alerts (kg).
pub const LOW_BODY_WEIGHT_KG: f64 = 60.0;

/// Cockcroft-Gault estimate of creatinine clearance in mL/min.
///
/// `((140 - age) * weight * factor) / (72 * creatinine)` with factor 0.85 for
/// female patients. Rejects inputs that would yield an infinite, zero or
/// negative clearance.
pub fn cockcroft_gault(age: u32, weight_kg: f64, creatinine: f64, gender: Gender) -> ClinicalResult<f64> {
    if age == 0 || age >= 140 {
        return Err(ClinicalError::InvalidInput(format!(
            "age must be between 1 and 139 years, got {}",
            age
        )));
    }
    if !weight_kg.is_finite() || weight_kg <= 0.0 {
        return Err(ClinicalError::InvalidInput(format!(
            "weight must be positive, got {}",
            weight_kg
        )));
    }
    if !creatinine.is_finite() || creatinine <= 0.0 {
        return Err(ClinicalError::InvalidInput(format!(
            "serum creatinine must be positive, got {}",
            creatinine
        )));
    }

    let age = f64::from(age);
    Ok(((140.0 - age) * weight_kg * gender.clearance_factor()) / (72.0 * creatinine))
}

/// Patient-level warnings shown regardless of the medication under review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientFlags {
    /// Effective clearance at or below 30 mL/min
    pub renal_impairment: bool,
    /// Age 80 or above
    pub advanced_age: bool,
}

impl PatientFlags {
    pub fn for_patient(patient: &Patient) -> Self {
        Self {
            renal_impairment: has_severe_renal_impairment(patient),
            advanced_age: patient.age >= ADVANCED_AGE_YEARS,
        }
    }

    pub fn any(&self) -> bool {
        self.renal_impairment || self.advanced_age
    }
}

/// Whether the patient's effective clearance is at or below the renal threshold.
pub fn has_severe_renal_impairment(patient: &Patient) -> bool {
    patient
        .effective_clearance()
        .is_some_and(|c| c <= SEVERE_RENAL_IMPAIRMENT_CLEARANCE)
}

/// Whether the patient is both elderly and of low body weight.
pub fn is_frail_elderly(patient: &Patient) -> bool {
    patient.age >= ADVANCED_AGE_YEARS && patient.weight <= LOW_BODY_WEIGHT_KG
}
