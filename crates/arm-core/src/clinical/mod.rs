//! Clinical rules evaluated against the current patient.
//!
//! - [`renal`]: Cockcroft-Gault creatinine clearance and patient-level flags
//! - [`alerts`]: contextual filtering of a medication's declared alert rules

mod alerts;
mod renal;

pub use alerts::*;
pub use renal::*;

use thiserror::Error;

/// Clinical computation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClinicalError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type ClinicalResult<T> = Result<T, ClinicalError>;
