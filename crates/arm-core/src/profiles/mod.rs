//! Patient profile resolution.
//!
//! Pipeline: SNS validation → in-memory cache → external lookup → cache backfill
//!
//! The bulk and single-patient sources are collaborators implemented outside
//! the core (profile file, mock endpoint); the loader only depends on the
//! traits below.

mod loader;

pub use loader::*;

use thiserror::Error;

use crate::models::{PatientProfile, Sns, SnsError};

/// Failures reported by profile collaborators.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid profile data: {0}")]
    Format(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Profile resolution errors.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// Malformed identifier, shown inline to the user
    #[error("{0}")]
    Validation(#[from] SnsError),

    #[error("No patient found with SNS: {0}")]
    NotFound(Sns),

    #[error("Patient lookup failed: {0}")]
    LookupFailed(#[from] SourceError),
}

pub type ProfileResult<T> = Result<T, ProfileError>;

/// Bulk source of every known profile.
pub trait PatientSource {
    fn load_all(&self) -> SourceResult<Vec<PatientProfile>>;
}

/// Single-patient lookup by validated identifier.
///
/// `Ok(None)` is the ordinary "no such patient" answer; `Err` is reserved for
/// I/O or transport failure.
pub trait PatientLookup {
    fn lookup(&self, sns: &Sns) -> SourceResult<Option<PatientProfile>>;
}

/// Source with no profiles. Used when no bulk source is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProfiles;

impl PatientSource for NoProfiles {
    fn load_all(&self) -> SourceResult<Vec<PatientProfile>> {
        Ok(Vec::new())
    }
}

impl PatientLookup for NoProfiles {
    fn lookup(&self, _sns: &Sns) -> SourceResult<Option<PatientProfile>> {
        Ok(None)
    }
}
