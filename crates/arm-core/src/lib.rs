//! ARM Core Library
//!
//! Patient-contextualised medication reference: which alerts matter for the
//! patient in front of the prescriber, and which medications are under review.
//!
//! # Architecture
//!
//! ```text
//!   SNS input ──► validation ──► ProfileLoader ──► cache ──► lookup collaborator
//!                                      │
//!                                      ▼
//!                               current Patient
//!                                      │
//!   MedicationCatalog ──► search / import batch ──► displayed medications
//!                                      │
//!                   ┌──────────────────┼──────────────────┐
//!                   ▼                  ▼                  ▼
//!            AlertEvaluator      SelectionSet       StatusNotifier
//!                   └──────────────────┼──────────────────┘
//!                                      ▼
//!                            presentation shell
//! ```
//!
//! # Modules
//!
//! - [`models`]: Domain types (Patient, Medication, AlertRule, Prescription)
//! - [`clinical`]: Cockcroft-Gault clearance and contextual alert evaluation
//! - [`catalog`]: Immutable medication catalog with typo-tolerant search
//! - [`selection`]: Review selection set
//! - [`status`]: Integration status map with subscribers
//! - [`profiles`]: Patient profile loader and collaborator traits
//! - [`session`]: Per-window context tying the above together
//! - [`config`]: Startup configuration

pub mod catalog;
pub mod clinical;
pub mod config;
pub mod models;
pub mod profiles;
pub mod selection;
pub mod session;
pub mod status;

// Re-export commonly used types
pub use catalog::{CatalogError, MedicationCatalog};
pub use clinical::{cockcroft_gault, AlertEvaluator, ClinicalError, PatientFlags, UnevaluatedAlertPolicy};
pub use config::{ArmConfig, ConfigError, ProfileDefaults};
pub use models::{
    AlertKind, AlertRule, Gender, Medication, Patient, PatientProfile, Prescription, ProfileOption,
    Severity, Sns, SnsError,
};
pub use profiles::{PatientLookup, PatientSource, ProfileError, ProfileLoader, SourceError};
pub use selection::SelectionSet;
pub use session::{LinkOpener, LookupOutcome, Session, SessionError};
pub use status::{IntegrationKind, IntegrationStatus, StatusMap, StatusNotifier, StatusState, SubscriptionId};
