//! ARM Shell Library
//!
//! Binds the ARM core to the desktop/mobile presentation shell.
//!
//! # Architecture
//!
//! ```text
//!   foreign UI ──► ArmApp (UniFFI object) ──► Mutex<Session>
//!                      │                            │
//!                      │                 ┌──────────┴──────────┐
//!                      │                 ▼                     ▼
//!                      │           ProfileFile          MockEndpointSource
//!                      │        (bulk profiles)         (single lookup)
//!                      │
//!                      ◄── StatusListener / ExternalLinkOpener callbacks
//! ```
//!
//! # Modules
//!
//! - [`sources`]: Profile file, demo endpoint and bundled reference data
//! - [`logging`]: `tracing` subscriber installation

pub mod logging;
pub mod sources;

pub use sources::{
    reference_data, Endpoint, EndpointResponse, EndpointSource, Envelope, MockEndpoint,
    MockEndpointSource, ProfileFile, ProfileRecord,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use arm_core::models::{AlertRule, Gender, Medication, Patient, ProfileOption};
use arm_core::session::{ImportBatch, MedicationReview, SessionError};
use arm_core::status::{IntegrationKind, IntegrationStatus, StatusMap, StatusState, SubscriptionId};
use arm_core::{
    ArmConfig, CatalogError, ClinicalError, ConfigError, LinkOpener, PatientFlags, ProfileError,
    ProfileLoader, Session, SourceError,
};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ArmError {
    /// Malformed SNS identifier; show next to the input field
    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ProfileError> for ArmError {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::Validation(_) => ArmError::Validation(e.to_string()),
            ProfileError::NotFound(_) => ArmError::NotFound(e.to_string()),
            ProfileError::LookupFailed(_) => ArmError::LookupFailed(e.to_string()),
        }
    }
}

impl From<SessionError> for ArmError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Profile(e) => e.into(),
            SessionError::UnknownMedication(_) => ArmError::NotFound(e.to_string()),
            SessionError::NothingImported => ArmError::InvalidInput(e.to_string()),
        }
    }
}

impl From<SourceError> for ArmError {
    fn from(e: SourceError) -> Self {
        ArmError::LookupFailed(e.to_string())
    }
}

impl From<ClinicalError> for ArmError {
    fn from(e: ClinicalError) -> Self {
        ArmError::InvalidInput(e.to_string())
    }
}

impl From<ConfigError> for ArmError {
    fn from(e: ConfigError) -> Self {
        ArmError::Config(e.to_string())
    }
}

impl From<CatalogError> for ArmError {
    fn from(e: CatalogError) -> Self {
        ArmError::Data(e.to_string())
    }
}

impl From<serde_json::Error> for ArmError {
    fn from(e: serde_json::Error) -> Self {
        ArmError::Data(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for ArmError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        ArmError::Internal(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Callback Interfaces
// =========================================================================

/// Receives the full status map after every change.
///
/// Called while the app is locked; implementations must not call back into
/// [`ArmApp`] synchronously.
#[uniffi::export(callback_interface)]
pub trait StatusListener: Send + Sync {
    fn on_status_changed(&self, statuses: Vec<FfiStatusEntry>);
}

/// Opens reference links in the system browser.
#[uniffi::export(callback_interface)]
pub trait ExternalLinkOpener: Send + Sync {
    fn open_url(&self, url: String);
}

struct ForeignLinkOpener(Box<dyn ExternalLinkOpener>);

impl LinkOpener for ForeignLinkOpener {
    fn open(&self, url: &str) {
        self.0.open_url(url.to_string());
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Start the app from an optional JSON configuration.
///
/// `ARM_*` environment variables are applied on top, then logging is
/// initialised with the resulting filter.
#[uniffi::export]
pub fn open_app(config_json: Option<String>) -> Result<Arc<ArmApp>, ArmError> {
    let config = match config_json {
        Some(json) => ArmConfig::from_json_str(&json)?,
        None => ArmConfig::default(),
    }
    .with_env_overrides(|key| std::env::var(key).ok())?;

    logging::init(&config.log_filter);
    Ok(ArmApp::from_session(build_session(&config)?))
}

/// Cockcroft-Gault creatinine clearance in mL/min.
#[uniffi::export]
pub fn creatinine_clearance(
    age: u32,
    weight_kg: f64,
    creatinine: f64,
    gender: FfiGender,
) -> Result<f64, ArmError> {
    Ok(arm_core::cockcroft_gault(age, weight_kg, creatinine, gender.into())?)
}

/// Wire the bundled collaborators into a session.
///
/// Bulk profiles come from the profile file; single lookups go through the
/// demo endpoint, which also falls back to that file.
pub fn build_session(config: &ArmConfig) -> Result<Session, ArmError> {
    let file = ProfileFile::from_config(config);
    if config.desktop_fallback {
        if let Err(e) = file.copy_from_desktop_if_needed() {
            tracing::warn!("Failed to copy patient profiles from Desktop: {}", e);
        }
    }

    let endpoint = MockEndpoint::new().with_profiles_file(file.path());
    let lookup = MockEndpointSource::new(endpoint, config.profile_defaults.clone());
    let loader = ProfileLoader::new(file, lookup);

    let catalog = reference_data::catalog()?;
    tracing::info!("Medication catalog loaded: {} medications", catalog.len());

    let mut session = Session::new(catalog, loader, config);
    session.set_patient(reference_data::demo_patient());
    Ok(session)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe session wrapper for FFI.
#[derive(uniffi::Object)]
pub struct ArmApp {
    session: Arc<Mutex<Session>>,
}

impl ArmApp {
    pub fn from_session(session: Session) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::new(Mutex::new(session)),
        })
    }
}

#[uniffi::export]
impl ArmApp {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Patients available in the picker.
    pub fn profile_options(&self) -> Result<Vec<FfiProfileOption>, ArmError> {
        let mut session = self.session.lock()?;
        let options = session.load_profile_options()?;
        Ok(options.into_iter().map(|o| o.into()).collect())
    }

    /// Validate and resolve an SNS identifier, making it the current patient.
    pub fn select_patient(&self, sns: String) -> Result<FfiPatient, ArmError> {
        let mut session = self.session.lock()?;
        session.select_patient(&sns)?;
        current(&session)
    }

    pub fn current_patient(&self) -> Result<Option<FfiPatient>, ArmError> {
        let session = self.session.lock()?;
        Ok(session.patient().map(FfiPatient::from_patient))
    }

    /// Replace the current patient with manually entered data.
    pub fn set_patient(&self, patient: FfiPatientInput) -> Result<FfiPatient, ArmError> {
        let mut session = self.session.lock()?;
        session.set_patient(patient.into());
        current(&session)
    }

    // =========================================================================
    // Medication List
    // =========================================================================

    pub fn set_search_term(&self, term: String) -> Result<(), ArmError> {
        self.session.lock()?.set_search_term(term);
        Ok(())
    }

    pub fn set_show_all(&self, show_all: bool) -> Result<(), ArmError> {
        self.session.lock()?.set_show_all(show_all);
        Ok(())
    }

    /// Medications to render, with the number hidden by the display limit.
    pub fn displayed_medications(&self) -> Result<FfiMedicationList, ArmError> {
        let session = self.session.lock()?;
        let medications = session
            .displayed_medications()
            .into_iter()
            .map(|m| summary(&session, m))
            .collect();
        Ok(FfiMedicationList {
            medications,
            remaining_count: session.remaining_count() as u32,
        })
    }

    /// Full monograph as JSON, for the detail view.
    pub fn medication_detail(&self, medication_id: String) -> Result<String, ArmError> {
        let session = self.session.lock()?;
        let medication = session
            .catalog()
            .get(&medication_id)
            .ok_or_else(|| ArmError::NotFound(format!("Unknown medication: {}", medication_id)))?;
        Ok(serde_json::to_string(medication)?)
    }

    // =========================================================================
    // Import Operations
    // =========================================================================

    /// Import the prescription open in the prescribing system.
    pub fn import_active_prescription(&self) -> Result<FfiImportBatch, ArmError> {
        let mut session = self.session.lock()?;
        session.begin_import();
        let batch = session.import_prescription(&reference_data::active_prescription())?;
        Ok(batch.into())
    }

    pub fn import_medications(&self, medication_ids: Vec<String>) -> Result<FfiImportBatch, ArmError> {
        let mut session = self.session.lock()?;
        session.begin_import();
        let batch = session.import_medications(medication_ids)?;
        Ok(batch.into())
    }

    pub fn clear_import(&self) -> Result<(), ArmError> {
        self.session.lock()?.clear_import();
        Ok(())
    }

    // =========================================================================
    // Selection & Alerts
    // =========================================================================

    /// Toggle a medication in the review selection. Returns the new state.
    pub fn toggle_selection(&self, medication_id: String) -> Result<bool, ArmError> {
        Ok(self.session.lock()?.toggle_selection(&medication_id)?)
    }

    pub fn selected_ids(&self) -> Result<Vec<String>, ArmError> {
        Ok(self.session.lock()?.selected_ids())
    }

    /// Alert rules of one medication that apply to the current patient.
    pub fn contextual_alerts(&self, medication_id: String) -> Result<Vec<FfiAlert>, ArmError> {
        let session = self.session.lock()?;
        let alerts = session.contextual_alerts(&medication_id)?;
        Ok(alerts.into_iter().map(FfiAlert::from).collect())
    }

    /// Selected medications with their alerts, for the clinical panel.
    pub fn review_panel(&self) -> Result<Vec<FfiMedicationReview>, ArmError> {
        let session = self.session.lock()?;
        Ok(session.review_panel().into_iter().map(|r| r.into()).collect())
    }

    // =========================================================================
    // Status Operations
    // =========================================================================

    pub fn statuses(&self) -> Result<Vec<FfiStatusEntry>, ArmError> {
        let session = self.session.lock()?;
        Ok(status_entries(&session.status().snapshot()))
    }

    /// Record a status reported by the shell itself (e.g. the PEM link).
    ///
    /// A well-known key must be reported with its own kind.
    pub fn report_status(&self, key: String, update: FfiStatusUpdate) -> Result<(), ArmError> {
        let kind: IntegrationKind = update.kind.into();
        if let Some(expected) = IntegrationKind::for_key(&key) {
            if expected != kind {
                return Err(ArmError::InvalidInput(format!(
                    "status key '{}' belongs to {:?}, not {:?}",
                    key, expected, kind
                )));
            }
        }

        let mut status = IntegrationStatus::new(kind, update.state.into());
        if let Some(message) = update.message {
            status = status.with_message(message);
        }
        self.session.lock()?.status_mut().set_status(key, status);
        Ok(())
    }

    /// Register a listener. Returns a handle for [`Self::unsubscribe_status`].
    pub fn subscribe_status(&self, listener: Box<dyn StatusListener>) -> Result<u64, ArmError> {
        let mut session = self.session.lock()?;
        let id = session
            .status_mut()
            .subscribe(move |map| listener.on_status_changed(status_entries(map)));
        Ok(id.raw())
    }

    pub fn unsubscribe_status(&self, subscription: u64) -> Result<bool, ArmError> {
        let mut session = self.session.lock()?;
        Ok(session.status_mut().unsubscribe(SubscriptionId::from_raw(subscription)))
    }

    // =========================================================================
    // External Links
    // =========================================================================

    pub fn set_link_opener(&self, opener: Box<dyn ExternalLinkOpener>) -> Result<(), ArmError> {
        self.session.lock()?.set_link_opener(ForeignLinkOpener(opener));
        Ok(())
    }

    pub fn open_reference(&self, url: String) -> Result<(), ArmError> {
        self.session.lock()?.open_reference(&url);
        Ok(())
    }
}

fn current(session: &Session) -> Result<FfiPatient, ArmError> {
    session
        .patient()
        .map(FfiPatient::from_patient)
        .ok_or_else(|| ArmError::NotFound("No current patient".into()))
}

fn summary(session: &Session, medication: &Medication) -> FfiMedicationSummary {
    FfiMedicationSummary {
        id: medication.id.clone(),
        name: medication.name.clone(),
        generic_name: medication.generic_name.clone(),
        atc_code: medication.atc_code.clone(),
        therapeutic_class: medication.therapeutic_class.clone(),
        selected: session.is_selected(&medication.id),
        has_alerts: session.has_alerts(&medication.id),
    }
}

fn status_entries(map: &StatusMap) -> Vec<FfiStatusEntry> {
    map.iter()
        .map(|(key, status)| FfiStatusEntry {
            key: key.clone(),
            kind: status.kind.into(),
            state: status.state.into(),
            message: status.message.clone(),
            data_json: status.data.as_ref().map(|d| d.to_string()),
            updated_at: status.updated_at.clone(),
        })
        .collect()
}

// =========================================================================
// FFI Types
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiGender {
    Male,
    Female,
}

impl From<Gender> for FfiGender {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::Male => FfiGender::Male,
            Gender::Female => FfiGender::Female,
        }
    }
}

impl From<FfiGender> for Gender {
    fn from(gender: FfiGender) -> Self {
        match gender {
            FfiGender::Male => Gender::Male,
            FfiGender::Female => Gender::Female,
        }
    }
}

/// FFI-safe patient with derived clinical values.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub sns: Option<String>,
    pub name: String,
    pub age: u32,
    pub weight: f64,
    pub gender: FfiGender,
    pub conditions: Vec<String>,
    pub creatinine: f64,
    pub creatinine_clearance: Option<f64>,
    /// Supplied clearance, or Cockcroft-Gault when none was supplied
    pub effective_clearance: Option<f64>,
    pub clearance_discrepancy: Option<f64>,
    pub current_medications: Vec<String>,
    pub renal_impairment: bool,
    pub advanced_age: bool,
}

impl FfiPatient {
    fn from_patient(patient: &Patient) -> Self {
        let flags = PatientFlags::for_patient(patient);
        Self {
            sns: patient.sns.as_ref().map(|s| s.to_string()),
            name: patient.name.clone(),
            age: patient.age,
            weight: patient.weight,
            gender: patient.gender.into(),
            conditions: patient.conditions.clone(),
            creatinine: patient.creatinine,
            creatinine_clearance: patient.creatinine_clearance,
            effective_clearance: patient.effective_clearance(),
            clearance_discrepancy: patient.clearance_discrepancy(),
            current_medications: patient.current_medications.clone(),
            renal_impairment: flags.renal_impairment,
            advanced_age: flags.advanced_age,
        }
    }
}

/// Manually entered patient data.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatientInput {
    pub name: String,
    pub age: u32,
    pub weight: f64,
    pub gender: FfiGender,
    pub conditions: Vec<String>,
    pub creatinine: f64,
    pub creatinine_clearance: Option<f64>,
    pub current_medications: Vec<String>,
}

impl From<FfiPatientInput> for Patient {
    fn from(input: FfiPatientInput) -> Self {
        Patient {
            sns: None,
            name: input.name,
            age: input.age,
            weight: input.weight,
            gender: input.gender.into(),
            conditions: input.conditions,
            creatinine: input.creatinine,
            creatinine_clearance: input.creatinine_clearance,
            current_medications: input.current_medications,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProfileOption {
    pub sns: String,
    pub name: String,
}

impl From<ProfileOption> for FfiProfileOption {
    fn from(option: ProfileOption) -> Self {
        Self {
            sns: option.sns.into(),
            name: option.name,
        }
    }
}

/// FFI-safe medication list entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicationSummary {
    pub id: String,
    pub name: String,
    pub generic_name: String,
    pub atc_code: String,
    pub therapeutic_class: String,
    pub selected: bool,
    pub has_alerts: bool,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicationList {
    pub medications: Vec<FfiMedicationSummary>,
    pub remaining_count: u32,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAlert {
    /// Lowercase alert kind ("renal", "age", ...)
    pub kind: String,
    pub condition: String,
    pub message: String,
    pub severity: Option<String>,
}

impl From<&AlertRule> for FfiAlert {
    fn from(rule: &AlertRule) -> Self {
        Self {
            kind: wire_name(&rule.kind),
            condition: rule.condition.clone(),
            message: rule.message.clone(),
            severity: rule.severity.as_ref().map(wire_name),
        }
    }
}

/// Serialized name of a unit-variant enum.
fn wire_name<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => String::new(),
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicationReview {
    pub medication_id: String,
    pub name: String,
    pub alerts: Vec<FfiAlert>,
}

impl From<MedicationReview<'_>> for FfiMedicationReview {
    fn from(review: MedicationReview<'_>) -> Self {
        Self {
            medication_id: review.medication.id.clone(),
            name: review.medication.name.clone(),
            alerts: review.alerts.into_iter().map(FfiAlert::from).collect(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiImportBatch {
    pub batch_id: String,
    pub medication_ids: Vec<String>,
    pub imported_at: String,
}

impl From<&ImportBatch> for FfiImportBatch {
    fn from(batch: &ImportBatch) -> Self {
        Self {
            batch_id: batch.batch_id.clone(),
            medication_ids: batch.medication_ids.clone(),
            imported_at: batch.imported_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiIntegrationKind {
    Pem,
    PatientLoad,
    MedicationImport,
}

impl From<IntegrationKind> for FfiIntegrationKind {
    fn from(kind: IntegrationKind) -> Self {
        match kind {
            IntegrationKind::Pem => FfiIntegrationKind::Pem,
            IntegrationKind::PatientLoad => FfiIntegrationKind::PatientLoad,
            IntegrationKind::MedicationImport => FfiIntegrationKind::MedicationImport,
        }
    }
}

impl From<FfiIntegrationKind> for IntegrationKind {
    fn from(kind: FfiIntegrationKind) -> Self {
        match kind {
            FfiIntegrationKind::Pem => IntegrationKind::Pem,
            FfiIntegrationKind::PatientLoad => IntegrationKind::PatientLoad,
            FfiIntegrationKind::MedicationImport => IntegrationKind::MedicationImport,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiStatusState {
    Idle,
    Loading,
    Success,
    Error,
}

impl From<StatusState> for FfiStatusState {
    fn from(state: StatusState) -> Self {
        match state {
            StatusState::Idle => FfiStatusState::Idle,
            StatusState::Loading => FfiStatusState::Loading,
            StatusState::Success => FfiStatusState::Success,
            StatusState::Error => FfiStatusState::Error,
        }
    }
}

impl From<FfiStatusState> for StatusState {
    fn from(state: FfiStatusState) -> Self {
        match state {
            FfiStatusState::Idle => StatusState::Idle,
            FfiStatusState::Loading => StatusState::Loading,
            FfiStatusState::Success => StatusState::Success,
            FfiStatusState::Error => StatusState::Error,
        }
    }
}

/// One entry of the status map.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStatusEntry {
    pub key: String,
    pub kind: FfiIntegrationKind,
    pub state: FfiStatusState,
    pub message: Option<String>,
    /// Payload serialized as JSON
    pub data_json: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStatusUpdate {
    pub kind: FfiIntegrationKind,
    pub state: FfiStatusState,
    pub message: Option<String>,
}
