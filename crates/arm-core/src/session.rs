//! Per-window session context.
//!
//! Owns everything the presentation shell renders from: the catalog, the
//! current patient, the active medication source (search results or an
//! imported batch), the review selection and the status map. Constructed
//! explicitly at startup and dropped at shutdown; nothing here is global.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::MedicationCatalog;
use crate::clinical::{AlertEvaluator, PatientFlags};
use crate::config::ArmConfig;
use crate::models::{AlertRule, Medication, Patient, PatientProfile, Prescription, ProfileOption, Sns};
use crate::profiles::{ProfileError, ProfileLoader, ProfileResult};
use crate::selection::SelectionSet;
use crate::status::{
    IntegrationKind, IntegrationStatus, StatusNotifier, StatusState, MEDICATION_IMPORT, PATIENT_LOAD,
};

/// Session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("Unknown medication: {0}")]
    UnknownMedication(String),

    #[error("No catalog medication matched the import")]
    NothingImported,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Opens a URL outside the application. Fire-and-forget.
pub trait LinkOpener {
    fn open(&self, url: &str);
}

/// Token for an in-flight patient lookup.
///
/// Only the most recently issued ticket may change the current patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    generation: u64,
    sns: Sns,
}

impl LookupTicket {
    pub fn sns(&self) -> &Sns {
        &self.sns
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Applied,
    /// A newer lookup or manual selection superseded this one
    Stale,
}

/// Medications imported from the active prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub medication_ids: Vec<String>,
    pub imported_at: String,
}

/// One selected medication with its alerts for the current patient.
#[derive(Debug, Clone, PartialEq)]
pub struct MedicationReview<'a> {
    pub medication: &'a Medication,
    pub alerts: Vec<&'a AlertRule>,
}

type BoxedOpener = Box<dyn LinkOpener + Send>;

pub struct Session {
    catalog: MedicationCatalog,
    loader: ProfileLoader,
    status: StatusNotifier,
    evaluator: AlertEvaluator,
    link_opener: Option<BoxedOpener>,
    patient: Option<Patient>,
    lookup_generation: u64,
    search_term: String,
    fuzzy_threshold: f64,
    import: Option<ImportBatch>,
    selection: SelectionSet,
    display_limit: usize,
    show_all: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("catalog", &self.catalog.len())
            .field("patient", &self.patient.as_ref().map(|p| &p.name))
            .field("import", &self.import)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(catalog: MedicationCatalog, loader: ProfileLoader, config: &ArmConfig) -> Self {
        Self {
            catalog,
            loader,
            status: StatusNotifier::new(),
            evaluator: AlertEvaluator::new(config.unevaluated_alerts),
            link_opener: None,
            patient: None,
            lookup_generation: 0,
            search_term: String::new(),
            fuzzy_threshold: config.fuzzy_threshold,
            import: None,
            selection: SelectionSet::new(),
            display_limit: config.display_limit,
            show_all: false,
        }
    }

    pub fn with_link_opener<O>(mut self, opener: O) -> Self
    where
        O: LinkOpener + Send + 'static,
    {
        self.set_link_opener(opener);
        self
    }

    pub fn set_link_opener<O>(&mut self, opener: O)
    where
        O: LinkOpener + Send + 'static,
    {
        self.link_opener = Some(Box::new(opener));
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn catalog(&self) -> &MedicationCatalog {
        &self.catalog
    }

    pub fn patient(&self) -> Option<&Patient> {
        self.patient.as_ref()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn import_batch(&self) -> Option<&ImportBatch> {
        self.import.as_ref()
    }

    pub fn evaluator(&self) -> &AlertEvaluator {
        &self.evaluator
    }

    pub fn status(&self) -> &StatusNotifier {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusNotifier {
        &mut self.status
    }

    pub fn loader(&self) -> &ProfileLoader {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut ProfileLoader {
        &mut self.loader
    }

    // =========================================================================
    // Patient
    // =========================================================================

    /// Load the bulk profile source and list the available patients.
    pub fn load_profile_options(&mut self) -> SessionResult<Vec<ProfileOption>> {
        self.report_patient(IntegrationStatus::loading(
            IntegrationKind::PatientLoad,
            "Loading patient profiles...",
        ));

        match self.loader.initialize() {
            Ok(count) => {
                self.report_patient(
                    IntegrationStatus::success(
                        IntegrationKind::PatientLoad,
                        format!("{} profiles loaded", count),
                    )
                    .with_data(serde_json::json!({ "count": count })),
                );
                Ok(self.loader.list_available())
            }
            Err(e) => {
                tracing::warn!("Failed to load patient profiles: {}", e);
                self.report_patient(IntegrationStatus::error(
                    IntegrationKind::PatientLoad,
                    "Failed to load patient profiles",
                ));
                Err(ProfileError::LookupFailed(e).into())
            }
        }
    }

    /// Validate, resolve and apply a patient identifier in one step.
    pub fn select_patient(&mut self, raw: &str) -> SessionResult<()> {
        let ticket = self.begin_patient_lookup(raw)?;
        let result = self.loader.resolve_sns(ticket.sns());
        self.apply_patient_lookup(ticket, result)?;
        Ok(())
    }

    /// Validate `raw` and mark a lookup as in flight.
    ///
    /// Validation errors are returned for inline display and leave the status
    /// map untouched. Issuing a ticket supersedes every earlier one.
    pub fn begin_patient_lookup(&mut self, raw: &str) -> SessionResult<LookupTicket> {
        let sns = Sns::parse(raw).map_err(ProfileError::from)?;
        self.lookup_generation += 1;
        self.report_patient(IntegrationStatus::loading(
            IntegrationKind::PatientLoad,
            format!("Looking up patient {}...", sns),
        ));
        Ok(LookupTicket {
            generation: self.lookup_generation,
            sns,
        })
    }

    /// Apply the result of a lookup started with [`Self::begin_patient_lookup`].
    ///
    /// Results for superseded tickets are discarded without touching state.
    pub fn apply_patient_lookup(
        &mut self,
        ticket: LookupTicket,
        result: ProfileResult<PatientProfile>,
    ) -> SessionResult<LookupOutcome> {
        if ticket.generation != self.lookup_generation {
            tracing::debug!(sns = %ticket.sns, "discarding stale patient lookup");
            return Ok(LookupOutcome::Stale);
        }

        match result {
            Ok(profile) => {
                self.report_patient(IntegrationStatus::success(
                    IntegrationKind::PatientLoad,
                    format!("Patient {} loaded", profile.name),
                ));
                self.patient = Some(profile.to_patient());
                Ok(LookupOutcome::Applied)
            }
            Err(ProfileError::NotFound(sns)) => {
                self.report_patient(IntegrationStatus::error(
                    IntegrationKind::PatientLoad,
                    format!("No patient found with SNS {}", sns),
                ));
                Err(ProfileError::NotFound(sns).into())
            }
            Err(e) => {
                tracing::warn!(sns = %ticket.sns, "patient lookup failed: {}", e);
                self.report_patient(IntegrationStatus::error(
                    IntegrationKind::PatientLoad,
                    "Failed to load patient data",
                ));
                Err(e.into())
            }
        }
    }

    /// Replace the current patient directly. Supersedes in-flight lookups.
    pub fn set_patient(&mut self, patient: Patient) {
        self.lookup_generation += 1;
        self.patient = Some(patient);
    }

    pub fn patient_flags(&self) -> Option<PatientFlags> {
        self.patient.as_ref().map(PatientFlags::for_patient)
    }

    // =========================================================================
    // Medication list
    // =========================================================================

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn set_show_all(&mut self, show_all: bool) {
        self.show_all = show_all;
    }

    /// Imported batch when present, otherwise catalog search results.
    pub fn active_medications(&self) -> Vec<&Medication> {
        match &self.import {
            Some(batch) => batch
                .medication_ids
                .iter()
                .filter_map(|id| self.catalog.get(id))
                .collect(),
            None => self
                .catalog
                .search_with_threshold(&self.search_term, self.fuzzy_threshold),
        }
    }

    /// Active medications truncated to the display limit unless showing all.
    pub fn displayed_medications(&self) -> Vec<&Medication> {
        let mut active = self.active_medications();
        if !self.show_all {
            active.truncate(self.display_limit);
        }
        active
    }

    /// Active medications hidden by the display limit.
    pub fn remaining_count(&self) -> usize {
        self.active_medications().len() - self.displayed_medications().len()
    }

    // =========================================================================
    // Import
    // =========================================================================

    pub fn begin_import(&mut self) {
        self.report_import(IntegrationStatus::loading(
            IntegrationKind::MedicationImport,
            "Importing from active prescription...",
        ));
    }

    /// Make the given medications the active source and select all of them.
    ///
    /// Ids missing from the catalog are skipped.
    pub fn import_medications<I, S>(&mut self, ids: I) -> SessionResult<&ImportBatch>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut medication_ids: Vec<String> = Vec::new();
        for id in ids {
            let id = id.as_ref();
            if !self.catalog.contains(id) {
                tracing::warn!(id, "skipping import of unknown medication");
                continue;
            }
            if !medication_ids.iter().any(|known| known == id) {
                medication_ids.push(id.to_string());
            }
        }

        if medication_ids.is_empty() {
            self.report_import(IntegrationStatus::error(
                IntegrationKind::MedicationImport,
                "No medications to import",
            ));
            return Err(SessionError::NothingImported);
        }

        let count = medication_ids.len();
        self.selection.replace_with(medication_ids.iter().cloned());
        tracing::info!("Imported {} medications", count);
        self.report_import(
            IntegrationStatus::success(
                IntegrationKind::MedicationImport,
                format!("{} medications imported", count),
            )
            .with_data(serde_json::json!({ "count": count })),
        );

        Ok(&*self.import.insert(ImportBatch {
            batch_id: uuid::Uuid::new_v4().to_string(),
            medication_ids,
            imported_at: chrono::Utc::now().to_rfc3339(),
        }))
    }

    pub fn import_prescription(&mut self, prescription: &Prescription) -> SessionResult<&ImportBatch> {
        self.import_medications(prescription.medication_ids())
    }

    /// Drop the imported batch and return to catalog search.
    pub fn clear_import(&mut self) {
        if self.import.take().is_some() {
            self.selection.clear();
            self.report_import(IntegrationStatus::new(
                IntegrationKind::MedicationImport,
                StatusState::Idle,
            ));
        }
    }

    // =========================================================================
    // Selection & alerts
    // =========================================================================

    pub fn toggle_selection(&mut self, medication_id: &str) -> SessionResult<bool> {
        if !self.catalog.contains(medication_id) {
            return Err(SessionError::UnknownMedication(medication_id.to_string()));
        }
        Ok(self.selection.toggle(medication_id))
    }

    pub fn is_selected(&self, medication_id: &str) -> bool {
        self.selection.contains(medication_id)
    }

    /// Selected ids in sorted order, displayed or not.
    pub fn selected_ids(&self) -> Vec<String> {
        self.selection.ids().iter().cloned().collect()
    }

    /// Displayed medications that are selected, in display order.
    pub fn selected_medications(&self) -> Vec<&Medication> {
        self.selection.retain_displayed(&self.displayed_medications())
    }

    /// Alert rules of a medication that apply to the current patient.
    ///
    /// Empty when no patient is selected.
    pub fn contextual_alerts(&self, medication_id: &str) -> SessionResult<Vec<&AlertRule>> {
        let medication = self
            .catalog
            .get(medication_id)
            .ok_or_else(|| SessionError::UnknownMedication(medication_id.to_string()))?;
        Ok(self.alerts_for(medication))
    }

    pub fn has_alerts(&self, medication_id: &str) -> bool {
        self.contextual_alerts(medication_id)
            .map(|alerts| !alerts.is_empty())
            .unwrap_or(false)
    }

    /// Selected medications with their applicable alerts, for the review panel.
    pub fn review_panel(&self) -> Vec<MedicationReview<'_>> {
        self.selected_medications()
            .into_iter()
            .map(|medication| MedicationReview {
                medication,
                alerts: self.alerts_for(medication),
            })
            .collect()
    }

    fn alerts_for<'a>(&self, medication: &'a Medication) -> Vec<&'a AlertRule> {
        match &self.patient {
            Some(patient) => self.evaluator.evaluate(patient, &medication.alerts),
            None => Vec::new(),
        }
    }

    // =========================================================================
    // External links
    // =========================================================================

    pub fn open_reference(&self, url: &str) {
        match &self.link_opener {
            Some(opener) => {
                tracing::info!(url, "opening external reference");
                opener.open(url);
            }
            None => tracing::warn!(url, "no link opener configured"),
        }
    }

    fn report_patient(&mut self, status: IntegrationStatus) {
        self.status.set_status(PATIENT_LOAD, status);
    }

    fn report_import(&mut self, status: IntegrationStatus) {
        self.status.set_status(MEDICATION_IMPORT, status);
    }
}
