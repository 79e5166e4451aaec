//! Demo patient endpoint and the lookup collaborator that consumes it.
//!
//! Responses use the envelope the prescribing system's patient service
//! speaks:
//!
//! ```json
//! { "success": true, "patient": { ... } }
//! { "success": true, "patients": [ ... ], "count": 3 }
//! { "success": false, "error": "Patient not found", "message": "..." }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use arm_core::models::{PatientProfile, Sns};
use arm_core::profiles::{PatientLookup, SourceError, SourceResult};
use arm_core::ProfileDefaults;

use super::profile_file::read_records;
use super::{reference_data, ProfileRecord};

const LIST_ROUTE: &str = "/mock/patients";
const LOAD_ROUTE: &str = "/mock/load-patient/";

/// Response body shared by every route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<ProfileRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patients: Option<Vec<ProfileRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Envelope {
    fn failure(error: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// HTTP-like response: status code plus JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResponse {
    pub status: u16,
    pub body: String,
}

impl EndpointResponse {
    fn json(status: u16, envelope: &Envelope) -> Self {
        // Envelope holds only strings, numbers and lists; serialization cannot fail
        let body = serde_json::to_string(envelope).unwrap_or_else(|_| "{}".to_string());
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport to a patient service.
pub trait Endpoint {
    fn get(&self, route: &str) -> EndpointResponse;
}

/// In-process stand-in for the patient service.
///
/// Answers from the built-in demo patients first, then from the profile
/// export when one is configured.
#[derive(Debug, Clone)]
pub struct MockEndpoint {
    patients: Vec<ProfileRecord>,
    profiles_file: Option<PathBuf>,
}

impl Default for MockEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self {
            patients: reference_data::demo_patient_records(),
            profiles_file: None,
        }
    }

    pub fn with_patients(patients: Vec<ProfileRecord>) -> Self {
        Self {
            patients,
            profiles_file: None,
        }
    }

    pub fn with_profiles_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.profiles_file = Some(path.into());
        self
    }

    /// `GET /mock/load-patient/:sns`
    pub fn load_patient(&self, sns: &str) -> EndpointResponse {
        let found = match self.patients.iter().find(|p| p.sns == sns) {
            Some(patient) => Some(patient.clone()),
            None => match self.file_records() {
                Ok(records) => records.into_iter().find(|p| p.sns == sns),
                Err(e) => return internal_error(e),
            },
        };

        match found {
            Some(patient) => EndpointResponse::json(
                200,
                &Envelope {
                    success: true,
                    patient: Some(patient),
                    ..Envelope::default()
                },
            ),
            None => EndpointResponse::json(
                404,
                &Envelope::failure(
                    "Patient not found",
                    format!("No patient found with SNS: {}", sns),
                ),
            ),
        }
    }

    /// `GET /mock/patients`
    ///
    /// The profile export when present, otherwise the demo patients.
    pub fn list_patients(&self) -> EndpointResponse {
        let patients = match &self.profiles_file {
            Some(path) if path.exists() => match read_records(path) {
                Ok(records) => records,
                Err(e) => return internal_error(e),
            },
            _ => self.patients.clone(),
        };

        EndpointResponse::json(
            200,
            &Envelope {
                success: true,
                count: Some(patients.len()),
                patients: Some(patients),
                ..Envelope::default()
            },
        )
    }

    fn file_records(&self) -> SourceResult<Vec<ProfileRecord>> {
        match &self.profiles_file {
            Some(path) => read_records(path),
            None => Ok(Vec::new()),
        }
    }
}

impl Endpoint for MockEndpoint {
    fn get(&self, route: &str) -> EndpointResponse {
        if route == LIST_ROUTE {
            return self.list_patients();
        }
        match route.strip_prefix(LOAD_ROUTE) {
            Some(sns) => self.load_patient(sns),
            None => EndpointResponse::json(
                404,
                &Envelope::failure("Not found", format!("No route for {}", route)),
            ),
        }
    }
}

fn internal_error(e: SourceError) -> EndpointResponse {
    tracing::error!("Error loading patients: {}", e);
    EndpointResponse::json(500, &Envelope::failure("Internal server error", e.to_string()))
}

/// Profile collaborator speaking the envelope protocol over an [`Endpoint`].
///
/// Missing clinical fields in responses are filled from [`ProfileDefaults`].
#[derive(Debug, Clone)]
pub struct EndpointSource<E> {
    endpoint: E,
    defaults: ProfileDefaults,
}

pub type MockEndpointSource = EndpointSource<MockEndpoint>;

impl<E: Endpoint> EndpointSource<E> {
    pub fn new(endpoint: E, defaults: ProfileDefaults) -> Self {
        Self { endpoint, defaults }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    fn request(&self, route: &str) -> SourceResult<Option<Envelope>> {
        let response = self.endpoint.get(route);
        if response.status == 404 {
            return Ok(None);
        }

        let envelope: Envelope = serde_json::from_str(&response.body)?;
        if !response.is_success() {
            let reason = envelope
                .message
                .or(envelope.error)
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            return Err(SourceError::Unavailable(reason));
        }
        Ok(envelope.success.then_some(envelope))
    }
}

impl<E: Endpoint> PatientLookup for EndpointSource<E> {
    fn lookup(&self, sns: &Sns) -> SourceResult<Option<PatientProfile>> {
        let route = format!("{}{}", LOAD_ROUTE, sns);
        self.request(&route)?
            .and_then(|envelope| envelope.patient)
            .map(|record| record.into_profile(&self.defaults))
            .transpose()
    }
}
