//! Session integration tests: patient lookup, import, selection and alerts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use arm_core::models::{AlertKind, Gender, Medication, PatientProfile, Prescription, Sns};
use arm_core::profiles::{NoProfiles, PatientLookup, PatientSource, SourceError, SourceResult};
use arm_core::session::{LookupOutcome, SessionError};
use arm_core::status::{StatusMap, StatusState, MEDICATION_IMPORT, PATIENT_LOAD};
use arm_core::{ArmConfig, LinkOpener, MedicationCatalog, ProfileError, ProfileLoader, Session};

fn medication(id: &str, alerts: &str) -> Medication {
    let json = format!(
        r#"{{
            "id": "{id}",
            "name": "{id}",
            "generic_name": "{id}",
            "atc_code": "X00",
            "therapeutic_class": "Test class",
            "sections": {{
                "indications": {{"title": "I", "content": {{"primary_indications": [], "dosage": []}}, "source": {{"type": "RCM", "reference": "r"}}}},
                "contraindications": {{"title": "C", "content": [], "source": {{"type": "RCM", "reference": "r"}}}},
                "cautions": {{"title": "P", "content": [], "source": {{"type": "RCM", "reference": "r"}}}},
                "interactions": {{"title": "X", "content": [], "source": {{"type": "RCM", "reference": "r"}}}},
                "side_effects": {{"title": "E", "content": {{"common": [], "uncommon": [], "serious": []}}, "source": {{"type": "RCM", "reference": "r"}}}}
            }},
            "alerts": {alerts}
        }}"#
    );
    serde_json::from_str(&json).unwrap()
}

fn catalog() -> MedicationCatalog {
    let renal = r#"[{"type": "renal", "condition": "TFG <30 mL/min", "message": "Reduce dose"}]"#;
    let age = r#"[{"type": "age", "condition": ">= 80 anos e <= 60 kg", "message": "Reduce dose"}]"#;
    let bleeding = r#"[{"type": "bleeding", "condition": "HAS-BLED >= 3", "message": "Bleeding risk"}]"#;

    let mut meds = vec![
        medication("apixabano", renal),
        medication("metformina", renal),
        medication("digoxina", age),
        medication("varfarina", bleeding),
    ];
    for i in 0..8 {
        meds.push(medication(&format!("extra{}", i), "[]"));
    }
    MedicationCatalog::new(meds).unwrap()
}

fn profile(sns: &str, name: &str, age: u32, weight: f64, clearance: f64) -> PatientProfile {
    PatientProfile {
        sns: Sns::parse(sns).unwrap(),
        name: name.into(),
        age,
        weight,
        gender: Gender::Male,
        conditions: vec![],
        creatinine: 1.8,
        creatinine_clearance: Some(clearance),
        current_medications: vec![],
        active_prescriptions: vec![],
    }
}

struct Directory(Vec<PatientProfile>);

impl PatientSource for Directory {
    fn load_all(&self) -> SourceResult<Vec<PatientProfile>> {
        Ok(self.0.clone())
    }
}

#[derive(Clone)]
struct CountingLookup {
    calls: Arc<AtomicUsize>,
    known: Vec<PatientProfile>,
}

impl PatientLookup for CountingLookup {
    fn lookup(&self, sns: &Sns) -> SourceResult<Option<PatientProfile>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.known.iter().find(|p| &p.sns == sns).cloned())
    }
}

struct FailingLookup;

impl PatientLookup for FailingLookup {
    fn lookup(&self, _sns: &Sns) -> SourceResult<Option<PatientProfile>> {
        Err(SourceError::Unavailable("connection refused".into()))
    }
}

fn session() -> (Session, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let bulk = Directory(vec![profile("123456789", "Maria Silva Santos", 65, 70.0, 45.0)]);
    let lookup = CountingLookup {
        calls: calls.clone(),
        known: vec![profile("987654321", "João Pedro Costa", 84, 55.0, 25.0)],
    };
    let loader = ProfileLoader::new(bulk, lookup);
    (Session::new(catalog(), loader, &ArmConfig::default()), calls)
}

fn record_statuses(session: &mut Session) -> Arc<Mutex<Vec<StatusMap>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    session
        .status_mut()
        .subscribe(move |map| sink.lock().unwrap().push(map.clone()));
    seen
}

#[test]
fn test_profile_options_report_status() {
    let (mut session, _) = session();
    let seen = record_statuses(&mut session);

    let options = session.load_profile_options().unwrap();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].sns.as_str(), "123456789");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0][PATIENT_LOAD].state, StatusState::Loading);
    assert_eq!(seen[1][PATIENT_LOAD].state, StatusState::Success);
    assert_eq!(seen[1][PATIENT_LOAD].data.as_ref().unwrap()["count"], 1);
}

#[test]
fn test_select_patient_uses_cache_then_lookup() {
    let (mut session, calls) = session();

    session.select_patient("123456789").unwrap();
    assert_eq!(session.patient().unwrap().name, "Maria Silva Santos");
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    session.select_patient("987654321").unwrap();
    assert_eq!(session.patient().unwrap().name, "João Pedro Costa");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    session.select_patient("987654321").unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.load_profile_options().unwrap().len(), 2);
}

#[test]
fn test_invalid_sns_does_not_touch_status() {
    let (mut session, calls) = session();
    let seen = record_statuses(&mut session);

    let err = session.select_patient("12345678a").unwrap_err();
    assert!(matches!(err, SessionError::Profile(ProfileError::Validation(_))));
    assert_eq!(err.to_string(), "SNS number must be exactly 9 digits");
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unknown_patient_sets_error_status() {
    let (mut session, _) = session();

    let err = session.select_patient("111111111").unwrap_err();
    assert!(matches!(err, SessionError::Profile(ProfileError::NotFound(_))));
    assert!(session.patient().is_none());

    let status = session.status().get(PATIENT_LOAD).unwrap();
    assert_eq!(status.state, StatusState::Error);
    assert!(status.message.as_deref().unwrap().contains("111111111"));
}

#[test]
fn test_lookup_failure_is_retryable() {
    let loader = ProfileLoader::new(NoProfiles, FailingLookup);
    let mut session = Session::new(catalog(), loader, &ArmConfig::default());

    for _ in 0..2 {
        let err = session.select_patient("111111111").unwrap_err();
        assert!(matches!(err, SessionError::Profile(ProfileError::LookupFailed(_))));
        assert_eq!(session.status().get(PATIENT_LOAD).unwrap().state, StatusState::Error);
    }
}

#[test]
fn test_stale_lookup_is_discarded() {
    let (mut session, _) = session();

    let first = session.begin_patient_lookup("123456789").unwrap();
    let second = session.begin_patient_lookup("987654321").unwrap();

    let second_result = session.loader_mut().resolve_sns(second.sns());
    assert_eq!(
        session.apply_patient_lookup(second, second_result).unwrap(),
        LookupOutcome::Applied
    );

    // The slower, older response arrives last and must not win
    let first_result = session.loader_mut().resolve_sns(first.sns());
    assert_eq!(
        session.apply_patient_lookup(first, first_result).unwrap(),
        LookupOutcome::Stale
    );
    assert_eq!(session.patient().unwrap().name, "João Pedro Costa");
}

#[test]
fn test_contextual_alerts_follow_patient() {
    let (mut session, _) = session();
    assert!(session.contextual_alerts("apixabano").unwrap().is_empty());

    // Clearance 45: no renal alert
    session.select_patient("123456789").unwrap();
    assert!(!session.has_alerts("apixabano"));
    assert!(!session.has_alerts("digoxina"));

    // Clearance 25, age 84, weight 55: renal and age alerts
    session.select_patient("987654321").unwrap();
    let alerts = session.contextual_alerts("apixabano").unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::Renal);
    assert!(session.has_alerts("digoxina"));
    // Bleeding rules are not evaluated under the default policy
    assert!(!session.has_alerts("varfarina"));

    let flags = session.patient_flags().unwrap();
    assert!(flags.renal_impairment && flags.advanced_age);

    assert!(matches!(
        session.contextual_alerts("paracetamol"),
        Err(SessionError::UnknownMedication(_))
    ));
}

#[test]
fn test_display_limit_and_show_all() {
    let (mut session, _) = session();
    assert_eq!(session.active_medications().len(), 12);
    assert_eq!(session.displayed_medications().len(), 8);
    assert_eq!(session.remaining_count(), 4);

    session.set_show_all(true);
    assert_eq!(session.displayed_medications().len(), 12);
    assert_eq!(session.remaining_count(), 0);

    session.set_search_term("extra");
    assert_eq!(session.active_medications().len(), 8);
}

#[test]
fn test_import_selects_exactly_the_batch() {
    let (mut session, _) = session();
    session.toggle_selection("varfarina").unwrap();
    session.toggle_selection("extra3").unwrap();

    session.begin_import();
    assert_eq!(session.status().get(MEDICATION_IMPORT).unwrap().state, StatusState::Loading);

    let batch = session
        .import_medications(["apixabano", "metformina", "unknown", "apixabano", "digoxina"])
        .unwrap();
    assert_eq!(batch.medication_ids, vec!["apixabano", "metformina", "digoxina"]);

    let selected: Vec<&str> = session.selection().ids().iter().map(String::as_str).collect();
    assert_eq!(selected, vec!["apixabano", "digoxina", "metformina"]);

    let status = session.status().get(MEDICATION_IMPORT).unwrap();
    assert_eq!(status.state, StatusState::Success);
    assert_eq!(status.data.as_ref().unwrap()["count"], 3);

    // Import replaces search results as the active source
    let active: Vec<&str> = session.active_medications().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(active, vec!["apixabano", "metformina", "digoxina"]);
}

#[test]
fn test_import_prescription_and_review_panel() {
    let (mut session, _) = session();
    session.select_patient("987654321").unwrap();

    let prescription: Prescription = serde_json::from_str(
        r#"{
            "prescriber": "Dr. Maria Santos",
            "date": "2025-01-08",
            "medications": [
                {"id": "apixabano", "dose": "5mg", "frequency": "2x/dia"},
                {"id": "metformina", "dose": "850mg", "frequency": "2x/dia"}
            ]
        }"#,
    )
    .unwrap();
    session.import_prescription(&prescription).unwrap();

    assert!(!session.toggle_selection("metformina").unwrap());
    let panel = session.review_panel();
    assert_eq!(panel.len(), 1);
    assert_eq!(panel[0].medication.id, "apixabano");
    assert_eq!(panel[0].alerts.len(), 1);
}

#[test]
fn test_empty_import_is_an_error() {
    let (mut session, _) = session();
    assert!(matches!(
        session.import_medications(["nothing"]),
        Err(SessionError::NothingImported)
    ));
    assert_eq!(session.status().get(MEDICATION_IMPORT).unwrap().state, StatusState::Error);
    assert!(session.import_batch().is_none());
}

#[test]
fn test_clear_import_returns_to_search() {
    let (mut session, _) = session();
    session.import_medications(["digoxina"]).unwrap();
    session.clear_import();

    assert!(session.import_batch().is_none());
    assert!(session.selection().is_empty());
    assert_eq!(session.active_medications().len(), 12);
    assert_eq!(session.status().get(MEDICATION_IMPORT).unwrap().state, StatusState::Idle);
}

#[test]
fn test_toggle_rejects_unknown_medication() {
    let (mut session, _) = session();
    assert!(matches!(
        session.toggle_selection("paracetamol"),
        Err(SessionError::UnknownMedication(_))
    ));
}

#[test]
fn test_open_reference_delegates() {
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl LinkOpener for Recorder {
        fn open(&self, url: &str) {
            self.0.lock().unwrap().push(url.to_string());
        }
    }

    let opened = Arc::new(Mutex::new(Vec::new()));
    let (session, _) = session();
    let session = session.with_link_opener(Recorder(opened.clone()));

    session.open_reference("https://www.infarmed.pt");
    assert_eq!(*opened.lock().unwrap(), vec!["https://www.infarmed.pt".to_string()]);
}
