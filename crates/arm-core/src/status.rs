//! Integration status broadcasting.
//!
//! A keyed map of operation statuses (patient loading, medication import,
//! prescription system) with an explicit observer registry. Every change
//! notifies all subscribers synchronously with the full map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Status key for patient profile loading.
pub const PATIENT_LOAD: &str = "patient_load";
/// Status key for importing medications from the active prescription.
pub const MEDICATION_IMPORT: &str = "medication_import";
/// Status key for the electronic prescribing system link.
pub const PEM: &str = "pem";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationKind {
    Pem,
    PatientLoad,
    MedicationImport,
}

impl IntegrationKind {
    /// Integration owning one of the well-known keys; `None` for other keys.
    pub fn for_key(key: &str) -> Option<Self> {
        match key {
            PATIENT_LOAD => Some(Self::PatientLoad),
            MEDICATION_IMPORT => Some(Self::MedicationImport),
            PEM => Some(Self::Pem),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Latest known state of one integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationStatus {
    #[serde(rename = "type")]
    pub kind: IntegrationKind,
    pub state: StatusState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// RFC 3339 timestamp of the update
    pub updated_at: String,
}

impl IntegrationStatus {
    pub fn new(kind: IntegrationKind, state: StatusState) -> Self {
        Self {
            kind,
            state,
            message: None,
            data: None,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn loading(kind: IntegrationKind, message: impl Into<String>) -> Self {
        Self::new(kind, StatusState::Loading).with_message(message)
    }

    pub fn success(kind: IntegrationKind, message: impl Into<String>) -> Self {
        Self::new(kind, StatusState::Success).with_message(message)
    }

    pub fn error(kind: IntegrationKind, message: impl Into<String>) -> Self {
        Self::new(kind, StatusState::Error).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

pub type StatusMap = BTreeMap<String, IntegrationStatus>;

/// Handle identifying one registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Rebuild a handle previously exposed through [`Self::raw`].
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

type Listener = Box<dyn FnMut(&StatusMap) + Send>;

/// Keyed status map with subscribers.
#[derive(Default)]
pub struct StatusNotifier {
    statuses: StatusMap,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl std::fmt::Debug for StatusNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusNotifier")
            .field("statuses", &self.statuses)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl StatusNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for `key` and notify every subscriber.
    pub fn set_status(&mut self, key: impl Into<String>, status: IntegrationStatus) {
        let key = key.into();
        tracing::debug!(key = %key, state = ?status.state, "status update");
        self.statuses.insert(key, status);
        self.notify();
    }

    pub fn get(&self, key: &str) -> Option<&IntegrationStatus> {
        self.statuses.get(key)
    }

    /// Copy of the full map.
    pub fn snapshot(&self) -> StatusMap {
        self.statuses.clone()
    }

    /// Register a callback. Notification follows registration order.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StatusMap) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove exactly the subscriber registered under `id`.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&mut self) {
        let statuses = &self.statuses;
        for (_, listener) in self.listeners.iter_mut() {
            listener(statuses);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<StatusMap>>>, impl FnMut(&StatusMap) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |map: &StatusMap| sink.lock().unwrap().push(map.clone()))
    }

    #[test]
    fn test_overwrite_notifies_full_map_each_time() {
        let mut notifier = StatusNotifier::new();
        let (first, listener_a) = recorder();
        let (second, listener_b) = recorder();
        notifier.subscribe(listener_a);
        notifier.subscribe(listener_b);

        notifier.set_status(PEM, IntegrationStatus::success(IntegrationKind::Pem, "linked"));
        notifier.set_status("x", IntegrationStatus::loading(IntegrationKind::PatientLoad, "A"));
        notifier.set_status("x", IntegrationStatus::success(IntegrationKind::PatientLoad, "B"));

        let snapshot = notifier.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["x"].message.as_deref(), Some("B"));

        for seen in [first, second] {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 3);
            // Full map, not a diff
            assert!(seen[1].contains_key(PEM));
            assert_eq!(seen[1]["x"].state, StatusState::Loading);
            assert_eq!(seen[2]["x"].state, StatusState::Success);
        }
    }

    #[test]
    fn test_unsubscribe_removes_only_that_listener() {
        let mut notifier = StatusNotifier::new();
        let (kept, listener_a) = recorder();
        let (dropped, listener_b) = recorder();
        notifier.subscribe(listener_a);
        let id = notifier.subscribe(listener_b);

        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        assert_eq!(notifier.subscriber_count(), 1);

        notifier.set_status(MEDICATION_IMPORT, IntegrationStatus::new(IntegrationKind::MedicationImport, StatusState::Idle));
        assert_eq!(kept.lock().unwrap().len(), 1);
        assert!(dropped.lock().unwrap().is_empty());
    }

    #[test]
    fn test_well_known_keys_map_to_kinds() {
        assert_eq!(IntegrationKind::for_key(PEM), Some(IntegrationKind::Pem));
        assert_eq!(IntegrationKind::for_key(PATIENT_LOAD), Some(IntegrationKind::PatientLoad));
        assert_eq!(
            IntegrationKind::for_key(MEDICATION_IMPORT),
            Some(IntegrationKind::MedicationImport)
        );
        assert_eq!(IntegrationKind::for_key("x"), None);
    }

    #[test]
    fn test_status_wire_format() {
        let status = IntegrationStatus::success(IntegrationKind::MedicationImport, "3 imported")
            .with_data(serde_json::json!({ "count": 3 }));
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["type"], "medication_import");
        assert_eq!(json["state"], "success");
        assert_eq!(json["data"]["count"], 3);
    }
}
