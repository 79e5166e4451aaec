//! Immutable medication catalog.
//!
//! Loaded once at startup and never mutated; every other component refers to
//! medications by id.

mod search;

pub use search::*;

use std::collections::HashMap;

use thiserror::Error;

use crate::models::Medication;

/// Catalog errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate medication id: {0}")]
    DuplicateId(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Reference medications indexed by id, in load order.
#[derive(Debug, Clone, Default)]
pub struct MedicationCatalog {
    medications: Vec<Medication>,
    index: HashMap<String, usize>,
}

impl MedicationCatalog {
    /// Build a catalog, rejecting duplicate ids.
    pub fn new(medications: Vec<Medication>) -> CatalogResult<Self> {
        let mut index = HashMap::with_capacity(medications.len());
        for (position, medication) in medications.iter().enumerate() {
            if index.insert(medication.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateId(medication.id.clone()));
            }
        }
        Ok(Self { medications, index })
    }

    /// Parse a JSON array of medications.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let medications: Vec<Medication> = serde_json::from_str(json)?;
        Self::new(medications)
    }

    pub fn get(&self, id: &str) -> Option<&Medication> {
        self.index.get(id).map(|&i| &self.medications[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Medication> {
        self.medications.iter()
    }

    pub fn as_slice(&self) -> &[Medication] {
        &self.medications
    }

    pub fn len(&self) -> usize {
        self.medications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.medications.is_empty()
    }
}
