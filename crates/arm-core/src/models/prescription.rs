//! Electronic prescription models.

use serde::{Deserialize, Serialize};

/// One medication line on a prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescribedMedication {
    /// Catalog medication id
    pub id: String,
    pub dose: String,
    pub frequency: String,
}

/// The prescription currently open in the prescribing system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prescription {
    pub prescriber: String,
    /// Issue date (YYYY-MM-DD)
    pub date: String,
    pub medications: Vec<PrescribedMedication>,
}

impl Prescription {
    /// Catalog ids in prescription order, duplicates removed.
    pub fn medication_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.medications.len());
        for line in &self.medications {
            if !ids.contains(&line.id) {
                ids.push(line.id.clone());
            }
        }
        ids
    }
}
