//! Medication reference models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Publication a section's content is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// Summary of product characteristics
    #[serde(rename = "RCM")]
    Rcm,
    #[serde(rename = "BNF")]
    Bnf,
    Guidelines,
    Infomed,
}

/// Citation attached to every reference section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A titled, sourced block of reference content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section<T> {
    pub title: String,
    pub content: T,
    pub source: Source,
}

/// Dosing guidance for one indication and population.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dosage {
    pub indication: String,
    pub population: String,
    pub dose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indications {
    pub primary_indications: Vec<String>,
    pub dosage: Vec<Dosage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub name: String,
    pub effect: String,
    pub management: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCategory {
    pub category: String,
    pub drugs: Vec<Interaction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEffects {
    pub common: Vec<String>,
    pub uncommon: Vec<String>,
    pub serious: Vec<String>,
}

/// Free-form section whose layout is left to the shell.
pub type NoteSection = Section<serde_json::Value>;

/// The structured monograph of a medication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationSections {
    pub indications: Section<Indications>,
    pub contraindications: Section<Vec<String>>,
    pub cautions: Section<Vec<String>>,
    pub interactions: Section<Vec<InteractionCategory>>,
    pub side_effects: Section<SideEffects>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_populations: Option<NoteSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hepatic_impairment: Option<NoteSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renal_impairment: Option<NoteSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<NoteSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antidote: Option<NoteSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forms: Option<NoteSection>,
}

/// Descriptor of a bedside calculator relevant to a medication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calculator {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub applicable: bool,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factors: Option<Vec<String>>,
}

/// Closed set of alert triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Renal,
    Age,
    Interaction,
    Bleeding,
    Hepatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Static alert rule declared by a medication.
///
/// Whether it applies to a patient is computed by
/// [`AlertEvaluator`](crate::clinical::AlertEvaluator), never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// Human-readable trigger, e.g. "TFG <30 mL/min"
    pub condition: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

/// Bibliographic reference listed at the end of a monograph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_accessed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

/// Immutable medication reference record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    /// Stable key, unique within a catalog
    pub id: String,
    pub name: String,
    pub generic_name: String,
    #[serde(default)]
    pub brand_names: Vec<String>,
    /// Anatomical Therapeutic Chemical code (e.g., "B01AF02")
    pub atc_code: String,
    pub therapeutic_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescription_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug_action: Option<NoteSection>,
    pub sections: MedicationSections,
    #[serde(default)]
    pub calculators: Vec<Calculator>,
    #[serde(default)]
    pub alerts: Vec<AlertRule>,
    #[serde(default)]
    pub clinical_pearls: Vec<String>,
    #[serde(default)]
    pub references: Vec<Reference>,
}

impl Medication {
    /// Calculators flagged as applicable.
    pub fn applicable_calculators(&self) -> impl Iterator<Item = &Calculator> {
        self.calculators.iter().filter(|c| c.applicable)
    }

    /// Every distinct external URL cited by the monograph.
    pub fn source_urls(&self) -> Vec<&str> {
        let s = &self.sections;
        let cited = [
            &s.indications.source,
            &s.contraindications.source,
            &s.cautions.source,
            &s.interactions.source,
            &s.side_effects.source,
        ]
        .into_iter()
        .filter_map(|src| src.url.as_deref())
        .chain(self.references.iter().filter_map(|r| r.url.as_deref()));

        let mut urls: Vec<&str> = Vec::new();
        for url in cited {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }
}
