//! Catalog search.
//!
//! Two passes:
//! 1. Case-insensitive substring match over name, generic name, therapeutic
//!    class and ATC code, in catalog order.
//! 2. If nothing matched, a typo-tolerant pass ranking names and generic
//!    names by Jaro-Winkler similarity.

use strsim::jaro_winkler;

use super::MedicationCatalog;
use crate::models::Medication;

/// Default similarity a fuzzy hit must reach.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

/// Shortest term for which fuzzy matching is attempted.
const MIN_FUZZY_TERM_LEN: usize = 3;

impl MedicationCatalog {
    /// Search with the default fuzzy threshold.
    pub fn search(&self, term: &str) -> Vec<&Medication> {
        self.search_with_threshold(term, DEFAULT_FUZZY_THRESHOLD)
    }

    /// Search the catalog. An empty term returns every medication.
    pub fn search_with_threshold(&self, term: &str, fuzzy_threshold: f64) -> Vec<&Medication> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.iter().collect();
        }

        let exact: Vec<&Medication> = self
            .iter()
            .filter(|m| matches_substring(m, &needle))
            .collect();
        if !exact.is_empty() || needle.chars().count() < MIN_FUZZY_TERM_LEN {
            return exact;
        }

        let mut scored: Vec<(f64, &Medication)> = self
            .iter()
            .map(|m| (name_similarity(m, &needle), m))
            .filter(|(score, _)| *score >= fuzzy_threshold)
            .collect();
        // Stable sort keeps catalog order among equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().map(|(_, m)| m).collect()
    }
}

fn matches_substring(medication: &Medication, needle: &str) -> bool {
    [
        &medication.name,
        &medication.generic_name,
        &medication.therapeutic_class,
        &medication.atc_code,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Best Jaro-Winkler score against the name, generic name or any brand name.
fn name_similarity(medication: &Medication, needle: &str) -> f64 {
    std::iter::once(&medication.name)
        .chain(std::iter::once(&medication.generic_name))
        .chain(medication.brand_names.iter())
        .map(|candidate| jaro_winkler(&candidate.to_lowercase(), needle))
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures;

    fn catalog() -> MedicationCatalog {
        MedicationCatalog::new(fixtures::sample()).unwrap()
    }

    fn ids<'a>(meds: &[&'a Medication]) -> Vec<&'a str> {
        meds.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_empty_term_returns_all() {
        let catalog = catalog();
        assert_eq!(catalog.search("").len(), 3);
        assert_eq!(catalog.search("   ").len(), 3);
    }

    #[test]
    fn test_substring_over_all_fields() {
        let catalog = catalog();
        assert_eq!(ids(&catalog.search("METF")), vec!["metformina"]);
        assert_eq!(ids(&catalog.search("anticoagulante")), vec!["apixabano"]);
        assert_eq!(ids(&catalog.search("c01aa")), vec!["digoxina"]);
        // "oral" appears in two therapeutic classes
        assert_eq!(ids(&catalog.search("oral")), vec!["apixabano", "metformina"]);
    }

    #[test]
    fn test_fuzzy_fallback_on_typo() {
        let catalog = catalog();
        assert_eq!(ids(&catalog.search("metformine")), vec!["metformina"]);
        assert_eq!(ids(&catalog.search("digoxyna")), vec!["digoxina"]);
    }

    #[test]
    fn test_no_fuzzy_for_short_or_distant_terms() {
        let catalog = catalog();
        assert!(catalog.search("zz").is_empty());
        assert!(catalog.search("paracetamol").is_empty());
    }

    #[test]
    fn test_threshold_is_respected() {
        let catalog = catalog();
        assert!(catalog.search_with_threshold("metformine", 0.99).is_empty());
    }
}
