//! Medications chosen for clinical-panel review.

use std::collections::BTreeSet;

use crate::models::Medication;

/// Set of selected medication ids.
///
/// Starts empty; replaced wholesale when the active medication source
/// changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: BTreeSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id`. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn ids(&self) -> &BTreeSet<String> {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Reset to exactly the given ids, discarding any prior selection.
    pub fn replace_with<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// The selected subset of `displayed`, in display order.
    pub fn retain_displayed<'a>(&self, displayed: &[&'a Medication]) -> Vec<&'a Medication> {
        displayed
            .iter()
            .copied()
            .filter(|m| self.contains(&m.id))
            .collect()
    }
}
