use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;

use super::model::{SupplierDataset, SupplierRow};
use super::normalize::normalize_code;

// ---------------------------------------------------------------------------
// Filter predicate: user selections
// ---------------------------------------------------------------------------

/// User selections. An empty set or an open bound means "no filter" for that
/// predicate; the three predicates are ANDed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    /// Selected UF codes.
    pub states: BTreeSet<String>,
    /// Selected category tags.
    pub categories: BTreeSet<String>,
    /// Inclusive lower bound on registration date.
    pub registered_from: Option<NaiveDate>,
    /// Inclusive upper bound on registration date.
    pub registered_to: Option<NaiveDate>,
}

impl FilterState {
    /// Whether no predicate restricts anything.
    pub fn is_unrestricted(&self) -> bool {
        self.states.is_empty()
            && self.categories.is_empty()
            && self.registered_from.is_none()
            && self.registered_to.is_none()
    }

    /// Toggle a state code in the selection.
    pub fn toggle_state(&mut self, state: &str) {
        toggle(&mut self.states, normalize_code(state));
    }

    /// Toggle a category tag in the selection.
    pub fn toggle_category(&mut self, category: &str) {
        toggle(&mut self.categories, normalize_code(category));
    }

    /// Whether a single row passes all active predicates.
    pub fn matches(&self, row: &SupplierRow) -> bool {
        self.compile().matches(row)
    }

    /// Selections after trim + upper-case, the same normalization the loader
    /// applies to the data.
    fn compile(&self) -> CompiledFilter {
        CompiledFilter {
            states: self.states.iter().map(|s| normalize_code(s)).collect(),
            categories: self.categories.iter().map(|c| normalize_code(c)).collect(),
            registered_from: self.registered_from,
            registered_to: self.registered_to,
        }
    }
}

/// A [`FilterState`] with its selections normalized, built once per pass.
struct CompiledFilter {
    states: HashSet<String>,
    categories: HashSet<String>,
    registered_from: Option<NaiveDate>,
    registered_to: Option<NaiveDate>,
}

impl CompiledFilter {
    fn matches(&self, row: &SupplierRow) -> bool {
        let sup = &row.supplier;

        if !self.states.is_empty() && !self.states.contains(&sup.state) {
            return false;
        }

        if !self.categories.is_empty()
            && !sup.categories.iter().any(|c| self.categories.contains(c))
        {
            return false;
        }

        if self.registered_from.is_some() || self.registered_to.is_some() {
            let Some(reg) = sup.registered_on else {
                return false;
            };
            if self.registered_from.is_some_and(|from| reg < from) {
                return false;
            }
            if self.registered_to.is_some_and(|to| reg > to) {
                return false;
            }
        }

        true
    }
}

fn toggle(set: &mut BTreeSet<String>, value: String) {
    if !set.remove(&value) {
        set.insert(value);
    }
}

/// Return indices of rows that pass all active filters.
pub fn filtered_indices(dataset: &SupplierDataset, filters: &FilterState) -> Vec<usize> {
    if filters.is_unrestricted() {
        return (0..dataset.len()).collect();
    }
    let compiled = filters.compile();
    dataset
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| compiled.matches(row))
        .map(|(i, _)| i)
        .collect()
}
