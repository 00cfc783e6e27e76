//! Selection stage result

use serde::{Deserialize, Serialize};

/// The subset of a batch judged most interesting and distinct.
///
/// Indices are 0-based positions in the input batch. They are always kept
/// in ascending order, not in the order the model ranked them, so the same
/// selection always compares and prints the same way. The ranking is not
/// preserved; use [`SelectionResult::new`] to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub selected_indices: Vec<usize>,
    pub reasons: String,
}

impl SelectionResult {
    /// Create a result with canonical (ascending) index order.
    pub fn new(mut selected_indices: Vec<usize>, reasons: impl Into<String>) -> Self {
        selected_indices.sort_unstable();
        Self {
            selected_indices,
            reasons: reasons.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.selected_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected_indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.selected_indices.binary_search(&index).is_ok()
    }
}
