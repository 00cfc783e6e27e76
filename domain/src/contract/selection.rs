//! Contract for the selection (de-duplication) stage

use super::error::ContractError;
use super::fields::{array, index, item_path, object, required, string};
use super::StructuredContract;
use crate::analysis::selection::SelectionResult;
use serde_json::{Value, json};

/// Selection output must pick at most `max_selected` distinct, in-range
/// indices of a batch of `batch_size` images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionContract {
    pub batch_size: usize,
    pub max_selected: usize,
}

impl SelectionContract {
    pub fn new(batch_size: usize, max_selected: usize) -> Self {
        Self {
            batch_size,
            max_selected,
        }
    }
}

impl StructuredContract for SelectionContract {
    type Output = SelectionResult;

    fn name(&self) -> &'static str {
        "selection"
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "selected_indices": {
                    "type": "array",
                    "items": {
                        "type": "integer",
                        "minimum": 0,
                        "maximum": self.batch_size.saturating_sub(1)
                    },
                    "maxItems": self.max_selected,
                    "uniqueItems": true
                },
                "reasons": { "type": "string" }
            },
            "required": ["selected_indices", "reasons"]
        })
    }

    fn validate(&self, candidate: &Value) -> Result<SelectionResult, ContractError> {
        let obj = object(candidate, "")?;
        let raw = array(required(obj, "", "selected_indices")?, "selected_indices")?;
        let reasons = string(required(obj, "", "reasons")?, "reasons")?;

        let indices = raw
            .iter()
            .enumerate()
            .map(|(i, v)| index(v, &item_path("selected_indices", i)))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(&out_of_range) = indices.iter().find(|&&i| i >= self.batch_size) {
            return Err(ContractError::constraint(
                "index_in_range",
                format!(
                    "index {} is outside a batch of {} images",
                    out_of_range, self.batch_size
                ),
            ));
        }

        let mut seen = std::collections::BTreeSet::new();
        for &i in &indices {
            if !seen.insert(i) {
                return Err(ContractError::constraint(
                    "unique_indices",
                    format!("index {} selected more than once", i),
                ));
            }
        }

        if indices.len() > self.max_selected {
            return Err(ContractError::constraint(
                "max_selected",
                format!(
                    "{} images selected, at most {} allowed",
                    indices.len(),
                    self.max_selected
                ),
            ));
        }

        Ok(SelectionResult::new(indices, reasons))
    }
}
