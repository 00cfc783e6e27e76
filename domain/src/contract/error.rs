//! Contract validation errors

use thiserror::Error;

/// Why a candidate stage output was rejected.
///
/// `field` is a path into the candidate (`images[1].location.lat`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("missing required field `{field}`")]
    MissingField { field: String },

    #[error("field `{field}` expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("constraint `{constraint}` violated: {detail}")]
    ConstraintViolation {
        constraint: &'static str,
        detail: String,
    },
}

impl ContractError {
    pub fn missing(field: impl Into<String>) -> Self {
        ContractError::MissingField {
            field: field.into(),
        }
    }

    pub fn mismatch(field: impl Into<String>, expected: &'static str, found: impl Into<String>) -> Self {
        ContractError::TypeMismatch {
            field: field.into(),
            expected,
            found: found.into(),
        }
    }

    pub fn constraint(constraint: &'static str, detail: impl Into<String>) -> Self {
        ContractError::ConstraintViolation {
            constraint,
            detail: detail.into(),
        }
    }

    /// The offending field path or constraint name, for diagnostics.
    pub fn location(&self) -> &str {
        match self {
            ContractError::MissingField { field } | ContractError::TypeMismatch { field, .. } => {
                field
            }
            ContractError::ConstraintViolation { constraint, .. } => constraint,
        }
    }
}
