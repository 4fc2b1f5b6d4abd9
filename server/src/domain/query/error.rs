//! Query validation errors

use thiserror::Error;

use crate::domain::entity::FieldVariant;

/// Rejections raised while parsing, validating or compiling a search query
///
/// Every variant is a client error; nothing here is retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Operator '{operator}' is not allowed for {variant} field '{field}'")]
    InvalidOperator {
        field: String,
        operator: String,
        variant: FieldVariant,
    },

    #[error("Invalid value for '{field}' {operator}: {reason}")]
    InvalidValueArity {
        field: String,
        operator: String,
        reason: String,
    },

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("Malformed query: {0}")]
    MalformedQuery(String),
}

impl QueryError {
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_operator(
        field: impl Into<String>,
        operator: impl Into<String>,
        variant: FieldVariant,
    ) -> Self {
        Self::InvalidOperator {
            field: field.into(),
            operator: operator.into(),
            variant,
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        operator: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValueArity {
            field: field.into(),
            operator: operator.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::InvalidOperator { .. } => "INVALID_OPERATOR",
            Self::InvalidValueArity { .. } => "INVALID_VALUE_ARITY",
            Self::InvalidPagination(_) => "INVALID_PAGINATION",
            Self::MalformedQuery(_) => "MALFORMED_QUERY",
        }
    }
}
