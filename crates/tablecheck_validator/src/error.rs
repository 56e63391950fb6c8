//! Error types for validation operations.

use tablecheck_core::SchemaError;
use thiserror::Error;

/// Errors that keep some or all checks of a table from running.
///
/// None of these are data violations: they are recorded in the table
/// report's `errors` and change its status.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Descriptor could not be normalized
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Table data for a resource is not available
    #[error("Resource '{0}' is not available")]
    ResourceUnavailable(String),

    /// Table data for a resource could not be read
    #[error("Resource '{resource}' could not be read: {reason}")]
    ResourceUnreadable { resource: String, reason: String },

    /// A foreign key targets a resource whose descriptor is malformed
    #[error("Referenced resource '{resource}' has an invalid schema: {error}")]
    InvalidReference { resource: String, error: SchemaError },

    /// A declared field has no column in the table data
    #[error("Field '{field}' of resource '{resource}' has no column in the data")]
    MissingColumn { resource: String, field: String },

    /// A column's length differs from the table's row count
    #[error("Column '{column}' has {actual} values, expected {expected}")]
    RaggedColumn {
        column: String,
        actual: usize,
        expected: usize,
    },

    /// A data row's width differs from the header's
    #[error("Row {row} has {actual} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

impl ValidationError {
    /// Creates a new resource unavailable error.
    pub fn unavailable(resource: impl Into<String>) -> Self {
        Self::ResourceUnavailable(resource.into())
    }

    /// Creates a new unreadable resource error.
    pub fn unreadable(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResourceUnreadable {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means the data of `resource` is missing.
    pub fn is_unavailable(&self, resource: &str) -> bool {
        match self {
            Self::ResourceUnavailable(name) => name == resource,
            Self::ResourceUnreadable { resource: name, .. } => name == resource,
            _ => false,
        }
    }

    /// Creates a new missing column error.
    pub fn missing_column(resource: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingColumn {
            resource: resource.into(),
            field: field.into(),
        }
    }

    /// Creates a new ragged column error.
    pub fn ragged(column: impl Into<String>, actual: usize, expected: usize) -> Self {
        Self::RaggedColumn {
            column: column.into(),
            actual,
            expected,
        }
    }
}
