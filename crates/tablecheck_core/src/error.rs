//! Error types for package descriptors.
//!
//! A `SchemaError` means a resource's check set cannot be derived, so the
//! resource cannot be validated at all.

use thiserror::Error;

/// Result type for descriptor operations.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Malformed descriptor errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Two resources share a name
    #[error("Duplicate resource name: {0}")]
    DuplicateResource(String),

    /// Two fields of one table share a name
    #[error("Duplicate field name '{field}' in resource '{resource}'")]
    DuplicateField {
        /// Resource name
        resource: String,
        /// Repeated field name
        field: String,
    },

    /// A key names a field that does not exist
    #[error("Unknown field '{field}' in {key} of resource '{resource}'")]
    UnknownField {
        /// Resource name
        resource: String,
        /// Referenced field name
        field: String,
        /// Key declaration naming the field (e.g. "primaryKey")
        key: String,
    },

    /// A key declaration lists no fields
    #[error("Empty {key} in resource '{resource}'")]
    EmptyKey {
        /// Resource name
        resource: String,
        /// Key declaration
        key: String,
    },

    /// A foreign key points at a resource that is not in the package
    #[error("Foreign key in resource '{resource}' references unknown resource '{reference}'")]
    UnknownResource {
        /// Declaring resource
        resource: String,
        /// Referenced resource
        reference: String,
    },

    /// Local and reference field counts differ
    #[error(
        "Foreign key in resource '{resource}' maps {local} field(s) onto {reference} reference field(s)"
    )]
    KeyArityMismatch {
        /// Declaring resource
        resource: String,
        /// Local field count
        local: usize,
        /// Reference field count
        reference: usize,
    },

    /// A `pattern` constraint is not a valid regular expression
    #[error("Invalid pattern for field '{field}' in resource '{resource}': {error}")]
    InvalidPattern {
        /// Resource name
        resource: String,
        /// Field name
        field: String,
        /// Regex compilation error
        error: String,
    },

    /// A `format` is not understood for the field's type
    #[error("Unsupported {field_type} format '{format}' for field '{field}' in resource '{resource}'")]
    UnsupportedFormat {
        /// Resource name
        resource: String,
        /// Field name
        field: String,
        /// Declared type
        field_type: String,
        /// Offending format
        format: String,
    },
}

impl SchemaError {
    /// Creates a new unknown field error.
    pub fn unknown_field(
        resource: impl Into<String>,
        field: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self::UnknownField {
            resource: resource.into(),
            field: field.into(),
            key: key.into(),
        }
    }

    /// Creates a new empty key error.
    pub fn empty_key(resource: impl Into<String>, key: impl Into<String>) -> Self {
        Self::EmptyKey {
            resource: resource.into(),
            key: key.into(),
        }
    }

    /// Creates a new unknown resource error.
    pub fn unknown_resource(resource: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::UnknownResource {
            resource: resource.into(),
            reference: reference.into(),
        }
    }
}
