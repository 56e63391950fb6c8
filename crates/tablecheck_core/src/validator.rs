//! Validation options and report types.
//!
//! A validation run is configured with a `ValidationContext` and produces a
//! `ValidationReport` holding one `TableReport` per resource.

use crate::{ConstraintKind, Violation};
use serde::{Deserialize, Serialize};

/// Options for a validation run.
///
/// # Example
///
/// ```rust
/// use tablecheck_core::ValidationContext;
///
/// let context = ValidationContext::new()
///     .with_parallel(false)
///     .with_sample_size(1_000);
///
/// assert!(!context.parallel);
/// assert_eq!(context.sample_size, Some(1_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationContext {
    /// Run field and table checks on the rayon thread pool
    pub parallel: bool,

    /// Only normalize the descriptor; read no data
    pub schema_only: bool,

    /// Validate only the first N rows of every table
    pub sample_size: Option<usize>,

    /// Report only the first unparseable value of each field
    pub first_invalid_only: bool,
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self {
            parallel: true,
            schema_only: false,
            sample_size: None,
            first_invalid_only: false,
        }
    }
}

impl ValidationContext {
    /// Creates a new validation context with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets schema-only mode.
    pub fn with_schema_only(mut self, schema_only: bool) -> Self {
        self.schema_only = schema_only;
        self
    }

    /// Sets the number of rows to validate per table.
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = Some(size);
        self
    }

    /// Sets whether only the first type error per field is reported.
    pub fn with_first_invalid_only(mut self, first_invalid_only: bool) -> Self {
        self.first_invalid_only = first_invalid_only;
        self
    }
}

/// How far validation of a table got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    /// Every check ran
    Validated,
    /// Some checks could not run (see `errors`)
    Partial,
    /// The table could not be validated at all
    Skipped,
}

/// Outcome for a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    /// Resource name
    pub resource: String,

    /// Validation status
    pub status: TableStatus,

    /// Rows validated
    pub row_count: usize,

    /// Data violations, in check order
    pub violations: Vec<Violation>,

    /// Errors that prevented checks from running
    pub errors: Vec<String>,
}

impl TableReport {
    /// Creates an empty report for a table that is about to be validated.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            status: TableStatus::Validated,
            row_count: 0,
            violations: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Creates a report for a table that could not be validated.
    pub fn skipped(resource: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            status: TableStatus::Skipped,
            row_count: 0,
            violations: Vec::new(),
            errors: vec![error.into()],
        }
    }

    /// Records an error that prevented some checks from running.
    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        if self.status == TableStatus::Validated {
            self.status = TableStatus::Partial;
        }
    }

    /// Whether every check ran and none failed.
    pub fn is_valid(&self) -> bool {
        self.status == TableStatus::Validated && self.violations.is_empty()
    }
}

/// Report of a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether every table was fully validated without violations
    pub valid: bool,

    /// Per-table outcomes, in package order
    pub tables: Vec<TableReport>,

    /// Run statistics
    pub stats: ValidationStats,
}

/// Statistics about validation execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStats {
    /// Number of tables validated (fully or partially)
    pub tables_validated: usize,

    /// Number of records validated
    pub records_validated: usize,

    /// Number of fields checked
    pub fields_checked: usize,

    /// Number of constraints evaluated
    pub constraints_evaluated: usize,

    /// Validation duration in milliseconds
    pub duration_ms: u64,
}

impl ValidationReport {
    /// Creates a report from per-table outcomes.
    pub fn new(tables: Vec<TableReport>, stats: ValidationStats) -> Self {
        Self {
            valid: tables.iter().all(TableReport::is_valid),
            tables,
            stats,
        }
    }

    /// Looks up the report of a resource.
    pub fn table(&self, resource: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.resource == resource)
    }

    /// Iterates over every violation, table by table.
    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.tables.iter().flat_map(|t| t.violations.iter())
    }

    /// Iterates over the violations of one kind.
    pub fn violations_of(&self, kind: ConstraintKind) -> impl Iterator<Item = &Violation> {
        self.violations().filter(move |v| v.kind == kind)
    }

    /// Total number of violations.
    pub fn violation_count(&self) -> usize {
        self.tables.iter().map(|t| t.violations.len()).sum()
    }

    /// Total number of errors that prevented checks from running.
    pub fn error_count(&self) -> usize {
        self.tables.iter().map(|t| t.errors.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_defaults() {
        let context = ValidationContext::new();
        assert!(context.parallel);
        assert!(!context.schema_only);
        assert_eq!(context.sample_size, None);
        assert!(!context.first_invalid_only);

        let context = context.with_schema_only(true).with_first_invalid_only(true);
        assert!(context.schema_only);
        assert!(context.first_invalid_only);
    }

    #[test]
    fn test_table_report_status() {
        let mut report = TableReport::new("people");
        assert!(report.is_valid());

        report.add_error("resource 'teams' unavailable");
        assert_eq!(report.status, TableStatus::Partial);
        assert!(!report.is_valid());

        let mut skipped = TableReport::skipped("teams", "no data");
        skipped.add_error("another");
        assert_eq!(skipped.status, TableStatus::Skipped);
    }

    #[test]
    fn test_skipped_table_is_never_valid() {
        let report = ValidationReport::new(
            vec![TableReport::skipped("people", "unknown field")],
            ValidationStats::default(),
        );
        assert!(!report.valid);
        assert_eq!(report.violation_count(), 0);
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn test_violations_of_kind() {
        let mut table = TableReport::new("people");
        table.violations.push(Violation::field(
            "people",
            "id",
            Some(0),
            ConstraintKind::RequiredConstraint,
            "missing",
        ));
        table.violations.push(Violation::field(
            "people",
            "age",
            Some(1),
            ConstraintKind::TypeError,
            "not an integer",
        ));
        let report = ValidationReport::new(vec![table], ValidationStats::default());

        assert!(!report.valid);
        assert_eq!(report.violations_of(ConstraintKind::TypeError).count(), 1);
        assert!(report.table("people").is_some());
        assert!(report.table("teams").is_none());
    }
}
