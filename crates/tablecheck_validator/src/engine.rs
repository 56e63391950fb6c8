//! Main validation engine.
//!
//! This module provides the `Validator` that runs a package through
//! normalization, type parsing, field checks and row-set checks, and
//! assembles the report.

use crate::keys::{check_foreign_key, check_unique, ReferenceKeys};
use crate::{
    normalize, Column, FieldChecker, LogicalColumn, NormalizedSchema, NormalizedTable,
    ReportAssembler, Table, TableSource, ValidationError,
};
use rayon::prelude::*;
use std::collections::HashMap;
use tablecheck_core::{
    ForeignKey, Package, TableDescriptor, ValidationContext, ValidationReport, Violation,
};
use tracing::{debug, info, warn};

/// Validation engine for tabular data packages.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use tablecheck_core::{FieldBuilder, FieldType, TableBuilder, ValidationContext};
/// use tablecheck_validator::{Column, Table, Validator};
///
/// let people = TableBuilder::new("people")
///     .field(FieldBuilder::new("id", FieldType::Integer).build())
///     .primary_key(["id"])
///     .build();
///
/// let mut tables = HashMap::new();
/// tables.insert(
///     "people".to_string(),
///     Table::from_columns(vec![Column::new("id", ["1", "2", "2"])]).unwrap(),
/// );
///
/// let validator = Validator::new(ValidationContext::new());
/// let report = validator.validate(&[people], &tables);
///
/// assert!(!report.valid);
/// for violation in report.violations() {
///     println!("{}", violation);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Validator {
    context: ValidationContext,
}

/// Result of the per-table phase.
struct TableOutcome {
    columns: HashMap<String, LogicalColumn>,
    violations: Vec<Violation>,
    errors: Vec<ValidationError>,
    row_count: usize,
    fields_checked: usize,
}

impl Validator {
    /// Creates a validator with the given options.
    pub fn new(context: ValidationContext) -> Self {
        Self { context }
    }

    /// Returns the options of this validator.
    pub fn context(&self) -> &ValidationContext {
        &self.context
    }

    /// Normalizes a package without reading any data.
    pub fn plan(&self, descriptors: &[TableDescriptor]) -> NormalizedSchema {
        normalize(descriptors)
    }

    /// Validates every resource of a package.
    pub fn validate_package<S>(&self, package: &Package, source: &S) -> ValidationReport
    where
        S: TableSource + ?Sized,
    {
        self.validate(&package.resources, source)
    }

    /// Validates a set of resources against their data.
    ///
    /// The returned report covers every resource. A resource whose descriptor
    /// is malformed or whose data is unavailable is `Skipped`; one where some
    /// checks could not run is `Partial`.
    pub fn validate<S>(&self, descriptors: &[TableDescriptor], source: &S) -> ValidationReport
    where
        S: TableSource + ?Sized,
    {
        info!("Validating {} resource(s)", descriptors.len());
        let schema = normalize(descriptors);
        let mut assembler = ReportAssembler::new(schema.entries().map(|(name, _)| name));

        let mut tables: Vec<(usize, &NormalizedTable)> = Vec::new();
        for (position, (name, entry)) in schema.entries().enumerate() {
            match entry {
                Ok(table) => tables.push((position, table)),
                Err(e) => {
                    warn!("Skipping resource '{}': {}", name, e);
                    assembler.skip(position, e);
                }
            }
        }

        if self.context.schema_only {
            info!("Schema only: no data read");
            for (_, table) in &tables {
                assembler.checked(table.schema().fields.len(), table.constraint_count());
            }
            return assembler.finish();
        }

        let mut checker =
            FieldChecker::new().with_first_invalid_only(self.context.first_invalid_only);
        for (position, table) in &tables {
            if let Err(e) = checker.prepare(table) {
                assembler.error(*position, e);
            }
        }

        let outcomes: Vec<TableOutcome> = self.map(&tables, |(_, table)| {
            self.check_table(table, fetch(source, table.name()), &checker)
        });

        let mut references: HashMap<(String, Vec<String>), Result<ReferenceKeys, ValidationError>> =
            HashMap::new();
        for ((position, table), outcome) in tables.iter().zip(outcomes) {
            let TableOutcome {
                columns,
                mut violations,
                errors,
                row_count,
                fields_checked,
            } = outcome;

            if let Some(unavailable) = errors.iter().find(|e| e.is_unavailable(table.name()))
            {
                warn!("Skipping resource '{}': {}", table.name(), unavailable);
                assembler.skip(*position, unavailable);
                continue;
            }
            for error in &errors {
                warn!("Resource '{}': {}", table.name(), error);
                assembler.error(*position, error);
            }

            for foreign_key in table.foreign_keys() {
                match self.check_reference(
                    table,
                    foreign_key,
                    &columns,
                    source,
                    &schema,
                    &mut references,
                ) {
                    Ok(found) => violations.extend(found),
                    Err(e) => {
                        warn!("Resource '{}': foreign key not checked: {}", table.name(), e);
                        assembler.error(*position, e);
                    }
                }
            }

            debug!(
                "Resource '{}': {} row(s), {} violation(s)",
                table.name(),
                row_count,
                violations.len()
            );
            assembler.rows(*position, row_count);
            assembler.checked(fields_checked, table.constraint_count());
            assembler.extend(*position, violations);
        }

        let report = assembler.finish();
        info!(
            "Validation finished: {} violation(s), {} error(s) in {}ms",
            report.violation_count(),
            report.error_count(),
            report.stats.duration_ms
        );
        report
    }

    /// Maps over items on the rayon pool when running in parallel, keeping
    /// the input order.
    fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if self.context.parallel {
            items.par_iter().map(f).collect()
        } else {
            items.iter().map(f).collect()
        }
    }

    /// Parses and checks one table: field checks, then unique keys.
    fn check_table(
        &self,
        table: &NormalizedTable,
        data: Result<&Table, ValidationError>,
        checker: &FieldChecker,
    ) -> TableOutcome {
        let data = match data {
            Ok(data) => data,
            Err(e) => {
                return TableOutcome {
                    columns: HashMap::new(),
                    violations: Vec::new(),
                    errors: vec![e],
                    row_count: 0,
                    fields_checked: 0,
                };
            }
        };
        let sampled;
        let data = match self.context.sample_size {
            Some(size) => {
                sampled = data.sample(size);
                &sampled
            }
            None => data,
        };

        let fields: Vec<_> = table.fields().collect();
        let results: Vec<Result<(Vec<Violation>, LogicalColumn), ValidationError>> =
            self.map(&fields, |(field, parser)| {
                let raw: &Column = data
                    .column(&field.name)
                    .ok_or_else(|| ValidationError::missing_column(table.name(), &field.name))?;
                let logical = parser.parse_column(raw);
                let violations = checker.check_field(table.name(), field, parser, raw, &logical);
                Ok((violations, logical))
            });

        let mut violations = Vec::new();
        let mut errors = Vec::new();
        let mut columns: HashMap<String, LogicalColumn> = HashMap::new();
        for ((field, _), result) in fields.iter().zip(results) {
            match result {
                Ok((found, logical)) => {
                    violations.extend(found);
                    columns.insert(field.name.clone(), logical);
                }
                Err(e) => errors.push(e),
            }
        }
        let fields_checked = columns.len();

        let key_checks = table.key_checks();
        let key_results: Vec<Option<Vec<Violation>>> = self.map(&key_checks, |(key, kind)| {
            let key_columns: Option<Vec<&LogicalColumn>> =
                key.iter().map(|f| columns.get(f.as_str())).collect();
            key_columns.map(|key_columns| check_unique(table.name(), key, *kind, &key_columns))
        });
        for found in key_results.into_iter().flatten() {
            violations.extend(found);
        }

        TableOutcome {
            columns,
            violations,
            errors,
            row_count: data.len(),
            fields_checked,
        }
    }

    /// Checks one foreign key of `table`.
    ///
    /// The reference key set is built once per (resource, fields) pair from
    /// the full reference table and reused.
    fn check_reference<S>(
        &self,
        table: &NormalizedTable,
        foreign_key: &ForeignKey,
        columns: &HashMap<String, LogicalColumn>,
        source: &S,
        schema: &NormalizedSchema,
        references: &mut HashMap<(String, Vec<String>), Result<ReferenceKeys, ValidationError>>,
    ) -> Result<Vec<Violation>, ValidationError>
    where
        S: TableSource + ?Sized,
    {
        // A missing local column is already reported for the table.
        let Some(local) = foreign_key
            .fields
            .iter()
            .map(|f| columns.get(f))
            .collect::<Option<Vec<&LogicalColumn>>>()
        else {
            return Ok(Vec::new());
        };

        let target = foreign_key.reference_resource(table.name()).to_string();
        let reference = references
            .entry((target.clone(), foreign_key.reference.fields.clone()))
            .or_insert_with(|| {
                debug!(
                    "Building reference keys {}.({})",
                    target,
                    foreign_key.reference.fields.join(", ")
                );
                let reference_table = schema.table(&target).ok_or_else(|| {
                    match schema.error(&target) {
                        Some(e) => ValidationError::InvalidReference {
                            resource: target.clone(),
                            error: e.clone(),
                        },
                        None => ValidationError::unavailable(&target),
                    }
                })?;
                let reference_data = fetch(source, &target)?;
                let key_columns =
                    parse_key(reference_table, &foreign_key.reference.fields, reference_data)?;
                Ok(ReferenceKeys::from_columns(
                    &key_columns.iter().collect::<Vec<_>>(),
                ))
            })
            .as_ref()
            .map_err(|e| e.clone())?;

        Ok(check_foreign_key(table.name(), foreign_key, &local, reference))
    }
}

/// Looks up the data of a resource, keeping the reason it is unavailable.
fn fetch<'a, S>(source: &'a S, resource: &str) -> Result<&'a Table, ValidationError>
where
    S: TableSource + ?Sized,
{
    source
        .table(resource)
        .ok_or_else(|| match source.unavailable_reason(resource) {
            Some(reason) => ValidationError::unreadable(resource, reason),
            None => ValidationError::unavailable(resource),
        })
}

/// Parses the key columns of a table.
fn parse_key(
    table: &NormalizedTable,
    fields: &[String],
    data: &Table,
) -> Result<Vec<LogicalColumn>, ValidationError> {
    fields
        .iter()
        .map(|name| {
            let missing = || ValidationError::missing_column(table.name(), name);
            let raw = data.column(name).ok_or_else(missing)?;
            let parser = table.parser(name).ok_or_else(missing)?;
            Ok(parser.parse_column(raw))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;
    use pretty_assertions::assert_eq;
    use tablecheck_core::{ConstraintKind, FieldBuilder, FieldType, TableBuilder, TableStatus};

    fn integer(name: &str) -> tablecheck_core::FieldDescriptor {
        FieldBuilder::new(name, FieldType::Integer).build()
    }

    fn source(tables: Vec<(&str, Table)>) -> HashMap<String, Table> {
        tables
            .into_iter()
            .map(|(name, table)| (name.to_string(), table))
            .collect()
    }

    fn kinds(report: &ValidationReport) -> Vec<ConstraintKind> {
        report.violations().map(|v| v.kind).collect()
    }

    #[test]
    fn test_empty_table() {
        let people = TableBuilder::new("people").field(integer("id")).build();
        let data = source(vec![(
            "people",
            Table::from_columns(vec![Column::new("id", Vec::<Value>::new())]).unwrap(),
        )]);
        let report = Validator::default().validate(&[people], &data);
        assert!(report.valid);
        assert_eq!(report.stats.records_validated, 0);
    }

    #[test]
    fn test_primary_key_violations() {
        let people = TableBuilder::new("people")
            .field(integer("id"))
            .primary_key(["id"])
            .build();
        let data = source(vec![(
            "people",
            Table::from_columns(vec![Column::new("id", [Some(1i64), Some(1), None])]).unwrap(),
        )]);

        for parallel in [true, false] {
            let validator = Validator::new(ValidationContext::new().with_parallel(parallel));
            let report = validator.validate(&[people.clone()], &data);
            assert_eq!(
                kinds(&report),
                vec![
                    ConstraintKind::RequiredConstraint,
                    ConstraintKind::PrimaryKeyConstraint
                ]
            );
            assert_eq!(report.table("people").unwrap().violations[1].rows, vec![0, 1]);
        }
    }

    #[test]
    fn test_schema_error_skips_table() {
        let people = TableBuilder::new("people")
            .field(integer("id"))
            .primary_key(["nope"])
            .build();
        let report = Validator::default().validate(&[people], &source(vec![]));
        let table = report.table("people").unwrap();
        assert_eq!(table.status, TableStatus::Skipped);
        assert!(table.violations.is_empty());
        assert!(!report.valid);
    }

    #[test]
    fn test_unavailable_data_skips_table() {
        let people = TableBuilder::new("people").field(integer("id")).build();
        let report = Validator::default().validate(&[people], &source(vec![]));
        assert_eq!(report.table("people").unwrap().status, TableStatus::Skipped);
        assert_eq!(report.stats.tables_validated, 0);
    }

    #[test]
    fn test_missing_column_is_partial() {
        let people = TableBuilder::new("people")
            .field(integer("id"))
            .field(integer("age"))
            .build();
        let data = source(vec![(
            "people",
            Table::from_columns(vec![Column::new("id", ["x"])]).unwrap(),
        )]);
        let report = Validator::default().validate(&[people], &data);
        let table = report.table("people").unwrap();
        assert_eq!(table.status, TableStatus::Partial);
        assert_eq!(kinds(&report), vec![ConstraintKind::TypeError]);
    }

    #[test]
    fn test_foreign_key_to_unavailable_resource() {
        let teams = TableBuilder::new("teams").field(integer("code")).build();
        let people = TableBuilder::new("people")
            .field(integer("team"))
            .foreign_key(["team"], "teams", ["code"])
            .build();
        let data = source(vec![(
            "people",
            Table::from_columns(vec![Column::new("team", ["1"])]).unwrap(),
        )]);
        let report = Validator::default().validate(&[teams, people], &data);

        assert_eq!(report.table("teams").unwrap().status, TableStatus::Skipped);
        let people = report.table("people").unwrap();
        assert_eq!(people.status, TableStatus::Partial);
        assert_eq!(people.row_count, 1);
        assert_eq!(
            people.errors,
            vec![ValidationError::unavailable("teams").to_string()]
        );
    }

    #[test]
    fn test_foreign_key_to_invalid_resource() {
        let teams = TableBuilder::new("teams")
            .field(integer("code"))
            .primary_key(["nope"])
            .build();
        let people = TableBuilder::new("people")
            .field(integer("team"))
            .foreign_key(["team"], "teams", ["code"])
            .build();
        let data = source(vec![
            (
                "teams",
                Table::from_columns(vec![Column::new("code", ["1"])]).unwrap(),
            ),
            (
                "people",
                Table::from_columns(vec![Column::new("team", ["1"])]).unwrap(),
            ),
        ]);
        let report = Validator::default().validate(&[teams, people], &data);

        assert_eq!(report.table("teams").unwrap().status, TableStatus::Skipped);
        let people = report.table("people").unwrap();
        assert_eq!(people.status, TableStatus::Partial);
        assert_eq!(people.errors.len(), 1);
        assert!(
            people.errors[0].starts_with("Referenced resource 'teams' has an invalid schema:"),
            "unexpected error: {}",
            people.errors[0]
        );
        assert!(people.errors[0].contains("Unknown field 'nope'"));
    }

    /// A source that knows why some resources could not be read.
    struct FailingSource {
        tables: HashMap<String, Table>,
        failures: HashMap<String, String>,
    }

    impl TableSource for FailingSource {
        fn table(&self, resource: &str) -> Option<&Table> {
            self.tables.get(resource)
        }

        fn unavailable_reason(&self, resource: &str) -> Option<&str> {
            self.failures.get(resource).map(String::as_str)
        }
    }

    #[test]
    fn test_unavailable_reason_is_reported() {
        let teams = TableBuilder::new("teams").field(integer("code")).build();
        let people = TableBuilder::new("people")
            .field(integer("team"))
            .foreign_key(["team"], "teams", ["code"])
            .build();
        let data = FailingSource {
            tables: source(vec![(
                "people",
                Table::from_columns(vec![Column::new("team", ["1"])]).unwrap(),
            )]),
            failures: HashMap::from([("teams".to_string(), "bad quoting".to_string())]),
        };
        let report = Validator::default().validate(&[teams, people], &data);

        let expected = ValidationError::unreadable("teams", "bad quoting").to_string();
        assert_eq!(expected, "Resource 'teams' could not be read: bad quoting");
        let teams = report.table("teams").unwrap();
        assert_eq!(teams.status, TableStatus::Skipped);
        assert_eq!(teams.errors, vec![expected.clone()]);
        let people = report.table("people").unwrap();
        assert_eq!(people.status, TableStatus::Partial);
        assert_eq!(people.errors, vec![expected]);
    }

    #[test]
    fn test_sample_size() {
        let people = TableBuilder::new("people")
            .field(FieldBuilder::new("id", FieldType::Integer).unique(true).build())
            .build();
        let data = source(vec![(
            "people",
            Table::from_columns(vec![Column::new("id", [1i64, 2, 3, 3])]).unwrap(),
        )]);
        let validator = Validator::new(ValidationContext::new().with_sample_size(3));
        let report = validator.validate(&[people], &data);
        assert!(report.valid);
        assert_eq!(report.stats.records_validated, 3);
    }

    #[test]
    fn test_schema_only() {
        let people = TableBuilder::new("people")
            .field(integer("id"))
            .primary_key(["id"])
            .build();
        let validator = Validator::new(ValidationContext::new().with_schema_only(true));
        let report = validator.validate(&[people], &source(vec![]));
        assert!(report.valid);
        assert_eq!(report.stats.records_validated, 0);
        assert_eq!(report.stats.fields_checked, 1);
        assert_eq!(report.stats.constraints_evaluated, 2);
    }
}
