//! Per-field constraint checks.
//!
//! Constraints run against one of two representations of a column:
//! - physical (raw text): `pattern`, `minLength`, `maxLength`
//! - logical (parsed values): `required`, `minimum`, `maximum`, `enum`
//!
//! `unique` is a one-field key and is checked with the row-set checks.

use crate::normalize::anchored_pattern;
use crate::{Column, LogicalColumn, NormalizedTable, TypeParser, ValidationError, Value};
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use tablecheck_core::{ConstraintKind, FieldDescriptor, SchemaError, Violation};

/// Checks field constraints.
///
/// Patterns are compiled once by `prepare` and shared read-only afterwards,
/// so one checker can serve many worker threads.
#[derive(Debug, Default)]
pub struct FieldChecker {
    /// Cache of compiled regex patterns
    regex_cache: HashMap<String, Regex>,

    /// Report only the first type error of each field
    first_invalid_only: bool,
}

impl FieldChecker {
    /// Creates a new field checker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether only the first type error per field is reported.
    pub fn with_first_invalid_only(mut self, first_invalid_only: bool) -> Self {
        self.first_invalid_only = first_invalid_only;
        self
    }

    /// Compiles the patterns of every field of a table.
    pub fn prepare(&mut self, table: &NormalizedTable) -> Result<(), ValidationError> {
        for (field, _) in table.fields() {
            let Some(pattern) = &field.constraints.pattern else {
                continue;
            };
            if self.regex_cache.contains_key(pattern) {
                continue;
            }
            let regex = anchored_pattern(pattern).map_err(|e| {
                ValidationError::Schema(SchemaError::InvalidPattern {
                    resource: table.name().to_string(),
                    field: field.name.clone(),
                    error: e.to_string(),
                })
            })?;
            self.regex_cache.insert(pattern.clone(), regex);
        }
        Ok(())
    }

    /// Runs every check of one field, in a fixed order: type errors, then
    /// the physical pass, then the logical pass.
    pub fn check_field(
        &self,
        resource: &str,
        field: &FieldDescriptor,
        parser: &TypeParser,
        raw: &Column,
        logical: &LogicalColumn,
    ) -> Vec<Violation> {
        let mut violations = self.check_types(resource, field, parser, logical);
        violations.extend(self.check_physical(resource, field, raw));
        violations.extend(self.check_logical(resource, field, parser, logical));
        violations
    }

    /// Emits one `type-error` per value that failed to parse.
    pub fn check_types(
        &self,
        resource: &str,
        field: &FieldDescriptor,
        parser: &TypeParser,
        logical: &LogicalColumn,
    ) -> Vec<Violation> {
        let limit = if self.first_invalid_only { 1 } else { usize::MAX };
        logical
            .failures()
            .take(limit)
            .map(|(row, failure)| {
                Violation::field(
                    resource,
                    &field.name,
                    Some(row),
                    ConstraintKind::TypeError,
                    format!("'{}' is not a valid {}", failure.raw, parser),
                )
            })
            .collect()
    }

    /// Checks `pattern`, `minLength` and `maxLength` on the raw text.
    pub fn check_physical(
        &self,
        resource: &str,
        field: &FieldDescriptor,
        raw: &Column,
    ) -> Vec<Violation> {
        let constraints = &field.constraints;
        let mut violations = Vec::new();
        let present = || {
            raw.values()
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_missing())
                .map(|(row, v)| (row, v.text()))
        };

        if let Some(pattern) = &constraints.pattern {
            // Patterns that failed to compile were rejected by the normalizer.
            if let Some(regex) = self.regex_cache.get(pattern) {
                for (row, text) in present().filter(|(_, t)| !regex.is_match(t)) {
                    violations.push(Violation::field(
                        resource,
                        &field.name,
                        Some(row),
                        ConstraintKind::PatternConstraint,
                        format!("'{}' does not match pattern '{}'", text, pattern),
                    ));
                }
            }
        }

        if let Some(min) = constraints.min_length {
            for (row, text) in present() {
                let length = text.chars().count();
                if length < min {
                    violations.push(Violation::field(
                        resource,
                        &field.name,
                        Some(row),
                        ConstraintKind::MinimumLengthConstraint,
                        format!("'{}' has length {}, minimum is {}", text, length, min),
                    ));
                }
            }
        }

        if let Some(max) = constraints.max_length {
            for (row, text) in present() {
                let length = text.chars().count();
                if length > max {
                    violations.push(Violation::field(
                        resource,
                        &field.name,
                        Some(row),
                        ConstraintKind::MaximumLengthConstraint,
                        format!("'{}' has length {}, maximum is {}", text, length, max),
                    ));
                }
            }
        }

        violations
    }

    /// Checks `required`, `minimum`, `maximum` and `enum` on parsed values.
    ///
    /// Constraint literals are parsed with the field's parser; a literal that
    /// does not parse yields one field-level `type-error` and its constraint
    /// is skipped.
    pub fn check_logical(
        &self,
        resource: &str,
        field: &FieldDescriptor,
        parser: &TypeParser,
        logical: &LogicalColumn,
    ) -> Vec<Violation> {
        let constraints = &field.constraints;
        let mut violations = Vec::new();

        if constraints.is_required() {
            for (row, cell) in logical.cells().iter().enumerate() {
                let message = match cell {
                    Ok(Value::Missing) => "required value is missing".to_string(),
                    Err(failure) => format!("required value '{}' is not usable", failure.raw),
                    Ok(_) => continue,
                };
                violations.push(Violation::field(
                    resource,
                    &field.name,
                    Some(row),
                    ConstraintKind::RequiredConstraint,
                    message,
                ));
            }
        }

        let mut literal = |name: &str, value: &serde_json::Value| -> Option<Value> {
            match parser.parse_literal(value) {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    violations.push(Violation::field(
                        resource,
                        &field.name,
                        None,
                        ConstraintKind::TypeError,
                        format!("{} constraint value {} is not a valid {}", name, value, parser),
                    ));
                    None
                }
            }
        };

        let ordered = field.field_type.is_ordered();
        let minimum = constraints
            .minimum
            .as_ref()
            .filter(|_| ordered)
            .and_then(|v| literal("minimum", v));
        let maximum = constraints
            .maximum
            .as_ref()
            .filter(|_| ordered)
            .and_then(|v| literal("maximum", v));
        let allowed: Option<Vec<Value>> = constraints.allowed.as_ref().and_then(|values| {
            values
                .iter()
                .map(|v| literal("enum", v))
                .collect::<Vec<_>>()
                .into_iter()
                .collect()
        });

        let present = || {
            logical
                .cells()
                .iter()
                .enumerate()
                .filter_map(|(row, cell)| match cell {
                    Ok(value) if !value.is_missing() => Some((row, value)),
                    _ => None,
                })
        };

        if let Some(minimum) = &minimum {
            for (row, value) in present() {
                if value.compare(minimum) == Some(Ordering::Less) {
                    violations.push(Violation::field(
                        resource,
                        &field.name,
                        Some(row),
                        ConstraintKind::MinimumConstraint,
                        format!("value {} is below minimum {}", value, minimum),
                    ));
                }
            }
        }

        if let Some(maximum) = &maximum {
            for (row, value) in present() {
                if value.compare(maximum) == Some(Ordering::Greater) {
                    violations.push(Violation::field(
                        resource,
                        &field.name,
                        Some(row),
                        ConstraintKind::MaximumConstraint,
                        format!("value {} is above maximum {}", value, maximum),
                    ));
                }
            }
        }

        if let Some(allowed) = &allowed {
            for (row, value) in present() {
                if !allowed.contains(value) {
                    let listed: Vec<String> = allowed.iter().map(Value::to_string).collect();
                    violations.push(Violation::field(
                        resource,
                        &field.name,
                        Some(row),
                        ConstraintKind::EnumConstraint,
                        format!("value {} is not one of [{}]", value, listed.join(", ")),
                    ));
                }
            }
        }

        violations
    }
}
