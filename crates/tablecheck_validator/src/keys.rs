//! Row-set checks: unique keys and foreign keys.
//!
//! Tuples compare with null-aware equality: positions are compared pairwise
//! and `Missing` equals only `Missing`. Rows are grouped by hashing, so both
//! checks are linear in the number of rows.

use crate::{LogicalColumn, Value};
use std::collections::{HashMap, HashSet};
use tablecheck_core::{ConstraintKind, ForeignKey, Violation};

/// Returns the key tuple of a row, or `None` if any key cell failed to parse.
fn tuple<'a>(columns: &[&'a LogicalColumn], row: usize) -> Option<Vec<&'a Value>> {
    columns.iter().map(|c| c.value(row)).collect()
}

fn row_count(columns: &[&LogicalColumn]) -> usize {
    columns.first().map_or(0, |c| c.len())
}

/// Formats a key tuple for messages.
fn describe(values: &[&Value]) -> String {
    let parts: Vec<String> = values
        .iter()
        .map(|v| match v {
            Value::Missing => "missing".to_string(),
            Value::String(s) => format!("'{}'", s),
            other => other.to_string(),
        })
        .collect();
    match parts.as_slice() {
        [single] => single.clone(),
        _ => format!("({})", parts.join(", ")),
    }
}

/// Groups rows with equal key tuples.
///
/// Returns only groups of more than one row, ordered by their first row.
/// Rows where a key cell failed to parse are left out. Rows whose tuple is
/// entirely missing form a group of their own.
pub fn duplicate_groups(columns: &[&LogicalColumn]) -> Vec<Vec<usize>> {
    let mut positions: HashMap<Vec<&Value>, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for row in 0..row_count(columns) {
        let Some(key) = tuple(columns, row) else {
            continue;
        };
        match positions.get(&key) {
            Some(&group) => groups[group].push(row),
            None => {
                positions.insert(key, groups.len());
                groups.push(vec![row]);
            }
        }
    }

    groups.retain(|rows| rows.len() > 1);
    groups
}

/// Checks that `key` is unique over the table.
///
/// Emits one violation per group of duplicate rows, listing every row of
/// the group.
pub fn check_unique(
    resource: &str,
    key: &[String],
    kind: ConstraintKind,
    columns: &[&LogicalColumn],
) -> Vec<Violation> {
    duplicate_groups(columns)
        .into_iter()
        .map(|rows| {
            let values = tuple(columns, rows[0]).unwrap_or_default();
            let message = format!(
                "{} {} appears in {} rows",
                if key.len() == 1 { "value" } else { "key" },
                describe(&values),
                rows.len()
            );
            Violation::key(resource, key, rows, kind, message)
        })
        .collect()
}

/// The set of key tuples present in a referenced table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceKeys {
    keys: HashSet<Vec<Value>>,
}

impl ReferenceKeys {
    /// Collects the key tuples of the reference columns.
    ///
    /// Rows where a key cell failed to parse contribute nothing.
    pub fn from_columns(columns: &[&LogicalColumn]) -> Self {
        let keys = (0..row_count(columns))
            .filter_map(|row| tuple(columns, row))
            .map(|values| values.into_iter().cloned().collect())
            .collect();
        Self { keys }
    }

    /// Whether the tuple is present.
    pub fn contains(&self, tuple: &[Value]) -> bool {
        self.keys.contains(tuple)
    }

    /// Returns the number of distinct tuples.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if there are no tuples.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Checks every row's local key against the reference key set.
///
/// Rows whose local key is entirely missing are exempt. Partially missing
/// keys must match a reference tuple with the same missing positions.
pub fn check_foreign_key(
    resource: &str,
    foreign_key: &ForeignKey,
    local: &[&LogicalColumn],
    reference: &ReferenceKeys,
) -> Vec<Violation> {
    let target = foreign_key.reference_resource(resource);
    let mut violations = Vec::new();

    for row in 0..row_count(local) {
        let Some(values) = tuple(local, row) else {
            continue;
        };
        if values.iter().all(|v| v.is_missing()) {
            continue;
        }
        let owned: Vec<Value> = values.iter().map(|v| (*v).clone()).collect();
        if !reference.contains(&owned) {
            violations.push(Violation::key(
                resource,
                &foreign_key.fields,
                vec![row],
                ConstraintKind::ForeignKeyConstraint,
                format!(
                    "{} not found in {}.({})",
                    describe(&values),
                    target,
                    foreign_key.reference.fields.join(", ")
                ),
            ));
        }
    }

    violations
}
