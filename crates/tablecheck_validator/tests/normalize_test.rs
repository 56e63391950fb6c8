//! Key normalization properties.
//!
//! The reduced check set must flag exactly what the naive expansion of every
//! declared key flags, and normalizing twice must change nothing.

use pretty_assertions::assert_eq;
use std::collections::{BTreeSet, HashMap};
use tablecheck_core::{
    ConstraintKind, FieldBuilder, FieldType, TableBuilder, TableDescriptor, ValidationContext,
};
use tablecheck_validator::keys::duplicate_groups;
use tablecheck_validator::{normalize, Column, LogicalColumn, Table, TypeParser, Validator};

type Flagged = BTreeSet<(String, BTreeSet<String>, Vec<usize>)>;

fn package() -> Vec<TableDescriptor> {
    let teams = TableBuilder::new("teams")
        .field(FieldBuilder::new("code", FieldType::String).build())
        .field(FieldBuilder::new("league", FieldType::String).build())
        .field(FieldBuilder::new("rank", FieldType::Integer).unique(true).build())
        .primary_key(["code"])
        .unique_key(["code"])
        .unique_key(["league", "rank"])
        .unique_key(["rank", "league"])
        .unique_key(["rank"])
        .build();
    let people = TableBuilder::new("people")
        .field(FieldBuilder::new("id", FieldType::Integer).build())
        .field(FieldBuilder::new("team", FieldType::String).build())
        .field(FieldBuilder::new("league", FieldType::String).build())
        .primary_key(["id"])
        .foreign_key(["team"], "teams", ["code"])
        .foreign_key(["league", "id"], "teams", ["league", "rank"])
        .build();
    vec![teams, people]
}

fn data() -> HashMap<String, Table> {
    let teams = Table::from_columns(vec![
        Column::new("code", [Some("red"), Some("blue"), Some("red"), None, None]),
        Column::new("league", [Some("a"), Some("a"), Some("b"), Some("b"), None]),
        Column::new("rank", [Some("1"), Some("1"), Some("2"), Some("2"), None]),
    ])
    .unwrap();
    let people = Table::from_columns(vec![
        Column::new("id", [Some("1"), Some("2"), Some("2"), None]),
        Column::new("team", [Some("red"), Some("green"), None, None]),
        Column::new("league", [Some("a"), Some("a"), Some("b"), None]),
    ])
    .unwrap();
    [("teams".to_string(), teams), ("people".to_string(), people)]
        .into_iter()
        .collect()
}

fn parse(table: &TableDescriptor, data: &Table, name: &str) -> LogicalColumn {
    let field = table.field(name).unwrap();
    TypeParser::for_field(&table.name, field)
        .unwrap()
        .parse_column(data.column(name).unwrap())
}

/// Every uniqueness predicate the raw descriptors imply, checked one by one.
fn naive_key_groups(descriptors: &[TableDescriptor], data: &HashMap<String, Table>) -> Flagged {
    let mut keys: Vec<(&TableDescriptor, Vec<String>)> = Vec::new();
    for table in descriptors {
        keys.push((table, table.schema.primary_key.clone()));
        for key in &table.schema.unique_keys {
            keys.push((table, key.clone()));
        }
        for field in table.schema.fields.iter().filter(|f| f.constraints.is_unique()) {
            keys.push((table, vec![field.name.clone()]));
        }
        for fk in &table.schema.foreign_keys {
            let target = descriptors
                .iter()
                .find(|t| t.name == fk.reference_resource(&table.name))
                .unwrap();
            keys.push((target, fk.reference.fields.clone()));
        }
    }

    let mut flagged = Flagged::new();
    for (table, key) in keys.into_iter().filter(|(_, k)| !k.is_empty()) {
        let columns: Vec<LogicalColumn> = key
            .iter()
            .map(|name| parse(table, &data[&table.name], name))
            .collect();
        let refs: Vec<&LogicalColumn> = columns.iter().collect();
        for rows in duplicate_groups(&refs) {
            flagged.insert((table.name.clone(), key.iter().cloned().collect(), rows));
        }
    }
    flagged
}

fn naive_required(descriptors: &[TableDescriptor], data: &HashMap<String, Table>) -> Flagged {
    let mut flagged = Flagged::new();
    for table in descriptors {
        for field in &table.schema.fields {
            let required = field.constraints.is_required()
                || table.schema.primary_key.contains(&field.name);
            if !required {
                continue;
            }
            let column = parse(table, &data[&table.name], &field.name);
            for row in 0..column.len() {
                if column.value(row).is_some_and(|v| v.is_missing()) {
                    flagged.insert((
                        table.name.clone(),
                        BTreeSet::from([field.name.clone()]),
                        vec![row],
                    ));
                }
            }
        }
    }
    flagged
}

#[test]
fn test_normalize_is_idempotent() {
    let once = normalize(&package()).descriptors();
    let twice = normalize(&once).descriptors();
    assert_eq!(once, twice);
}

#[test]
fn test_normalized_keys_are_minimal() {
    let schema = normalize(&package());
    let teams = schema.table("teams").unwrap();

    assert_eq!(teams.unique_keys(), &[vec!["league".to_string(), "rank".to_string()]]);
    assert_eq!(teams.primary_key(), &["code".to_string()]);
    let code = teams.schema().field("code").unwrap();
    assert!(code.constraints.is_required());
    assert!(code.constraints.is_unique());

    let people = schema.table("people").unwrap();
    assert_eq!(people.foreign_keys().len(), 2);
    assert!(people.unique_keys().is_empty());
}

#[test]
fn test_reduced_checks_match_naive_expansion() {
    let descriptors = package();
    let data = data();

    let report = Validator::new(ValidationContext::new()).validate(&descriptors, &data);
    assert!(report.tables.iter().all(|t| t.errors.is_empty()));

    let reported_keys: Flagged = report
        .violations()
        .filter(|v| v.kind.is_key_constraint() && v.kind != ConstraintKind::ForeignKeyConstraint)
        .map(|v| {
            (
                v.resource.clone(),
                v.fields.iter().cloned().collect(),
                v.rows.clone(),
            )
        })
        .collect();
    assert_eq!(reported_keys, naive_key_groups(&descriptors, &data));

    let reported_required: Flagged = report
        .violations_of(ConstraintKind::RequiredConstraint)
        .map(|v| {
            (
                v.resource.clone(),
                v.fields.iter().cloned().collect(),
                v.rows.clone(),
            )
        })
        .collect();
    assert_eq!(reported_required, naive_required(&descriptors, &data));
}

#[test]
fn test_reduced_checks_emit_each_group_once() {
    let report = Validator::default().validate(&package(), &data());
    let teams = report.table("teams").unwrap();
    let count = |fields: &[&str]| {
        let fields: BTreeSet<String> = fields.iter().map(|f| f.to_string()).collect();
        teams
            .violations
            .iter()
            .filter(|v| v.fields.iter().cloned().collect::<BTreeSet<_>>() == fields)
            .count()
    };

    // Two duplicate groups each, although the keys are declared several times.
    assert_eq!(count(&["rank"]), 2);
    assert_eq!(count(&["league", "rank"]), 2);
}
