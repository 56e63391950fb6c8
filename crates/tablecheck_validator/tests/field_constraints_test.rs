//! Field constraints across declared types.

use pretty_assertions::assert_eq;
use std::collections::HashMap;
use tablecheck_core::{
    ConstraintKind, FieldBuilder, FieldDescriptor, FieldType, TableBuilder, ValidationContext,
    ValidationReport,
};
use tablecheck_validator::{Column, Table, TypeParser, Validator, Value};

fn validate(field: FieldDescriptor, column: Column) -> ValidationReport {
    let table = TableBuilder::new("t").field(field).build();
    let source: HashMap<String, Table> =
        [("t".to_string(), Table::from_columns(vec![column]).unwrap())]
            .into_iter()
            .collect();
    Validator::new(ValidationContext::new()).validate(&[table], &source)
}

fn flagged(report: &ValidationReport) -> Vec<(ConstraintKind, Vec<usize>)> {
    report
        .violations()
        .map(|v| (v.kind, v.rows.clone()))
        .collect()
}

#[test]
fn test_pattern_and_length_ignore_declared_type() {
    let raw = ["123", "12", "1234"];
    for field_type in [FieldType::String, FieldType::Integer] {
        let field = FieldBuilder::new("code", field_type)
            .pattern(r"\d{3}")
            .min_length(3)
            .max_length(3)
            .build();
        let report = validate(field, Column::new("code", raw));
        assert_eq!(
            flagged(&report),
            vec![
                (ConstraintKind::PatternConstraint, vec![1]),
                (ConstraintKind::PatternConstraint, vec![2]),
                (ConstraintKind::MinimumLengthConstraint, vec![1]),
                (ConstraintKind::MaximumLengthConstraint, vec![2]),
            ],
            "declared type {}",
            field_type
        );
    }
}

#[test]
fn test_pattern_is_a_full_match() {
    let field = FieldBuilder::new("code", FieldType::String)
        .pattern("a|b")
        .build();
    let report = validate(field, Column::new("code", ["a", "ab", "b"]));
    assert_eq!(flagged(&report), vec![(ConstraintKind::PatternConstraint, vec![1])]);
}

#[test]
fn test_missing_primary_key_value_is_required_violation() {
    let table = TableBuilder::new("t")
        .field(FieldBuilder::new("id", FieldType::String).build())
        .primary_key(["id"])
        .build();
    let source: HashMap<String, Table> = [(
        "t".to_string(),
        Table::from_rows(
            &["id".to_string()],
            vec![vec!["a".to_string()], vec!["".to_string()]],
            &["".to_string()],
        )
        .unwrap(),
    )]
    .into_iter()
    .collect();

    let report = Validator::default().validate(&[table], &source);
    assert_eq!(flagged(&report), vec![(ConstraintKind::RequiredConstraint, vec![1])]);
}

#[test]
fn test_range_on_dates_with_custom_format() {
    let field = FieldBuilder::new("day", FieldType::Date)
        .format("%d/%m/%Y")
        .minimum("01/01/2024")
        .maximum("31/12/2024")
        .build();
    let report = validate(
        field,
        Column::new("day", ["15/06/2024", "31/12/2023", "01/01/2025", "2024-06-15"]),
    );
    assert_eq!(
        flagged(&report),
        vec![
            (ConstraintKind::TypeError, vec![3]),
            (ConstraintKind::MinimumConstraint, vec![1]),
            (ConstraintKind::MaximumConstraint, vec![2]),
        ]
    );
}

#[test]
fn test_enum_compares_parsed_values() {
    let field = FieldBuilder::new("n", FieldType::Number)
        .allowed([1.5, 2.0])
        .build();
    let report = validate(field, Column::new("n", ["1.50", "2", "3"]));
    assert_eq!(flagged(&report), vec![(ConstraintKind::EnumConstraint, vec![2])]);
}

#[test]
fn test_unparseable_values_only_fail_as_types_unless_required() {
    let field = FieldBuilder::new("n", FieldType::Integer)
        .minimum(10)
        .build();
    let report = validate(field.clone(), Column::new("n", ["x", "5", "20"]));
    assert_eq!(
        flagged(&report),
        vec![
            (ConstraintKind::TypeError, vec![0]),
            (ConstraintKind::MinimumConstraint, vec![1]),
        ]
    );

    let mut required = field;
    required.constraints.required = Some(true);
    let report = validate(required, Column::new("n", ["x", "5", "20"]));
    assert_eq!(
        flagged(&report),
        vec![
            (ConstraintKind::TypeError, vec![0]),
            (ConstraintKind::RequiredConstraint, vec![0]),
            (ConstraintKind::MinimumConstraint, vec![1]),
        ]
    );
}

#[test]
fn test_first_invalid_only() {
    let table = TableBuilder::new("t")
        .field(FieldBuilder::new("n", FieldType::Integer).build())
        .build();
    let source: HashMap<String, Table> = [(
        "t".to_string(),
        Table::from_columns(vec![Column::new("n", ["a", "b", "c"])]).unwrap(),
    )]
    .into_iter()
    .collect();

    let validator = Validator::new(ValidationContext::new().with_first_invalid_only(true));
    let report = validator.validate(&[table], &source);
    assert_eq!(flagged(&report), vec![(ConstraintKind::TypeError, vec![0])]);
}

#[test]
fn test_reparsing_a_logical_column_is_a_no_op() {
    let fields = [
        FieldBuilder::new("d", FieldType::Date).format("%d/%m/%Y").build(),
        FieldBuilder::new("n", FieldType::Number)
            .decimal_char(",")
            .group_char(".")
            .build(),
        FieldBuilder::new("b", FieldType::Boolean)
            .boolean_values(["ja"], ["nein"])
            .build(),
        FieldBuilder::new("g", FieldType::GeoPoint).build(),
    ];
    let raw = [
        Column::new("d", [Some("01/02/2024"), None, Some("bad")]),
        Column::new("n", [Some("1.234,5"), None, Some("bad")]),
        Column::new("b", [Some("ja"), None, Some("bad")]),
        Column::new("g", [Some("10.5, 20"), None, Some("bad")]),
    ];

    for (field, raw) in fields.iter().zip(raw) {
        let parser = TypeParser::for_field("t", field).unwrap();
        let once = parser.parse_column(&raw);
        let twice = parser.parse_column(&once.to_column());
        assert_eq!(once, twice, "field {}", field.name);
        assert_eq!(once.value(1), Some(&Value::Missing));
        assert!(once.value(2).is_none());
    }
}
