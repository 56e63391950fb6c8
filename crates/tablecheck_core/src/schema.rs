//! Package, resource and table schema descriptors.
//!
//! These types mirror the shape of a tabular data package descriptor: a
//! package lists resources, each resource points at its data and carries a
//! table schema made of field descriptors and key declarations.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A tabular data package: an ordered list of table resources.
///
/// # Example
///
/// ```rust
/// use tablecheck_core::{Package, FieldType, TableBuilder, FieldBuilder};
///
/// let package = Package {
///     name: Some("registry".to_string()),
///     resources: vec![
///         TableBuilder::new("people")
///             .field(FieldBuilder::new("id", FieldType::Integer).build())
///             .primary_key(["id"])
///             .build(),
///     ],
/// };
/// assert!(package.resource("people").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Optional package name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Table resources, in declaration order
    #[serde(default)]
    pub resources: Vec<TableDescriptor>,
}

impl Package {
    /// Looks up a resource by name.
    pub fn resource(&self, name: &str) -> Option<&TableDescriptor> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Returns the resource names in declaration order.
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.name.as_str()).collect()
    }
}

/// A single table resource of a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Resource identifier, unique within the package
    pub name: String,

    /// Data file path(s), relative to the descriptor
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub path: Vec<String>,

    /// CSV dialect used to read the data
    #[serde(default)]
    pub dialect: Dialect,

    /// Table schema
    pub schema: TableSchema,
}

impl TableDescriptor {
    /// Looks up a field descriptor by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.schema.field(name)
    }
}

/// Field list and key declarations of a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Field descriptors, in column order
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,

    /// Primary key field names (may be empty)
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub primary_key: Vec<String>,

    /// Unique key groups
    #[serde(
        default,
        deserialize_with = "key_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub unique_keys: Vec<Vec<String>>,

    /// Foreign key declarations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,

    /// Raw strings read as missing values
    #[serde(default = "default_missing_values")]
    pub missing_values: Vec<String>,
}

impl TableSchema {
    /// Looks up a field descriptor by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Looks up a field descriptor by name for modification.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldDescriptor> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Returns the field names in column order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

fn default_missing_values() -> Vec<String> {
    vec![String::new()]
}

/// Declared logical type of a field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Text, kept as-is
    #[default]
    String,
    /// Floating point number
    Number,
    /// Signed 64-bit integer
    Integer,
    /// Boolean from a configurable lexicon
    Boolean,
    /// Calendar date
    Date,
    /// Date and time without offset
    #[serde(rename = "datetime")]
    DateTime,
    /// Calendar year
    Year,
    /// Longitude/latitude pair
    #[serde(rename = "geopoint")]
    GeoPoint,
}

impl FieldType {
    /// Returns the descriptor name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Year => "year",
            FieldType::GeoPoint => "geopoint",
        }
    }

    /// Whether `minimum`/`maximum` are meaningful for this type.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, FieldType::Boolean | FieldType::GeoPoint)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field (column) definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Field name, unique within the table
    pub name: String,

    /// Declared type
    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    /// Format string(s); meaning depends on the type
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub format: Vec<String>,

    /// Optional human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Field constraints
    #[serde(default)]
    pub constraints: Constraints,

    /// Strings read as `true` (boolean fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_values: Option<Vec<String>>,

    /// Strings read as `false` (boolean fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub false_values: Option<Vec<String>>,

    /// Decimal separator (number fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_char: Option<String>,

    /// Digit group separator (number fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_char: Option<String>,

    /// Whether numbers appear without surrounding text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bare_number: Option<bool>,
}

impl FieldDescriptor {
    /// Creates a field with no constraints or type options.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            format: Vec::new(),
            description: None,
            constraints: Constraints::default(),
            true_values: None,
            false_values: None,
            decimal_char: None,
            group_char: None,
            bare_number: None,
        }
    }
}

/// Per-field constraints.
///
/// Literal-valued constraints (`minimum`, `maximum`, `enum`) are kept as raw
/// JSON values and parsed with the field's type at check time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    /// Value must not be missing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    /// Values must be unique within the column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,

    /// Inclusive lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<serde_json::Value>,

    /// Inclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<serde_json::Value>,

    /// Regular expression the raw text must fully match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Minimum length of the raw text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Maximum length of the raw text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Allowed values
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<serde_json::Value>>,
}

impl Constraints {
    /// Whether the field is required.
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    /// Whether the field is unique.
    pub fn is_unique(&self) -> bool {
        self.unique.unwrap_or(false)
    }
}

/// A foreign key declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Local field names
    #[serde(deserialize_with = "one_or_many")]
    pub fields: Vec<String>,

    /// Referenced resource and fields
    pub reference: ForeignKeyReference,
}

impl ForeignKey {
    /// Resolves the referenced resource name, where an empty name means
    /// the declaring resource itself.
    pub fn reference_resource<'a>(&'a self, local: &'a str) -> &'a str {
        if self.reference.resource.is_empty() {
            local
        } else {
            &self.reference.resource
        }
    }
}

/// Target of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyReference {
    /// Referenced resource name; empty for a self-reference
    #[serde(default)]
    pub resource: String,

    /// Referenced field names
    #[serde(deserialize_with = "one_or_many")]
    pub fields: Vec<String>,
}

/// CSV dialect of a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dialect {
    /// Field delimiter
    pub delimiter: char,

    /// Quote character
    pub quote_char: char,

    /// Whether a doubled quote escapes a quote
    pub double_quote: bool,

    /// Whether the first row is a header
    pub header: bool,

    /// Whether whitespace after a delimiter is ignored
    pub skip_initial_space: bool,

    /// Lines starting with this character are skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_char: Option<char>,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote_char: '"',
            double_quote: true,
            header: true,
            skip_initial_space: true,
            comment_char: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Accepts either a single string or a list of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(OneOrMany::deserialize(deserializer)?.into())
}

/// Accepts a list whose entries are each a string or a list of strings.
fn key_list<'de, D>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let keys = Vec::<OneOrMany>::deserialize(deserializer)?;
    Ok(keys.into_iter().map(Vec::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keys_accept_string_or_list() {
        let schema: TableSchema = serde_json::from_str(
            r#"{
                "fields": [{"name": "a"}, {"name": "b"}],
                "primaryKey": "a",
                "uniqueKeys": ["b", ["a", "b"]],
                "foreignKeys": [
                    {"fields": "b", "reference": {"resource": "", "fields": "a"}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(schema.primary_key, vec!["a"]);
        assert_eq!(
            schema.unique_keys,
            vec![vec!["b".to_string()], vec!["a".to_string(), "b".to_string()]]
        );
        assert_eq!(schema.foreign_keys[0].fields, vec!["b"]);
        assert_eq!(schema.foreign_keys[0].reference.fields, vec!["a"]);
        assert_eq!(schema.missing_values, vec![""]);
    }

    #[test]
    fn test_field_defaults() {
        let field: FieldDescriptor = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(field.field_type, FieldType::String);
        assert!(field.format.is_empty());
        assert!(!field.constraints.is_required());
        assert!(!field.constraints.is_unique());
    }

    #[test]
    fn test_field_type_names() {
        let field: FieldDescriptor =
            serde_json::from_str(r#"{"name": "t", "type": "datetime", "format": "%d/%m/%Y %H:%M"}"#)
                .unwrap();
        assert_eq!(field.field_type, FieldType::DateTime);
        assert_eq!(field.format, vec!["%d/%m/%Y %H:%M"]);

        let field: FieldDescriptor =
            serde_json::from_str(r#"{"name": "p", "type": "geopoint"}"#).unwrap();
        assert_eq!(field.field_type.to_string(), "geopoint");
    }

    #[test]
    fn test_enum_constraint_rename() {
        let constraints: Constraints =
            serde_json::from_str(r#"{"enum": ["a", "b"], "minLength": 1, "required": true}"#)
                .unwrap();
        assert_eq!(constraints.allowed.as_ref().map(Vec::len), Some(2));
        assert_eq!(constraints.min_length, Some(1));
        assert!(constraints.is_required());
    }

    #[test]
    fn test_self_reference_resolution() {
        let fk = ForeignKey {
            fields: vec!["parent".into()],
            reference: ForeignKeyReference {
                resource: String::new(),
                fields: vec!["id".into()],
            },
        };
        assert_eq!(fk.reference_resource("nodes"), "nodes");
    }

    #[test]
    fn test_dialect_defaults() {
        let dialect: Dialect = serde_json::from_str(r#"{"delimiter": ";"}"#).unwrap();
        assert_eq!(dialect.delimiter, ';');
        assert_eq!(dialect.quote_char, '"');
        assert!(dialect.header);
    }
}
