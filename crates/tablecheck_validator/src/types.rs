//! Type parsing: physical (raw) values to logical (typed) values.
//!
//! Each declared field type has one arm of `TypeParser`. Parsing a column
//! never fails as a whole: every cell is either a parsed value or a
//! `ParseFailure` carrying the raw text. Missing values bypass parsing.

use crate::dataset::exact_integer;
use crate::{Column, GeoPoint, Value};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tablecheck_core::{FieldDescriptor, FieldType, SchemaError};

static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[+-]?(?:nan|inf(?:inity)?|(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:e[+-]?[0-9]+)?)")
        .expect("static regex")
});

static INTEGER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[+-]?[0-9]+").expect("static regex"));

static GEOPOINT_DEFAULT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^, ]+), ?([^ ]+)$").expect("static regex"));

static GEOPOINT_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[\s*(.+),\s*(.+)\s*\]\s*$").expect("static regex"));

static GEOPOINT_LONLAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*\{\s*"lon":\s*(.+),\s*"lat":\s*(.+)\s*\}\s*$"#).expect("static regex")
});

static GEOPOINT_LATLON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*\{\s*"lat":\s*(.+),\s*"lon":\s*(.+)\s*\}\s*$"#).expect("static regex")
});

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[a-z0-9]+(?:-[a-z0-9]+)*(?:\.[a-z0-9]+(?:-[a-z0-9]+)*)+$",
    )
    .expect("static regex")
});

static URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z][a-z0-9+.-]*:(?://\S+|[^\s/]\S*)$").expect("static regex")
});

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-f0-9]{8}-?[a-f0-9]{4}-?[a-f0-9]{4}-?[a-f0-9]{4}-?[a-f0-9]{12}$")
        .expect("static regex")
});

static BASE64: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/]*={0,2}$").expect("static regex"));

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Layouts tried, in order, for the `any` date format.
const ANY_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%d-%m-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Layouts tried, in order, for the `any` datetime format.
const ANY_DATETIME_FORMATS: &[&str] = &[
    "%+",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d",
];

/// A cell of a logical column.
pub type Cell = Result<Value, ParseFailure>;

/// A value that could not be parsed as the declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Raw text of the value
    pub raw: String,
}

impl ParseFailure {
    fn of(value: &Value) -> Self {
        Self { raw: value.text() }
    }
}

/// A parsed column: one cell per row of the physical column.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalColumn {
    name: String,
    field_type: FieldType,
    cells: Vec<Cell>,
}

impl LogicalColumn {
    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type the column was parsed with.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Returns the cells.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Returns the number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the parsed value at `row`, or `None` for a parse failure.
    pub fn value(&self, row: usize) -> Option<&Value> {
        self.cells.get(row)?.as_ref().ok()
    }

    /// Iterates over the rows that failed to parse.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &ParseFailure)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(row, cell)| cell.as_ref().err().map(|f| (row, f)))
    }

    /// Converts back to a column, keeping failed cells as their raw text.
    pub fn to_column(&self) -> Column {
        Column::new(
            self.name.clone(),
            self.cells.iter().map(|cell| match cell {
                Ok(value) => value.clone(),
                Err(failure) => Value::String(failure.raw.clone()),
            }),
        )
    }
}

/// `string` field formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Default,
    Email,
    Uri,
    Uuid,
    Binary,
}

impl StringFormat {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(StringFormat::Default),
            "email" => Some(StringFormat::Email),
            "uri" => Some(StringFormat::Uri),
            "uuid" => Some(StringFormat::Uuid),
            "binary" => Some(StringFormat::Binary),
            _ => None,
        }
    }

    fn matches(&self, text: &str) -> bool {
        match self {
            StringFormat::Default => true,
            StringFormat::Email => is_email(text),
            StringFormat::Uri => URI.is_match(text),
            StringFormat::Uuid => UUID.is_match(text),
            StringFormat::Binary => is_base64(text),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            StringFormat::Default => "default",
            StringFormat::Email => "email",
            StringFormat::Uri => "uri",
            StringFormat::Uuid => "uuid",
            StringFormat::Binary => "binary",
        }
    }
}

/// `geopoint` field formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoPointFormat {
    /// `"lon, lat"`
    Default,
    /// `"[lon, lat]"`
    Array,
    /// `{"lon": x, "lat": y}` in either key order
    Object,
}

impl GeoPointFormat {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(GeoPointFormat::Default),
            "array" => Some(GeoPointFormat::Array),
            "object" => Some(GeoPointFormat::Object),
            _ => None,
        }
    }

    fn parse(&self, text: &str) -> Option<(f64, f64)> {
        match self {
            GeoPointFormat::Default => coordinates(&GEOPOINT_DEFAULT, text),
            GeoPointFormat::Array => coordinates(&GEOPOINT_ARRAY, text),
            GeoPointFormat::Object => coordinates(&GEOPOINT_LONLAT, text)
                .or_else(|| coordinates(&GEOPOINT_LATLON, text).map(|(lat, lon)| (lon, lat))),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            GeoPointFormat::Default => "default",
            GeoPointFormat::Array => "array",
            GeoPointFormat::Object => "object",
        }
    }
}

/// Lexical options of `number` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberLexicon {
    pub decimal_char: String,
    pub group_char: Option<String>,
    pub bare_number: bool,
}

impl Default for NumberLexicon {
    fn default() -> Self {
        Self {
            decimal_char: ".".to_string(),
            group_char: None,
            bare_number: true,
        }
    }
}

impl NumberLexicon {
    fn parse(&self, text: &str) -> Option<f64> {
        let mut text = text.to_string();
        if let Some(group) = self.group_char.as_deref().filter(|g| !g.is_empty()) {
            text = text.replace(group, "");
        }
        if !self.decimal_char.is_empty() && self.decimal_char != "." {
            text = text.replace(&self.decimal_char, ".");
        }
        if self.bare_number {
            parse_float(&text)
        } else {
            single_token(&NUMBER_TOKEN, &text).and_then(parse_float)
        }
    }
}

/// Parser for one declared field type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeParser {
    String {
        formats: Vec<StringFormat>,
    },
    Number(NumberLexicon),
    Integer {
        bare_number: bool,
    },
    Boolean {
        true_values: Vec<String>,
        false_values: Vec<String>,
    },
    Date {
        formats: Vec<String>,
    },
    DateTime {
        formats: Vec<String>,
    },
    Year,
    GeoPoint {
        formats: Vec<GeoPointFormat>,
    },
}

impl TypeParser {
    /// Builds the parser of a field from its type and type options.
    ///
    /// Fails when a `format` is not understood for the field's type.
    pub fn for_field(resource: &str, field: &FieldDescriptor) -> Result<Self, SchemaError> {
        let names: Vec<&str> = if field.format.is_empty() {
            vec!["default"]
        } else {
            field.format.iter().map(String::as_str).collect()
        };
        let unsupported = |format: &str| SchemaError::UnsupportedFormat {
            resource: resource.to_string(),
            field: field.name.clone(),
            field_type: field.field_type.to_string(),
            format: format.to_string(),
        };

        let parser = match field.field_type {
            FieldType::String => TypeParser::String {
                formats: names
                    .iter()
                    .map(|&n| StringFormat::from_name(n).ok_or_else(|| unsupported(n)))
                    .collect::<Result<_, _>>()?,
            },
            FieldType::GeoPoint => TypeParser::GeoPoint {
                formats: names
                    .iter()
                    .map(|&n| GeoPointFormat::from_name(n).ok_or_else(|| unsupported(n)))
                    .collect::<Result<_, _>>()?,
            },
            FieldType::Date => TypeParser::Date {
                formats: time_formats(&names, DEFAULT_DATE_FORMAT, ANY_DATE_FORMATS)
                    .map_err(|n| unsupported(&n))?,
            },
            FieldType::DateTime => TypeParser::DateTime {
                formats: time_formats(&names, DEFAULT_DATETIME_FORMAT, ANY_DATETIME_FORMATS)
                    .map_err(|n| unsupported(&n))?,
            },
            other => {
                if let Some(&name) = names.iter().find(|n| **n != "default") {
                    return Err(unsupported(name));
                }
                match other {
                    FieldType::Number => TypeParser::Number(NumberLexicon {
                        decimal_char: field.decimal_char.clone().unwrap_or_else(|| ".".into()),
                        group_char: field.group_char.clone(),
                        bare_number: field.bare_number.unwrap_or(true),
                    }),
                    FieldType::Integer => TypeParser::Integer {
                        bare_number: field.bare_number.unwrap_or(true),
                    },
                    FieldType::Boolean => TypeParser::Boolean {
                        true_values: field.true_values.clone().unwrap_or_else(|| {
                            ["true", "True", "TRUE", "1"].map(String::from).to_vec()
                        }),
                        false_values: field.false_values.clone().unwrap_or_else(|| {
                            ["false", "False", "FALSE", "0"].map(String::from).to_vec()
                        }),
                    },
                    _ => TypeParser::Year,
                }
            }
        };
        Ok(parser)
    }

    /// Returns the declared type this parser handles.
    pub fn field_type(&self) -> FieldType {
        match self {
            TypeParser::String { .. } => FieldType::String,
            TypeParser::Number(_) => FieldType::Number,
            TypeParser::Integer { .. } => FieldType::Integer,
            TypeParser::Boolean { .. } => FieldType::Boolean,
            TypeParser::Date { .. } => FieldType::Date,
            TypeParser::DateTime { .. } => FieldType::DateTime,
            TypeParser::Year => FieldType::Year,
            TypeParser::GeoPoint { .. } => FieldType::GeoPoint,
        }
    }

    /// Parses one value.
    ///
    /// Values already of the logical type parse to themselves.
    pub fn parse(&self, value: &Value) -> Cell {
        if value.is_missing() {
            return Ok(Value::Missing);
        }
        self.parse_present(value)
            .ok_or_else(|| ParseFailure::of(value))
    }

    /// Parses every value of a column.
    pub fn parse_column(&self, column: &Column) -> LogicalColumn {
        LogicalColumn {
            name: column.name().to_string(),
            field_type: self.field_type(),
            cells: column.values().iter().map(|v| self.parse(v)).collect(),
        }
    }

    /// Parses a constraint literal (`minimum`, `maximum` or an `enum` entry).
    ///
    /// Textual literals are parsed; typed literals are converted. A `null`
    /// literal is a failure.
    pub fn parse_literal(&self, literal: &serde_json::Value) -> Cell {
        match self.parse(&json_to_value(literal)) {
            Ok(Value::Missing) => Err(ParseFailure {
                raw: literal.to_string(),
            }),
            cell => cell,
        }
    }

    fn parse_present(&self, value: &Value) -> Option<Value> {
        match self {
            TypeParser::String { formats } => {
                let text = value.text();
                formats
                    .iter()
                    .any(|f| f.matches(&text))
                    .then_some(Value::String(text))
            }
            TypeParser::Number(lexicon) => match value {
                Value::Number(f) => Some(Value::Number(*f)),
                Value::Integer(i) => Some(Value::Number(*i as f64)),
                Value::String(s) => lexicon.parse(s).map(Value::Number),
                _ => None,
            },
            TypeParser::Integer { bare_number } => match value {
                Value::Integer(i) => Some(Value::Integer(*i)),
                Value::Number(f) => exact_integer(*f).map(Value::Integer),
                Value::String(s) => parse_integer(s, *bare_number).map(Value::Integer),
                _ => None,
            },
            TypeParser::Boolean {
                true_values,
                false_values,
            } => {
                if let Value::Boolean(b) = value {
                    return Some(Value::Boolean(*b));
                }
                let text = value.text();
                if true_values.contains(&text) {
                    Some(Value::Boolean(true))
                } else if false_values.contains(&text) {
                    Some(Value::Boolean(false))
                } else {
                    None
                }
            }
            TypeParser::Date { formats } => match value {
                Value::Date(d) => Some(Value::Date(*d)),
                Value::String(s) => formats
                    .iter()
                    .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                    .map(Value::Date),
                _ => None,
            },
            TypeParser::DateTime { formats } => match value {
                Value::DateTime(dt) => Some(Value::DateTime(*dt)),
                Value::Date(d) => d.and_hms_opt(0, 0, 0).map(Value::DateTime),
                Value::String(s) => formats
                    .iter()
                    .find_map(|f| parse_datetime(s, f))
                    .map(Value::DateTime),
                _ => None,
            },
            TypeParser::Year => match value {
                Value::Year(y) => Some(Value::Year(*y)),
                Value::Integer(i) => i32::try_from(*i).ok().map(Value::Year),
                Value::String(s) => s.trim().parse::<i32>().ok().map(Value::Year),
                _ => None,
            },
            TypeParser::GeoPoint { formats } => match value {
                Value::GeoPoint(p) => geopoint(p.lon, p.lat),
                Value::List(items) => match items.as_slice() {
                    [lon, lat] => geopoint(lon.as_float()?, lat.as_float()?),
                    _ => None,
                },
                Value::String(s) => formats
                    .iter()
                    .find_map(|f| f.parse(s))
                    .and_then(|(lon, lat)| geopoint(lon, lat)),
                _ => None,
            },
        }
    }
}

impl fmt::Display for TypeParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formats: Vec<&str> = match self {
            TypeParser::String { formats } => formats.iter().map(StringFormat::as_str).collect(),
            TypeParser::GeoPoint { formats } => {
                formats.iter().map(GeoPointFormat::as_str).collect()
            }
            TypeParser::Date { formats } | TypeParser::DateTime { formats } => {
                formats.iter().map(String::as_str).collect()
            }
            _ => Vec::new(),
        };
        match formats.as_slice() {
            [] | ["default"] => write!(f, "{}", self.field_type()),
            _ => write!(f, "{} ({})", self.field_type(), formats.join(" | ")),
        }
    }
}

/// Expands date/datetime format names into strftime patterns.
///
/// Returns the first name that is not a valid pattern as the error.
fn time_formats(
    names: &[&str],
    default: &str,
    any: &[&str],
) -> Result<Vec<String>, String> {
    let mut formats = Vec::new();
    for name in names {
        match *name {
            "default" => formats.push(default.to_string()),
            "any" => formats.extend(any.iter().map(|f| f.to_string())),
            pattern => {
                let valid = pattern.contains('%')
                    && !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error));
                if !valid {
                    return Err(pattern.to_string());
                }
                formats.push(pattern.to_string());
            }
        }
    }
    Ok(formats)
}

fn parse_datetime(text: &str, format: &str) -> Option<NaiveDateTime> {
    if format.contains("%z") || format.contains("%:z") || format.contains("%+") {
        return DateTime::parse_from_str(text, format)
            .ok()
            .map(|dt| dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(text, format).ok().or_else(|| {
        NaiveDate::parse_from_str(text, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

fn parse_integer(text: &str, bare_number: bool) -> Option<i64> {
    if bare_number {
        text.trim().parse::<i64>().ok()
    } else {
        single_token(&INTEGER_TOKEN, text).and_then(|t| t.parse::<i64>().ok())
    }
}

/// Returns the only match of `re` in `text`.
fn single_token<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    let mut matches = re.find_iter(text);
    let first = matches.next()?;
    matches.next().is_none().then_some(first.as_str())
}

fn coordinates(re: &Regex, text: &str) -> Option<(f64, f64)> {
    let captures = re.captures(text)?;
    Some((
        parse_float(captures.get(1)?.as_str())?,
        parse_float(captures.get(2)?.as_str())?,
    ))
}

fn geopoint(lon: f64, lat: f64) -> Option<Value> {
    ((-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat))
        .then_some(Value::GeoPoint(GeoPoint { lon, lat }))
}

fn is_email(text: &str) -> bool {
    let Some((local, domain)) = text.rsplit_once('@') else {
        return false;
    };
    local.len() <= 64 && domain.split('.').all(|label| label.len() <= 63) && EMAIL.is_match(text)
}

fn is_base64(text: &str) -> bool {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() % 4 == 0 && BASE64.is_match(&compact)
}

fn json_to_value(literal: &serde_json::Value) -> Value {
    match literal {
        serde_json::Value::Null => Value::Missing,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map_or(Value::Missing, Value::Number),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => {
            match (
                map.get("lon").and_then(|v| v.as_f64()),
                map.get("lat").and_then(|v| v.as_f64()),
            ) {
                (Some(lon), Some(lat)) => Value::GeoPoint(GeoPoint { lon, lat }),
                _ => Value::String(literal.to_string()),
            }
        }
    }
}
