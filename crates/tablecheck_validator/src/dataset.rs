//! Column-oriented table representation for validation.
//!
//! A `Table` is a set of equally long named columns. Cells hold a `Value`,
//! which is either the `Missing` marker, a raw string as read from a file, or
//! an already typed value.

use crate::ValidationError;
use chrono::{NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A longitude/latitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    /// Longitude, -180..=180
    pub lon: f64,
    /// Latitude, -90..=90
    pub lat: f64,
}

/// A cell value.
///
/// Equality is null-aware: `Missing` equals `Missing` and nothing else.
/// Numbers compare by value (an integral `Number` equals the same
/// `Integer`, `-0.0` equals `0.0`, and `NaN` equals `NaN`) so that values
/// can be grouped by hashing.
#[derive(Debug, Clone)]
pub enum Value {
    /// Missing value marker
    Missing,
    /// Text value (also the physical form of values read from files)
    String(String),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Number(f64),
    /// Boolean value
    Boolean(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Date and time
    DateTime(NaiveDateTime),
    /// Calendar year
    Year(i32),
    /// Geographic point
    GeoPoint(GeoPoint),
    /// List value
    List(Vec<Value>),
}

impl Value {
    /// Returns true if this value is the missing marker.
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Missing => "missing",
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Year(_) => "year",
            Value::GeoPoint(_) => "geopoint",
            Value::List(_) => "list",
        }
    }

    /// Attempts to get this value as a string.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to get this value as a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Number(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the textual (physical) form of the value.
    pub fn text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Orders two values of compatible types.
    ///
    /// Returns `None` for missing values, unordered types (booleans,
    /// geopoints, lists) and mismatched types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(_) | Value::Number(_), Value::Integer(_) | Value::Number(_)) => {
                self.as_float()?.partial_cmp(&other.as_float()?)
            }
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Year(a), Value::Year(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Bit pattern used to compare and hash floats.
fn float_key(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    }
}

/// Integer equal to `f`, when `f` is integral and in range.
pub(crate) fn exact_integer(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Missing, Value::Missing) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => float_key(*a) == float_key(*b),
            (Value::Integer(a), Value::Number(b)) | (Value::Number(b), Value::Integer(a)) => {
                exact_integer(*b) == Some(*a)
            }
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Year(a), Value::Year(b)) => a == b,
            (Value::GeoPoint(a), Value::GeoPoint(b)) => {
                float_key(a.lon) == float_key(b.lon) && float_key(a.lat) == float_key(b.lat)
            }
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Missing => 0u8.hash(state),
            Value::String(s) => {
                1u8.hash(state);
                s.hash(state);
            }
            Value::Integer(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Value::Number(f) => match exact_integer(*f) {
                Some(i) => {
                    2u8.hash(state);
                    i.hash(state);
                }
                None => {
                    3u8.hash(state);
                    float_key(*f).hash(state);
                }
            },
            Value::Boolean(b) => {
                4u8.hash(state);
                b.hash(state);
            }
            Value::Date(d) => {
                5u8.hash(state);
                d.hash(state);
            }
            Value::DateTime(dt) => {
                6u8.hash(state);
                dt.hash(state);
            }
            Value::Year(y) => {
                7u8.hash(state);
                y.hash(state);
            }
            Value::GeoPoint(p) => {
                8u8.hash(state);
                float_key(p.lon).hash(state);
                float_key(p.lat).hash(state);
            }
            Value::List(items) => {
                9u8.hash(state);
                items.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Value::Year(y) => write!(f, "{}", y),
            Value::GeoPoint(p) => write!(f, "{}, {}", p.lon, p.lat),
            Value::List(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Number(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Missing, Into::into)
    }
}

/// A named column of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<Value>,
}

impl Column {
    /// Creates a column from values.
    pub fn new<I, V>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the values.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the column has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A table of equally long named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Creates a new empty table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a table from columns of equal length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, ValidationError> {
        let row_count = columns.first().map_or(0, Column::len);
        if let Some(column) = columns.iter().find(|c| c.len() != row_count) {
            return Err(ValidationError::ragged(column.name(), column.len(), row_count));
        }
        Ok(Self { columns, row_count })
    }

    /// Creates a table from a header and rows of raw strings.
    ///
    /// Strings listed in `missing_values` become `Value::Missing`.
    pub fn from_rows(
        header: &[String],
        rows: Vec<Vec<String>>,
        missing_values: &[String],
    ) -> Result<Self, ValidationError> {
        let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); header.len()];
        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != header.len() {
                return Err(ValidationError::RowWidth {
                    row: row_idx,
                    expected: header.len(),
                    actual: row.len(),
                });
            }
            for (column, raw) in columns.iter_mut().zip(row) {
                if missing_values.contains(&raw) {
                    column.push(Value::Missing);
                } else {
                    column.push(Value::String(raw));
                }
            }
        }
        Self::from_columns(
            header
                .iter()
                .zip(columns)
                .map(|(name, values)| Column::new(name.clone(), values))
                .collect(),
        )
    }

    /// Returns the number of rows in the table.
    pub fn len(&self) -> usize {
        self.row_count
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the columns.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Takes the first `size` rows of the table.
    ///
    /// If `size` is greater than the number of rows, returns all rows.
    pub fn sample(&self, size: usize) -> Table {
        let sample_size = size.min(self.row_count);
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values[..sample_size].to_vec(),
                })
                .collect(),
            row_count: sample_size,
        }
    }
}

/// Resolves resource names to tables.
pub trait TableSource: Sync {
    /// Returns the table of a resource, if its data is available.
    fn table(&self, resource: &str) -> Option<&Table>;

    /// Returns why the data of a resource is unavailable, if known.
    fn unavailable_reason(&self, resource: &str) -> Option<&str> {
        let _ = resource;
        None
    }
}

impl TableSource for HashMap<String, Table> {
    fn table(&self, resource: &str) -> Option<&Table> {
        self.get(resource)
    }
}
