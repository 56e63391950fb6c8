//! Violation records and the constraint kind vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed vocabulary of violation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintKind {
    /// Value could not be parsed as the declared type
    TypeError,
    /// Raw text does not match `pattern`
    PatternConstraint,
    /// Raw text shorter than `minLength`
    MinimumLengthConstraint,
    /// Raw text longer than `maxLength`
    MaximumLengthConstraint,
    /// Value below `minimum`
    MinimumConstraint,
    /// Value above `maximum`
    MaximumConstraint,
    /// Value not in `enum`
    EnumConstraint,
    /// Missing value in a required field
    RequiredConstraint,
    /// Duplicate value in a unique field
    UniqueConstraint,
    /// Duplicate primary key tuple
    PrimaryKeyConstraint,
    /// Duplicate unique key tuple
    UniqueKeyConstraint,
    /// Local key tuple absent from the referenced key set
    ForeignKeyConstraint,
}

impl ConstraintKind {
    /// Every kind, in vocabulary order.
    pub const ALL: [ConstraintKind; 12] = [
        ConstraintKind::TypeError,
        ConstraintKind::PatternConstraint,
        ConstraintKind::MinimumLengthConstraint,
        ConstraintKind::MaximumLengthConstraint,
        ConstraintKind::MinimumConstraint,
        ConstraintKind::MaximumConstraint,
        ConstraintKind::EnumConstraint,
        ConstraintKind::RequiredConstraint,
        ConstraintKind::UniqueConstraint,
        ConstraintKind::PrimaryKeyConstraint,
        ConstraintKind::UniqueKeyConstraint,
        ConstraintKind::ForeignKeyConstraint,
    ];

    /// Returns the report code of the kind.
    pub fn code(&self) -> &'static str {
        match self {
            ConstraintKind::TypeError => "type-error",
            ConstraintKind::PatternConstraint => "pattern-constraint",
            ConstraintKind::MinimumLengthConstraint => "minimum-length-constraint",
            ConstraintKind::MaximumLengthConstraint => "maximum-length-constraint",
            ConstraintKind::MinimumConstraint => "minimum-constraint",
            ConstraintKind::MaximumConstraint => "maximum-constraint",
            ConstraintKind::EnumConstraint => "enum-constraint",
            ConstraintKind::RequiredConstraint => "required-constraint",
            ConstraintKind::UniqueConstraint => "unique-constraint",
            ConstraintKind::PrimaryKeyConstraint => "primary-key-constraint",
            ConstraintKind::UniqueKeyConstraint => "unique-key-constraint",
            ConstraintKind::ForeignKeyConstraint => "foreign-key-constraint",
        }
    }

    /// Whether the kind is produced by a row-set (key) check.
    pub fn is_key_constraint(&self) -> bool {
        matches!(
            self,
            ConstraintKind::UniqueConstraint
                | ConstraintKind::PrimaryKeyConstraint
                | ConstraintKind::UniqueKeyConstraint
                | ConstraintKind::ForeignKeyConstraint
        )
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single constraint violation.
///
/// `fields` is empty for table-level entries, holds one name for field-level
/// violations and the whole tuple for key-group violations. `rows` holds the
/// zero-based row indices involved; it is empty when the violation concerns
/// the field definition rather than a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Resource the violation belongs to
    pub resource: String,

    /// Field or key group
    pub fields: Vec<String>,

    /// Row indices involved
    pub rows: Vec<usize>,

    /// Constraint kind
    pub kind: ConstraintKind,

    /// Human-readable description
    pub message: String,
}

impl Violation {
    /// Creates a violation for one field, optionally at one row.
    pub fn field(
        resource: impl Into<String>,
        field: impl Into<String>,
        row: Option<usize>,
        kind: ConstraintKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            fields: vec![field.into()],
            rows: row.into_iter().collect(),
            kind,
            message: message.into(),
        }
    }

    /// Creates a violation for a key group over a set of rows.
    pub fn key(
        resource: impl Into<String>,
        fields: &[String],
        rows: Vec<usize>,
        kind: ConstraintKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.into(),
            fields: fields.to_vec(),
            rows,
            kind,
            message: message.into(),
        }
    }

    /// Returns the first row involved, if any.
    pub fn row(&self) -> Option<usize> {
        self.rows.first().copied()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.resource)?;
        match self.fields.as_slice() {
            [] => {}
            [field] => write!(f, ".{}", field)?,
            fields => write!(f, ".({})", fields.join(", "))?,
        }
        match self.rows.as_slice() {
            [] => {}
            [row] => write!(f, " row {}", row)?,
            rows => {
                let rows: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
                write!(f, " rows {}", rows.join(", "))?;
            }
        }
        write!(f, ": {}", self.message)
    }
}
