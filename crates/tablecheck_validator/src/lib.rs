//! # Tablecheck Validator
//!
//! Validation engine for tabular data packages. This crate checks table data
//! against package descriptors:
//!
//! - Key normalization (primary, unique and foreign keys reduced to a minimal check set)
//! - Type parsing (raw values to typed values, per-value failures)
//! - Field constraints (pattern and length on raw text; required, range and enum on typed values)
//! - Row-set checks (null-aware uniqueness and foreign key membership)
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use tablecheck_core::{FieldBuilder, FieldType, TableBuilder, ValidationContext};
//! use tablecheck_validator::{Column, Table, Validator};
//!
//! let teams = TableBuilder::new("teams")
//!     .field(FieldBuilder::new("code", FieldType::String).build())
//!     .primary_key(["code"])
//!     .build();
//! let people = TableBuilder::new("people")
//!     .field(FieldBuilder::new("name", FieldType::String).build())
//!     .field(FieldBuilder::new("team", FieldType::String).build())
//!     .foreign_key(["team"], "teams", ["code"])
//!     .build();
//!
//! let mut tables = HashMap::new();
//! tables.insert(
//!     "teams".to_string(),
//!     Table::from_columns(vec![Column::new("code", ["red", "blue"])]).unwrap(),
//! );
//! tables.insert(
//!     "people".to_string(),
//!     Table::from_columns(vec![
//!         Column::new("name", ["ada", "bob"]),
//!         Column::new("team", ["red", "green"]),
//!     ])
//!     .unwrap(),
//! );
//!
//! let report = Validator::new(ValidationContext::new()).validate(&[teams, people], &tables);
//!
//! assert!(!report.valid);
//! assert_eq!(report.violation_count(), 1);
//! ```

mod constraints;
mod dataset;
mod engine;
mod error;
pub mod keys;
mod normalize;
mod report;
mod types;

pub use constraints::*;
pub use dataset::*;
pub use engine::*;
pub use error::*;
pub use normalize::*;
pub use report::*;
pub use types::*;
