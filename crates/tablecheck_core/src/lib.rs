//! # Tablecheck Core
//!
//! Core data structures and types for validating tabular data packages.
//!
//! A package is a set of table resources. Each resource carries a table
//! schema: typed fields with per-field constraints plus key declarations
//! (primary key, unique keys, foreign keys). Validation produces a report of
//! violations drawn from a fixed vocabulary of constraint kinds.
//!
//! ## Key Concepts
//!
//! - **Package / TableDescriptor**: the declarative schema being enforced
//! - **Violation**: a single failed constraint, addressed by resource, field(s) and row(s)
//! - **ValidationReport**: per-table outcomes that separate "could not validate"
//!   from "validated with violations"
//!
//! ## Example
//!
//! ```rust
//! use tablecheck_core::{FieldBuilder, FieldType, Package, TableBuilder};
//!
//! let package = Package {
//!     name: None,
//!     resources: vec![
//!         TableBuilder::new("countries")
//!             .field(FieldBuilder::new("code", FieldType::String).pattern("[A-Z]{2}").build())
//!             .field(FieldBuilder::new("population", FieldType::Integer).minimum(0).build())
//!             .primary_key(["code"])
//!             .build(),
//!     ],
//! };
//!
//! assert_eq!(package.resource_names(), vec!["countries"]);
//! ```

pub mod builder;
pub mod error;
pub mod schema;
pub mod validator;
pub mod violation;

pub use builder::*;
pub use error::*;
pub use schema::*;
pub use validator::*;
pub use violation::*;
