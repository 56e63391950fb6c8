//! Key constraint normalization.
//!
//! Rewrites every resource's `primaryKey`, `uniqueKeys` and `foreignKeys`
//! into a minimal check set:
//!
//! 1. each foreign key's reference tuple becomes a unique key of the
//!    referenced resource, unless a key with the same field set exists;
//! 2. a primary key is folded into `uniqueKeys` and its fields become
//!    `required`;
//! 3. single-field unique keys become the field's `unique` flag.
//!
//! The result is computed in one pass over the whole package and stored in an
//! arena (`NormalizedSchema`) that is never mutated afterwards. Normalizing a
//! normalized schema gives the same schema back.

use crate::TypeParser;
use regex::Regex;
use std::collections::{BTreeSet, HashMap, HashSet};
use tablecheck_core::{
    ConstraintKind, FieldDescriptor, ForeignKey, Package, SchemaError, TableDescriptor,
    TableSchema,
};

/// Whether two keys list the same set of fields.
pub fn same_fields(a: &[String], b: &[String]) -> bool {
    a.iter().collect::<BTreeSet<_>>() == b.iter().collect::<BTreeSet<_>>()
}

/// Builds the regex that fully matches `pattern`.
pub fn anchored_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

/// Normalized, immutable view of one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    descriptor: TableDescriptor,
    parsers: Vec<TypeParser>,
}

impl NormalizedTable {
    /// Returns the resource name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Returns the normalized descriptor.
    ///
    /// Field flags carry the derived `required` / `unique` constraints,
    /// `uniqueKeys` holds only multi-field keys, and `primaryKey` and
    /// `foreignKeys` are the declared ones.
    pub fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    /// Returns the normalized schema.
    pub fn schema(&self) -> &TableSchema {
        &self.descriptor.schema
    }

    /// Iterates over fields with their type parsers, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &TypeParser)> {
        self.descriptor.schema.fields.iter().zip(&self.parsers)
    }

    /// Returns the parser of a field.
    pub fn parser(&self, field: &str) -> Option<&TypeParser> {
        self.fields()
            .find(|(f, _)| f.name == field)
            .map(|(_, parser)| parser)
    }

    /// Returns the declared primary key.
    pub fn primary_key(&self) -> &[String] {
        &self.descriptor.schema.primary_key
    }

    /// Returns the multi-field unique keys.
    pub fn unique_keys(&self) -> &[Vec<String>] {
        &self.descriptor.schema.unique_keys
    }

    /// Returns the declared foreign keys.
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.descriptor.schema.foreign_keys
    }

    /// Returns every tuple the table checks for uniqueness with its
    /// violation kind: `unique` fields first (in field order), then
    /// multi-field unique keys.
    pub fn key_checks(&self) -> Vec<(Vec<String>, ConstraintKind)> {
        let singles = self
            .descriptor
            .schema
            .fields
            .iter()
            .filter(|f| f.constraints.is_unique())
            .map(|f| vec![f.name.clone()]);
        singles
            .chain(self.unique_keys().iter().cloned())
            .map(|key| {
                let kind = self.key_kind(&key);
                (key, kind)
            })
            .collect()
    }

    /// Returns the violation kind for duplicates of `key`.
    pub fn key_kind(&self, key: &[String]) -> ConstraintKind {
        if !self.primary_key().is_empty() && same_fields(key, self.primary_key()) {
            ConstraintKind::PrimaryKeyConstraint
        } else if key.len() == 1 {
            ConstraintKind::UniqueConstraint
        } else {
            ConstraintKind::UniqueKeyConstraint
        }
    }

    /// Number of constraints the table declares after normalization.
    pub fn constraint_count(&self) -> usize {
        let field_constraints: usize = self
            .descriptor
            .schema
            .fields
            .iter()
            .map(|f| {
                let c = &f.constraints;
                [
                    c.is_required(),
                    c.is_unique(),
                    c.minimum.is_some(),
                    c.maximum.is_some(),
                    c.pattern.is_some(),
                    c.min_length.is_some(),
                    c.max_length.is_some(),
                    c.allowed.is_some(),
                ]
                .iter()
                .filter(|set| **set)
                .count()
            })
            .sum();
        field_constraints + self.unique_keys().len() + self.foreign_keys().len()
    }
}

/// Arena of normalized resources, indexed by position and by name.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSchema {
    tables: Vec<(String, Result<NormalizedTable, SchemaError>)>,
    index: HashMap<String, usize>,
}

impl NormalizedSchema {
    /// Normalizes every resource of a package.
    pub fn from_package(package: &Package) -> Self {
        normalize(&package.resources)
    }

    /// Returns the number of resources.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if there are no resources.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Iterates over resources in package order with their outcome.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Result<&NormalizedTable, &SchemaError>)> {
        self.tables
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.as_ref()))
    }

    /// Iterates over the resources that normalized successfully.
    pub fn tables(&self) -> impl Iterator<Item = &NormalizedTable> {
        self.tables.iter().filter_map(|(_, entry)| entry.as_ref().ok())
    }

    /// Looks up a normalized resource by name.
    pub fn table(&self, name: &str) -> Option<&NormalizedTable> {
        self.tables[*self.index.get(name)?].1.as_ref().ok()
    }

    /// Returns the schema error of a resource, if it failed.
    pub fn error(&self, name: &str) -> Option<&SchemaError> {
        self.tables[*self.index.get(name)?].1.as_ref().err()
    }

    /// Iterates over every schema error in package order.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &SchemaError)> {
        self.tables
            .iter()
            .filter_map(|(name, entry)| entry.as_ref().err().map(|e| (name.as_str(), e)))
    }

    /// Returns the normalized descriptors of the successful resources.
    pub fn descriptors(&self) -> Vec<TableDescriptor> {
        self.tables().map(|t| t.descriptor.clone()).collect()
    }
}

/// Normalizes a set of resources.
///
/// A resource whose descriptor is malformed gets a `SchemaError` and takes no
/// part in the normalization of the others.
pub fn normalize(descriptors: &[TableDescriptor]) -> NormalizedSchema {
    let mut index = HashMap::new();
    let mut checked: Vec<Result<Vec<TypeParser>, SchemaError>> = Vec::new();
    let names: HashMap<&str, &TableDescriptor> = descriptors
        .iter()
        .rev()
        .map(|d| (d.name.as_str(), d))
        .collect();

    for (position, descriptor) in descriptors.iter().enumerate() {
        if index.contains_key(&descriptor.name) {
            checked.push(Err(SchemaError::DuplicateResource(descriptor.name.clone())));
            continue;
        }
        index.insert(descriptor.name.clone(), position);
        checked.push(check_table(descriptor, &names));
    }

    let mut working: Vec<Result<(TableDescriptor, Vec<TypeParser>), SchemaError>> = descriptors
        .iter()
        .zip(checked)
        .map(|(descriptor, checked)| checked.map(|parsers| (descriptor.clone(), parsers)))
        .collect();

    // Foreign key references become unique keys of the referenced resource.
    let references: Vec<(usize, Vec<String>)> = working
        .iter()
        .filter_map(|entry| entry.as_ref().ok())
        .flat_map(|(descriptor, _)| {
            descriptor.schema.foreign_keys.iter().map(|fk| {
                (
                    index[fk.reference_resource(&descriptor.name)],
                    fk.reference.fields.clone(),
                )
            })
        })
        .collect();
    for (target, fields) in references {
        if let Ok((descriptor, _)) = &mut working[target] {
            if !has_key(&descriptor.schema, &fields) {
                descriptor.schema.unique_keys.push(fields);
            }
        }
    }

    let tables = descriptors
        .iter()
        .zip(working)
        .map(|(original, entry)| {
            let entry = entry.map(|(mut descriptor, parsers)| {
                reduce_keys(&mut descriptor.schema);
                NormalizedTable {
                    descriptor,
                    parsers,
                }
            });
            (original.name.clone(), entry)
        })
        .collect();

    NormalizedSchema { tables, index }
}

/// Whether `schema` already checks `key` through its primary key or a
/// unique key.
fn has_key(schema: &TableSchema, key: &[String]) -> bool {
    (!schema.primary_key.is_empty() && same_fields(&schema.primary_key, key))
        || schema.unique_keys.iter().any(|k| same_fields(k, key))
}

/// Folds the primary key into the unique keys and moves single-field keys
/// onto field flags.
fn reduce_keys(schema: &mut TableSchema) {
    let mut keys: Vec<Vec<String>> = Vec::new();
    for key in std::mem::take(&mut schema.unique_keys) {
        if !keys.iter().any(|k| same_fields(k, &key)) {
            keys.push(key);
        }
    }

    let primary_key = schema.primary_key.clone();
    if !primary_key.is_empty() {
        if !keys.iter().any(|k| same_fields(k, &primary_key)) {
            keys.insert(0, primary_key.clone());
        }
        for name in &primary_key {
            if let Some(field) = schema.field_mut(name) {
                field.constraints.required = Some(true);
            }
        }
    }

    let (singles, multi): (Vec<_>, Vec<_>) = keys.into_iter().partition(|k| {
        k.iter().collect::<HashSet<_>>().len() == 1
    });
    for key in singles {
        if let Some(field) = schema.field_mut(&key[0]) {
            field.constraints.unique = Some(true);
        }
    }
    schema.unique_keys = multi;
}

/// Checks that a descriptor can be normalized and builds its type parsers.
fn check_table(
    descriptor: &TableDescriptor,
    resources: &HashMap<&str, &TableDescriptor>,
) -> Result<Vec<TypeParser>, SchemaError> {
    let name = descriptor.name.as_str();
    let schema = &descriptor.schema;

    let mut seen = HashSet::new();
    for field in &schema.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                resource: name.to_string(),
                field: field.name.clone(),
            });
        }
    }

    let check_fields = |fields: &[String], key: &str| -> Result<(), SchemaError> {
        match fields.iter().find(|f| !seen.contains(f.as_str())) {
            Some(field) => Err(SchemaError::unknown_field(name, field, key)),
            None => Ok(()),
        }
    };

    check_fields(&schema.primary_key, "primaryKey")?;
    for key in &schema.unique_keys {
        if key.is_empty() {
            return Err(SchemaError::empty_key(name, "uniqueKeys"));
        }
        check_fields(key, "uniqueKeys")?;
    }

    for fk in &schema.foreign_keys {
        if fk.fields.is_empty() || fk.reference.fields.is_empty() {
            return Err(SchemaError::empty_key(name, "foreignKeys"));
        }
        check_fields(&fk.fields, "foreignKeys")?;
        let reference_name = fk.reference_resource(name);
        let reference = resources
            .get(reference_name)
            .ok_or_else(|| SchemaError::unknown_resource(name, reference_name))?;
        if fk.fields.len() != fk.reference.fields.len() {
            return Err(SchemaError::KeyArityMismatch {
                resource: name.to_string(),
                local: fk.fields.len(),
                reference: fk.reference.fields.len(),
            });
        }
        if let Some(field) = fk
            .reference
            .fields
            .iter()
            .find(|f| reference.field(f).is_none())
        {
            return Err(SchemaError::unknown_field(
                reference_name,
                field,
                format!("foreign key reference from '{}'", name),
            ));
        }
    }

    schema
        .fields
        .iter()
        .map(|field| {
            if let Some(pattern) = &field.constraints.pattern {
                anchored_pattern(pattern).map_err(|e| SchemaError::InvalidPattern {
                    resource: name.to_string(),
                    field: field.name.clone(),
                    error: e.to_string(),
                })?;
            }
            TypeParser::for_field(name, field)
        })
        .collect()
}
