//! Builder pattern for creating table descriptors.
//!
//! This module provides ergonomic builders for constructing resources and
//! field descriptors with a fluent API.

use crate::{
    Constraints, Dialect, FieldDescriptor, FieldType, ForeignKey, ForeignKeyReference,
    TableDescriptor, TableSchema,
};

/// Builder for creating a `TableDescriptor`.
///
/// # Example
///
/// ```rust
/// use tablecheck_core::{FieldBuilder, FieldType, TableBuilder};
///
/// let orders = TableBuilder::new("orders")
///     .path("orders.csv")
///     .field(FieldBuilder::new("id", FieldType::Integer).build())
///     .field(FieldBuilder::new("customer", FieldType::Integer).build())
///     .primary_key(["id"])
///     .foreign_key(["customer"], "customers", ["id"])
///     .build();
///
/// assert_eq!(orders.schema.foreign_keys.len(), 1);
/// ```
#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    path: Vec<String>,
    dialect: Dialect,
    schema: TableSchema,
}

impl TableBuilder {
    /// Creates a new table builder.
    ///
    /// # Arguments
    ///
    /// * `name` - Resource name, unique within the package
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: Vec::new(),
            dialect: Dialect::default(),
            schema: TableSchema {
                missing_values: vec![String::new()],
                ..Default::default()
            },
        }
    }

    /// Adds a data path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path.push(path.into());
        self
    }

    /// Sets the CSV dialect.
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Adds a field to the schema.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.schema.fields.push(field);
        self
    }

    /// Adds multiple fields to the schema.
    pub fn fields(mut self, fields: Vec<FieldDescriptor>) -> Self {
        self.schema.fields.extend(fields);
        self
    }

    /// Sets the primary key.
    pub fn primary_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.primary_key = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a unique key group.
    pub fn unique_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema
            .unique_keys
            .push(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a foreign key. An empty `resource` references this table.
    pub fn foreign_key<I, J, S, T>(mut self, fields: I, resource: impl Into<String>, reference: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        self.schema.foreign_keys.push(ForeignKey {
            fields: fields.into_iter().map(Into::into).collect(),
            reference: ForeignKeyReference {
                resource: resource.into(),
                fields: reference.into_iter().map(Into::into).collect(),
            },
        });
        self
    }

    /// Sets the strings read as missing values.
    pub fn missing_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.missing_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Builds the table descriptor.
    pub fn build(self) -> TableDescriptor {
        TableDescriptor {
            name: self.name,
            path: self.path,
            dialect: self.dialect,
            schema: self.schema,
        }
    }
}

/// Builder for creating a `FieldDescriptor`.
///
/// # Example
///
/// ```rust
/// use tablecheck_core::{FieldBuilder, FieldType};
///
/// let field = FieldBuilder::new("code", FieldType::String)
///     .description("Three digit code")
///     .pattern(r"\d{3}")
///     .required(true)
///     .build();
///
/// assert!(field.constraints.is_required());
/// ```
#[derive(Debug)]
pub struct FieldBuilder {
    field: FieldDescriptor,
}

impl FieldBuilder {
    /// Creates a new field builder.
    ///
    /// # Arguments
    ///
    /// * `name` - Field name
    /// * `field_type` - Declared type
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            field: FieldDescriptor::new(name, field_type),
        }
    }

    /// Sets the field description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.field.description = Some(description.into());
        self
    }

    /// Adds a format string.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.field.format.push(format.into());
        self
    }

    /// Replaces all constraints.
    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.field.constraints = constraints;
        self
    }

    /// Sets the `required` constraint.
    pub fn required(mut self, required: bool) -> Self {
        self.field.constraints.required = Some(required);
        self
    }

    /// Sets the `unique` constraint.
    pub fn unique(mut self, unique: bool) -> Self {
        self.field.constraints.unique = Some(unique);
        self
    }

    /// Sets the `minimum` constraint.
    pub fn minimum(mut self, minimum: impl Into<serde_json::Value>) -> Self {
        self.field.constraints.minimum = Some(minimum.into());
        self
    }

    /// Sets the `maximum` constraint.
    pub fn maximum(mut self, maximum: impl Into<serde_json::Value>) -> Self {
        self.field.constraints.maximum = Some(maximum.into());
        self
    }

    /// Sets the `pattern` constraint.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.field.constraints.pattern = Some(pattern.into());
        self
    }

    /// Sets the `minLength` constraint.
    pub fn min_length(mut self, length: usize) -> Self {
        self.field.constraints.min_length = Some(length);
        self
    }

    /// Sets the `maxLength` constraint.
    pub fn max_length(mut self, length: usize) -> Self {
        self.field.constraints.max_length = Some(length);
        self
    }

    /// Sets the `enum` constraint.
    pub fn allowed<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<serde_json::Value>,
    {
        self.field.constraints.allowed = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the boolean lexicon.
    pub fn boolean_values<I, J, S, T>(mut self, true_values: I, false_values: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        self.field.true_values = Some(true_values.into_iter().map(Into::into).collect());
        self.field.false_values = Some(false_values.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the decimal separator.
    pub fn decimal_char(mut self, decimal_char: impl Into<String>) -> Self {
        self.field.decimal_char = Some(decimal_char.into());
        self
    }

    /// Sets the digit group separator.
    pub fn group_char(mut self, group_char: impl Into<String>) -> Self {
        self.field.group_char = Some(group_char.into());
        self
    }

    /// Sets whether numbers are bare.
    pub fn bare_number(mut self, bare_number: bool) -> Self {
        self.field.bare_number = Some(bare_number);
        self
    }

    /// Builds the field.
    pub fn build(self) -> FieldDescriptor {
        self.field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_builder_basic() {
        let table = TableBuilder::new("people")
            .path("people.csv")
            .field(FieldBuilder::new("id", FieldType::Integer).build())
            .field(FieldBuilder::new("name", FieldType::String).build())
            .primary_key(["id"])
            .unique_key(["id", "name"])
            .build();

        assert_eq!(table.name, "people");
        assert_eq!(table.path, vec!["people.csv"]);
        assert_eq!(table.schema.field_names(), vec!["id", "name"]);
        assert_eq!(table.schema.primary_key, vec!["id"]);
        assert_eq!(table.schema.unique_keys.len(), 1);
        assert_eq!(table.schema.missing_values, vec![""]);
    }

    #[test]
    fn test_table_builder_foreign_key() {
        let table = TableBuilder::new("tree")
            .field(FieldBuilder::new("id", FieldType::Integer).build())
            .field(FieldBuilder::new("parent", FieldType::Integer).build())
            .foreign_key(["parent"], "", ["id"])
            .build();

        let fk = &table.schema.foreign_keys[0];
        assert_eq!(fk.fields, vec!["parent"]);
        assert_eq!(fk.reference_resource("tree"), "tree");
        assert_eq!(fk.reference.fields, vec!["id"]);
    }

    #[test]
    fn test_field_builder_constraints() {
        let field = FieldBuilder::new("score", FieldType::Number)
            .required(true)
            .unique(false)
            .minimum(0)
            .maximum(100)
            .allowed([1, 2, 3])
            .min_length(1)
            .max_length(3)
            .build();

        assert!(field.constraints.is_required());
        assert!(!field.constraints.is_unique());
        assert_eq!(field.constraints.minimum, Some(serde_json::json!(0)));
        assert_eq!(field.constraints.maximum, Some(serde_json::json!(100)));
        assert_eq!(field.constraints.allowed.map(|v| v.len()), Some(3));
        assert_eq!(field.constraints.min_length, Some(1));
        assert_eq!(field.constraints.max_length, Some(3));
    }

    #[test]
    fn test_field_builder_type_options() {
        let field = FieldBuilder::new("flag", FieldType::Boolean)
            .boolean_values(["y"], ["n"])
            .build();
        assert_eq!(field.true_values, Some(vec!["y".to_string()]));
        assert_eq!(field.false_values, Some(vec!["n".to_string()]));

        let field = FieldBuilder::new("amount", FieldType::Number)
            .decimal_char(",")
            .group_char(".")
            .bare_number(false)
            .format("default")
            .build();
        assert_eq!(field.decimal_char.as_deref(), Some(","));
        assert_eq!(field.group_char.as_deref(), Some("."));
        assert_eq!(field.bare_number, Some(false));
        assert_eq!(field.format, vec!["default"]);
    }
}
