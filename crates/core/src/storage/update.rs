//! Partial updates.
//!
//! A [`Patch`] names the fields to change on an existing item. Key fields cannot
//! be patched; clearing an optional field removes its attribute. Appending to a
//! list field extends the stored list in place, so concurrent appends all land.

use super::attribute::AttributeValue;
use super::error::{Result, TableError};
use super::record::ToAttribute;
use super::schema::{FieldDef, FieldKind, SchemaDescriptor};

/// A validated set of field changes bound to one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    table_name: String,
    set: Vec<(&'static str, AttributeValue)>,
    append: Vec<(&'static str, AttributeValue)>,
    remove: Vec<&'static str>,
}

impl Patch {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Physical attributes to assign, with their new values.
    pub fn set_attributes(&self) -> &[(&'static str, AttributeValue)] {
        &self.set
    }

    /// List attributes to extend, with the elements to add at the end. An
    /// absent attribute starts as an empty list.
    pub fn appended_attributes(&self) -> &[(&'static str, AttributeValue)] {
        &self.append
    }

    /// Physical attributes to remove.
    pub fn removed_attributes(&self) -> &[&'static str] {
        &self.remove
    }
}

/// Builds a [`Patch`]; the first invalid change is reported by [`build`](Self::build).
pub struct PatchBuilder<'a> {
    schema: &'a SchemaDescriptor,
    set: Vec<(&'static str, AttributeValue)>,
    append: Vec<(&'static str, AttributeValue)>,
    remove: Vec<&'static str>,
    error: Option<TableError>,
}

impl<'a> PatchBuilder<'a> {
    pub fn new(schema: &'a SchemaDescriptor) -> Self {
        Self {
            schema,
            set: Vec::new(),
            append: Vec::new(),
            remove: Vec::new(),
            error: None,
        }
    }

    /// Assigns a new value to a field.
    pub fn set<V: ToAttribute + ?Sized>(mut self, field: &str, value: &V) -> Self {
        let value = value.to_attribute();
        match self.writable(field) {
            Ok(def) if def.kind.accepts(&value) => {
                self.forget(def.attribute());
                self.set.push((def.attribute(), def.kind.normalize(value)));
            }
            Ok(def) => {
                let err = TableError::schema(format!(
                    "{}: field '{}' expects {}, got {}",
                    self.schema.table_name(),
                    def.name,
                    def.kind.name(),
                    value.type_name()
                ));
                self.error.get_or_insert(err);
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    /// Adds `values` to the end of a list field.
    pub fn append<V: ToAttribute + ?Sized>(mut self, field: &str, values: &V) -> Self {
        let values = values.to_attribute();
        match self.writable(field) {
            Ok(def) if def.kind == FieldKind::StringList && def.kind.accepts(&values) => {
                self.forget(def.attribute());
                self.append.push((def.attribute(), values));
            }
            Ok(def) => {
                let err = TableError::schema(format!(
                    "{}: cannot append a {} to {} field '{}'",
                    self.schema.table_name(),
                    values.type_name(),
                    def.kind.name(),
                    def.name
                ));
                self.error.get_or_insert(err);
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    /// Removes an optional field from the stored item.
    pub fn clear(mut self, field: &str) -> Self {
        match self.writable(field) {
            Ok(def) if !def.required => {
                self.forget(def.attribute());
                self.remove.push(def.attribute());
            }
            Ok(def) => {
                let err = TableError::schema(format!(
                    "{}: required field '{}' cannot be cleared",
                    self.schema.table_name(),
                    def.name
                ));
                self.error.get_or_insert(err);
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
        self
    }

    pub fn build(self) -> Result<Patch> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.set.is_empty() && self.append.is_empty() && self.remove.is_empty() {
            return Err(TableError::schema(format!(
                "{}: patch changes no fields",
                self.schema.table_name()
            )));
        }
        Ok(Patch {
            table_name: self.schema.table_name().to_string(),
            set: self.set,
            append: self.append,
            remove: self.remove,
        })
    }

    fn writable(&self, field: &str) -> Result<&'static FieldDef> {
        let def = self.schema.require_field(field)?;
        if def.is_key() {
            return Err(TableError::schema(format!(
                "{}: key field '{field}' cannot be updated",
                self.schema.table_name()
            )));
        }
        Ok(def)
    }

    // A later change to the same field replaces the earlier one.
    fn forget(&mut self, attribute: &str) {
        self.set.retain(|(a, _)| *a != attribute);
        self.append.retain(|(a, _)| *a != attribute);
        self.remove.retain(|a| *a != attribute);
    }
}
