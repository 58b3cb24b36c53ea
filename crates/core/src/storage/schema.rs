//! Schema descriptors: the declarative field table behind every record type.
//!
//! Key fields are aliased to fixed physical attributes so every table shares the
//! same key schema; all other fields are stored under their own name.

use super::attribute::AttributeValue;
use super::error::{Result, TableError};
use super::record::{parse_datetime, Record};

/// Physical attribute holding the partition key on every table.
pub const PARTITION_KEY_ATTRIBUTE: &str = "partition_key";

/// Physical attribute holding the sort key on tables that declare one.
pub const SORT_KEY_ATTRIBUTE: &str = "sort_key";

/// Shape of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    /// Stored as RFC 3339 text.
    DateTime,
    StringList,
}

impl FieldKind {
    /// Whether a stored value has the shape this kind expects.
    pub fn accepts(&self, value: &AttributeValue) -> bool {
        match (self, value) {
            (FieldKind::String, AttributeValue::S(_)) => true,
            (FieldKind::Integer, AttributeValue::N(n)) => n.parse::<i64>().is_ok(),
            (FieldKind::Boolean, AttributeValue::Bool(_)) => true,
            (FieldKind::DateTime, AttributeValue::S(s)) => parse_datetime(s).is_some(),
            (FieldKind::StringList, AttributeValue::L(items)) => {
                items.iter().all(|item| matches!(item, AttributeValue::S(_)))
            }
            _ => false,
        }
    }

    /// Rewrites a value into the form records store, so text comparisons agree
    /// with the values they compare against. Datetimes become UTC RFC 3339.
    pub fn normalize(&self, value: AttributeValue) -> AttributeValue {
        match (self, value) {
            (FieldKind::DateTime, AttributeValue::S(s)) => match parse_datetime(&s) {
                Some(dt) => AttributeValue::S(dt.to_rfc3339()),
                None => AttributeValue::S(s),
            },
            (_, value) => value,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::DateTime => "datetime",
            FieldKind::StringList => "string list",
        }
    }
}

/// Which part of the physical key a field is aliased to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Partition,
    Sort,
}

/// One entry of a record type's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub key: Option<KeyRole>,
}

impl FieldDef {
    /// The field aliased to the partition key. Always a required string.
    pub const fn partition(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::String,
            required: true,
            key: Some(KeyRole::Partition),
        }
    }

    /// The field aliased to the sort key. Always a required string.
    pub const fn sort(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::String,
            required: true,
            key: Some(KeyRole::Sort),
        }
    }

    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            key: None,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            key: None,
        }
    }

    /// Physical attribute name this field is stored under.
    pub fn attribute(&self) -> &'static str {
        match self.key {
            Some(KeyRole::Partition) => PARTITION_KEY_ATTRIBUTE,
            Some(KeyRole::Sort) => SORT_KEY_ATTRIBUTE,
            None => self.name,
        }
    }

    pub fn is_key(&self) -> bool {
        self.key.is_some()
    }
}

/// Static metadata for one record type bound to one physical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    table_name: String,
    fields: &'static [FieldDef],
    partition: usize,
    sort: Option<usize>,
}

impl SchemaDescriptor {
    /// Builds and validates a descriptor from a field table.
    ///
    /// Fails with [`TableError::Schema`] when the table name is empty, the
    /// table does not have exactly one partition field, has more than one
    /// sort field, repeats a field name, or maps two fields to the same
    /// physical attribute.
    pub fn new(table_name: impl Into<String>, fields: &'static [FieldDef]) -> Result<Self> {
        let table_name = table_name.into();
        if table_name.trim().is_empty() {
            return Err(TableError::schema("table name must not be empty"));
        }

        let mut partition = None;
        let mut sort = None;
        for (index, field) in fields.iter().enumerate() {
            if fields[..index].iter().any(|f| f.name == field.name) {
                return Err(TableError::schema(format!(
                    "{table_name}: duplicate field '{}'",
                    field.name
                )));
            }
            if fields[..index]
                .iter()
                .any(|f| f.attribute() == field.attribute())
            {
                return Err(TableError::schema(format!(
                    "{table_name}: field '{}' collides with attribute '{}'",
                    field.name,
                    field.attribute()
                )));
            }
            match field.key {
                Some(KeyRole::Partition) if partition.is_some() => {
                    return Err(TableError::schema(format!(
                        "{table_name}: more than one partition field"
                    )));
                }
                Some(KeyRole::Partition) => partition = Some(index),
                Some(KeyRole::Sort) if sort.is_some() => {
                    return Err(TableError::schema(format!(
                        "{table_name}: more than one sort field"
                    )));
                }
                Some(KeyRole::Sort) => sort = Some(index),
                None => {}
            }
        }

        let partition = partition.ok_or_else(|| {
            TableError::schema(format!("{table_name}: no partition field declared"))
        })?;

        Ok(Self {
            table_name,
            fields,
            partition,
            sort,
        })
    }

    /// Descriptor for a record type's field table bound to `table_name`.
    pub fn for_record<R: Record>(table_name: impl Into<String>) -> Result<Self> {
        Self::new(table_name, R::FIELDS)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn partition_field(&self) -> &'static FieldDef {
        &self.fields[self.partition]
    }

    pub fn sort_field(&self) -> Option<&'static FieldDef> {
        self.sort.map(|index| &self.fields[index])
    }

    pub fn has_sort_key(&self) -> bool {
        self.sort.is_some()
    }

    pub fn fields(&self) -> &'static [FieldDef] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Like [`field`](Self::field) but unknown names are a schema error.
    pub fn require_field(&self, name: &str) -> Result<&'static FieldDef> {
        self.field(name).ok_or_else(|| {
            TableError::schema(format!("{}: unknown field '{name}'", self.table_name))
        })
    }

    pub fn field_for_attribute(&self, attribute: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.attribute() == attribute)
    }

    /// Logical field name to physical attribute name, in declaration order.
    pub fn field_map(&self) -> Vec<(&'static str, &'static str)> {
        self.fields.iter().map(|f| (f.name, f.attribute())).collect()
    }
}
