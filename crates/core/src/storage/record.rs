//! Record codec.
//!
//! A [`Record`] declares its fields once in a static table and moves values in
//! and out through [`FieldWriter`] and [`FieldReader`]. The codec maps logical
//! field names to physical attributes using the bound [`SchemaDescriptor`].

use chrono::{DateTime, NaiveDateTime, Utc};

use super::attribute::{AttributeValue, Item};
use super::error::{Result, TableError};
use super::keys;
use super::schema::{FieldDef, SchemaDescriptor};

/// A strongly-typed record stored through a [`TableClient`](super::TableClient).
pub trait Record: Clone + Send + Sync + Sized + 'static {
    /// Field table. Exactly one partition field, at most one sort field.
    const FIELDS: &'static [FieldDef];

    /// Writes every field by logical name. Optional fields with no value are
    /// written as unset and omitted from the stored item.
    fn write_fields(&self, fields: &mut FieldWriter);

    /// Rebuilds the record from a stored item.
    fn read_fields(fields: &FieldReader<'_>) -> Result<Self>;
}

/// Conversion of a field value into its stored representation.
pub trait ToAttribute {
    fn to_attribute(&self) -> AttributeValue;
}

/// Conversion of a stored value back into a field value.
pub trait FromAttribute: Sized {
    /// Returns a short reason when the stored value has the wrong shape.
    fn from_attribute(value: &AttributeValue) -> std::result::Result<Self, String>;
}

impl ToAttribute for String {
    fn to_attribute(&self) -> AttributeValue {
        AttributeValue::S(self.clone())
    }
}

impl ToAttribute for str {
    fn to_attribute(&self) -> AttributeValue {
        AttributeValue::S(self.to_string())
    }
}

impl ToAttribute for bool {
    fn to_attribute(&self) -> AttributeValue {
        AttributeValue::Bool(*self)
    }
}

impl ToAttribute for i64 {
    fn to_attribute(&self) -> AttributeValue {
        AttributeValue::N(self.to_string())
    }
}

impl ToAttribute for DateTime<Utc> {
    fn to_attribute(&self) -> AttributeValue {
        AttributeValue::S(self.to_rfc3339())
    }
}

impl ToAttribute for Vec<String> {
    fn to_attribute(&self) -> AttributeValue {
        AttributeValue::L(self.iter().cloned().map(AttributeValue::S).collect())
    }
}

impl FromAttribute for String {
    fn from_attribute(value: &AttributeValue) -> std::result::Result<Self, String> {
        value
            .as_s()
            .map(str::to_string)
            .ok_or_else(|| format!("expected S, got {}", value.type_name()))
    }
}

impl FromAttribute for bool {
    fn from_attribute(value: &AttributeValue) -> std::result::Result<Self, String> {
        value
            .as_bool()
            .ok_or_else(|| format!("expected BOOL, got {}", value.type_name()))
    }
}

impl FromAttribute for i64 {
    fn from_attribute(value: &AttributeValue) -> std::result::Result<Self, String> {
        let n = value
            .as_n()
            .ok_or_else(|| format!("expected N, got {}", value.type_name()))?;
        n.parse().map_err(|e| format!("invalid integer '{n}': {e}"))
    }
}

impl FromAttribute for DateTime<Utc> {
    fn from_attribute(value: &AttributeValue) -> std::result::Result<Self, String> {
        let s = value
            .as_s()
            .ok_or_else(|| format!("expected S, got {}", value.type_name()))?;
        parse_datetime(s).ok_or_else(|| format!("invalid datetime '{s}'"))
    }
}

impl FromAttribute for Vec<String> {
    fn from_attribute(value: &AttributeValue) -> std::result::Result<Self, String> {
        let items = value
            .as_l()
            .ok_or_else(|| format!("expected L, got {}", value.type_name()))?;
        items.iter().map(String::from_attribute).collect()
    }
}

/// Parses RFC 3339 text, falling back to a naive ISO 8601 timestamp read as UTC.
pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Collects field values by logical name while a record writes itself out.
#[derive(Debug, Default)]
pub struct FieldWriter {
    values: Vec<(&'static str, Option<AttributeValue>)>,
}

impl FieldWriter {
    pub(crate) fn collect<R: Record>(record: &R) -> Self {
        let mut fields = Self::default();
        record.write_fields(&mut fields);
        fields
    }

    pub fn set<V: ToAttribute + ?Sized>(&mut self, name: &'static str, value: &V) -> &mut Self {
        self.put(name, Some(value.to_attribute()))
    }

    pub fn set_optional<V: ToAttribute + ?Sized>(
        &mut self,
        name: &'static str,
        value: Option<&V>,
    ) -> &mut Self {
        self.put(name, value.map(ToAttribute::to_attribute))
    }

    fn put(&mut self, name: &'static str, value: Option<AttributeValue>) -> &mut Self {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
        self
    }

    pub(crate) fn value(&self, name: &str) -> Option<&AttributeValue> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, value)| value.as_ref())
    }
}

/// Read access to a stored item by logical field name.
pub struct FieldReader<'a> {
    schema: &'a SchemaDescriptor,
    item: &'a Item,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(schema: &'a SchemaDescriptor, item: &'a Item) -> Self {
        Self { schema, item }
    }

    /// Reads a field that must be present.
    pub fn required<T: FromAttribute>(&self, name: &str) -> Result<T> {
        let field = self.schema.require_field(name)?;
        let value = self.lookup(field).ok_or_else(|| {
            TableError::decode(format!(
                "{}: missing required attribute '{}' ({})",
                self.schema.table_name(),
                field.attribute(),
                field.name
            ))
        })?;
        self.convert(field, value)
    }

    /// Reads a field that may be absent. Absent and NULL both read as `None`.
    pub fn optional<T: FromAttribute>(&self, name: &str) -> Result<Option<T>> {
        let field = self.schema.require_field(name)?;
        self.lookup(field)
            .map(|value| self.convert(field, value))
            .transpose()
    }

    fn lookup(&self, field: &FieldDef) -> Option<&'a AttributeValue> {
        self.item
            .get(field.attribute())
            .filter(|value| !matches!(value, AttributeValue::Null))
    }

    fn convert<T: FromAttribute>(&self, field: &FieldDef, value: &AttributeValue) -> Result<T> {
        T::from_attribute(value).map_err(|reason| {
            TableError::decode(format!(
                "{}: attribute '{}' ({}): {reason}",
                self.schema.table_name(),
                field.attribute(),
                field.name
            ))
        })
    }
}

/// Serializes a record into a store item.
///
/// Unset optional fields are omitted rather than written as NULL. A record
/// writing a field its table does not declare, leaving a required field unset,
/// or writing a value of the wrong kind fails with [`TableError::Schema`].
pub fn to_storage<R: Record>(schema: &SchemaDescriptor, record: &R) -> Result<Item> {
    let fields = FieldWriter::collect(record);
    keys::key_from_fields(schema, &fields)?;

    let mut item = Item::new();
    for (name, value) in &fields.values {
        let field = schema.require_field(name)?;
        match value {
            Some(value) if field.kind.accepts(value) => {
                item.insert(field.attribute().to_string(), value.clone());
            }
            Some(value) => {
                return Err(TableError::schema(format!(
                    "{}: field '{}' expects {}, got {}",
                    schema.table_name(),
                    field.name,
                    field.kind.name(),
                    value.type_name()
                )))
            }
            None if field.required => {
                return Err(TableError::schema(format!(
                    "{}: required field '{}' is unset",
                    schema.table_name(),
                    field.name
                )))
            }
            None => {}
        }
    }

    if let Some(missing) = schema
        .fields()
        .iter()
        .find(|f| f.required && !item.contains_key(f.attribute()))
    {
        return Err(TableError::schema(format!(
            "{}: required field '{}' was not written",
            schema.table_name(),
            missing.name
        )));
    }

    Ok(item)
}

/// Deserializes a store item into a record.
///
/// Fails with [`TableError::Decode`] when the key attributes or a required
/// field are missing, or when a value has an incompatible shape.
pub fn from_storage<R: Record>(schema: &SchemaDescriptor, item: &Item) -> Result<R> {
    keys::decode(schema, item)?;
    R::read_fields(&FieldReader::new(schema, item))
}
