//! Key codec.
//!
//! Pure functions deriving the physical `(partition, sort?)` key of an item from
//! a record or from caller-supplied parts, and reading it back from stored items.

use std::fmt;

use super::attribute::{AttributeValue, Item};
use super::error::{Result, TableError};
use super::record::{FieldWriter, Record};
use super::schema::{SchemaDescriptor, PARTITION_KEY_ATTRIBUTE, SORT_KEY_ATTRIBUTE};

/// Physical key of a stored item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    pub partition: String,
    pub sort: Option<String>,
}

impl Key {
    pub fn new(partition: impl Into<String>, sort: Option<impl Into<String>>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.map(Into::into),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sort {
            Some(sort) => write!(f, "({}, {})", self.partition, sort),
            None => write!(f, "({})", self.partition),
        }
    }
}

/// Derives the key of a record.
///
/// Fails with [`TableError::Schema`] when the partition value is missing or
/// empty, or when the sort value does not match the descriptor.
pub fn encode<R: Record>(schema: &SchemaDescriptor, record: &R) -> Result<Key> {
    key_from_fields(schema, &FieldWriter::collect(record))
}

pub(crate) fn key_from_fields(schema: &SchemaDescriptor, fields: &FieldWriter) -> Result<Key> {
    let partition_field = schema.partition_field();
    let partition = match fields.value(partition_field.name) {
        Some(AttributeValue::S(value)) => value.as_str(),
        Some(other) => {
            return Err(TableError::schema(format!(
                "{}: partition field '{}' must be a string, got {}",
                schema.table_name(),
                partition_field.name,
                other.type_name()
            )))
        }
        None => {
            return Err(TableError::schema(format!(
                "{}: partition field '{}' is not set",
                schema.table_name(),
                partition_field.name
            )))
        }
    };

    let sort = match schema.sort_field() {
        Some(sort_field) => match fields.value(sort_field.name) {
            Some(AttributeValue::S(value)) => Some(value.as_str()),
            _ => {
                return Err(TableError::schema(format!(
                    "{}: sort field '{}' is not set",
                    schema.table_name(),
                    sort_field.name
                )))
            }
        },
        None => None,
    };

    from_parts(schema, partition, sort)
}

/// Validates caller-supplied key parts against the descriptor.
///
/// `sort` must be given exactly when the descriptor declares a sort field.
pub fn from_parts(schema: &SchemaDescriptor, partition: &str, sort: Option<&str>) -> Result<Key> {
    if partition.is_empty() {
        return Err(TableError::schema(format!(
            "{}: partition key '{}' must not be empty",
            schema.table_name(),
            schema.partition_field().name
        )));
    }

    match (schema.sort_field(), sort) {
        (Some(field), None) => Err(TableError::schema(format!(
            "{}: sort key '{}' is required",
            schema.table_name(),
            field.name
        ))),
        (None, Some(_)) => Err(TableError::schema(format!(
            "{}: table has no sort key",
            schema.table_name()
        ))),
        (Some(field), Some("")) => Err(TableError::schema(format!(
            "{}: sort key '{}' must not be empty",
            schema.table_name(),
            field.name
        ))),
        (_, sort) => Ok(Key::new(partition, sort)),
    }
}

/// Reads the key components back out of a stored item.
///
/// Fails with [`TableError::Decode`] when the item's key attributes do not
/// match the descriptor's key shape.
pub fn decode(schema: &SchemaDescriptor, item: &Item) -> Result<Key> {
    let partition = match item.get(PARTITION_KEY_ATTRIBUTE) {
        Some(AttributeValue::S(value)) if !value.is_empty() => value.clone(),
        _ => {
            return Err(TableError::decode(format!(
                "{}: item has no valid '{PARTITION_KEY_ATTRIBUTE}' attribute",
                schema.table_name()
            )))
        }
    };

    let sort = match (schema.has_sort_key(), item.get(SORT_KEY_ATTRIBUTE)) {
        (true, Some(AttributeValue::S(value))) if !value.is_empty() => Some(value.clone()),
        (true, _) => {
            return Err(TableError::decode(format!(
                "{}: item has no valid '{SORT_KEY_ATTRIBUTE}' attribute",
                schema.table_name()
            )))
        }
        (false, _) => None,
    };

    Ok(Key { partition, sort })
}

/// The key as a store item containing only the physical key attributes.
pub fn to_item(key: &Key) -> Item {
    let mut item = Item::new();
    item.insert(
        PARTITION_KEY_ATTRIBUTE.to_string(),
        AttributeValue::S(key.partition.clone()),
    );
    if let Some(sort) = &key.sort {
        item.insert(SORT_KEY_ATTRIBUTE.to_string(), AttributeValue::S(sort.clone()));
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::record::FieldReader;
    use crate::storage::schema::{FieldDef, FieldKind};

    #[derive(Debug, Clone, PartialEq)]
    struct Seat {
        hall: String,
        seat: String,
        holder: Option<String>,
    }

    impl Record for Seat {
        const FIELDS: &'static [FieldDef] = &[
            FieldDef::partition("hall"),
            FieldDef::sort("seat"),
            FieldDef::optional("holder", FieldKind::String),
        ];

        fn write_fields(&self, fields: &mut FieldWriter) {
            fields
                .set("hall", &self.hall)
                .set("seat", &self.seat)
                .set_optional("holder", self.holder.as_ref());
        }

        fn read_fields(fields: &FieldReader<'_>) -> Result<Self> {
            Ok(Self {
                hall: fields.required("hall")?,
                seat: fields.required("seat")?,
                holder: fields.optional("holder")?,
            })
        }
    }

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::for_record::<Seat>("seats").unwrap()
    }

    fn seat(hall: &str, seat: &str) -> Seat {
        Seat {
            hall: hall.to_string(),
            seat: seat.to_string(),
            holder: None,
        }
    }

    #[test]
    fn test_encode() {
        let key = encode(&schema(), &seat("A", "12")).unwrap();
        assert_eq!(key, Key::new("A", Some("12")));
        assert_eq!(key.to_string(), "(A, 12)");
    }

    #[test]
    fn test_encode_rejects_empty_partition() {
        let err = encode(&schema(), &seat("", "12")).unwrap_err();
        assert!(matches!(err, TableError::Schema(_)));
    }

    #[test]
    fn test_encode_rejects_empty_sort() {
        assert!(encode(&schema(), &seat("A", "")).is_err());
    }

    #[test]
    fn test_from_parts_requires_matching_sort_shape() {
        let schema = schema();
        assert!(from_parts(&schema, "A", Some("1")).is_ok());
        assert!(matches!(
            from_parts(&schema, "A", None),
            Err(TableError::Schema(_))
        ));

        const SINGLE: &[FieldDef] = &[FieldDef::partition("code")];
        let single = SchemaDescriptor::new("single", SINGLE).unwrap();
        assert_eq!(from_parts(&single, "E1", None).unwrap(), Key::new("E1", None::<String>));
        assert!(matches!(
            from_parts(&single, "E1", Some("x")),
            Err(TableError::Schema(_))
        ));
    }

    #[test]
    fn test_to_item_and_decode() {
        let schema = schema();
        let key = Key::new("A", Some("12"));
        let item = to_item(&key);

        assert_eq!(item.len(), 2);
        assert_eq!(item.get("partition_key").and_then(|v| v.as_s()), Some("A"));
        assert_eq!(decode(&schema, &item).unwrap(), key);
    }

    #[test]
    fn test_decode_rejects_missing_sort() {
        let item = to_item(&Key::new("A", None::<String>));
        assert!(matches!(
            decode(&schema(), &item),
            Err(TableError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_string_partition() {
        let mut item = Item::new();
        item.insert("partition_key".to_string(), AttributeValue::from(7i64));
        item.insert("sort_key".to_string(), AttributeValue::from("1"));
        assert!(decode(&schema(), &item).is_err());
    }
}
