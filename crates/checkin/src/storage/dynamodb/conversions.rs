//! DynamoDB attribute conversion functions.
//!
//! Pure functions translating between the core attribute model and the SDK's
//! `AttributeValue`, and rendering patches into update expressions. Testable
//! without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue as DynamoValue;
use checkin_core::storage::{AttributeValue, Item, Patch, StoreError, StoreResult};

/// A DynamoDB item as the SDK represents it.
pub type DynamoItem = HashMap<String, DynamoValue>;

pub fn to_dynamo(value: &AttributeValue) -> DynamoValue {
    match value {
        AttributeValue::S(s) => DynamoValue::S(s.clone()),
        AttributeValue::N(n) => DynamoValue::N(n.clone()),
        AttributeValue::Bool(b) => DynamoValue::Bool(*b),
        AttributeValue::Null => DynamoValue::Null(true),
        AttributeValue::L(items) => DynamoValue::L(items.iter().map(to_dynamo).collect()),
        AttributeValue::M(map) => DynamoValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_dynamo(v)))
                .collect(),
        ),
    }
}

/// Converts an SDK value into the core model.
///
/// String and number sets read as lists. Binary values have no counterpart
/// and are reported as a permanent failure.
pub fn from_dynamo(value: &DynamoValue) -> StoreResult<AttributeValue> {
    Ok(match value {
        DynamoValue::S(s) => AttributeValue::S(s.clone()),
        DynamoValue::N(n) => AttributeValue::N(n.clone()),
        DynamoValue::Bool(b) => AttributeValue::Bool(*b),
        DynamoValue::Null(_) => AttributeValue::Null,
        DynamoValue::L(items) => {
            AttributeValue::L(items.iter().map(from_dynamo).collect::<StoreResult<_>>()?)
        }
        DynamoValue::M(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), from_dynamo(v)?)))
                .collect::<StoreResult<_>>()?,
        ),
        DynamoValue::Ss(values) => {
            AttributeValue::L(values.iter().cloned().map(AttributeValue::S).collect())
        }
        DynamoValue::Ns(values) => {
            AttributeValue::L(values.iter().cloned().map(AttributeValue::N).collect())
        }
        other => {
            return Err(StoreError::Permanent(format!(
                "Unsupported attribute type: {other:?}"
            )))
        }
    })
}

pub fn item_to_dynamo(item: &Item) -> DynamoItem {
    item.iter()
        .map(|(k, v)| (k.clone(), to_dynamo(v)))
        .collect()
}

pub fn item_from_dynamo(item: &DynamoItem) -> StoreResult<Item> {
    item.iter()
        .map(|(k, v)| Ok((k.clone(), from_dynamo(v)?)))
        .collect()
}

/// An `UpdateItem` expression with its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, DynamoValue>,
}

/// Renders `SET #s0 = :s0, #a0 = list_append(if_not_exists(#a0, :empty), :a0) REMOVE #r0`
/// for a patch.
pub fn update_expression(patch: &Patch) -> UpdateExpression {
    let mut names = HashMap::new();
    let mut values = HashMap::new();
    let mut sets = Vec::new();
    let mut removes = Vec::new();

    for (index, (attribute, value)) in patch.set_attributes().iter().enumerate() {
        let name = format!("#s{index}");
        let placeholder = format!(":s{index}");
        sets.push(format!("{name} = {placeholder}"));
        names.insert(name, attribute.to_string());
        values.insert(placeholder, to_dynamo(value));
    }

    for (index, (attribute, value)) in patch.appended_attributes().iter().enumerate() {
        let name = format!("#a{index}");
        let placeholder = format!(":a{index}");
        sets.push(format!(
            "{name} = list_append(if_not_exists({name}, :empty), {placeholder})"
        ));
        names.insert(name, attribute.to_string());
        values.insert(placeholder, to_dynamo(value));
    }
    if !patch.appended_attributes().is_empty() {
        values.insert(":empty".to_string(), DynamoValue::L(Vec::new()));
    }

    for (index, attribute) in patch.removed_attributes().iter().enumerate() {
        let name = format!("#r{index}");
        removes.push(name.clone());
        names.insert(name, attribute.to_string());
    }

    let mut clauses = Vec::new();
    if !sets.is_empty() {
        clauses.push(format!("SET {}", sets.join(", ")));
    }
    if !removes.is_empty() {
        clauses.push(format!("REMOVE {}", removes.join(", ")));
    }

    UpdateExpression {
        expression: clauses.join(" "),
        names,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_core::storage::{FieldDef, FieldKind, PatchBuilder, SchemaDescriptor};

    #[test]
    fn test_scalar_round_trip() {
        for value in [
            AttributeValue::from("Kim"),
            AttributeValue::from(42i64),
            AttributeValue::from(true),
            AttributeValue::Null,
        ] {
            assert_eq!(from_dynamo(&to_dynamo(&value)).unwrap(), value);
        }
    }

    #[test]
    fn test_nested_values() {
        let mut map = HashMap::new();
        map.insert("tags".to_string(), AttributeValue::L(vec!["v1".into(), "v2".into()]));
        let value = AttributeValue::M(map);

        let dynamo = to_dynamo(&value);
        assert!(dynamo.as_m().unwrap().get("tags").unwrap().is_l());
        assert_eq!(from_dynamo(&dynamo).unwrap(), value);
    }

    #[test]
    fn test_string_set_reads_as_list() {
        let dynamo = DynamoValue::Ss(vec!["v1".to_string(), "v2".to_string()]);
        assert_eq!(
            from_dynamo(&dynamo).unwrap(),
            AttributeValue::L(vec!["v1".into(), "v2".into()])
        );
    }

    #[test]
    fn test_binary_is_unsupported() {
        let dynamo = DynamoValue::B(aws_sdk_dynamodb::primitives::Blob::new(vec![1, 2]));
        assert!(matches!(from_dynamo(&dynamo), Err(StoreError::Permanent(_))));
    }

    #[test]
    fn test_item_round_trip() {
        let mut item = Item::new();
        item.insert("partition_key".to_string(), AttributeValue::from("E1"));
        item.insert("name".to_string(), AttributeValue::from("Kim"));

        let dynamo = item_to_dynamo(&item);
        assert_eq!(dynamo.get("partition_key").unwrap().as_s().unwrap(), "E1");
        assert_eq!(item_from_dynamo(&dynamo).unwrap(), item);
    }

    #[test]
    fn test_update_expression() {
        const FIELDS: &[FieldDef] = &[
            FieldDef::partition("event_code"),
            FieldDef::optional("name", FieldKind::String),
            FieldDef::optional("email", FieldKind::String),
        ];
        let schema = SchemaDescriptor::new("dev-event-registration", FIELDS).unwrap();
        let patch = PatchBuilder::new(&schema)
            .set("name", "Kim")
            .clear("email")
            .build()
            .unwrap();

        let update = update_expression(&patch);

        assert_eq!(update.expression, "SET #s0 = :s0 REMOVE #r0");
        assert_eq!(update.names.get("#s0").map(String::as_str), Some("name"));
        assert_eq!(update.names.get("#r0").map(String::as_str), Some("email"));
        assert_eq!(
            update.values.get(":s0"),
            Some(&DynamoValue::S("Kim".to_string()))
        );
        assert!(!update.values.contains_key(":empty"));
    }

    #[test]
    fn test_append_expression() {
        const FIELDS: &[FieldDef] = &[
            FieldDef::partition("organization_code"),
            FieldDef::required("organization_name", FieldKind::String),
            FieldDef::required("event_version", FieldKind::StringList),
        ];
        let schema = SchemaDescriptor::new("dev-event-organization", FIELDS).unwrap();
        let patch = PatchBuilder::new(&schema)
            .set("organization_name", "Sunny")
            .append("event_version", &vec!["v2".to_string()])
            .build()
            .unwrap();

        let update = update_expression(&patch);

        assert_eq!(
            update.expression,
            "SET #s0 = :s0, #a0 = list_append(if_not_exists(#a0, :empty), :a0)"
        );
        assert_eq!(
            update.names.get("#a0").map(String::as_str),
            Some("event_version")
        );
        assert_eq!(
            update.values.get(":a0"),
            Some(&DynamoValue::L(vec![DynamoValue::S("v2".to_string())]))
        );
        assert_eq!(update.values.get(":empty"), Some(&DynamoValue::L(Vec::new())));
    }
}
