//! Filter builder.
//!
//! Query predicates are `(field, operator, value)` triples joined with AND.
//! They are validated against the bound [`SchemaDescriptor`] when built, and can
//! then be evaluated against stored items or rendered into the store's native
//! filter syntax.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::attribute::{AttributeValue, Item};
use super::error::{Result, TableError};
use super::schema::{FieldKind, SchemaDescriptor};

/// Supported comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BeginsWith,
    Contains,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::BeginsWith => "begins_with",
            Operator::Contains => "contains",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eq" => Ok(Operator::Eq),
            "ne" => Ok(Operator::Ne),
            "lt" => Ok(Operator::Lt),
            "le" => Ok(Operator::Le),
            "gt" => Ok(Operator::Gt),
            "ge" => Ok(Operator::Ge),
            "begins_with" => Ok(Operator::BeginsWith),
            "contains" => Ok(Operator::Contains),
            other => Err(TableError::schema(format!("unsupported operator '{other}'"))),
        }
    }
}

/// One validated clause of a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: &'static str,
    pub attribute: &'static str,
    pub operator: Operator,
    pub value: AttributeValue,
}

impl Condition {
    /// Evaluates the clause against a stored item. A missing attribute never matches.
    pub fn matches(&self, item: &Item) -> bool {
        let Some(actual) = item.get(self.attribute) else {
            return false;
        };

        match self.operator {
            Operator::Eq => actual == &self.value,
            Operator::Ne => actual != &self.value,
            Operator::Lt => actual.compare(&self.value) == Some(Ordering::Less),
            Operator::Le => matches!(
                actual.compare(&self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Gt => actual.compare(&self.value) == Some(Ordering::Greater),
            Operator::Ge => matches!(
                actual.compare(&self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::BeginsWith => match (actual, &self.value) {
                (AttributeValue::S(actual), AttributeValue::S(prefix)) => {
                    actual.starts_with(prefix.as_str())
                }
                _ => false,
            },
            Operator::Contains => actual.contains(&self.value),
        }
    }
}

/// A filter expression in the store's native syntax, with its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFilter {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

/// A validated conjunction of conditions bound to one table.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    table_name: String,
    conditions: Vec<Condition>,
}

impl FilterExpression {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// True when the item satisfies every condition.
    pub fn matches(&self, item: &Item) -> bool {
        self.conditions.iter().all(|c| c.matches(item))
    }

    /// Renders `#n0 = :v0 AND begins_with(#n1, :v1)` style syntax.
    ///
    /// Every attribute name goes through a placeholder so reserved words are
    /// never an issue.
    pub fn render(&self) -> RenderedFilter {
        let mut names = HashMap::new();
        let mut values = HashMap::new();
        let mut clauses = Vec::with_capacity(self.conditions.len());

        for (index, condition) in self.conditions.iter().enumerate() {
            let name = format!("#n{index}");
            let value = format!(":v{index}");
            let clause = match condition.operator {
                Operator::Eq => format!("{name} = {value}"),
                Operator::Ne => format!("{name} <> {value}"),
                Operator::Lt => format!("{name} < {value}"),
                Operator::Le => format!("{name} <= {value}"),
                Operator::Gt => format!("{name} > {value}"),
                Operator::Ge => format!("{name} >= {value}"),
                Operator::BeginsWith => format!("begins_with({name}, {value})"),
                Operator::Contains => format!("contains({name}, {value})"),
            };
            clauses.push(clause);
            names.insert(name, condition.attribute.to_string());
            values.insert(value, condition.value.clone());
        }

        RenderedFilter {
            expression: clauses.join(" AND "),
            names,
            values,
        }
    }
}

/// Builds a [`FilterExpression`] for one table.
///
/// The first invalid clause is remembered and reported by [`build`](Self::build).
pub struct FilterBuilder<'a> {
    schema: &'a SchemaDescriptor,
    conditions: Vec<Condition>,
    error: Option<TableError>,
}

impl<'a> FilterBuilder<'a> {
    pub fn new(schema: &'a SchemaDescriptor) -> Self {
        Self {
            schema,
            conditions: Vec::new(),
            error: None,
        }
    }

    /// Adds `field <operator> value`.
    pub fn condition(
        mut self,
        field: &str,
        operator: Operator,
        value: impl Into<AttributeValue>,
    ) -> Self {
        if self.error.is_none() {
            match self.validate(field, operator, value.into()) {
                Ok(condition) => self.conditions.push(condition),
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    /// Adds a condition whose operator is given by name (`"eq"`, `"begins_with"`, ...).
    pub fn condition_named(
        mut self,
        field: &str,
        operator: &str,
        value: impl Into<AttributeValue>,
    ) -> Self {
        match operator.parse() {
            Ok(operator) => self.condition(field, operator, value),
            Err(err) => {
                self.error.get_or_insert(err);
                self
            }
        }
    }

    pub fn eq(self, field: &str, value: impl Into<AttributeValue>) -> Self {
        self.condition(field, Operator::Eq, value)
    }

    pub fn build(self) -> Result<FilterExpression> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(FilterExpression {
                table_name: self.schema.table_name().to_string(),
                conditions: self.conditions,
            }),
        }
    }

    fn validate(&self, name: &str, operator: Operator, value: AttributeValue) -> Result<Condition> {
        let table = self.schema.table_name();
        let field = self.schema.require_field(name)?;

        // Queries are already scoped by key; the store only filters non-key attributes.
        if field.is_key() {
            return Err(TableError::schema(format!(
                "{table}: cannot filter on key field '{name}'"
            )));
        }

        let compatible = match operator {
            Operator::Eq | Operator::Ne => field.kind.accepts(&value),
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => {
                !matches!(field.kind, FieldKind::Boolean | FieldKind::StringList)
                    && field.kind.accepts(&value)
            }
            Operator::BeginsWith => {
                matches!(field.kind, FieldKind::String | FieldKind::DateTime)
                    && matches!(value, AttributeValue::S(_))
            }
            Operator::Contains => {
                matches!(field.kind, FieldKind::String | FieldKind::StringList)
                    && matches!(value, AttributeValue::S(_))
            }
        };

        if !compatible {
            return Err(TableError::schema(format!(
                "{table}: '{operator}' on {} field '{name}' cannot take a {} value",
                field.kind.name(),
                value.type_name()
            )));
        }

        // Prefixes stay as written; whole values take their stored form.
        let value = match operator {
            Operator::BeginsWith | Operator::Contains => value,
            _ => field.kind.normalize(value),
        };

        Ok(Condition {
            field: field.name,
            attribute: field.attribute(),
            operator,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::FieldDef;

    const CHECKIN: &[FieldDef] = &[
        FieldDef::partition("phone"),
        FieldDef::sort("event_code"),
        FieldDef::optional("name", FieldKind::String),
        FieldDef::required("checked_at", FieldKind::DateTime),
        FieldDef::required("event_version", FieldKind::String),
        FieldDef::optional("tags", FieldKind::StringList),
    ];

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new("dev-event-checkin", CHECKIN).unwrap()
    }

    fn item(pairs: &[(&str, AttributeValue)]) -> Item {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_operator_from_str() {
        assert_eq!("eq".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!("begins_with".parse::<Operator>().unwrap(), Operator::BeginsWith);
        assert!(matches!(
            "like".parse::<Operator>(),
            Err(TableError::Schema(_))
        ));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let schema = schema();
        let err = FilterBuilder::new(&schema)
            .eq("color", "red")
            .build()
            .unwrap_err();
        assert!(matches!(err, TableError::Schema(_)));
    }

    #[test]
    fn test_unknown_operator_name_is_rejected() {
        let schema = schema();
        let result = FilterBuilder::new(&schema)
            .condition_named("event_version", "like", "v1")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_key_field_is_rejected() {
        let schema = schema();
        assert!(FilterBuilder::new(&schema).eq("event_code", "E1").build().is_err());
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let schema = schema();
        assert!(FilterBuilder::new(&schema)
            .eq("event_version", 1i64)
            .build()
            .is_err());
        assert!(FilterBuilder::new(&schema)
            .condition("checked_at", Operator::Gt, "not a date")
            .build()
            .is_err());
        assert!(FilterBuilder::new(&schema)
            .condition("tags", Operator::Lt, "v1")
            .build()
            .is_err());
    }

    #[test]
    fn test_first_error_wins() {
        let schema = schema();
        let err = FilterBuilder::new(&schema)
            .eq("color", "red")
            .condition_named("event_version", "like", "v1")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("color"));
    }

    #[test]
    fn test_matches_is_conjunctive() {
        let schema = schema();
        let filter = FilterBuilder::new(&schema)
            .eq("event_version", "v1")
            .condition("name", Operator::BeginsWith, "Ki")
            .build()
            .unwrap();

        let kim = item(&[
            ("event_version", "v1".into()),
            ("name", "Kim".into()),
        ]);
        let lee = item(&[
            ("event_version", "v1".into()),
            ("name", "Lee".into()),
        ]);
        let old = item(&[
            ("event_version", "v0".into()),
            ("name", "Kim".into()),
        ]);

        assert!(filter.matches(&kim));
        assert!(!filter.matches(&lee));
        assert!(!filter.matches(&old));
    }

    #[test]
    fn test_missing_attribute_never_matches() {
        let schema = schema();
        let filter = FilterBuilder::new(&schema)
            .condition("name", Operator::Ne, "Kim")
            .build()
            .unwrap();
        assert!(!filter.matches(&item(&[("event_version", "v1".into())])));
    }

    #[test]
    fn test_range_and_contains() {
        let schema = schema();
        let filter = FilterBuilder::new(&schema)
            .condition("checked_at", Operator::Ge, "2024-06-01T00:00:00+00:00")
            .condition("tags", Operator::Contains, "vip")
            .build()
            .unwrap();

        let hit = item(&[
            ("checked_at", "2024-06-15T09:00:00+00:00".into()),
            ("tags", AttributeValue::L(vec!["vip".into()])),
        ]);
        let early = item(&[
            ("checked_at", "2024-05-15T09:00:00+00:00".into()),
            ("tags", AttributeValue::L(vec!["vip".into()])),
        ]);

        assert!(filter.matches(&hit));
        assert!(!filter.matches(&early));
    }

    #[test]
    fn test_datetime_values_compare_as_instants() {
        let schema = schema();
        let stored = item(&[("checked_at", "2024-06-15T10:30:00+00:00".into())]);

        let since = FilterBuilder::new(&schema)
            .condition("checked_at", Operator::Ge, "2024-06-15T19:00:00+09:00")
            .build()
            .unwrap();
        assert!(since.matches(&stored));

        let same = FilterBuilder::new(&schema)
            .eq("checked_at", "2024-06-15T19:30:00+09:00")
            .build()
            .unwrap();
        assert!(same.matches(&stored));
        assert_eq!(
            same.conditions()[0].value,
            AttributeValue::from("2024-06-15T10:30:00+00:00")
        );

        let later = FilterBuilder::new(&schema)
            .condition("checked_at", Operator::Gt, "2024-06-15T19:31:00+09:00")
            .build()
            .unwrap();
        assert!(!later.matches(&stored));
    }

    #[test]
    fn test_datetime_prefix_is_kept() {
        let schema = schema();
        let filter = FilterBuilder::new(&schema)
            .condition("checked_at", Operator::BeginsWith, "2024-06-15")
            .build()
            .unwrap();
        assert_eq!(filter.conditions()[0].value, AttributeValue::from("2024-06-15"));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let schema = schema();
        let filter = FilterBuilder::new(&schema).build().unwrap();
        assert!(filter.is_empty());
        assert!(filter.matches(&Item::new()));
        assert_eq!(filter.table_name(), "dev-event-checkin");
    }

    #[test]
    fn test_render() {
        let schema = schema();
        let rendered = FilterBuilder::new(&schema)
            .eq("event_version", "v1")
            .condition("name", Operator::BeginsWith, "K")
            .build()
            .unwrap()
            .render();

        assert_eq!(rendered.expression, "#n0 = :v0 AND begins_with(#n1, :v1)");
        assert_eq!(rendered.names.get("#n0").map(String::as_str), Some("event_version"));
        assert_eq!(rendered.names.get("#n1").map(String::as_str), Some("name"));
        assert_eq!(rendered.values.get(":v0"), Some(&AttributeValue::from("v1")));
    }
}
