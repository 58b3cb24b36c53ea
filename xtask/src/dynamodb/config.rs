//! Table configuration types (Functional Core - pure data).

use checkin_core::event::{Event, EventCheckIn, EventOrganization, EventRegistration, TableNames};
use checkin_core::storage::{
    Record, SchemaDescriptor, TableError, PARTITION_KEY_ATTRIBUTE, SORT_KEY_ATTRIBUTE,
};

/// Table schema configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub table_name: String,
    pub partition_key: KeyAttribute,
    pub sort_key: Option<KeyAttribute>,
    pub billing_mode: BillingMode,
}

/// A key attribute definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAttribute {
    pub name: String,
    pub attribute_type: AttributeType,
}

impl KeyAttribute {
    fn string(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attribute_type: AttributeType::String,
        }
    }
}

/// DynamoDB attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
}

/// Billing mode for the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingMode {
    PayPerRequest,
}

impl TableConfig {
    /// Key layout every table client expects for `schema`.
    pub fn from_schema(schema: &SchemaDescriptor) -> Self {
        Self {
            table_name: schema.table_name().to_string(),
            partition_key: KeyAttribute::string(PARTITION_KEY_ATTRIBUTE),
            sort_key: schema
                .has_sort_key()
                .then(|| KeyAttribute::string(SORT_KEY_ATTRIBUTE)),
            billing_mode: BillingMode::PayPerRequest,
        }
    }
}

fn config_for<R: Record>(table_name: String) -> Result<TableConfig, TableError> {
    Ok(TableConfig::from_schema(&SchemaDescriptor::for_record::<R>(
        table_name,
    )?))
}

/// Returns the table configurations for one environment.
/// This is a pure function - no I/O.
pub fn checkin_table_configs(env: &str) -> Result<Vec<TableConfig>, TableError> {
    let tables = TableNames::for_env(env);
    Ok(vec![
        config_for::<Event>(tables.event)?,
        config_for::<EventCheckIn>(tables.check_in)?,
        config_for::<EventRegistration>(tables.registration)?,
        config_for::<EventOrganization>(tables.organization)?,
    ])
}
