//! Table deployment operations (Imperative Shell).

use super::client;
use super::config::{self, AttributeType, TableConfig};
use super::error::{DynamodbError, Result};
use super::planning::{DeployPlan, DestroyPlan, TablePlan, TableStatus};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
};
use aws_sdk_dynamodb::Client;
use std::time::Duration;

/// Execute a deploy plan. Tables already in place are left alone.
pub async fn execute_deploy_plan(client: &Client, plan: &DeployPlan) -> Result<()> {
    for table in &plan.tables {
        if let TablePlan::CreateTable { config } = table {
            create_table(client, config).await?;
            wait_for_table_active(client, &config.table_name).await?;
        }
    }
    Ok(())
}

/// Execute destroy plans.
pub async fn execute_destroy_plan(client: &Client, plans: &[DestroyPlan]) -> Result<()> {
    for plan in plans {
        if let DestroyPlan::DeleteTable { table_name } = plan {
            delete_table(client, table_name).await?;
        }
    }
    Ok(())
}

fn key_element(name: &str, key_type: KeyType) -> Result<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(|e| DynamodbError::AwsSdk(e.to_string()))
}

fn attribute_definition(name: &str, attribute_type: AttributeType) -> Result<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(to_scalar_type(attribute_type))
        .build()
        .map_err(|e| DynamodbError::AwsSdk(e.to_string()))
}

async fn create_table(client: &Client, config: &TableConfig) -> Result<()> {
    let mut key_schema = vec![key_element(&config.partition_key.name, KeyType::Hash)?];
    let mut attribute_definitions = vec![attribute_definition(
        &config.partition_key.name,
        config.partition_key.attribute_type,
    )?];

    if let Some(sk) = &config.sort_key {
        key_schema.push(key_element(&sk.name, KeyType::Range)?);
        attribute_definitions.push(attribute_definition(&sk.name, sk.attribute_type)?);
    }

    client
        .create_table()
        .table_name(&config.table_name)
        .set_key_schema(Some(key_schema))
        .set_attribute_definitions(Some(attribute_definitions))
        .billing_mode(to_billing_mode(config.billing_mode))
        .send()
        .await
        .map_err(|e| DynamodbError::AwsSdk(e.to_string()))?;
    Ok(())
}

async fn delete_table(client: &Client, table_name: &str) -> Result<()> {
    client
        .delete_table()
        .table_name(table_name)
        .send()
        .await
        .map_err(|e| DynamodbError::AwsSdk(e.to_string()))?;
    Ok(())
}

async fn wait_for_table_active(client: &Client, table_name: &str) -> Result<()> {
    let max_attempts = 60;
    let delay = Duration::from_secs(2);

    for _ in 0..max_attempts {
        if let Some(state) = client::get_table_state(client, table_name).await? {
            if state.status == TableStatus::Active {
                return Ok(());
            }
        }
        tokio::time::sleep(delay).await;
    }

    Err(DynamodbError::TableActivationTimeout {
        table_name: table_name.to_string(),
    })
}

fn to_scalar_type(attr_type: AttributeType) -> ScalarAttributeType {
    match attr_type {
        AttributeType::String => ScalarAttributeType::S,
    }
}

fn to_billing_mode(mode: config::BillingMode) -> BillingMode {
    match mode {
        config::BillingMode::PayPerRequest => BillingMode::PayPerRequest,
    }
}
