//! DynamoDB storage backend.
//!
//! Implements `StorageBackend` from `checkin_core::storage` with
//! `aws-sdk-dynamodb`. Every table shares the key schema
//! `partition_key` (HASH) and, where declared, `sort_key` (RANGE).

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue as DynamoValue, PutRequest, ReturnValue, WriteRequest};
use aws_sdk_dynamodb::Client;

use checkin_core::storage::{
    FilterExpression, Item, Patch, StorageBackend, StoreError, StoreResult,
    PARTITION_KEY_ATTRIBUTE,
};

use super::conversions::{item_from_dynamo, item_to_dynamo, to_dynamo, update_expression};
use super::error::map_sdk_error;

/// DynamoDB-based storage backend.
///
/// Reads are strongly consistent so a read following a write sees it.
#[derive(Debug, Clone)]
pub struct DynamoDbBackend {
    client: Client,
}

impl DynamoDbBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Creates a backend for `region`, optionally against a local endpoint.
    ///
    /// Credentials come from the AWS SDK default chain.
    pub async fn connect(region: &str, endpoint_url: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()));

        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config))
    }
}

#[async_trait]
impl StorageBackend for DynamoDbBackend {
    async fn get_item(&self, table: &str, key: Item) -> StoreResult<Option<Item>> {
        let result = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(item_to_dynamo(&key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "GetItem"))?;

        result.item.as_ref().map(item_from_dynamo).transpose()
    }

    async fn put_item(&self, table: &str, item: Item) -> StoreResult<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item_to_dynamo(&item)))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "PutItem"))?;

        Ok(())
    }

    async fn update_item(
        &self,
        table: &str,
        key: Item,
        patch: &Patch,
    ) -> StoreResult<Option<Item>> {
        let update = update_expression(patch);
        let mut names = update.names;
        names.insert("#pk".to_string(), PARTITION_KEY_ATTRIBUTE.to_string());

        let mut request = self
            .client
            .update_item()
            .table_name(table)
            .set_key(Some(item_to_dynamo(&key)))
            .update_expression(update.expression)
            // Merge-update only; never create the item.
            .condition_expression("attribute_exists(#pk)")
            .set_expression_attribute_names(Some(names))
            .return_values(ReturnValue::AllNew);
        if !update.values.is_empty() {
            request = request.set_expression_attribute_values(Some(update.values));
        }

        match request.send().await {
            Ok(output) => match output.attributes {
                Some(attributes) => item_from_dynamo(&attributes).map(Some),
                None => Err(StoreError::Permanent(
                    "UpdateItem returned no attributes".to_string(),
                )),
            },
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(map_sdk_error(err, "UpdateItem")),
        }
    }

    async fn delete_item(&self, table: &str, key: Item) -> StoreResult<()> {
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(item_to_dynamo(&key)))
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "DeleteItem"))?;

        Ok(())
    }

    async fn query(
        &self,
        table: &str,
        partition: &str,
        filter: Option<&FilterExpression>,
    ) -> StoreResult<Vec<Item>> {
        let rendered = filter.filter(|f| !f.is_empty()).map(FilterExpression::render);
        let mut items = Vec::new();
        let mut start_key = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(table)
                .consistent_read(true)
                .key_condition_expression("#pk = :pk")
                .expression_attribute_names("#pk", PARTITION_KEY_ATTRIBUTE)
                .expression_attribute_values(":pk", DynamoValue::S(partition.to_string()))
                .set_exclusive_start_key(start_key.take());

            if let Some(rendered) = &rendered {
                request = request.filter_expression(&rendered.expression);
                for (placeholder, attribute) in &rendered.names {
                    request = request.expression_attribute_names(placeholder, attribute);
                }
                for (placeholder, value) in &rendered.values {
                    request = request.expression_attribute_values(placeholder, to_dynamo(value));
                }
            }

            let output = request
                .send()
                .await
                .map_err(|e| map_sdk_error(e, "Query"))?;

            for item in output.items.unwrap_or_default() {
                items.push(item_from_dynamo(&item)?);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }

    async fn batch_write(&self, table: &str, items: Vec<Item>) -> StoreResult<Vec<Item>> {
        let write_requests = items
            .iter()
            .map(|item| {
                let put = PutRequest::builder()
                    .set_item(Some(item_to_dynamo(item)))
                    .build()
                    .map_err(|e| StoreError::Permanent(format!("Invalid put request: {e}")))?;
                Ok(WriteRequest::builder().put_request(put).build())
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let output = self
            .client
            .batch_write_item()
            .request_items(table, write_requests)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "BatchWriteItem"))?;

        let mut unprocessed = Vec::new();
        if let Some(mut tables) = output.unprocessed_items {
            for request in tables.remove(table).unwrap_or_default() {
                if let Some(put) = request.put_request {
                    unprocessed.push(item_from_dynamo(&put.item)?);
                }
            }
        }
        Ok(unprocessed)
    }

    fn filters_server_side(&self) -> bool {
        true
    }
}
