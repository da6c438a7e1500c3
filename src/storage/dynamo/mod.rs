//! DynamoDB key store.
//!
//! Table schema:
//! - `PK` (String, partition key), `SK` (String, sort key)
//! - `GSI1`: `GSI1PK` / `GSI1SK`, projection ALL
//! - `GSI2`: `GSI2PK` / `GSI2SK`, projection ALL

mod convert;

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{
    AttributeValue, KeysAndAttributes, Put, PutRequest, ReturnValue,
    ReturnValuesOnConditionCheckFailure, TransactWriteItem, WriteRequest,
};
use aws_sdk_dynamodb::Client;
use tracing::{debug, info};

use crate::config::DynamoConfig;
use crate::interfaces::{
    key_attributes, Item, KeyStore, PutOutcome, QueryPage, QueryRequest, SkCondition,
    StorageError,
};
use crate::keys::{PK, SK};

use super::Result;
use convert::{from_sdk_item, to_sdk, to_sdk_item, SdkItem};

/// Maximum items per BatchWriteItem request.
const BATCH_WRITE_LIMIT: usize = 25;
/// Maximum keys per BatchGetItem request.
const BATCH_GET_LIMIT: usize = 100;

fn backend(operation: &str, err: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(format!("DynamoDB {} failed: {}", operation, err))
}

fn primary_key(pk: &str, sk: &str) -> SdkItem {
    HashMap::from([
        (PK.to_string(), AttributeValue::S(pk.to_string())),
        (SK.to_string(), AttributeValue::S(sk.to_string())),
    ])
}

/// DynamoDB implementation of [`KeyStore`].
#[derive(Clone)]
pub struct DynamoKeyStore {
    client: Client,
    table_name: String,
}

impl std::fmt::Debug for DynamoKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoKeyStore")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl DynamoKeyStore {
    /// Connect using the SDK default credential chain plus configured overrides.
    pub async fn new(config: &DynamoConfig) -> Result<Self> {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);

        if let Some(region) = &config.region {
            builder = builder.region(aws_sdk_dynamodb::config::Region::new(region.clone()));
        }

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(timeout_ms) = config.timeout_ms {
            let timeout_config = aws_config::timeout::TimeoutConfig::builder()
                .operation_timeout(Duration::from_millis(timeout_ms))
                .build();
            builder = builder.timeout_config(timeout_config);
        }

        info!(table = %config.table_name, "Connected to DynamoDB key store");

        Ok(Self {
            client: Client::from_conf(builder.build()),
            table_name: config.table_name.clone(),
        })
    }

    /// Create from a pre-built client.
    pub fn from_client(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn write_batch(&self, requests: Vec<WriteRequest>) -> Result<()> {
        let mut pending = HashMap::from([(self.table_name.clone(), requests)]);

        while !pending.is_empty() {
            let response = self
                .client
                .batch_write_item()
                .set_request_items(Some(pending))
                .send()
                .await
                .map_err(|e| backend("BatchWriteItem", e))?;

            pending = response
                .unprocessed_items()
                .map(|items| {
                    items
                        .iter()
                        .filter(|(_, requests)| !requests.is_empty())
                        .map(|(table, requests)| (table.clone(), requests.clone()))
                        .collect()
                })
                .unwrap_or_default();

            if !pending.is_empty() {
                debug!(table = %self.table_name, "Retrying unprocessed batch writes");
            }
        }

        Ok(())
    }

    async fn get_batch(&self, keys: Vec<SdkItem>) -> Result<Vec<Item>> {
        let mut found = Vec::with_capacity(keys.len());
        let mut pending = Some(
            KeysAndAttributes::builder()
                .set_keys(Some(keys))
                .build()
                .map_err(|e| backend("BatchGetItem", e))?,
        );

        while let Some(request) = pending.take() {
            let response = self
                .client
                .batch_get_item()
                .request_items(&self.table_name, request)
                .send()
                .await
                .map_err(|e| backend("BatchGetItem", e))?;

            if let Some(items) = response
                .responses()
                .and_then(|tables| tables.get(&self.table_name))
            {
                for item in items {
                    found.push(from_sdk_item(item)?);
                }
            }

            pending = response
                .unprocessed_keys()
                .and_then(|tables| tables.get(&self.table_name))
                .filter(|request| !request.keys().is_empty())
                .cloned();
        }

        Ok(found)
    }
}

#[async_trait]
impl KeyStore for DynamoKeyStore {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(primary_key(pk, sk)))
            .send()
            .await
            .map_err(|e| backend("GetItem", e))?;

        response.item().map(from_sdk_item).transpose()
    }

    async fn put(&self, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_sdk_item(item)))
            .send()
            .await
            .map_err(|e| backend("PutItem", e))?;
        Ok(())
    }

    async fn put_if_absent(&self, item: Item) -> Result<PutOutcome> {
        let put = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(to_sdk_item(item)))
            .condition_expression("attribute_not_exists(#pk)")
            .expression_attribute_names("#pk", PK)
            .return_values_on_condition_check_failure(ReturnValuesOnConditionCheckFailure::AllOld)
            .build()
            .map_err(|e| backend("TransactWriteItems", e))?;

        let result = self
            .client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().put(put).build())
            .send()
            .await;

        match result {
            Ok(_) => Ok(PutOutcome::Created),
            Err(SdkError::ServiceError(service_err)) => match service_err.err() {
                TransactWriteItemsError::TransactionCanceledException(cancelled) => {
                    let existing = cancelled
                        .cancellation_reasons()
                        .first()
                        .and_then(|reason| reason.item())
                        .ok_or_else(|| {
                            backend("TransactWriteItems", "cancelled without an existing item")
                        })?;
                    debug!(table = %self.table_name, "Conditional create lost to existing item");
                    Ok(PutOutcome::Exists(from_sdk_item(existing)?))
                }
                other => Err(backend("TransactWriteItems", other)),
            },
            Err(e) => Err(backend("TransactWriteItems", e)),
        }
    }

    async fn put_items(&self, items: Vec<Item>) -> Result<()> {
        let mut requests = Vec::with_capacity(items.len());
        for item in items {
            let put = PutRequest::builder()
                .set_item(Some(to_sdk_item(item)))
                .build()
                .map_err(|e| backend("BatchWriteItem", e))?;
            requests.push(WriteRequest::builder().put_request(put).build());
        }

        let mut chunks = requests.into_iter().peekable();
        while chunks.peek().is_some() {
            let chunk: Vec<WriteRequest> = chunks.by_ref().take(BATCH_WRITE_LIMIT).collect();
            self.write_batch(chunk).await?;
        }

        Ok(())
    }

    async fn delete(&self, pk: &str, sk: &str) -> Result<bool> {
        let response = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(primary_key(pk, sk)))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| backend("DeleteItem", e))?;

        Ok(response.attributes().is_some_and(|a| !a.is_empty()))
    }

    async fn update_values(&self, pk: &str, sk: &str, values: Item) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }

        let mut names = HashMap::new();
        let mut expression_values = HashMap::new();
        let mut assignments = Vec::with_capacity(values.len());
        for (i, (name, value)) in values.into_iter().enumerate() {
            names.insert(format!("#a{}", i), name);
            expression_values.insert(format!(":v{}", i), to_sdk(value));
            assignments.push(format!("#a{i} = :v{i}"));
        }

        self.client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(primary_key(pk, sk)))
            .update_expression(format!("SET {}", assignments.join(", ")))
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(expression_values))
            .send()
            .await
            .map_err(|e| backend("UpdateItem", e))?;

        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryPage> {
        let (pk_name, sk_name) = key_attributes(request.index);

        let mut names = HashMap::from([("#pk".to_string(), pk_name.to_string())]);
        let mut values = HashMap::from([(":pk".to_string(), AttributeValue::S(request.pk))]);
        let mut expression = "#pk = :pk".to_string();

        if let Some(condition) = request.sk {
            names.insert("#sk".to_string(), sk_name.to_string());
            match condition {
                SkCondition::Eq(v) => {
                    expression.push_str(" AND #sk = :sk");
                    values.insert(":sk".to_string(), AttributeValue::S(v));
                }
                SkCondition::BeginsWith(v) => {
                    expression.push_str(" AND begins_with(#sk, :sk)");
                    values.insert(":sk".to_string(), AttributeValue::S(v));
                }
                SkCondition::Between(start, end) => {
                    expression.push_str(" AND #sk BETWEEN :start AND :end");
                    values.insert(":start".to_string(), AttributeValue::S(start));
                    values.insert(":end".to_string(), AttributeValue::S(end));
                }
            }
        }

        let mut builder = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression(expression)
            .set_expression_attribute_names(Some(names))
            .set_expression_attribute_values(Some(values))
            .scan_index_forward(request.scan_forward);

        if let Some(index) = request.index {
            builder = builder.index_name(index.as_str());
        }
        if let Some(limit) = request.limit {
            builder = builder.limit(i32::try_from(limit).unwrap_or(i32::MAX));
        }
        if let Some(start_key) = request.start_key {
            builder = builder.set_exclusive_start_key(Some(to_sdk_item(start_key)));
        }

        let response = builder.send().await.map_err(|e| backend("Query", e))?;

        let items = response
            .items()
            .iter()
            .map(from_sdk_item)
            .collect::<Result<Vec<_>>>()?;
        let last_key = response
            .last_evaluated_key()
            .filter(|key| !key.is_empty())
            .map(from_sdk_item)
            .transpose()?;

        Ok(QueryPage { items, last_key })
    }

    async fn batch_get(&self, keys: Vec<(String, String)>) -> Result<Vec<Item>> {
        // BatchGetItem rejects duplicate keys in one request.
        let mut seen = HashSet::new();
        let keys: Vec<SdkItem> = keys
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .map(|(pk, sk)| primary_key(&pk, &sk))
            .collect();

        let mut found = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(BATCH_GET_LIMIT) {
            found.extend(self.get_batch(chunk.to_vec()).await?);
        }

        Ok(found)
    }
}
