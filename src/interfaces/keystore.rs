//! Key-value store interface.
//!
//! The index layer is written against this trait only. It models the subset of
//! a partitioned key-value database the layer relies on: point reads and writes
//! by `(PK, SK)`, an insert-if-absent that hands back the existing item when it
//! loses, single-partition range queries on the table or a secondary index, and
//! batch reads/writes.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::keys::{GSI1, GSI1_PK, GSI1_SK, GSI2, GSI2_PK, GSI2_SK, PK, SK};

/// Result type for key store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by a key store backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Item is missing key attribute '{0}'")]
    MissingAttribute(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

/// A single stored attribute value.
///
/// Serializes in the store's tagged JSON shape (`{"S": "..."}`), which is
/// also the shape pagination tokens carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    S(String),
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    L(Vec<AttrValue>),
    M(HashMap<String, AttrValue>),
    #[serde(rename = "NULL")]
    Null(bool),
}

impl AttrValue {
    pub fn s(value: impl Into<String>) -> Self {
        AttrValue::S(value.into())
    }

    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttrValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            AttrValue::N(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// A stored item: attribute name to value.
pub type Item = HashMap<String, AttrValue>;

/// Read a string attribute from an item.
pub fn item_str<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    item.get(name).and_then(AttrValue::as_s)
}

/// Which projection a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexName {
    Gsi1,
    Gsi2,
}

impl IndexName {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexName::Gsi1 => GSI1,
            IndexName::Gsi2 => GSI2,
        }
    }

    /// Partition and sort key attribute names of this index.
    pub fn key_attributes(&self) -> (&'static str, &'static str) {
        match self {
            IndexName::Gsi1 => (GSI1_PK, GSI1_SK),
            IndexName::Gsi2 => (GSI2_PK, GSI2_SK),
        }
    }
}

/// Partition and sort key attribute names for a query target.
pub fn key_attributes(index: Option<IndexName>) -> (&'static str, &'static str) {
    match index {
        Some(index) => index.key_attributes(),
        None => (PK, SK),
    }
}

/// Sort key condition of a range query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkCondition {
    Eq(String),
    BeginsWith(String),
    Between(String, String),
}

impl SkCondition {
    pub fn matches(&self, sk: &str) -> bool {
        match self {
            SkCondition::Eq(v) => sk == v,
            SkCondition::BeginsWith(prefix) => sk.starts_with(prefix.as_str()),
            SkCondition::Between(start, end) => sk >= start.as_str() && sk <= end.as_str(),
        }
    }
}

/// A single-partition range query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub index: Option<IndexName>,
    pub pk: String,
    pub sk: Option<SkCondition>,
    pub scan_forward: bool,
    pub limit: Option<usize>,
    /// Resume point: the key attributes of the last item of the previous page.
    pub start_key: Option<Item>,
}

impl QueryRequest {
    pub fn new(pk: impl Into<String>) -> Self {
        Self {
            index: None,
            pk: pk.into(),
            sk: None,
            scan_forward: true,
            limit: None,
            start_key: None,
        }
    }

    pub fn index(mut self, index: IndexName) -> Self {
        self.index = Some(index);
        self
    }

    pub fn sk(mut self, condition: SkCondition) -> Self {
        self.sk = Some(condition);
        self
    }

    pub fn descending(mut self) -> Self {
        self.scan_forward = false;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_key(mut self, start_key: Option<Item>) -> Self {
        self.start_key = start_key;
        self
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub items: Vec<Item>,
    /// Key attributes of the last returned item when more may follow.
    pub last_key: Option<Item>,
}

/// Outcome of an insert-if-absent.
#[derive(Debug, Clone, PartialEq)]
pub enum PutOutcome {
    /// The item did not exist and was written.
    Created,
    /// The key was already taken; carries the item that won.
    Exists(Item),
}

/// Interface for the backing key-value store.
///
/// Implementations:
/// - `MockKeyStore`: in-memory store for tests and standalone use
/// - `DynamoKeyStore`: Amazon DynamoDB (feature `dynamo`)
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Point read by primary key.
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>>;

    /// Unconditional write. Replaces any item with the same key.
    async fn put(&self, item: Item) -> Result<()>;

    /// Write only if no item with the same `PK`/`SK` exists.
    ///
    /// On conflict the existing item is returned from the same request.
    async fn put_if_absent(&self, item: Item) -> Result<PutOutcome>;

    /// Write several items. Not atomic across items.
    async fn put_items(&self, items: Vec<Item>) -> Result<()>;

    /// Delete by primary key. Returns whether an item was removed.
    async fn delete(&self, pk: &str, sk: &str) -> Result<bool>;

    /// Set the given attributes on an existing item, creating it if absent.
    async fn update_values(&self, pk: &str, sk: &str, values: Item) -> Result<()>;

    /// Range query within one partition of the table or a secondary index.
    async fn query(&self, request: QueryRequest) -> Result<QueryPage>;

    /// Batch read by primary keys. Results come back in no particular order;
    /// missing keys are omitted.
    async fn batch_get(&self, keys: Vec<(String, String)>) -> Result<Vec<Item>>;
}
