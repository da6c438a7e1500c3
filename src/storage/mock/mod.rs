//! In-memory key store for tests and standalone use.
//!
//! Items are held in an ordered map keyed by `(PK, SK)`. Secondary index
//! queries scan the map and keep only items carrying both key attributes of
//! the index, so GSI1/GSI2 are sparse the way the real store's are.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::interfaces::{
    item_str, key_attributes, AttrValue, Item, KeyStore, PutOutcome, QueryPage, QueryRequest,
    StorageError,
};
use crate::keys::{PK, SK};

use super::Result;

type TableKey = (String, String);

/// Ordering position of an item within a query: index sort key, then the
/// table key as a tie-breaker so equal index sort keys still page stably.
type Position = (String, String, String);

/// Mock key store that keeps items in memory.
#[derive(Default)]
pub struct MockKeyStore {
    items: RwLock<BTreeMap<TableKey, Item>>,
    writes: AtomicUsize,
    fail_on_write: RwLock<bool>,
}

impl MockKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutations applied since creation.
    pub fn write_count(&self) -> usize {
        self.writes.load(AtomicOrdering::SeqCst)
    }

    pub fn reset_write_count(&self) {
        self.writes.store(0, AtomicOrdering::SeqCst);
    }

    /// Make every subsequent mutation fail with a backend error.
    pub async fn set_fail_on_write(&self, fail: bool) {
        *self.fail_on_write.write().await = fail;
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    async fn check_writable(&self) -> Result<()> {
        if *self.fail_on_write.read().await {
            return Err(StorageError::Backend("mock write failure".to_string()));
        }
        Ok(())
    }

    fn record_writes(&self, n: usize) {
        self.writes.fetch_add(n, AtomicOrdering::SeqCst);
    }
}

fn table_key(item: &Item) -> Result<TableKey> {
    let pk = item_str(item, PK).ok_or_else(|| StorageError::MissingAttribute(PK.to_string()))?;
    let sk = item_str(item, SK).ok_or_else(|| StorageError::MissingAttribute(SK.to_string()))?;
    Ok((pk.to_string(), sk.to_string()))
}

fn position(item: &Item, sk_name: &str) -> Result<Position> {
    let index_sk = item_str(item, sk_name)
        .ok_or_else(|| StorageError::MissingAttribute(sk_name.to_string()))?;
    let (pk, sk) = table_key(item)?;
    Ok((index_sk.to_string(), pk, sk))
}

/// Key attributes of an item as seen by the queried projection.
fn key_of(item: &Item, pk_name: &str, sk_name: &str) -> Item {
    [PK, SK, pk_name, sk_name]
        .into_iter()
        .filter_map(|name| item.get(name).map(|v| (name.to_string(), v.clone())))
        .collect()
}

#[async_trait]
impl KeyStore for MockKeyStore {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>> {
        let store = self.items.read().await;
        Ok(store.get(&(pk.to_string(), sk.to_string())).cloned())
    }

    async fn put(&self, item: Item) -> Result<()> {
        self.check_writable().await?;
        let key = table_key(&item)?;
        self.items.write().await.insert(key, item);
        self.record_writes(1);
        Ok(())
    }

    async fn put_if_absent(&self, item: Item) -> Result<PutOutcome> {
        self.check_writable().await?;
        let key = table_key(&item)?;
        let mut store = self.items.write().await;
        if let Some(existing) = store.get(&key) {
            return Ok(PutOutcome::Exists(existing.clone()));
        }
        store.insert(key, item);
        self.record_writes(1);
        Ok(PutOutcome::Created)
    }

    async fn put_items(&self, items: Vec<Item>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.check_writable().await?;
        let keyed = items
            .into_iter()
            .map(|item| table_key(&item).map(|key| (key, item)))
            .collect::<Result<Vec<_>>>()?;

        let count = keyed.len();
        let mut store = self.items.write().await;
        store.extend(keyed);
        self.record_writes(count);
        Ok(())
    }

    async fn delete(&self, pk: &str, sk: &str) -> Result<bool> {
        self.check_writable().await?;
        let removed = self
            .items
            .write()
            .await
            .remove(&(pk.to_string(), sk.to_string()))
            .is_some();
        if removed {
            self.record_writes(1);
        }
        Ok(removed)
    }

    async fn update_values(&self, pk: &str, sk: &str, values: Item) -> Result<()> {
        self.check_writable().await?;
        let mut store = self.items.write().await;
        let item = store
            .entry((pk.to_string(), sk.to_string()))
            .or_insert_with(|| {
                Item::from([
                    (PK.to_string(), AttrValue::s(pk)),
                    (SK.to_string(), AttrValue::s(sk)),
                ])
            });
        item.extend(values);
        self.record_writes(1);
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryPage> {
        let (pk_name, sk_name) = key_attributes(request.index);
        let store = self.items.read().await;

        let mut matches = Vec::new();
        for item in store.values() {
            if item_str(item, pk_name) != Some(request.pk.as_str()) {
                continue;
            }
            let Some(sk) = item_str(item, sk_name) else {
                continue;
            };
            if request.sk.as_ref().map_or(true, |c| c.matches(sk)) {
                matches.push((position(item, sk_name)?, item));
            }
        }

        matches.sort_by(|a, b| a.0.cmp(&b.0));
        if !request.scan_forward {
            matches.reverse();
        }

        if let Some(start_key) = &request.start_key {
            let start = position(start_key, sk_name)?;
            let past = if request.scan_forward {
                Ordering::Greater
            } else {
                Ordering::Less
            };
            matches.retain(|(pos, _)| pos.cmp(&start) == past);
        }

        let limit = request.limit.unwrap_or(usize::MAX);
        let has_more = matches.len() > limit;
        let items: Vec<Item> = matches
            .into_iter()
            .take(limit)
            .map(|(_, item)| item.clone())
            .collect();

        let last_key = if has_more {
            items.last().map(|item| key_of(item, pk_name, sk_name))
        } else {
            None
        };

        Ok(QueryPage { items, last_key })
    }

    async fn batch_get(&self, keys: Vec<(String, String)>) -> Result<Vec<Item>> {
        let store = self.items.read().await;
        let mut found: Vec<Item> = keys
            .into_iter()
            .filter_map(|key| store.get(&key).cloned())
            .collect();
        // The real store makes no ordering promise; reversing keeps callers honest.
        found.reverse();
        Ok(found)
    }
}

#[cfg(test)]
mod tests;
