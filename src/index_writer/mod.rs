//! Global index writer.
//!
//! Maintains the site-wide list of tag keys in use (`global#tags#`). Writes
//! are idempotent; a per-process [`RecencyCache`] only saves store traffic.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::IndexLimits;
use crate::error::Result;
use crate::interfaces::{item_str, AttrValue, Item, KeyStore};
use crate::keys::{global_tag_key, DEFAULT_SITE_ID, PK, SK};

/// Bounded FIFO memory of keys written recently, kept separately per site.
///
/// Tag keys are held lowercased, matching how they are stored.
#[derive(Debug)]
pub struct RecencyCache {
    capacity: usize,
    sites: HashMap<String, VecDeque<String>>,
}

impl RecencyCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sites: HashMap::new(),
        }
    }

    pub fn from_limits(limits: &IndexLimits) -> Self {
        Self::new(limits.recency_cache_capacity)
    }

    fn site_key(site: Option<&str>) -> &str {
        site.unwrap_or(DEFAULT_SITE_ID)
    }

    pub fn contains(&self, site: Option<&str>, key: &str) -> bool {
        self.sites
            .get(Self::site_key(site))
            .is_some_and(|keys| keys.iter().any(|k| k == key))
    }

    /// Remember `key`, evicting the oldest entry of the site when full.
    pub fn insert(&mut self, site: Option<&str>, key: &str) {
        if self.capacity == 0 || self.contains(site, key) {
            return;
        }
        let keys = self
            .sites
            .entry(Self::site_key(site).to_string())
            .or_default();
        if keys.len() >= self.capacity {
            keys.pop_front();
        }
        keys.push_back(key.to_string());
    }

    pub fn len(&self, site: Option<&str>) -> usize {
        self.sites
            .get(Self::site_key(site))
            .map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, site: Option<&str>) -> bool {
        self.len(site) == 0
    }
}

/// Writer for site-wide index records.
pub struct GlobalIndexWriter {
    store: Arc<dyn KeyStore>,
    cache: Mutex<RecencyCache>,
}

impl GlobalIndexWriter {
    pub fn new(store: Arc<dyn KeyStore>, cache: RecencyCache) -> Self {
        Self {
            store,
            cache: Mutex::new(cache),
        }
    }

    /// Record that `tag_keys` are in use on `site`.
    ///
    /// Keys seen recently are skipped; the rest are written unless already
    /// stored. Returns how many records were written.
    pub async fn write_tag_index(
        &self,
        site: Option<&str>,
        tag_keys: &[String],
    ) -> Result<usize> {
        let candidates: Vec<(&String, String)> = {
            let cache = self.cache.lock().await;
            let mut seen = HashSet::new();
            tag_keys
                .iter()
                .filter(|key| !key.is_empty())
                .map(|key| (key, key.to_lowercase()))
                .filter(|(_, lower)| seen.insert(lower.clone()))
                .filter(|(_, lower)| !cache.contains(site, lower))
                .collect()
        };
        if candidates.is_empty() {
            return Ok(0);
        }

        let mut records: Vec<((String, String), Item)> = Vec::with_capacity(candidates.len());
        for (tag_key, _) in &candidates {
            let db_key = global_tag_key(site, tag_key);
            let mut item = db_key.attributes();
            item.insert("tagKey".to_string(), AttrValue::s(tag_key.as_str()));
            records.push(((db_key.pk.clone(), db_key.sort_key()?.to_string()), item));
        }

        let keys = records.iter().map(|(key, _)| key.clone()).collect();
        let existing: HashSet<(String, String)> = self
            .store
            .batch_get(keys)
            .await?
            .iter()
            .filter_map(|item| {
                let pk = item_str(item, PK)?;
                let sk = item_str(item, SK)?;
                Some((pk.to_string(), sk.to_string()))
            })
            .collect();

        let missing: Vec<Item> = records
            .into_iter()
            .filter(|(key, _)| !existing.contains(key))
            .map(|(_, item)| item)
            .collect();
        let written = missing.len();

        if written > 0 {
            self.store.put_items(missing).await?;
            info!(site = ?site, count = written, "Wrote global tag index");
        } else {
            debug!(site = ?site, "Global tag index already up to date");
        }

        let mut cache = self.cache.lock().await;
        for (_, lower) in &candidates {
            cache.insert(site, lower);
        }
        Ok(written)
    }
}
