//! Attribute definitions and their lookup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::interfaces::{item_str, AttrValue, Item, KeyStore};
use crate::keys::{attribute_definition_key, PK, SK};

/// Declared data type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeDataType {
    String,
    Number,
    Boolean,
    KeyOnly,
}

impl AttributeDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeDataType::String => "STRING",
            AttributeDataType::Number => "NUMBER",
            AttributeDataType::Boolean => "BOOLEAN",
            AttributeDataType::KeyOnly => "KEY_ONLY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "STRING" => Some(AttributeDataType::String),
            "NUMBER" => Some(AttributeDataType::Number),
            "BOOLEAN" => Some(AttributeDataType::Boolean),
            "KEY_ONLY" => Some(AttributeDataType::KeyOnly),
            _ => None,
        }
    }
}

/// A site's declaration of an attribute key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub key: String,
    pub data_type: AttributeDataType,
}

impl AttributeDefinition {
    pub fn new(key: impl Into<String>, data_type: AttributeDataType) -> Self {
        Self {
            key: key.into(),
            data_type,
        }
    }

    pub fn to_item(&self, site: Option<&str>) -> Result<Item> {
        if self.key.is_empty() {
            return Err(IndexError::invalid("'key' is required"));
        }
        let mut item = attribute_definition_key(site, &self.key).attributes();
        item.insert("key".to_string(), AttrValue::s(&self.key));
        item.insert("dataType".to_string(), AttrValue::s(self.data_type.as_str()));
        Ok(item)
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        let key = item_str(item, "key").ok_or_else(|| {
            IndexError::IntegrityViolation("attribute definition is missing 'key'".to_string())
        })?;
        let data_type = item_str(item, "dataType")
            .and_then(AttributeDataType::parse)
            .ok_or_else(|| {
                IndexError::IntegrityViolation(format!(
                    "attribute definition '{}' has no valid data type",
                    key
                ))
            })?;
        Ok(Self::new(key, data_type))
    }
}

/// Source of attribute definitions.
#[async_trait]
pub trait AttributeCatalog: Send + Sync {
    /// Definitions for `keys`, positionally: `None` where a key is unknown.
    async fn definitions(
        &self,
        site: Option<&str>,
        keys: &[String],
    ) -> Result<Vec<Option<AttributeDefinition>>>;
}

/// Catalog reading definitions from the key store.
pub struct KeyStoreAttributeCatalog {
    store: Arc<dyn KeyStore>,
}

impl KeyStoreAttributeCatalog {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self { store }
    }

    /// Store a definition.
    pub async fn put(&self, site: Option<&str>, definition: &AttributeDefinition) -> Result<()> {
        self.store.put(definition.to_item(site)?).await?;
        Ok(())
    }
}

#[async_trait]
impl AttributeCatalog for KeyStoreAttributeCatalog {
    async fn definitions(
        &self,
        site: Option<&str>,
        keys: &[String],
    ) -> Result<Vec<Option<AttributeDefinition>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let requested: Vec<(String, String)> = keys
            .iter()
            .map(|key| {
                let db_key = attribute_definition_key(site, key);
                let sk = db_key.sort_key()?.to_string();
                Ok((db_key.pk, sk))
            })
            .collect::<Result<_>>()?;

        // Batch reads come back unordered.
        let mut found: HashMap<(String, String), Item> = HashMap::new();
        for item in self.store.batch_get(requested.clone()).await? {
            if let (Some(pk), Some(sk)) = (item_str(&item, PK), item_str(&item, SK)) {
                found.insert((pk.to_string(), sk.to_string()), item);
            }
        }

        requested
            .iter()
            .map(|key| {
                found
                    .get(key)
                    .map(AttributeDefinition::from_item)
                    .transpose()
            })
            .collect()
    }
}
