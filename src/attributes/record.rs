//! Document attribute records.
//!
//! - `PK = {site}/docs#{documentId}`
//! - `SK = attr#{key}#{value}`
//! - `GSI1PK = {site}/docs#attr#{key}`, `GSI1SK = {value}`

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::folders::{format_date, parse_date};
use crate::interfaces::{item_str, AttrValue, Item};
use crate::keys::{
    prefix_key, DbKey, GSI1_PK, GSI1_SK, PK, PREFIX_ATTR, PREFIX_DOCS, SK, TAG_DELIMITER,
};

/// GSI1 sort key of a key-only attribute.
pub const KEY_ONLY_MARKER: &str = "#";

/// Canonical string form of a number: zero padded, four decimals, so that
/// string order matches numeric order for non-negative values.
pub fn format_number(value: f64) -> String {
    format!("{:020.4}", value)
}

/// Kind of value an attribute record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeValueType {
    String,
    Number,
    Boolean,
    KeyOnly,
    CompositeString,
    Classification,
}

impl AttributeValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeValueType::String => "STRING",
            AttributeValueType::Number => "NUMBER",
            AttributeValueType::Boolean => "BOOLEAN",
            AttributeValueType::KeyOnly => "KEY_ONLY",
            AttributeValueType::CompositeString => "COMPOSITE_STRING",
            AttributeValueType::Classification => "CLASSIFICATION",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "STRING" => Some(AttributeValueType::String),
            "NUMBER" => Some(AttributeValueType::Number),
            "BOOLEAN" => Some(AttributeValueType::Boolean),
            "KEY_ONLY" => Some(AttributeValueType::KeyOnly),
            "COMPOSITE_STRING" => Some(AttributeValueType::CompositeString),
            "CLASSIFICATION" => Some(AttributeValueType::Classification),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value of one attribute on one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentAttributeRecord {
    pub key: String,
    pub document_id: String,
    pub value_type: AttributeValueType,
    pub string_value: Option<String>,
    pub number_value: Option<f64>,
    pub boolean_value: Option<bool>,
    pub inserted_date: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
}

impl DocumentAttributeRecord {
    fn with_type(
        key: impl Into<String>,
        document_id: impl Into<String>,
        value_type: AttributeValueType,
    ) -> Self {
        Self {
            key: key.into(),
            document_id: document_id.into(),
            value_type,
            string_value: None,
            number_value: None,
            boolean_value: None,
            inserted_date: None,
            user_id: None,
        }
    }

    pub fn string(
        key: impl Into<String>,
        document_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let mut record = Self::with_type(key, document_id, AttributeValueType::String);
        record.string_value = Some(value.into());
        record
    }

    pub fn number(key: impl Into<String>, document_id: impl Into<String>, value: f64) -> Self {
        let mut record = Self::with_type(key, document_id, AttributeValueType::Number);
        record.number_value = Some(value);
        record
    }

    pub fn boolean(key: impl Into<String>, document_id: impl Into<String>, value: bool) -> Self {
        let mut record = Self::with_type(key, document_id, AttributeValueType::Boolean);
        record.boolean_value = Some(value);
        record
    }

    pub fn key_only(key: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self::with_type(key, document_id, AttributeValueType::KeyOnly)
    }

    pub fn composite(
        key: impl Into<String>,
        document_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let mut record = Self::with_type(key, document_id, AttributeValueType::CompositeString);
        record.string_value = Some(value.into());
        record
    }

    pub fn classification(
        key: impl Into<String>,
        document_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        let mut record = Self::with_type(key, document_id, AttributeValueType::Classification);
        record.string_value = Some(value.into());
        record
    }

    /// The value as it appears in sort keys.
    pub fn index_value(&self) -> Result<String> {
        let value = match self.value_type {
            AttributeValueType::String
            | AttributeValueType::CompositeString
            | AttributeValueType::Classification => self.string_value.clone(),
            AttributeValueType::Number => self.number_value.map(format_number),
            AttributeValueType::Boolean => self.boolean_value.map(|b| b.to_string()),
            AttributeValueType::KeyOnly => Some(KEY_ONLY_MARKER.to_string()),
        };
        value.ok_or_else(|| {
            IndexError::invalid(format!(
                "{} attribute '{}' has no value",
                self.value_type, self.key
            ))
        })
    }

    fn require_ids(&self) -> Result<()> {
        if self.document_id.is_empty() {
            return Err(IndexError::invalid("'documentId' is required"));
        }
        if self.key.is_empty() {
            return Err(IndexError::invalid("'key' is required"));
        }
        Ok(())
    }

    pub fn pk(&self, site: Option<&str>) -> String {
        prefix_key(site, &format!("{}{}", PREFIX_DOCS, self.document_id))
    }

    pub fn sk(&self) -> Result<String> {
        let mut sk = format!("{}{}{}", PREFIX_ATTR, self.key, TAG_DELIMITER);
        if self.value_type != AttributeValueType::KeyOnly {
            sk.push_str(&self.index_value()?);
        }
        Ok(sk)
    }

    pub fn gsi1_pk(&self, site: Option<&str>) -> String {
        attribute_index_partition(site, &self.key)
    }

    pub fn key(&self, site: Option<&str>) -> Result<DbKey> {
        self.require_ids()?;
        Ok(DbKey::new(self.pk(site), self.sk()?))
    }

    pub fn to_item(&self, site: Option<&str>) -> Result<Item> {
        self.require_ids()?;

        let mut item = Item::new();
        item.insert(PK.to_string(), AttrValue::s(self.pk(site)));
        item.insert(SK.to_string(), AttrValue::s(self.sk()?));
        item.insert(GSI1_PK.to_string(), AttrValue::s(self.gsi1_pk(site)));
        item.insert(GSI1_SK.to_string(), AttrValue::s(self.index_value()?));
        item.insert("key".to_string(), AttrValue::s(&self.key));
        item.insert("documentId".to_string(), AttrValue::s(&self.document_id));
        item.insert(
            "valueType".to_string(),
            AttrValue::s(self.value_type.as_str()),
        );

        if let Some(value) = &self.string_value {
            item.insert("stringValue".to_string(), AttrValue::s(value));
        }
        if let Some(value) = self.number_value {
            item.insert("numberValue".to_string(), AttrValue::N(value.to_string()));
        }
        if let Some(value) = self.boolean_value {
            item.insert("booleanValue".to_string(), AttrValue::Bool(value));
        }
        if let Some(date) = &self.inserted_date {
            item.insert("inserteddate".to_string(), AttrValue::s(format_date(date)));
        }
        if let Some(user_id) = &self.user_id {
            item.insert("userId".to_string(), AttrValue::s(user_id));
        }
        Ok(item)
    }

    pub fn from_item(item: &Item) -> Result<Self> {
        let required = |name: &str| {
            item_str(item, name).map(str::to_string).ok_or_else(|| {
                IndexError::IntegrityViolation(format!("attribute record is missing '{}'", name))
            })
        };

        let value_type = required("valueType")?;
        let value_type = AttributeValueType::parse(&value_type).ok_or_else(|| {
            IndexError::IntegrityViolation(format!("unknown attribute value type '{}'", value_type))
        })?;

        let mut record = Self::with_type(required("key")?, required("documentId")?, value_type);
        record.string_value = item_str(item, "stringValue").map(str::to_string);
        record.number_value = item
            .get("numberValue")
            .and_then(AttrValue::as_n)
            .and_then(|n| n.parse().ok());
        record.boolean_value = item.get("booleanValue").and_then(AttrValue::as_bool);
        record.inserted_date = item_str(item, "inserteddate").and_then(parse_date);
        record.user_id = item_str(item, "userId").map(str::to_string);
        Ok(record)
    }
}

/// GSI1 partition holding every value of attribute `key` across documents.
pub fn attribute_index_partition(site: Option<&str>, key: &str) -> String {
    prefix_key(site, &format!("{}{}{}", PREFIX_DOCS, PREFIX_ATTR, key))
}
