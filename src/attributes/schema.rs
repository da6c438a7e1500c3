use serde::{Deserialize, Serialize};

use crate::keys::COMPOSITE_KEY_DELIMITER;

/// Attribute layout a site or classification imposes on its documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Schema {
    pub composite_keys: Vec<CompositeKeySpec>,
    pub required: Vec<RequiredAttribute>,
}

impl Schema {
    pub fn with_composite_key<I, S>(mut self, attribute_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.composite_keys.push(CompositeKeySpec::new(attribute_keys));
        self
    }

    pub fn with_required(mut self, required: RequiredAttribute) -> Self {
        self.required.push(required);
        self
    }

    /// Composite key covering exactly `keys`, in any order.
    pub fn find_composite_key(&self, keys: &[&str]) -> Option<&CompositeKeySpec> {
        self.composite_keys.iter().find(|spec| {
            spec.attribute_keys.len() == keys.len()
                && keys
                    .iter()
                    .all(|k| spec.attribute_keys.iter().any(|a| a == k))
        })
    }
}

/// An ordered list of attribute names indexed together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompositeKeySpec {
    pub attribute_keys: Vec<String>,
}

impl CompositeKeySpec {
    pub fn new<I, S>(attribute_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attribute_keys: attribute_keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Attribute names joined with the composite delimiter.
    pub fn key(&self) -> String {
        self.attribute_keys.join(COMPOSITE_KEY_DELIMITER)
    }
}

/// A required attribute and the defaults applied when a document lacks it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequiredAttribute {
    pub attribute_key: String,
    pub default_value: Option<String>,
    pub default_values: Vec<String>,
}

impl RequiredAttribute {
    pub fn new(attribute_key: impl Into<String>) -> Self {
        Self {
            attribute_key: attribute_key.into(),
            ..Default::default()
        }
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn default_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Default values to apply: the single value, when set, then the list.
    pub fn defaults(&self) -> Vec<&str> {
        self.default_value
            .as_deref()
            .into_iter()
            .chain(self.default_values.iter().map(String::as_str))
            .collect()
    }
}
