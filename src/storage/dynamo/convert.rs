//! Conversion between crate items and SDK attribute maps.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;

use crate::interfaces::{AttrValue, Item, StorageError};
use crate::storage::Result;

pub(super) type SdkItem = HashMap<String, AttributeValue>;

pub(super) fn to_sdk(value: AttrValue) -> AttributeValue {
    match value {
        AttrValue::S(s) => AttributeValue::S(s),
        AttrValue::N(n) => AttributeValue::N(n),
        AttrValue::Bool(b) => AttributeValue::Bool(b),
        AttrValue::L(list) => AttributeValue::L(list.into_iter().map(to_sdk).collect()),
        AttrValue::M(map) => AttributeValue::M(to_sdk_item(map)),
        AttrValue::Null(n) => AttributeValue::Null(n),
    }
}

pub(super) fn to_sdk_item(item: Item) -> SdkItem {
    item.into_iter().map(|(k, v)| (k, to_sdk(v))).collect()
}

pub(super) fn from_sdk(value: &AttributeValue) -> Result<AttrValue> {
    Ok(match value {
        AttributeValue::S(s) => AttrValue::S(s.clone()),
        AttributeValue::N(n) => AttrValue::N(n.clone()),
        AttributeValue::Bool(b) => AttrValue::Bool(*b),
        AttributeValue::Null(n) => AttrValue::Null(*n),
        AttributeValue::L(list) => AttrValue::L(list.iter().map(from_sdk).collect::<Result<_>>()?),
        AttributeValue::M(map) => AttrValue::M(from_sdk_item(map)?),
        AttributeValue::Ss(set) => AttrValue::L(set.iter().cloned().map(AttrValue::S).collect()),
        AttributeValue::Ns(set) => AttrValue::L(set.iter().cloned().map(AttrValue::N).collect()),
        other => {
            return Err(StorageError::Backend(format!(
                "unsupported attribute value: {:?}",
                other
            )))
        }
    })
}

pub(super) fn from_sdk_item(item: &SdkItem) -> Result<Item> {
    item.iter()
        .map(|(k, v)| from_sdk(v).map(|v| (k.clone(), v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_values_convert_both_ways() {
        let mut inner = HashMap::new();
        inner.insert("n".to_string(), AttrValue::N("1".to_string()));
        let item = Item::from([
            ("PK".to_string(), AttrValue::s("docs#1")),
            ("flag".to_string(), AttrValue::Bool(false)),
            (
                "list".to_string(),
                AttrValue::L(vec![AttrValue::s("a"), AttrValue::M(inner)]),
            ),
        ]);

        let sdk = to_sdk_item(item.clone());
        assert_eq!(from_sdk_item(&sdk).unwrap(), item);
    }

    #[test]
    fn test_string_sets_become_lists() {
        let value = AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            from_sdk(&value).unwrap(),
            AttrValue::L(vec![AttrValue::s("a"), AttrValue::s("b")])
        );
    }
}
