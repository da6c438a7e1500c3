//! Key-space design.
//!
//! Every record lives in one flat table addressed by `PK`/`SK`, with two
//! optional alternate projections (`GSI1PK`/`GSI1SK`, `GSI2PK`/`GSI2SK`).
//! Tenants ("sites") share the table: a site id is folded into partition keys
//! as a `"{site}/"` prefix, except for the default site which is stored bare.
//!
//! All functions here are pure. Builders that need an identifier fail with
//! [`IndexError::InvalidArgument`] at call time rather than producing a key
//! the store would accept.

use crate::error::{IndexError, Result};
use crate::interfaces::{AttrValue, IndexName, Item};

/// Site id stored without a prefix.
pub const DEFAULT_SITE_ID: &str = "default";

/// Partition key attribute of the table.
pub const PK: &str = "PK";
/// Sort key attribute of the table.
pub const SK: &str = "SK";

/// Global secondary index 1.
pub const GSI1: &str = "GSI1";
pub const GSI1_PK: &str = "GSI1PK";
pub const GSI1_SK: &str = "GSI1SK";

/// Global secondary index 2.
pub const GSI2: &str = "GSI2";
pub const GSI2_PK: &str = "GSI2PK";
pub const GSI2_SK: &str = "GSI2SK";

/// Separator between key segments.
pub const TAG_DELIMITER: &str = "#";
/// Separator between attribute names and values of a composite key.
pub const COMPOSITE_KEY_DELIMITER: &str = "#";

pub const PREFIX_CONFIG: &str = "configs#";
pub const PREFIX_API_KEYS: &str = "apikeys#";
pub const PREFIX_API_KEY: &str = "apikey#";
pub const PREFIX_DOCS: &str = "docs#";
pub const PREFIX_DOCUMENT_FORMAT: &str = "format#";
pub const PREFIX_PRESETS: &str = "pre";
pub const PREFIX_PRESET_TAGS: &str = "pretag";
pub const PREFIX_TAGS: &str = "tags#";
pub const PREFIX_WEBHOOK: &str = "webhook#";
pub const PREFIX_WEBHOOKS: &str = "webhooks#";
pub const PREFIX_ATTR: &str = "attr#";
pub const PREFIX_ATTRIBUTE_DEFINITION: &str = "attrdef#";

/// Partition prefix of folder tree entries (`global#folders#{parentId}`).
pub const GLOBAL_FOLDER_METADATA: &str = "global#folders";
/// Partition of the per-site tag key registry.
pub const GLOBAL_FOLDER_TAGS: &str = "global#tags#";
/// Partition prefix of the filename index.
pub const GLOBAL_FILENAME: &str = "global#filename#";

/// Whether `site` denotes the default tenant.
pub fn is_default_site(site: Option<&str>) -> bool {
    match site {
        None => true,
        Some(s) => s.is_empty() || s == DEFAULT_SITE_ID,
    }
}

/// Fold a site id into a raw key.
pub fn prefix_key(site: Option<&str>, raw: &str) -> String {
    match site {
        Some(s) if !is_default_site(site) => format!("{}/{}", s, raw),
        _ => raw.to_string(),
    }
}

/// Remove the site prefix added by [`prefix_key`].
///
/// Keys without the prefix are returned unchanged.
pub fn unprefix_key(site: Option<&str>, key: &str) -> String {
    match site {
        Some(s) if !is_default_site(site) => key
            .strip_prefix(s)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(key)
            .to_string(),
        _ => key.to_string(),
    }
}

/// Split an object-store style `"{site}/{documentId}"` key.
///
/// Only a single `/` separates the site; `//` sequences (as in
/// `"s3://bucket"`-style ids) are treated as part of the document id. The
/// default site is reported as `None`.
pub fn split_site_document(s: &str) -> (Option<String>, String) {
    let bytes = s.as_bytes();
    let separator = (0..bytes.len()).find(|&i| {
        bytes[i] == b'/'
            && (i == 0 || bytes[i - 1] != b'/')
            && (i + 1 >= bytes.len() || bytes[i + 1] != b'/')
    });

    match separator {
        Some(i) if !s[..i].contains("//") => {
            let site = &s[..i];
            let document_id = s[i + 1..].to_string();
            let site = (!is_default_site(Some(site))).then(|| site.to_string());
            (site, document_id)
        }
        _ => (None, s.to_string()),
    }
}

/// A record address: partition key plus optional sort key, on the table or
/// on one of the secondary indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbKey {
    pub index: Option<IndexName>,
    pub pk: String,
    pub sk: Option<String>,
}

impl DbKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            index: None,
            pk: pk.into(),
            sk: Some(sk.into()),
        }
    }

    /// Partition-only key, used as the target of a range query.
    pub fn partition(pk: impl Into<String>) -> Self {
        Self {
            index: None,
            pk: pk.into(),
            sk: None,
        }
    }

    fn on(mut self, index: IndexName) -> Self {
        self.index = Some(index);
        self
    }

    /// Sort key, or an error naming the key when it is partition-only.
    pub fn sort_key(&self) -> Result<&str> {
        self.sk
            .as_deref()
            .ok_or_else(|| IndexError::invalid(format!("key '{}' has no sort key", self.pk)))
    }

    /// The key as store attributes, using the attribute names of its projection.
    pub fn attributes(&self) -> Item {
        let (pk_name, sk_name) = crate::interfaces::key_attributes(self.index);
        let mut item = Item::new();
        item.insert(pk_name.to_string(), AttrValue::s(&self.pk));
        if let Some(sk) = &self.sk {
            item.insert(sk_name.to_string(), AttrValue::s(sk));
        }
        item
    }
}

fn site_key(site: Option<&str>, pk: &str, sk: Option<String>) -> DbKey {
    DbKey {
        index: None,
        pk: prefix_key(site, pk),
        sk,
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(IndexError::invalid(format!("'{}' required", name))),
    }
}

/// Secondary index that owns a key attribute name, if any.
pub fn index_name_for(attribute: &str) -> Option<IndexName> {
    if attribute.starts_with(GSI1) {
        Some(IndexName::Gsi1)
    } else if attribute.starts_with(GSI2) {
        Some(IndexName::Gsi2)
    } else {
        None
    }
}

/// Document record key.
pub fn document_key(site: Option<&str>, document_id: &str) -> DbKey {
    site_key(
        site,
        &format!("{}{}", PREFIX_DOCS, document_id),
        Some("document".to_string()),
    )
}

/// Child document record key, stored in the parent's partition.
pub fn child_document_key(site: Option<&str>, document_id: &str, child_id: &str) -> DbKey {
    site_key(
        site,
        &format!("{}{}", PREFIX_DOCS, document_id),
        Some(format!("document{}{}", TAG_DELIMITER, child_id)),
    )
}

/// Document tag key. Without a tag key this is the prefix of all tags.
pub fn document_tag_key(site: Option<&str>, document_id: &str, tag_key: Option<&str>) -> DbKey {
    site_key(
        site,
        &format!("{}{}", PREFIX_DOCS, document_id),
        Some(format!("{}{}", PREFIX_TAGS, tag_key.unwrap_or_default())),
    )
}

/// Document format key. Without a content type this is the prefix of all formats.
pub fn document_format_key(
    site: Option<&str>,
    document_id: &str,
    content_type: Option<&str>,
) -> DbKey {
    site_key(
        site,
        &format!("{}{}", PREFIX_DOCS, document_id),
        Some(format!(
            "{}{}",
            PREFIX_DOCUMENT_FORMAT,
            content_type.unwrap_or_default()
        )),
    )
}

/// Preset record key.
pub fn preset_key(site: Option<&str>, id: Option<&str>) -> Result<DbKey> {
    let id = required(id, "id")?;
    Ok(site_key(
        site,
        &format!("{}{}{}", PREFIX_PRESETS, TAG_DELIMITER, id),
        Some("preset".to_string()),
    ))
}

/// Preset tag key.
pub fn preset_tag_key(site: Option<&str>, id: Option<&str>, tag: &str) -> Result<DbKey> {
    let id = required(id, "id")?;
    Ok(site_key(
        site,
        &format!("{}{}{}", PREFIX_PRESET_TAGS, TAG_DELIMITER, id),
        Some(tag.to_string()),
    ))
}

/// Preset lookup-by-name key on GSI2.
///
/// The sort key narrows from `type#` to `type#name#` to `type#name#id` as
/// more identifiers are supplied.
pub fn preset_gsi2_key(
    site: Option<&str>,
    id: Option<&str>,
    preset_type: Option<&str>,
    name: Option<&str>,
) -> Result<DbKey> {
    let preset_type = required(preset_type, "type")?;
    let d = TAG_DELIMITER;
    let sk = match (name, id) {
        (Some(name), Some(id)) => format!("{preset_type}{d}{name}{d}{id}"),
        (Some(name), None) => format!("{preset_type}{d}{name}{d}"),
        _ => format!("{preset_type}{d}"),
    };

    Ok(site_key(site, &format!("{}_name", PREFIX_PRESETS), Some(sk)).on(IndexName::Gsi2))
}

/// Webhook record key.
pub fn webhook_key(site: Option<&str>, id: Option<&str>) -> Result<DbKey> {
    let id = required(id, "id")?;
    Ok(site_key(
        site,
        &format!("{}{}", PREFIX_WEBHOOK, id),
        Some("webhook".to_string()),
    ))
}

/// Webhook tag key. Without a tag key this is the prefix of all tags.
pub fn webhook_tag_key(site: Option<&str>, id: Option<&str>, tag_key: Option<&str>) -> Result<DbKey> {
    let id = required(id, "id")?;
    Ok(site_key(
        site,
        &format!("{}{}", PREFIX_WEBHOOK, id),
        Some(format!("{}{}", PREFIX_TAGS, tag_key.unwrap_or_default())),
    ))
}

/// Partition listing every webhook of a site (GSI1).
pub fn webhooks_list_key(site: Option<&str>) -> DbKey {
    site_key(site, PREFIX_WEBHOOKS, None).on(IndexName::Gsi1)
}

/// API key record key.
pub fn api_key_key(site: Option<&str>, api_key: &str) -> DbKey {
    site_key(
        site,
        PREFIX_API_KEYS,
        Some(format!("{}{}", PREFIX_API_KEY, api_key)),
    )
}

/// Per-site configuration key. Configuration lives in a shared partition, so
/// the site id is the sort key rather than a prefix.
pub fn config_key(site: Option<&str>) -> DbKey {
    let sk = match site {
        Some(s) if !is_default_site(site) => s,
        _ => DEFAULT_SITE_ID,
    };
    DbKey::new(PREFIX_CONFIG, sk)
}

/// Entry in the per-site tag key registry.
pub fn global_tag_key(site: Option<&str>, tag_key: &str) -> DbKey {
    site_key(
        site,
        GLOBAL_FOLDER_TAGS,
        Some(format!("key{}{}", TAG_DELIMITER, tag_key.to_lowercase())),
    )
}

/// Attribute definition key.
pub fn attribute_definition_key(site: Option<&str>, attribute_key: &str) -> DbKey {
    site_key(
        site,
        &format!("{}{}", PREFIX_ATTRIBUTE_DEFINITION, attribute_key),
        Some("attribute".to_string()),
    )
}
