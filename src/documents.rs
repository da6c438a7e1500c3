//! The slice of a document the index layer reads and writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interfaces::{AttrValue, Item};
use crate::keys::document_key;

/// Attribute holding a document's materialized path.
pub const ATTR_PATH: &str = "path";

/// A stored document as seen by folder indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub document_id: String,
    /// Full path, e.g. `"invoices/2024/acme.pdf"`. Empty when the document
    /// is not placed in the folder tree.
    pub path: String,
    pub user_id: Option<String>,
    pub inserted_date: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(document_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            path: path.into(),
            user_id: None,
            inserted_date: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Attribute update that sets a document's path.
pub(crate) fn path_update(path: &str) -> Item {
    Item::from([(ATTR_PATH.to_string(), AttrValue::s(path))])
}

/// Key of the document record whose path follows a move.
pub(crate) fn path_owner(site: Option<&str>, document_id: &str) -> (String, String) {
    let key = document_key(site, document_id);
    let sk = key.sk.unwrap_or_default();
    (key.pk, sk)
}
