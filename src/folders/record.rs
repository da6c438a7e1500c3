//! Folder index records.
//!
//! One record per path segment:
//! - `PK = {site}/global#folders#{parentDocumentId}` (root parent is `""`)
//! - `SK = fi#{segment}` or `ff#{segment}`, lowercased
//! - folders only: `GSI1PK = {site}/global#folders#{documentId}`, `GSI1SK = folder`
//! - files only: `GSI2PK = {site}/global#filename#{bucket}`, `GSI2SK = fi#{filename}`

use chrono::{DateTime, Utc};

use super::path::EntryType;
use crate::error::{IndexError, Result};
use crate::interfaces::{item_str, AttrValue, Item};
use crate::keys::{
    prefix_key, unprefix_key, DbKey, GLOBAL_FILENAME, GLOBAL_FOLDER_METADATA, GSI1_PK, GSI1_SK,
    GSI2_PK, GSI2_SK, PK, SK, TAG_DELIMITER,
};

/// Sort key of a folder's reverse-lookup entry on GSI1.
pub const FOLDER_GSI1_SK: &str = "folder";

/// Stored timestamp format (ISO 8601, second precision, numeric offset).
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

const ATTR_DOCUMENT_ID: &str = "documentId";
const ATTR_PATH: &str = "path";
const ATTR_TYPE: &str = "type";
const ATTR_INSERTED_DATE: &str = "inserteddate";
const ATTR_LAST_MODIFIED_DATE: &str = "lastModifiedDate";
const ATTR_USER_ID: &str = "userId";

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(value, DATE_FORMAT)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Partition holding the children of `parent_id`.
pub fn folder_partition(site: Option<&str>, parent_id: &str) -> String {
    prefix_key(
        site,
        &format!("{}{}{}", GLOBAL_FOLDER_METADATA, TAG_DELIMITER, parent_id),
    )
}

/// Sort key of a segment of the given type.
pub fn segment_sk(segment: &str, entry_type: EntryType) -> String {
    format!("{}{}", entry_type.sk_prefix(), segment.to_lowercase())
}

/// GSI2 bucket of a filename: its first two lowercased characters, padded
/// with `_` when shorter.
pub fn filename_bucket(filename: &str) -> String {
    let mut bucket: String = filename.to_lowercase().chars().take(2).collect();
    while bucket.chars().count() < 2 {
        bucket.push('_');
    }
    bucket
}

/// GSI2 partition of a filename.
pub fn filename_partition(site: Option<&str>, filename: &str) -> String {
    prefix_key(
        site,
        &format!("{}{}", GLOBAL_FILENAME, filename_bucket(filename)),
    )
}

/// A folder or file position in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderIndexRecord {
    /// Owning document id; a generated uuid for pure folders.
    pub document_id: String,
    /// Containing folder's document id, `""` at the root.
    pub parent_document_id: String,
    /// This segment's literal name.
    pub path: String,
    pub entry_type: EntryType,
    pub inserted_date: Option<DateTime<Utc>>,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub user_id: Option<String>,
}

impl FolderIndexRecord {
    pub fn new(
        parent_document_id: impl Into<String>,
        path: impl Into<String>,
        entry_type: EntryType,
    ) -> Self {
        Self {
            document_id: String::new(),
            parent_document_id: parent_document_id.into(),
            path: path.into(),
            entry_type,
            inserted_date: None,
            last_modified_date: None,
            user_id: None,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.entry_type == EntryType::Folder
    }

    pub fn pk(&self, site: Option<&str>) -> String {
        folder_partition(site, &self.parent_document_id)
    }

    pub fn sk(&self) -> String {
        segment_sk(&self.path, self.entry_type)
    }

    pub fn key(&self, site: Option<&str>) -> DbKey {
        DbKey::new(self.pk(site), self.sk())
    }

    /// Key used to address the record externally: `"{parentId}#{path}"`.
    pub fn index_key(&self) -> String {
        format!("{}{}{}", self.parent_document_id, TAG_DELIMITER, self.path)
    }

    /// Store representation, including the secondary index projections.
    pub fn to_item(&self, site: Option<&str>) -> Result<Item> {
        if self.path.is_empty() {
            return Err(IndexError::invalid("'path' is required"));
        }
        if self.document_id.is_empty() {
            return Err(IndexError::invalid("'documentId' is required"));
        }

        let mut item = Item::new();
        item.insert(PK.to_string(), AttrValue::s(self.pk(site)));
        item.insert(SK.to_string(), AttrValue::s(self.sk()));
        item.insert(ATTR_DOCUMENT_ID.to_string(), AttrValue::s(&self.document_id));
        item.insert(ATTR_PATH.to_string(), AttrValue::s(&self.path));
        item.insert(ATTR_TYPE.to_string(), AttrValue::s(self.entry_type.as_str()));

        if let Some(date) = &self.inserted_date {
            item.insert(ATTR_INSERTED_DATE.to_string(), AttrValue::s(format_date(date)));
        }
        if let Some(date) = &self.last_modified_date {
            item.insert(
                ATTR_LAST_MODIFIED_DATE.to_string(),
                AttrValue::s(format_date(date)),
            );
        }
        if let Some(user_id) = &self.user_id {
            item.insert(ATTR_USER_ID.to_string(), AttrValue::s(user_id));
        }

        match self.entry_type {
            EntryType::Folder => {
                item.insert(
                    GSI1_PK.to_string(),
                    AttrValue::s(folder_partition(site, &self.document_id)),
                );
                item.insert(GSI1_SK.to_string(), AttrValue::s(FOLDER_GSI1_SK));
            }
            EntryType::File => {
                item.insert(
                    GSI2_PK.to_string(),
                    AttrValue::s(filename_partition(site, &self.path)),
                );
                item.insert(GSI2_SK.to_string(), AttrValue::s(self.sk()));
            }
        }

        Ok(item)
    }

    /// Rebuild a record from its stored form. The parent id is recovered from
    /// the partition key.
    pub fn from_item(site: Option<&str>, item: &Item) -> Result<Self> {
        let pk = item_str(item, PK).ok_or_else(|| missing(PK))?;
        let partition_prefix = format!("{}{}", GLOBAL_FOLDER_METADATA, TAG_DELIMITER);
        let parent_document_id = unprefix_key(site, pk)
            .strip_prefix(&partition_prefix)
            .map(str::to_string)
            .ok_or_else(|| {
                IndexError::IntegrityViolation(format!("'{}' is not a folder index key", pk))
            })?;

        let type_value = item_str(item, ATTR_TYPE).ok_or_else(|| missing(ATTR_TYPE))?;
        let entry_type = EntryType::parse(type_value).ok_or_else(|| {
            IndexError::IntegrityViolation(format!("unknown folder entry type '{}'", type_value))
        })?;

        Ok(Self {
            document_id: item_str(item, ATTR_DOCUMENT_ID)
                .ok_or_else(|| missing(ATTR_DOCUMENT_ID))?
                .to_string(),
            parent_document_id,
            path: item_str(item, ATTR_PATH)
                .ok_or_else(|| missing(ATTR_PATH))?
                .to_string(),
            entry_type,
            inserted_date: item_str(item, ATTR_INSERTED_DATE).and_then(parse_date),
            last_modified_date: item_str(item, ATTR_LAST_MODIFIED_DATE).and_then(parse_date),
            user_id: item_str(item, ATTR_USER_ID).map(str::to_string),
        })
    }

    /// Attribute update that stamps a new modification time.
    pub(crate) fn touch_values(date: &DateTime<Utc>) -> Item {
        Item::from([(
            ATTR_LAST_MODIFIED_DATE.to_string(),
            AttrValue::s(format_date(date)),
        )])
    }
}

fn missing(attribute: &str) -> IndexError {
    IndexError::IntegrityViolation(format!(
        "folder index record is missing '{}'",
        attribute
    ))
}

/// A record produced by a path walk, flagged when it differs from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    pub record: FolderIndexRecord,
    pub changed: bool,
}
