//! Folder Index Processor.
//!
//! Maintains the folder tree as flat records: children are found by querying
//! the parent's partition, and a folder is found from its own id through the
//! GSI1 reverse entry. Every lookup of a path segment is a point read.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::path::{self, EntryType};
use super::record::{
    filename_partition, folder_partition, segment_sk, FolderIndexRecord, ResolvedRecord,
};
use crate::config::IndexLimits;
use crate::documents::{self, Document};
use crate::error::{IndexError, Result};
use crate::interfaces::{
    item_str, IndexName, Item, KeyStore, PutOutcome, QueryRequest, SkCondition,
};
use crate::keys::{PK, SK, TAG_DELIMITER};
use crate::pagination::{decode_optional, encode_token, Page, PaginationToken};

/// Hierarchical path index over a [`KeyStore`].
pub struct FolderIndexProcessor {
    store: Arc<dyn KeyStore>,
    limits: IndexLimits,
}

impl FolderIndexProcessor {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self::with_limits(store, IndexLimits::default())
    }

    pub fn with_limits(store: Arc<dyn KeyStore>, limits: IndexLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> &IndexLimits {
        &self.limits
    }

    async fn lookup(
        &self,
        site: Option<&str>,
        parent_id: &str,
        segment: &str,
        entry_type: EntryType,
    ) -> Result<Option<FolderIndexRecord>> {
        let pk = folder_partition(site, parent_id);
        let sk = segment_sk(segment, entry_type);
        self.store
            .get(&pk, &sk)
            .await?
            .map(|item| FolderIndexRecord::from_item(site, &item))
            .transpose()
    }

    async fn has_children(&self, site: Option<&str>, folder_id: &str) -> Result<bool> {
        let page = self
            .store
            .query(QueryRequest::new(folder_partition(site, folder_id)).limit(1))
            .await?;
        Ok(!page.items.is_empty())
    }

    /// Walk `path` segment by segment without writing anything.
    ///
    /// Existing segments come back unchanged. Missing segments are synthesized
    /// with fresh ids and flagged as changed, as is the immediate parent of
    /// each synthesized segment (its modification time moves to now). The last
    /// segment is a file unless the path ends with `/`.
    pub async fn resolve(
        &self,
        site: Option<&str>,
        path: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<ResolvedRecord>> {
        let now = Utc::now();
        let kind = EntryType::of_path(path);
        let tokens = path::tokens(path);
        let last = tokens.len().saturating_sub(1);

        let mut parent_id = String::new();
        let mut resolved: Vec<ResolvedRecord> = Vec::with_capacity(tokens.len());

        for (i, token) in tokens.iter().enumerate() {
            let entry_type = if kind == EntryType::File && i == last {
                EntryType::File
            } else {
                EntryType::Folder
            };

            let entry = match self.lookup(site, &parent_id, token, entry_type).await? {
                Some(record) => {
                    debug!(
                        site = ?site,
                        segment = %token,
                        document_id = %record.document_id,
                        "Path segment found"
                    );
                    ResolvedRecord {
                        record,
                        changed: false,
                    }
                }
                None => {
                    let mut record =
                        FolderIndexRecord::new(parent_id.as_str(), token.as_str(), entry_type);
                    record.document_id = Uuid::new_v4().to_string();
                    if entry_type == EntryType::Folder {
                        record.inserted_date = Some(now);
                        record.last_modified_date = Some(now);
                        record.user_id = user_id.map(str::to_string);
                    }
                    debug!(site = ?site, segment = %token, "Path segment missing");
                    ResolvedRecord {
                        record,
                        changed: true,
                    }
                }
            };

            parent_id = entry.record.document_id.clone();
            resolved.push(entry);
        }

        let synthesized: Vec<bool> = resolved.iter().map(|r| r.changed).collect();
        for (i, is_new) in synthesized.into_iter().enumerate().skip(1) {
            if is_new {
                let parent = &mut resolved[i - 1];
                parent.record.last_modified_date = Some(now);
                parent.changed = true;
            }
        }

        Ok(resolved)
    }

    /// Create one folder under `parent_id`, or return the one already there.
    ///
    /// Creation is a conditional insert; when a concurrent caller wins, its
    /// record comes back in the failed write and is adopted as-is.
    async fn create_folder(
        &self,
        site: Option<&str>,
        parent_id: &str,
        name: &str,
        now: DateTime<Utc>,
        user_id: Option<&str>,
    ) -> Result<FolderIndexRecord> {
        // Read first to skip the write in the common case. Races are settled
        // by the conditional insert alone.
        if let Some(existing) = self.lookup(site, parent_id, name, EntryType::Folder).await? {
            return Ok(existing);
        }

        let mut record = FolderIndexRecord::new(parent_id, name, EntryType::Folder);
        record.document_id = Uuid::new_v4().to_string();
        record.inserted_date = Some(now);
        record.last_modified_date = Some(now);
        record.user_id = user_id.map(str::to_string);

        match self.store.put_if_absent(record.to_item(site)?).await? {
            PutOutcome::Created => {
                info!(
                    site = ?site,
                    folder = %name,
                    document_id = %record.document_id,
                    "Created folder"
                );
                Ok(record)
            }
            PutOutcome::Exists(winner) => {
                warn!(
                    site = ?site,
                    folder = %name,
                    "Folder created concurrently, adopting existing record"
                );
                FolderIndexRecord::from_item(site, &winner)
            }
        }
    }

    async fn create_folder_chain(
        &self,
        site: Option<&str>,
        names: &[String],
        now: DateTime<Utc>,
        user_id: Option<&str>,
    ) -> Result<Vec<FolderIndexRecord>> {
        let mut parent_id = String::new();
        let mut folders = Vec::with_capacity(names.len());
        for name in names {
            let folder = self.create_folder(site, &parent_id, name, now, user_id).await?;
            parent_id = folder.document_id.clone();
            folders.push(folder);
        }
        Ok(folders)
    }

    /// Create every folder of `path`: all segments when it ends with `/`,
    /// otherwise all but the last. Existing folders are reused.
    pub async fn create_folders(
        &self,
        site: Option<&str>,
        path: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<FolderIndexRecord>> {
        let tokens = path::tokens(path);
        let count = match EntryType::of_path(path) {
            EntryType::Folder => tokens.len(),
            EntryType::File => tokens.len().saturating_sub(1),
        };
        self.create_folder_chain(site, &tokens[..count], Utc::now(), user_id)
            .await
    }

    /// Build the file leaf for `document_id` under `parent` (the root when
    /// `None`) and stamp the parent as modified.
    ///
    /// When the leaf name already belongs to another document the returned
    /// record carries a disambiguated name. The leaf itself is not written.
    pub async fn add_file_to_folder(
        &self,
        site: Option<&str>,
        document_id: &str,
        parent: Option<&mut FolderIndexRecord>,
        path: &str,
    ) -> Result<FolderIndexRecord> {
        let filename = path::filename(path);
        if filename.is_empty() {
            return Err(IndexError::invalid(format!(
                "path '{}' does not name a file",
                path
            )));
        }

        let parent_id = match parent {
            Some(parent) => {
                let now = Utc::now();
                parent.last_modified_date = Some(now);
                self.store
                    .update_values(
                        &parent.pk(site),
                        &parent.sk(),
                        FolderIndexRecord::touch_values(&now),
                    )
                    .await?;
                parent.document_id.clone()
            }
            None => String::new(),
        };

        let mut record = FolderIndexRecord::new(parent_id, filename, EntryType::File);
        record.document_id = document_id.to_string();

        if let Some(existing) = self
            .lookup(site, &record.parent_document_id, filename, EntryType::File)
            .await?
        {
            if existing.document_id != document_id {
                record.path = path::disambiguate(filename, document_id);
                debug!(
                    site = ?site,
                    filename = %filename,
                    taken_by = %existing.document_id,
                    renamed = %record.path,
                    "Leaf name collision"
                );
            }
        }

        Ok(record)
    }

    /// Place a document in the tree.
    ///
    /// Missing ancestor folders are created. Returns the records of every
    /// segment of the path for the caller to persist. If the leaf had to be
    /// renamed the document's `path` is rewritten to match.
    pub async fn generate_index(
        &self,
        site: Option<&str>,
        document: &mut Document,
    ) -> Result<Vec<Item>> {
        if path::tokens(&document.path).is_empty() {
            return Ok(Vec::new());
        }
        if EntryType::of_path(&document.path) == EntryType::Folder {
            return Err(IndexError::invalid(format!(
                "document path '{}' does not name a file",
                document.path
            )));
        }

        let tokens = path::tokens(&document.path);
        let now = document.inserted_date.unwrap_or_else(Utc::now);
        let user_id = document.user_id.as_deref();
        let mut folders = self
            .create_folder_chain(site, &tokens[..tokens.len() - 1], now, user_id)
            .await?;

        let leaf = self
            .add_file_to_folder(site, &document.document_id, folders.last_mut(), &document.path)
            .await?;

        if leaf.path != path::filename(&document.path) {
            let renamed = path::join(folders.iter().map(|f| f.path.as_str()), &leaf.path);
            info!(
                site = ?site,
                document_id = %document.document_id,
                from = %document.path,
                to = %renamed,
                "Document path renamed to avoid collision"
            );
            document.path = renamed;
        }

        let mut items = folders
            .iter()
            .map(|folder| folder.to_item(site))
            .collect::<Result<Vec<_>>>()?;
        items.push(leaf.to_item(site)?);
        Ok(items)
    }

    /// Move a file into a folder, or a folder into a folder.
    ///
    /// A trailing `/` marks a folder path. The source must exist. Target
    /// folders are created as needed. A folder move takes its new name from
    /// the last segment of `target`, so moving `a/` to `b/c/` renames `a` to
    /// `c` under `b`.
    pub async fn move_index(
        &self,
        site: Option<&str>,
        source: &str,
        target: &str,
        user_id: Option<&str>,
    ) -> Result<()> {
        let source_kind = EntryType::of_path(source);
        let target_kind = EntryType::of_path(target);

        match (source_kind, target_kind) {
            (EntryType::File, EntryType::Folder) => {
                self.move_file_to_folder(site, source, target, user_id).await
            }
            (EntryType::Folder, EntryType::Folder) => {
                self.move_folder_to_folder(site, source, target, user_id)
                    .await
            }
            _ => Err(IndexError::UnsupportedMove {
                source_kind: source_kind.to_string(),
                target_kind: target_kind.to_string(),
            }),
        }
    }

    async fn existing_source(
        &self,
        site: Option<&str>,
        source: &str,
        user_id: Option<&str>,
    ) -> Result<FolderIndexRecord> {
        let resolved = self.resolve(site, source, user_id).await?;
        if resolved.iter().any(|r| r.changed) {
            return Err(IndexError::not_found(format!("folder '{}'", source)));
        }
        resolved
            .into_iter()
            .last()
            .map(|r| r.record)
            .ok_or_else(|| IndexError::invalid("cannot move the root folder"))
    }

    async fn move_file_to_folder(
        &self,
        site: Option<&str>,
        source: &str,
        target: &str,
        user_id: Option<&str>,
    ) -> Result<()> {
        let file = self.existing_source(site, source, user_id).await?;

        let targets = self.create_folders(site, target, user_id).await?;
        let target_id = targets
            .last()
            .map(|t| t.document_id.clone())
            .unwrap_or_default();

        let mut moved = file.clone();
        moved.parent_document_id = target_id;
        if let Some(existing) = self
            .lookup(site, &moved.parent_document_id, &moved.path, EntryType::File)
            .await?
        {
            if existing.document_id != moved.document_id {
                moved.path = path::disambiguate(&file.path, &moved.document_id);
            }
        }

        self.store.delete(&file.pk(site), &file.sk()).await?;
        self.store.put(moved.to_item(site)?).await?;

        let new_path = path::join(targets.iter().map(|t| t.path.as_str()), &moved.path);
        let (pk, sk) = documents::path_owner(site, &moved.document_id);
        self.store
            .update_values(&pk, &sk, documents::path_update(&new_path))
            .await?;

        if let Some(folder) = targets.last() {
            self.store
                .update_values(
                    &folder.pk(site),
                    &folder.sk(),
                    FolderIndexRecord::touch_values(&Utc::now()),
                )
                .await?;
        }

        info!(
            site = ?site,
            document_id = %moved.document_id,
            from = %source,
            to = %new_path,
            "Moved file"
        );
        Ok(())
    }

    async fn move_folder_to_folder(
        &self,
        site: Option<&str>,
        source: &str,
        target: &str,
        user_id: Option<&str>,
    ) -> Result<()> {
        let (target_parent, new_name) = path::split_parent(target);
        if new_name.is_empty() {
            return Err(IndexError::invalid("target folder must be named"));
        }

        let folder = self.existing_source(site, source, user_id).await?;

        let lowercase = |p: &str| -> Vec<String> {
            path::tokens(p).iter().map(|t| t.to_lowercase()).collect()
        };
        if lowercase(&target_parent).starts_with(&lowercase(source)) {
            return Err(IndexError::invalid(format!(
                "cannot move folder '{}' into itself",
                source
            )));
        }

        // Reject a name clash before anything is written.
        let parent_chain = self.resolve(site, &target_parent, user_id).await?;
        if !parent_chain.iter().any(|r| r.changed) {
            let parent_id = parent_chain
                .last()
                .map(|r| r.record.document_id.as_str())
                .unwrap_or_default();
            if let Some(existing) = self
                .lookup(site, parent_id, &new_name, EntryType::Folder)
                .await?
            {
                if existing.document_id != folder.document_id {
                    return Err(IndexError::invalid(format!(
                        "folder '{}' already exists",
                        target
                    )));
                }
            }
        }

        let targets = self.create_folders(site, &target_parent, user_id).await?;

        let mut moved = folder.clone();
        moved.parent_document_id = targets
            .last()
            .map(|t| t.document_id.clone())
            .unwrap_or_default();
        moved.path = new_name;

        self.store.delete(&folder.pk(site), &folder.sk()).await?;
        self.store.put(moved.to_item(site)?).await?;

        info!(
            site = ?site,
            document_id = %moved.document_id,
            from = %source,
            to = %target,
            "Moved folder"
        );
        Ok(())
    }

    /// Find a folder from its own id.
    pub async fn get_folder_by_document_id(
        &self,
        site: Option<&str>,
        document_id: &str,
    ) -> Result<Option<FolderIndexRecord>> {
        if document_id.is_empty() {
            return Ok(None);
        }

        let page = self
            .store
            .query(
                QueryRequest::new(folder_partition(site, document_id))
                    .index(IndexName::Gsi1)
                    .limit(1),
            )
            .await?;

        let Some((pk, sk)) = page.items.first().and_then(table_key) else {
            return Ok(None);
        };

        // The index is eventually consistent; the table read is not.
        self.store
            .get(&pk, &sk)
            .await?
            .map(|item| FolderIndexRecord::from_item(site, &item))
            .transpose()
    }

    /// Find several folders from their ids. Unknown ids are absent from the
    /// result.
    pub async fn get_folder_by_document_ids(
        &self,
        site: Option<&str>,
        document_ids: &[String],
    ) -> Result<HashMap<String, FolderIndexRecord>> {
        let lookups = document_ids
            .iter()
            .filter(|id| !id.is_empty())
            .map(|id| {
                self.store.query(
                    QueryRequest::new(folder_partition(site, id))
                        .index(IndexName::Gsi1)
                        .limit(1),
                )
            });
        let pages = try_join_all(lookups).await?;

        let keys: Vec<(String, String)> = pages
            .iter()
            .filter_map(|page| page.items.first())
            .filter_map(table_key)
            .collect();
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        self.store
            .batch_get(keys)
            .await?
            .iter()
            .map(|item| {
                FolderIndexRecord::from_item(site, item).map(|r| (r.document_id.clone(), r))
            })
            .collect()
    }

    /// Ancestry of a folder, root first, ending with the folder itself.
    ///
    /// Walks parent pointers one read per level. A walk longer than
    /// `max_folder_depth` means the stored tree is corrupt.
    pub async fn get_folders_by_document_id(
        &self,
        site: Option<&str>,
        document_id: &str,
    ) -> Result<Vec<FolderIndexRecord>> {
        let mut chain = Vec::new();
        let mut id = document_id.to_string();

        for _ in 0..=self.limits.max_folder_depth {
            let Some(folder) = self.get_folder_by_document_id(site, &id).await? else {
                chain.reverse();
                return Ok(chain);
            };
            id = folder.parent_document_id.clone();
            chain.push(folder);
        }

        Err(IndexError::IntegrityViolation(
            "maximum iterations reached".to_string(),
        ))
    }

    /// Records of every segment of an existing path, root first.
    pub async fn get_folder_index_records(
        &self,
        site: Option<&str>,
        path: &str,
    ) -> Result<Vec<FolderIndexRecord>> {
        let tokens = path::tokens(path);
        let file_index = match EntryType::of_path(path) {
            EntryType::File => tokens.len().checked_sub(1),
            EntryType::Folder => None,
        };

        let mut parent_id = String::new();
        let mut records = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            let entry_type = if Some(i) == file_index {
                EntryType::File
            } else {
                EntryType::Folder
            };
            let record = self
                .lookup(site, &parent_id, token, entry_type)
                .await?
                .ok_or_else(|| IndexError::not_found(format!("folder '{}'", path)))?;
            parent_id = record.document_id.clone();
            records.push(record);
        }

        Ok(records)
    }

    /// Record of the last segment of an existing path.
    pub async fn get_index(&self, site: Option<&str>, path: &str) -> Result<FolderIndexRecord> {
        self.get_folder_index_records(site, path)
            .await?
            .pop()
            .ok_or_else(|| IndexError::invalid("'path' is required"))
    }

    /// Record addressed by an index key (`"{parentId}#{path}"`).
    pub async fn get_index_by_key(
        &self,
        site: Option<&str>,
        index_key: &str,
        is_file: bool,
    ) -> Result<Option<FolderIndexRecord>> {
        let Some((parent_id, segment)) = index_key.split_once(TAG_DELIMITER) else {
            return Ok(None);
        };
        let entry_type = if is_file {
            EntryType::File
        } else {
            EntryType::Folder
        };
        self.lookup(site, parent_id, segment, entry_type).await
    }

    /// Whether `folder_id` is one of the folders along `path`.
    pub async fn is_folder_id_in_path(
        &self,
        site: Option<&str>,
        path: &str,
        folder_id: &str,
    ) -> Result<bool> {
        let mut parent_id = String::new();
        for token in path::tokens(path) {
            let folder = self
                .lookup(site, &parent_id, &token, EntryType::Folder)
                .await?
                .ok_or_else(|| IndexError::not_found(format!("index for '{}'", token)))?;
            if folder.document_id == folder_id {
                return Ok(true);
            }
            parent_id = folder.document_id;
        }
        Ok(false)
    }

    /// Delete the folder `path` under `parent_id` if it has no children.
    pub async fn delete_empty_directory(
        &self,
        site: Option<&str>,
        parent_id: &str,
        path: &str,
    ) -> Result<()> {
        let folder = self
            .lookup(site, parent_id, path, EntryType::Folder)
            .await?
            .ok_or_else(|| IndexError::not_found(format!("folder '{}'", path)))?;

        if self.has_children(site, &folder.document_id).await? {
            return Err(IndexError::FolderNotEmpty);
        }

        self.store.delete(&folder.pk(site), &folder.sk()).await?;
        info!(
            site = ?site,
            folder = %path,
            document_id = %folder.document_id,
            "Deleted empty folder"
        );
        Ok(())
    }

    /// [`delete_empty_directory`](Self::delete_empty_directory) addressed by
    /// index key.
    pub async fn delete_empty_directory_by_key(
        &self,
        site: Option<&str>,
        index_key: &str,
    ) -> Result<()> {
        let (parent_id, path) = index_key
            .split_once(TAG_DELIMITER)
            .ok_or_else(|| IndexError::invalid(format!("invalid index key '{}'", index_key)))?;
        self.delete_empty_directory(site, parent_id, path).await
    }

    /// Remove a document's file leaf. Folders along the path stay.
    ///
    /// Returns false when the leaf is absent or belongs to another document.
    pub async fn delete_path(
        &self,
        site: Option<&str>,
        document_id: &str,
        path: &str,
    ) -> Result<bool> {
        let tokens = path::tokens(path);
        let Some((leaf, folders)) = tokens.split_last() else {
            return Err(IndexError::invalid("'path' is required"));
        };
        if EntryType::of_path(path) == EntryType::Folder {
            return Err(IndexError::invalid(format!(
                "path '{}' does not name a file",
                path
            )));
        }

        let mut parent_id = String::new();
        for name in folders {
            let folder = self
                .lookup(site, &parent_id, name, EntryType::Folder)
                .await?
                .ok_or_else(|| IndexError::not_found(format!("index for '{}'", name)))?;
            parent_id = folder.document_id;
        }

        match self.lookup(site, &parent_id, leaf, EntryType::File).await? {
            Some(file) if file.document_id == document_id => {
                let deleted = self.store.delete(&file.pk(site), &file.sk()).await?;
                debug!(
                    site = ?site,
                    document_id = %document_id,
                    path = %path,
                    "Deleted file index"
                );
                Ok(deleted)
            }
            _ => Ok(false),
        }
    }

    /// Children of a folder (`""` for the root), folders before files.
    pub async fn list_folder(
        &self,
        site: Option<&str>,
        folder_document_id: &str,
        entry_type: Option<EntryType>,
        limit: Option<usize>,
        token: Option<&PaginationToken>,
    ) -> Result<Page<FolderIndexRecord>> {
        let mut request = QueryRequest::new(folder_partition(site, folder_document_id))
            .limit(self.limits.page_size(limit))
            .start_key(decode_optional(token)?);
        if let Some(entry_type) = entry_type {
            request = request.sk(SkCondition::BeginsWith(entry_type.sk_prefix().to_string()));
        }

        let page = self.store.query(request).await?;
        let items = page
            .items
            .iter()
            .map(|item| FolderIndexRecord::from_item(site, item))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            next_token: encode_token(page.last_key.as_ref())?,
        })
    }

    /// Files whose name starts with `prefix`, case-insensitively, across the
    /// whole site.
    ///
    /// Filenames are bucketed by their first two characters, so a
    /// one-character prefix only matches one-character names.
    pub async fn find_by_filename(
        &self,
        site: Option<&str>,
        prefix: &str,
        limit: Option<usize>,
        token: Option<&PaginationToken>,
    ) -> Result<Page<FolderIndexRecord>> {
        if prefix.is_empty() {
            return Err(IndexError::invalid("'prefix' is required"));
        }

        let request = QueryRequest::new(filename_partition(site, prefix))
            .index(IndexName::Gsi2)
            .sk(SkCondition::BeginsWith(segment_sk(prefix, EntryType::File)))
            .limit(self.limits.page_size(limit))
            .start_key(decode_optional(token)?);

        let page = self.store.query(request).await?;
        let items = page
            .items
            .iter()
            .map(|item| FolderIndexRecord::from_item(site, item))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            next_token: encode_token(page.last_key.as_ref())?,
        })
    }
}

fn table_key(item: &Item) -> Option<(String, String)> {
    Some((
        item_str(item, PK)?.to_string(),
        item_str(item, SK)?.to_string(),
    ))
}
