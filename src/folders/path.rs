//! Path syntax.
//!
//! A path is a `/`-separated list of segments. A trailing `/` (or an empty
//! path) denotes a folder; anything else names a file in its last segment.

use std::fmt;

/// Kind of tree entry a path or record denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    File,
    Folder,
}

impl EntryType {
    /// Classify a path by the trailing-separator convention.
    pub fn of_path(path: &str) -> Self {
        if path.is_empty() || path.ends_with('/') {
            EntryType::Folder
        } else {
            EntryType::File
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::File => "file",
            EntryType::Folder => "folder",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "file" => Some(EntryType::File),
            "folder" => Some(EntryType::Folder),
            _ => None,
        }
    }

    /// Sort key prefix that keeps files and folders in separate ranges of a
    /// parent's partition.
    pub fn sk_prefix(&self) -> &'static str {
        match self {
            EntryType::File => "fi#",
            EntryType::Folder => "ff#",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split a path into its segments.
///
/// Leading dots and separators are dropped and repeated separators collapse,
/// so `"//a///b/"` and `"a/b"` yield the same segments.
pub fn tokens(path: &str) -> Vec<String> {
    if path.is_empty() || path == "/" {
        return Vec::new();
    }

    path.replace(":://", "/")
        .trim_start_matches('.')
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Last segment of a path.
pub fn filename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Extension of a filename, without the dot.
pub fn extension(filename: &str) -> Option<&str> {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Rename a leaf that collides with another document's entry:
/// `"invoice.pdf"` becomes `"invoice (doc-id).pdf"`.
pub fn disambiguate(filename: &str, document_id: &str) -> String {
    match extension(filename) {
        Some(ext) => {
            let stem = &filename[..filename.len() - ext.len() - 1];
            format!("{} ({}).{}", stem, document_id, ext)
        }
        None => format!("{} ({})", filename, document_id),
    }
}

/// Split a folder path into its parent folder path and its own name.
///
/// `"a/b/c/"` gives `("a/b/", "c")`; a single segment lives under the root.
pub fn split_parent(folder_path: &str) -> (String, String) {
    let trimmed = folder_path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(pos) => (
            format!("{}/", &trimmed[..pos]),
            trimmed[pos + 1..].to_string(),
        ),
        None => ("/".to_string(), trimmed.to_string()),
    }
}

/// Join folder names and an optional leaf into a materialized path.
pub fn join<'a>(folders: impl IntoIterator<Item = &'a str>, leaf: &str) -> String {
    let mut path: String = folders
        .into_iter()
        .filter(|f| !f.is_empty())
        .map(|f| format!("{}/", f))
        .collect();
    path.push_str(leaf);
    path
}
