//! Bounds applied by the index layer.

use serde::Deserialize;

/// Default maximum number of parent hops when walking a folder upward.
pub const DEFAULT_MAX_FOLDER_DEPTH: usize = 100;

/// Default number of tag keys remembered per site by the global index writer.
pub const DEFAULT_RECENCY_CACHE_CAPACITY: usize = 500;

/// Default page size of list queries.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Default upper bound on a requested page size.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// Limits for tree walks, caches and pagination.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexLimits {
    /// Maximum parent hops before a folder walk is declared corrupt.
    ///
    /// Default: 100. A walk that exceeds this has found a parent-pointer
    /// cycle or a tree deeper than any path the layer creates.
    pub max_folder_depth: usize,

    /// Tag keys remembered per site before the oldest is evicted.
    pub recency_cache_capacity: usize,

    /// Page size used when the caller supplies none.
    pub default_page_size: usize,

    /// Largest page size a caller may request.
    pub max_page_size: usize,
}

impl Default for IndexLimits {
    fn default() -> Self {
        Self {
            max_folder_depth: DEFAULT_MAX_FOLDER_DEPTH,
            recency_cache_capacity: DEFAULT_RECENCY_CACHE_CAPACITY,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }
}

impl IndexLimits {
    /// Clamp a requested page size into `1..=max_page_size`.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}
