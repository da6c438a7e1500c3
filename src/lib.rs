//! Docindex - indexing and addressing for a multi-tenant document store
//!
//! Emulates tenant isolation, a mutable folder tree and multi-attribute
//! search on a partitioned key-value store that offers only point reads,
//! single-partition range queries and conditional writes.

pub mod attributes;
pub mod config;
pub mod documents;
pub mod error;
pub mod folders;
pub mod index_writer;
pub mod interfaces;
pub mod keys;
pub mod pagination;
pub mod search;
pub mod storage;
pub mod utils;

pub use error::{IndexError, Result};
pub use folders::{EntryType, FolderIndexProcessor, FolderIndexRecord, ResolvedRecord};
pub use index_writer::{GlobalIndexWriter, RecencyCache};
pub use interfaces::KeyStore;
pub use pagination::{decode_token, encode_token, Page, PaginationToken};
pub use search::{compose_search_criteria, AttributeCriteria, CompositeCriteria};
