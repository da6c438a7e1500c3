//! Folder tree over the flat key space.

pub mod path;
mod processor;
mod record;

pub use path::EntryType;
pub use processor::FolderIndexProcessor;
pub use record::{
    filename_bucket, folder_partition, format_date, parse_date, segment_sk, FolderIndexRecord,
    ResolvedRecord, DATE_FORMAT, FOLDER_GSI1_SK,
};
