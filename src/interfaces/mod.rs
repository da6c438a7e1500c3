//! Abstract interfaces for docindex components.
//!
//! The index layer never talks to a database client directly; everything
//! goes through the `KeyStore` contract defined here.

pub mod keystore;

pub use keystore::{
    item_str, key_attributes, AttrValue, IndexName, Item, KeyStore, PutOutcome, QueryPage,
    QueryRequest, SkCondition, StorageError,
};
