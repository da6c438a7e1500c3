//! Pagination token codec.
//!
//! A query's resume key is a map of key attribute names to values. Which
//! names appear depends on the projection that produced it (`PK`/`SK` for the
//! table, plus `GSI1PK`/`GSI1SK` or `GSI2PK`/`GSI2SK` for an index query), so
//! the codec carries whatever it is given verbatim. Tokens are URL-safe
//! base64 over the tagged JSON form of the map.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::interfaces::{AttrValue, Item};

/// Opaque, round-trippable resume position of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaginationToken(String);

impl PaginationToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaginationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PaginationToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// A page of results plus the token for the next page, if any.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<PaginationToken>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_token: self.next_token,
        }
    }
}

/// Encode a resume key. Returns `None` when there is nothing to resume from.
pub fn encode_token(last_key: Option<&Item>) -> Result<Option<PaginationToken>> {
    let Some(last_key) = last_key.filter(|k| !k.is_empty()) else {
        return Ok(None);
    };

    // Ordered so equal keys always produce the same token.
    let ordered: BTreeMap<&String, &AttrValue> = last_key.iter().collect();
    let json = serde_json::to_vec(&ordered)
        .map_err(|e| IndexError::InvalidToken(format!("cannot encode resume key: {}", e)))?;

    Ok(Some(PaginationToken(URL_SAFE_NO_PAD.encode(json))))
}

/// Decode a token back into the resume key it was minted from.
pub fn decode_token(token: &PaginationToken) -> Result<Item> {
    let json = URL_SAFE_NO_PAD
        .decode(token.as_str())
        .map_err(|e| IndexError::InvalidToken(e.to_string()))?;

    let key: Item =
        serde_json::from_slice(&json).map_err(|e| IndexError::InvalidToken(e.to_string()))?;

    if key.is_empty() {
        return Err(IndexError::InvalidToken("empty resume key".to_string()));
    }

    Ok(key)
}

/// Decode an optional token.
pub fn decode_optional(token: Option<&PaginationToken>) -> Result<Option<Item>> {
    token.map(decode_token).transpose()
}

#[cfg(test)]
mod tests;
