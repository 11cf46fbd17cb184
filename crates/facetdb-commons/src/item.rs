//! Physical item model.
//!
//! Every item stored by FacetDB is a flat JSON object with two reserved string
//! fields, [`PARTITION_KEY_FIELD`] and [`SORT_KEY_FIELD`]. Everything else is
//! an opaque attribute.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Reserved attribute holding the partition key of every item.
pub const PARTITION_KEY_FIELD: &str = "pk";

/// Reserved attribute holding the sort key of every item.
pub const SORT_KEY_FIELD: &str = "sk";

/// A stored record: reserved key fields plus arbitrary attributes.
pub type Item = Map<String, Value>;

/// An application-level record. Same shape as an [`Item`] but never persisted
/// directly; only the items derived from it are.
pub type Entity = Map<String, Value>;

/// Errors raised when an item does not carry a usable key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("item is missing key field '{0}'")]
    MissingField(&'static str),
    #[error("key field '{0}' must be a string")]
    NotAString(&'static str),
}

/// Exact address of one item: partition key plus sort key.
///
/// Ordering is `(pk, sk)` lexicographic, which matches the byte order used by
/// the RocksDB key encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub pk: String,
    pub sk: String,
}

impl ItemKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }

    /// Reads the reserved key fields out of an item.
    pub fn from_item(item: &Item) -> Result<Self, KeyError> {
        Ok(Self {
            pk: key_field(item, PARTITION_KEY_FIELD)?,
            sk: key_field(item, SORT_KEY_FIELD)?,
        })
    }

    /// Returns `true` if `field` is one of the reserved key attributes.
    pub fn is_key_field(field: &str) -> bool {
        field == PARTITION_KEY_FIELD || field == SORT_KEY_FIELD
    }

    /// Builds an item containing only the key attributes.
    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert(PARTITION_KEY_FIELD.to_string(), Value::String(self.pk.clone()));
        item.insert(SORT_KEY_FIELD.to_string(), Value::String(self.sk.clone()));
        item
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pk, self.sk)
    }
}

fn key_field(item: &Item, field: &'static str) -> Result<String, KeyError> {
    match item.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(KeyError::NotAString(field)),
        None => Err(KeyError::MissingField(field)),
    }
}
