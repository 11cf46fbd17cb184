//! Write operations that make up a batch.

use crate::item::{Item, ItemKey, KeyError};
use serde::{Deserialize, Serialize};

/// A single write inside a batch or transaction.
///
/// Batches are ordered: backends apply operations in the order given, so a
/// `Delete` followed by a `Put` on a related key keeps that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Insert or replace a whole item (key fields included)
    Put { item: Item },

    /// Merge `changes` into the item at `key`, creating it if absent
    Update { key: ItemKey, changes: Item },

    /// Remove the item at `key`; missing items are ignored
    Delete { key: ItemKey },
}

impl Operation {
    pub fn put(item: Item) -> Self {
        Operation::Put { item }
    }

    pub fn update(key: ItemKey, changes: Item) -> Self {
        Operation::Update { key, changes }
    }

    pub fn delete(key: ItemKey) -> Self {
        Operation::Delete { key }
    }

    /// Key targeted by this operation.
    pub fn key(&self) -> Result<ItemKey, KeyError> {
        match self {
            Operation::Put { item } => ItemKey::from_item(item),
            Operation::Update { key, .. } | Operation::Delete { key } => Ok(key.clone()),
        }
    }

    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Put { .. } => "put",
            Operation::Update { .. } => "update",
            Operation::Delete { .. } => "delete",
        }
    }
}
