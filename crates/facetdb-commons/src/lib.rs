//! # facetdb-commons
//!
//! Types shared by every FacetDB crate: the physical [`Item`] shape, its
//! [`ItemKey`], and the write [`Operation`]s that make up a batch.
//!
//! ```text
//! facetdb-views (entities → items)
//!     ↓
//! facetdb-store (items → backend)
//!     ↓
//! RocksDB / in-memory
//! ```

pub mod item;
pub mod operation;
pub mod value;

pub use item::{Entity, Item, ItemKey, KeyError, PARTITION_KEY_FIELD, SORT_KEY_FIELD};
pub use operation::Operation;
pub use value::values_equal;

/// Re-exported so downstream crates agree on a single value type.
pub use serde_json::Value;
