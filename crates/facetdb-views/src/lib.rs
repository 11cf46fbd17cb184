//! # facetdb-views
//!
//! Denormalized views of one logical entity, kept consistent on a store that
//! is only atomic per bounded batch.
//!
//! An entity type declares its [`AccessPattern`]s: key templates, an optional
//! projection and an optional inclusion [`Predicate`]. A [`Collection`] turns
//! `add`/`update`/`remove` of an entity into the minimal operation list that
//! brings every view in line, and submits it as one transaction.
//!
//! ```rust,ignore
//! let users = Collection::new("users", store, vec![
//!     AccessPattern::new("profile", "user#{id}", "profile")?.with_fields(["name", "email"]),
//!     AccessPattern::new("byEmail", "email#{email}", "user")?.with_fields(["id"]),
//! ])?;
//!
//! users.add(&user, vec![]).await?;
//! users.update(&user, &changes, vec![]).await?;
//! ```

pub mod collection;
pub mod error;
pub mod pattern;
pub mod predicate;
pub mod template;

pub use collection::{Collection, WriteOutcome};
pub use error::{ConfigurationError, Result, ViewError};
pub use pattern::{AccessPattern, AccessPatternConfig};
pub use predicate::{EntityPredicate, Predicate, PredicateConfig, PredicateRegistry};
pub use template::{resolve_key, KeyTemplate};
