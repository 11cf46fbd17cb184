//! Access-pattern collection.
//!
//! A `Collection` owns the access patterns of one entity type and turns
//! entity mutations into the store operations that keep every view in step.
//! All operations of one mutation, plus any caller-supplied extras, go to the
//! store as a single `transact_write`.
//!
//! ```text
//! update(entity, changes)
//!     │
//!     ├── drop changes equal to the current values
//!     ├── next = entity ⊕ changes
//!     │
//!     └── per pattern:
//!           was ∧ ¬is          → Delete(prev key)
//!           ¬was ∧ is          → Put(project(next))
//!           is ∧ key changed   → Delete(prev key), Put(project(next))
//!           is ∧ projected Δ   → Update(key, changed projected fields)
//!           otherwise          → nothing
//! ```
//!
//! Updates are planned from the caller's before/after state; nothing is read
//! from the store first.

use crate::error::{ConfigurationError, Result};
use crate::pattern::{AccessPattern, AccessPatternConfig};
use crate::predicate::PredicateRegistry;
use facetdb_commons::{values_equal, Entity, Item, ItemKey, Operation};
use facetdb_store::{KvStore, QueryOptions, QueryPage};
use std::collections::HashSet;

/// Result of a collection mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Operations were submitted and committed
    Applied { operations: usize },
    /// Nothing to write; the store was not contacted
    Skipped,
}

impl WriteOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, WriteOutcome::Skipped)
    }
}

/// The views of one entity type over a shared [`KvStore`].
#[derive(Clone)]
pub struct Collection {
    name: String,
    store: KvStore,
    patterns: Vec<AccessPattern>,
}

impl Collection {
    pub fn new(
        name: impl Into<String>,
        store: KvStore,
        patterns: Vec<AccessPattern>,
    ) -> std::result::Result<Self, ConfigurationError> {
        let name = name.into();
        if patterns.is_empty() {
            return Err(ConfigurationError::NoPatterns(name));
        }
        let mut seen = HashSet::new();
        for pattern in &patterns {
            if !seen.insert(pattern.name()) {
                return Err(ConfigurationError::DuplicatePattern(pattern.name().to_string()));
            }
        }

        log::debug!(
            "Collection '{}' with {} access pattern(s): {}",
            name,
            patterns.len(),
            patterns.iter().map(AccessPattern::name).collect::<Vec<_>>().join(", ")
        );
        Ok(Self { name, store, patterns })
    }

    /// Builds a collection from serialized definitions, resolving named
    /// predicates through `registry`.
    pub fn from_config(
        name: impl Into<String>,
        store: KvStore,
        definitions: Vec<AccessPatternConfig>,
        registry: &PredicateRegistry,
    ) -> std::result::Result<Self, ConfigurationError> {
        let patterns = definitions
            .into_iter()
            .map(|definition| definition.build(registry))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Self::new(name, store, patterns)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    pub fn patterns(&self) -> &[AccessPattern] {
        &self.patterns
    }

    pub fn pattern(&self, name: &str) -> std::result::Result<&AccessPattern, ConfigurationError> {
        self.patterns
            .iter()
            .find(|pattern| pattern.name() == name)
            .ok_or_else(|| ConfigurationError::UnknownPattern(name.to_string()))
    }

    /// One `Put` of the projected item per pattern that includes `entity`.
    pub fn plan_add(&self, entity: &Entity) -> std::result::Result<Vec<Operation>, ConfigurationError> {
        self.patterns
            .iter()
            .filter(|pattern| pattern.includes(entity))
            .map(|pattern| pattern.project(entity).map(Operation::put))
            .collect()
    }

    /// One `Delete` per pattern that currently includes `entity`.
    pub fn plan_remove(&self, entity: &Entity) -> std::result::Result<Vec<Operation>, ConfigurationError> {
        self.patterns
            .iter()
            .filter(|pattern| pattern.includes(entity))
            .map(|pattern| pattern.resolve_key(entity).map(Operation::delete))
            .collect()
    }

    /// Operations that move every view from `entity` to `entity ⊕ changes`.
    pub fn plan_update(
        &self,
        entity: &Entity,
        changes: &Entity,
    ) -> std::result::Result<Vec<Operation>, ConfigurationError> {
        let changes: Entity = changes
            .iter()
            .filter(|(field, value)| {
                !entity
                    .get(field.as_str())
                    .is_some_and(|current| values_equal(current, value))
            })
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect();
        if changes.is_empty() {
            return Ok(Vec::new());
        }

        let mut next = entity.clone();
        for (field, value) in &changes {
            next.insert(field.clone(), value.clone());
        }

        let mut operations = Vec::new();
        for pattern in &self.patterns {
            let was_included = pattern.includes(entity);
            let is_included = pattern.includes(&next);

            if !is_included {
                if was_included {
                    operations.push(Operation::delete(pattern.resolve_key(entity)?));
                }
                continue;
            }
            if !was_included {
                operations.push(Operation::put(pattern.project(&next)?));
                continue;
            }

            let previous_key = pattern.resolve_key(entity)?;
            let next_key = pattern.resolve_key(&next)?;
            if previous_key != next_key {
                operations.push(Operation::delete(previous_key));
                operations.push(Operation::put(pattern.project(&next)?));
                continue;
            }

            let projected: Item = changes
                .iter()
                .filter(|(field, _)| pattern.projects(field))
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect();
            if !projected.is_empty() {
                operations.push(Operation::update(next_key, projected));
            }
        }
        Ok(operations)
    }

    pub async fn add(&self, entity: &Entity, extra_operations: Vec<Operation>) -> Result<WriteOutcome> {
        let operations = self.plan_add(entity)?;
        self.submit("add", operations, extra_operations).await
    }

    pub async fn remove(&self, entity: &Entity, extra_operations: Vec<Operation>) -> Result<WriteOutcome> {
        let operations = self.plan_remove(entity)?;
        self.submit("remove", operations, extra_operations).await
    }

    pub async fn update(
        &self,
        entity: &Entity,
        changes: &Entity,
        extra_operations: Vec<Operation>,
    ) -> Result<WriteOutcome> {
        let operations = self.plan_update(entity, changes)?;
        self.submit("update", operations, extra_operations).await
    }

    /// Resolved keys of every pattern that includes `entity`, by pattern name.
    pub fn keys_for(&self, entity: &Entity) -> std::result::Result<Vec<(String, ItemKey)>, ConfigurationError> {
        self.patterns
            .iter()
            .filter(|pattern| pattern.includes(entity))
            .map(|pattern| -> std::result::Result<_, ConfigurationError> {
                Ok((pattern.name().to_string(), pattern.resolve_key(entity)?))
            })
            .collect()
    }

    /// Reads the item of `pattern` addressed by the key fields in `entity`.
    pub async fn get(&self, pattern: &str, entity: &Entity) -> Result<Option<Item>> {
        let key = self.pattern(pattern)?.resolve_key(entity)?;
        Ok(self.store.get(&key).await?)
    }

    /// Queries the partition of `pattern` addressed by `entity`. Only the
    /// partition-key template is resolved; the sort key is narrowed by
    /// `sort_key_prefix`.
    pub async fn query(
        &self,
        pattern: &str,
        entity: &Entity,
        sort_key_prefix: Option<&str>,
        options: QueryOptions,
    ) -> Result<QueryPage> {
        let pk = self.pattern(pattern)?.partition_key().resolve(entity)?;
        Ok(self.store.query(&pk, sort_key_prefix, options).await?)
    }

    async fn submit(
        &self,
        action: &str,
        mut operations: Vec<Operation>,
        extra_operations: Vec<Operation>,
    ) -> Result<WriteOutcome> {
        operations.extend(extra_operations);
        if operations.is_empty() {
            log::debug!("{} {}: nothing to write", self.name, action);
            return Ok(WriteOutcome::Skipped);
        }

        let count = operations.len();
        log::debug!("{} {}: submitting {} operation(s)", self.name, action, count);
        self.store.transact_write(operations).await?;
        Ok(WriteOutcome::Applied { operations: count })
    }
}
