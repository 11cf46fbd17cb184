//! Inclusion predicates.
//!
//! A pattern's item exists only while its predicate accepts the entity. The
//! built-in variants cover the usual field checks; anything else goes through
//! [`EntityPredicate`], either directly via [`Predicate::Custom`] or by name
//! through a [`PredicateRegistry`] when patterns are loaded from configuration.

use crate::error::ConfigurationError;
use facetdb_commons::{values_equal, Entity, Value};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Custom inclusion rule. Must be a pure function of the entity.
pub trait EntityPredicate: Send + Sync {
    fn evaluate(&self, entity: &Entity) -> bool;
}

impl<F> EntityPredicate for F
where
    F: Fn(&Entity) -> bool + Send + Sync,
{
    fn evaluate(&self, entity: &Entity) -> bool {
        self(entity)
    }
}

#[derive(Clone)]
pub enum Predicate {
    Always,
    FieldEquals { field: String, value: Value },
    /// Also false when the field is absent
    FieldNotEquals { field: String, value: Value },
    FieldPresent { field: String },
    /// Present and not `null`, `false`, `0` or `""`
    FieldTruthy { field: String },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
    Custom(Arc<dyn EntityPredicate>),
}

impl Predicate {
    pub fn field_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field_not_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::FieldNotEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn field_present(field: impl Into<String>) -> Self {
        Predicate::FieldPresent { field: field.into() }
    }

    pub fn field_truthy(field: impl Into<String>) -> Self {
        Predicate::FieldTruthy { field: field.into() }
    }

    pub fn custom<P: EntityPredicate + 'static>(predicate: P) -> Self {
        Predicate::Custom(Arc::new(predicate))
    }

    pub fn evaluate(&self, entity: &Entity) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::FieldEquals { field, value } => {
                entity.get(field).is_some_and(|current| values_equal(current, value))
            }
            Predicate::FieldNotEquals { field, value } => {
                entity.get(field).is_some_and(|current| !values_equal(current, value))
            }
            Predicate::FieldPresent { field } => entity.contains_key(field),
            Predicate::FieldTruthy { field } => entity.get(field).is_some_and(is_truthy),
            Predicate::All(predicates) => predicates.iter().all(|p| p.evaluate(entity)),
            Predicate::Any(predicates) => predicates.iter().any(|p| p.evaluate(entity)),
            Predicate::Not(predicate) => !predicate.evaluate(entity),
            Predicate::Custom(predicate) => predicate.evaluate(entity),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Always => f.write_str("Always"),
            Predicate::FieldEquals { field, value } => write!(f, "FieldEquals({} = {})", field, value),
            Predicate::FieldNotEquals { field, value } => write!(f, "FieldNotEquals({} != {})", field, value),
            Predicate::FieldPresent { field } => write!(f, "FieldPresent({})", field),
            Predicate::FieldTruthy { field } => write!(f, "FieldTruthy({})", field),
            Predicate::All(predicates) => f.debug_tuple("All").field(predicates).finish(),
            Predicate::Any(predicates) => f.debug_tuple("Any").field(predicates).finish(),
            Predicate::Not(predicate) => f.debug_tuple("Not").field(predicate).finish(),
            Predicate::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Named custom predicates available to configuration-loaded patterns.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    named: HashMap<String, Arc<dyn EntityPredicate>>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: EntityPredicate + 'static>(mut self, name: impl Into<String>, predicate: P) -> Self {
        self.named.insert(name.into(), Arc::new(predicate));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn EntityPredicate>> {
        self.named.get(name).cloned()
    }
}

/// Configuration form of a [`Predicate`].
///
/// ```toml
/// predicate = { field_equals = { field = "status", value = "active" } }
/// predicate = { named = "isActive" }
/// predicate = "always"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum PredicateConfig {
    Always,
    FieldEquals { field: String, value: Value },
    FieldNotEquals { field: String, value: Value },
    FieldPresent { field: String },
    FieldTruthy { field: String },
    All(Vec<PredicateConfig>),
    Any(Vec<PredicateConfig>),
    Not(Box<PredicateConfig>),
    /// Looked up in the [`PredicateRegistry`]
    Named(String),
}

impl PredicateConfig {
    pub fn build(self, registry: &PredicateRegistry) -> Result<Predicate, ConfigurationError> {
        let build_all = |configs: Vec<PredicateConfig>| {
            configs
                .into_iter()
                .map(|config| config.build(registry))
                .collect::<Result<Vec<_>, _>>()
        };

        Ok(match self {
            PredicateConfig::Always => Predicate::Always,
            PredicateConfig::FieldEquals { field, value } => Predicate::FieldEquals { field, value },
            PredicateConfig::FieldNotEquals { field, value } => Predicate::FieldNotEquals { field, value },
            PredicateConfig::FieldPresent { field } => Predicate::FieldPresent { field },
            PredicateConfig::FieldTruthy { field } => Predicate::FieldTruthy { field },
            PredicateConfig::All(configs) => Predicate::All(build_all(configs)?),
            PredicateConfig::Any(configs) => Predicate::Any(build_all(configs)?),
            PredicateConfig::Not(config) => Predicate::Not(Box::new(config.build(registry)?)),
            PredicateConfig::Named(name) => match registry.get(&name) {
                Some(predicate) => Predicate::Custom(predicate),
                None => return Err(ConfigurationError::UnknownPredicate(name)),
            },
        })
    }
}
