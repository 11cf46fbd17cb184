use facetdb_store::StorageError;
use thiserror::Error;

/// Result type for collection operations.
pub type Result<T> = std::result::Result<T, ViewError>;

/// Invalid access-pattern definition or unresolvable key template.
///
/// Raised at construction for bad definitions and while planning a write when
/// an entity lacks a field a template needs. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Access pattern '{pattern}' has no {which} template")]
    MissingTemplate { pattern: String, which: &'static str },

    #[error("Invalid key template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Key template '{template}' references field '{field}' which the entity does not have")]
    UnresolvedPlaceholder { template: String, field: String },

    #[error("Key template '{template}' references field '{field}' which is not a string, number or boolean")]
    NonScalarField { template: String, field: String },

    #[error("Unknown predicate '{0}'")]
    UnknownPredicate(String),

    #[error("Unknown access pattern '{0}'")]
    UnknownPattern(String),

    #[error("Access pattern '{0}' is defined more than once")]
    DuplicatePattern(String),

    #[error("Collection '{0}' declares no access patterns")]
    NoPatterns(String),

    /// Unknown configuration keys, wrong types and other decoding failures
    #[error("Invalid access pattern definition: {0}")]
    InvalidDefinition(String),
}

/// Anything a collection operation can fail with.
#[derive(Debug, Clone, Error)]
pub enum ViewError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ViewError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, ViewError::Configuration(_))
    }
}
