//! Access patterns: one physical item shape derived from an entity.

use crate::error::ConfigurationError;
use crate::predicate::{Predicate, PredicateConfig, PredicateRegistry};
use crate::template::KeyTemplate;
use facetdb_commons::{Entity, Item, ItemKey};
use serde::Deserialize;

/// A view definition: key templates, optional projection and optional
/// inclusion predicate.
#[derive(Debug, Clone)]
pub struct AccessPattern {
    name: String,
    partition_key: KeyTemplate,
    sort_key: KeyTemplate,
    fields: Option<Vec<String>>,
    predicate: Option<Predicate>,
}

impl AccessPattern {
    /// Both templates are required; an empty template counts as missing.
    pub fn new(
        name: impl Into<String>,
        partition_key: &str,
        sort_key: &str,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into();
        let partition_key = required_template(&name, "partition key", Some(partition_key))?;
        let sort_key = required_template(&name, "sort key", Some(sort_key))?;
        Ok(Self {
            name,
            partition_key,
            sort_key,
            fields: None,
            predicate: None,
        })
    }

    /// Restricts stored attributes to `fields` (plus the derived keys).
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_key(&self) -> &KeyTemplate {
        &self.partition_key
    }

    pub fn sort_key(&self) -> &KeyTemplate {
        &self.sort_key
    }

    /// `None` means the whole entity is projected.
    pub fn fields(&self) -> Option<&[String]> {
        self.fields.as_deref()
    }

    /// Whether this pattern's item should exist for `entity`.
    pub fn includes(&self, entity: &Entity) -> bool {
        self.predicate
            .as_ref()
            .map_or(true, |predicate| predicate.evaluate(entity))
    }

    pub fn resolve_key(&self, entity: &Entity) -> Result<ItemKey, ConfigurationError> {
        Ok(ItemKey::new(
            self.partition_key.resolve(entity)?,
            self.sort_key.resolve(entity)?,
        ))
    }

    /// True if `field` is stored on this pattern's item. Reserved key fields
    /// are always derived, never projected.
    pub fn projects(&self, field: &str) -> bool {
        if ItemKey::is_key_field(field) {
            return false;
        }
        match &self.fields {
            Some(fields) => fields.iter().any(|f| f == field),
            None => true,
        }
    }

    /// Builds the stored item: projected entity fields plus derived keys.
    /// Projected fields the entity lacks are left out.
    pub fn project(&self, entity: &Entity) -> Result<Item, ConfigurationError> {
        let key = self.resolve_key(entity)?;
        let mut item = key.to_item();
        match &self.fields {
            Some(fields) => {
                for field in fields.iter().filter(|f| !ItemKey::is_key_field(f)) {
                    if let Some(value) = entity.get(field) {
                        item.insert(field.clone(), value.clone());
                    }
                }
            }
            None => {
                for (field, value) in entity.iter().filter(|(f, _)| !ItemKey::is_key_field(f)) {
                    item.insert(field.clone(), value.clone());
                }
            }
        }
        Ok(item)
    }
}

fn required_template(
    pattern: &str,
    which: &'static str,
    template: Option<&str>,
) -> Result<KeyTemplate, ConfigurationError> {
    match template {
        Some(template) if !template.trim().is_empty() => KeyTemplate::parse(template),
        _ => Err(ConfigurationError::MissingTemplate {
            pattern: pattern.to_string(),
            which,
        }),
    }
}

/// Serialized form of an [`AccessPattern`].
///
/// ```toml
/// [[patterns]]
/// name = "byEmail"
/// partition_key = "email#{email}"
/// sort_key = "user"
/// fields = ["id"]
/// predicate = { field_present = { field = "email" } }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessPatternConfig {
    pub name: String,
    #[serde(default, alias = "pk")]
    pub partition_key: Option<String>,
    #[serde(default, alias = "sk")]
    pub sort_key: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub predicate: Option<PredicateConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatternFile {
    patterns: Vec<AccessPatternConfig>,
}

impl AccessPatternConfig {
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigurationError> {
        serde_json::from_value(value).map_err(|e| ConfigurationError::InvalidDefinition(e.to_string()))
    }

    /// Parses a list of definitions from a JSON array.
    pub fn list_from_value(value: serde_json::Value) -> Result<Vec<Self>, ConfigurationError> {
        serde_json::from_value(value).map_err(|e| ConfigurationError::InvalidDefinition(e.to_string()))
    }

    /// Parses a TOML document of `[[patterns]]` tables.
    pub fn list_from_toml(source: &str) -> Result<Vec<Self>, ConfigurationError> {
        toml::from_str::<PatternFile>(source)
            .map(|file| file.patterns)
            .map_err(|e| ConfigurationError::InvalidDefinition(e.to_string()))
    }

    pub fn build(self, registry: &PredicateRegistry) -> Result<AccessPattern, ConfigurationError> {
        let partition_key = required_template(&self.name, "partition key", self.partition_key.as_deref())?;
        let sort_key = required_template(&self.name, "sort key", self.sort_key.as_deref())?;
        let predicate = self
            .predicate
            .map(|config| config.build(registry))
            .transpose()?;

        Ok(AccessPattern {
            name: self.name,
            partition_key,
            sort_key,
            fields: self.fields,
            predicate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn entity(value: Value) -> Entity {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_projection_with_fields() {
        let pattern = AccessPattern::new("profile", "user#{id}", "profile")
            .unwrap()
            .with_fields(["name", "email", "phone"]);
        let item = pattern
            .project(&entity(json!({"id": "42", "name": "Ann", "email": "a@x.com", "age": 30})))
            .unwrap();
        assert_eq!(
            Value::Object(item),
            json!({"pk": "user#42", "sk": "profile", "name": "Ann", "email": "a@x.com"})
        );
    }

    #[test]
    fn test_whole_entity_projection_keeps_derived_keys() {
        let pattern = AccessPattern::new("all", "user#{id}", "v").unwrap();
        let item = pattern
            .project(&entity(json!({"id": "1", "pk": "spoofed", "x": 1})))
            .unwrap();
        assert_eq!(Value::Object(item), json!({"pk": "user#1", "sk": "v", "id": "1", "x": 1}));
        assert!(!pattern.projects("sk"));
        assert!(pattern.projects("anything"));
    }

    #[test]
    fn test_missing_templates() {
        assert!(matches!(
            AccessPattern::new("p", "", "sk"),
            Err(ConfigurationError::MissingTemplate { which: "partition key", .. })
        ));
        let config = AccessPatternConfig::from_value(json!({"name": "p", "partition_key": "a"})).unwrap();
        assert!(matches!(
            config.build(&PredicateRegistry::new()),
            Err(ConfigurationError::MissingTemplate { which: "sort key", .. })
        ));
    }

    #[test]
    fn test_unknown_configuration_key_rejected() {
        let err = AccessPatternConfig::from_value(json!({
            "name": "p", "pk": "a", "sk": "b", "ttl": 30
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDefinition(_)));
    }

    #[test]
    fn test_list_from_toml() {
        let source = r#"
            [[patterns]]
            name = "profile"
            pk = "user#{id}"
            sk = "profile"
            fields = ["name"]

            [[patterns]]
            name = "byEmail"
            partition_key = "email#{email}"
            sort_key = "user"
            predicate = { field_present = { field = "email" } }
        "#;
        let configs = AccessPatternConfig::list_from_toml(source).unwrap();
        assert_eq!(configs.len(), 2);
        let by_email = configs[1].clone().build(&PredicateRegistry::new()).unwrap();
        assert!(!by_email.includes(&entity(json!({"id": "1"}))));
        assert_eq!(
            by_email.resolve_key(&entity(json!({"email": "a@x.com"}))).unwrap(),
            ItemKey::new("email#a@x.com", "user")
        );
    }
}
