//! Key templates.
//!
//! A template is literal text with `{field}` placeholders, e.g.
//! `user#{id}` or `order#{createdAt}#{orderId}`. A placeholder may also
//! bucket its value: `{customerId|shard:16}` resolves to
//! `partition(customerId, 16)`.
//!
//! Resolution is a pure function of the template and the entity.

use crate::error::ConfigurationError;
use facetdb_commons::{Entity, Value};
use facetdb_sharding::partition;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
    Shard { field: String, partitions: u32 },
}

impl Segment {
    fn field(&self) -> Option<&str> {
        match self {
            Segment::Literal(_) => None,
            Segment::Field(field) | Segment::Shard { field, .. } => Some(field),
        }
    }
}

/// Parsed key template.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct KeyTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl KeyTemplate {
    pub fn parse(template: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut placeholder = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => return Err(invalid("nested '{'")),
                            Some(c) => placeholder.push(c),
                            None => return Err(invalid("unclosed '{'")),
                        }
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(parse_placeholder(&placeholder).map_err(|reason| invalid(&reason))?);
                }
                '}' => return Err(invalid("unmatched '}'")),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Entity fields this template reads, in order of appearance.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::field)
    }

    /// True if the template has no placeholders.
    pub fn is_constant(&self) -> bool {
        self.fields().next().is_none()
    }

    /// Substitutes every placeholder with the entity's field value.
    ///
    /// Absent or null fields are unresolved; arrays and objects are rejected.
    pub fn resolve(&self, entity: &Entity) -> Result<String, ConfigurationError> {
        let mut key = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => key.push_str(text),
                Segment::Field(field) => key.push_str(&self.render(entity, field)?),
                Segment::Shard { field, partitions } => {
                    let value = self.render(entity, field)?;
                    key.push_str(&partition(&value, *partitions).to_string());
                }
            }
        }
        Ok(key)
    }

    fn render(&self, entity: &Entity, field: &str) -> Result<String, ConfigurationError> {
        match entity.get(field) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(Value::Bool(b)) => Ok(b.to_string()),
            Some(Value::Array(_)) | Some(Value::Object(_)) => Err(ConfigurationError::NonScalarField {
                template: self.source.clone(),
                field: field.to_string(),
            }),
            Some(Value::Null) | None => Err(ConfigurationError::UnresolvedPlaceholder {
                template: self.source.clone(),
                field: field.to_string(),
            }),
        }
    }
}

fn parse_placeholder(placeholder: &str) -> Result<Segment, String> {
    let (field, modifier) = match placeholder.split_once('|') {
        Some((field, modifier)) => (field.trim(), Some(modifier.trim())),
        None => (placeholder.trim(), None),
    };
    if field.is_empty() {
        return Err("empty placeholder".to_string());
    }

    match modifier {
        None => Ok(Segment::Field(field.to_string())),
        Some(modifier) => {
            let count = modifier
                .strip_prefix("shard:")
                .ok_or_else(|| format!("unknown modifier '{}'", modifier))?;
            let partitions: u32 = count
                .trim()
                .parse()
                .map_err(|_| format!("shard count '{}' is not a positive integer", count))?;
            if partitions == 0 {
                return Err("shard count must be at least 1".to_string());
            }
            Ok(Segment::Shard {
                field: field.to_string(),
                partitions,
            })
        }
    }
}

impl TryFrom<String> for KeyTemplate {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for KeyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parses `template` and resolves it against `entity` in one step.
pub fn resolve_key(template: &str, entity: &Entity) -> Result<String, ConfigurationError> {
    KeyTemplate::parse(template)?.resolve(entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: serde_json::Value) -> Entity {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_resolve_fields_and_literals() {
        let e = entity(json!({"id": "42", "n": 7, "ok": true}));
        assert_eq!(resolve_key("user#{id}", &e).unwrap(), "user#42");
        assert_eq!(resolve_key("{id}/{n}/{ok}", &e).unwrap(), "42/7/true");
        assert_eq!(resolve_key("profile", &e).unwrap(), "profile");
    }

    #[test]
    fn test_missing_and_null_fields_are_unresolved() {
        let e = entity(json!({"id": null}));
        for template in ["user#{id}", "user#{email}"] {
            assert!(matches!(
                resolve_key(template, &e),
                Err(ConfigurationError::UnresolvedPlaceholder { .. })
            ));
        }
    }

    #[test]
    fn test_non_scalar_field_rejected() {
        let e = entity(json!({"tags": ["a"]}));
        assert!(matches!(
            resolve_key("t#{tags}", &e),
            Err(ConfigurationError::NonScalarField { .. })
        ));
    }

    #[test]
    fn test_shard_placeholder() {
        let e = entity(json!({"customer": "c-991"}));
        let expected = format!("orders#{}", partition("c-991", 8));
        assert_eq!(resolve_key("orders#{customer|shard:8}", &e).unwrap(), expected);
    }

    #[test]
    fn test_malformed_templates() {
        for template in ["user#{id", "user#id}", "{}", "{a{b}}", "{id|shard:0}", "{id|shard:x}", "{id|upper}"] {
            assert!(
                matches!(KeyTemplate::parse(template), Err(ConfigurationError::InvalidTemplate { .. })),
                "{} should be rejected",
                template
            );
        }
    }

    #[test]
    fn test_fields_listing() {
        let t = KeyTemplate::parse("order#{createdAt}#{id|shard:4}").unwrap();
        assert_eq!(t.fields().collect::<Vec<_>>(), vec!["createdAt", "id"]);
        assert!(!t.is_constant());
        assert!(KeyTemplate::parse("profile").unwrap().is_constant());
    }

    #[test]
    fn test_deserialize_from_string() {
        let t: KeyTemplate = serde_json::from_value(json!("user#{id}")).unwrap();
        assert_eq!(t.as_str(), "user#{id}");
        assert!(serde_json::from_value::<KeyTemplate>(json!("user#{id")).is_err());
    }
}
