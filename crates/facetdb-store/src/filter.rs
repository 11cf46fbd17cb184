//! Query filter expressions.
//!
//! Filters are written as `"field operator value"` strings and ANDed together.
//! The value literal is coerced: `true`/`false` become booleans, anything that
//! parses as a number becomes a number, everything else stays a string.
//! Wrapping the value in single or double quotes forces a string.
//!
//! Supported operators: `=`, `!=`, `<>`, `<`, `<=`, `>`, `>=`, `begins_with`,
//! `contains`. An item lacking the field never matches.

use crate::error::{Result, StorageError};
use facetdb_commons::{values_equal, Item, Value};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    BeginsWith,
    Contains,
}

impl FromStr for FilterOp {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "=" | "==" => Ok(FilterOp::Eq),
            "!=" | "<>" => Ok(FilterOp::Ne),
            "<" => Ok(FilterOp::Lt),
            "<=" => Ok(FilterOp::Le),
            ">" => Ok(FilterOp::Gt),
            ">=" => Ok(FilterOp::Ge),
            "begins_with" => Ok(FilterOp::BeginsWith),
            "contains" => Ok(FilterOp::Contains),
            other => Err(format!("unknown operator '{}'", other)),
        }
    }
}

/// One parsed `field operator value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn parse(expr: &str) -> Result<Self> {
        let invalid = |reason: &str| StorageError::InvalidFilter {
            filter: expr.to_string(),
            reason: reason.to_string(),
        };

        let (field, rest) = expr
            .trim()
            .split_once(char::is_whitespace)
            .ok_or_else(|| invalid("expected 'field operator value'"))?;
        let (op, value) = rest
            .trim_start()
            .split_once(char::is_whitespace)
            .ok_or_else(|| invalid("expected 'field operator value'"))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(invalid("missing value"));
        }

        Ok(Self {
            field: field.to_string(),
            op: op.parse().map_err(|reason: String| invalid(&reason))?,
            value: coerce_literal(value),
        })
    }

    /// Parses every expression, failing on the first invalid one.
    pub fn parse_all<S: AsRef<str>>(exprs: &[S]) -> Result<Vec<Self>> {
        exprs.iter().map(|e| Self::parse(e.as_ref())).collect()
    }

    pub fn matches(&self, item: &Item) -> bool {
        let Some(actual) = item.get(&self.field) else {
            return false;
        };

        match self.op {
            FilterOp::Eq => values_equal(actual, &self.value),
            FilterOp::Ne => !values_equal(actual, &self.value),
            FilterOp::Lt => compare(actual, &self.value) == Some(Ordering::Less),
            FilterOp::Le => matches!(
                compare(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Gt => compare(actual, &self.value) == Some(Ordering::Greater),
            FilterOp::Ge => matches!(
                compare(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::BeginsWith => match (actual, &self.value) {
                (Value::String(a), Value::String(b)) => a.starts_with(b.as_str()),
                _ => false,
            },
            FilterOp::Contains => match (actual, literal_text(&self.value)) {
                (Value::String(a), Some(needle)) => a.contains(needle.as_str()),
                (Value::Array(values), _) => values.iter().any(|v| values_equal(v, &self.value)),
                _ => false,
            },
        }
    }
}

impl FromStr for Filter {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Coerces a raw filter literal to a JSON value.
pub fn coerce_literal(raw: &str) -> Value {
    let quoted = raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"'))
            || (raw.starts_with('\'') && raw.ends_with('\'')));
    if quoted {
        return Value::String(raw[1..raw.len() - 1].to_string());
    }

    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        if let Some(number) = serde_json::Number::from_f64(float) {
            return Value::Number(number);
        }
    }
    Value::String(raw.to_string())
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

// `contains` on a string attribute searches for the literal as text, so
// `tags contains 42` still finds "v42".
fn literal_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
