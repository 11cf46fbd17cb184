//! Attribute value comparison.

use serde_json::Value;

/// Deep equality where numbers compare by numeric value, so `30` equals
/// `30.0`. Arrays compare element-wise and objects key by key.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_compare_by_value() {
        assert!(values_equal(&json!(30), &json!(30.0)));
        assert!(values_equal(&json!(-2), &json!(-2.0)));
        assert!(!values_equal(&json!(30), &json!(30.5)));
        assert!(!values_equal(&json!(30), &json!("30")));
    }

    #[test]
    fn test_nested_values() {
        assert!(values_equal(&json!({"a": [1, {"b": 2.0}]}), &json!({"a": [1.0, {"b": 2}]})));
        assert!(!values_equal(&json!([1, 2]), &json!([1, 2, 3])));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": null})));
        assert!(!values_equal(&json!({"a": 1}), &json!({"b": 1})));
    }
}
