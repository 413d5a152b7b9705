//! Byte-size estimation for keys and values.

use serde_json::Value;

/// Estimates how many bytes a key or value occupies once stored.
pub trait SizeEstimator: Send + Sync {
    fn estimate_key(&self, key: &str) -> usize;
    fn estimate_value(&self, value: &Value) -> usize;
}

// == JSON Size Estimator ==
/// Rough estimate of the in-memory footprint of a JSON value.
///
/// Strings cost two bytes per UTF-16 unit, numbers eight, booleans four and
/// null nothing. Containers cost the sum of their parts, object keys
/// included.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSizeEstimator;

impl JsonSizeEstimator {
    fn string_size(s: &str) -> usize {
        s.encode_utf16().count() * 2
    }
}

impl SizeEstimator for JsonSizeEstimator {
    fn estimate_key(&self, key: &str) -> usize {
        Self::string_size(key)
    }

    fn estimate_value(&self, value: &Value) -> usize {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 4,
            Value::Number(_) => 8,
            Value::String(s) => Self::string_size(s),
            Value::Array(items) => items.iter().map(|v| self.estimate_value(v)).sum(),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Self::string_size(k) + self.estimate_value(v))
                .sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        let est = JsonSizeEstimator;
        assert_eq!(est.estimate_value(&Value::Null), 0);
        assert_eq!(est.estimate_value(&json!(true)), 4);
        assert_eq!(est.estimate_value(&json!(3.5)), 8);
        assert_eq!(est.estimate_value(&json!("abc")), 6);
    }

    #[test]
    fn test_non_bmp_characters_count_as_two_units() {
        // U+1F600 is a surrogate pair in UTF-16
        assert_eq!(JsonSizeEstimator.estimate_key("\u{1F600}"), 4);
    }

    #[test]
    fn test_containers_sum_their_parts() {
        let est = JsonSizeEstimator;
        assert_eq!(est.estimate_value(&json!([1, "ab", null])), 8 + 4);
        // "id" = 4, 7 = 8, "tags" = 8, ["x"] = 2
        assert_eq!(est.estimate_value(&json!({"id": 7, "tags": ["x"]})), 22);
    }
}
