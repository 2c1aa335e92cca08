//! Structural comparison of JSON output
//!
//! Tools that can dump their parsed model as JSON are compared value by
//! value, so key order and formatting never count as a difference.

use serde_json::Value;

use crate::common::truncate_for_display;

/// Longest rendering of a value kept in a difference report
const MAX_VALUE_LEN: usize = 120;

/// First point where two JSON documents disagree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonDifference {
    /// Location in `$.a.b[3]` notation
    pub path: String,
    pub baseline: String,
    pub modified: String,
}

/// Find the first difference between two JSON values, in document order
pub fn first_difference(baseline: &Value, modified: &Value) -> Option<JsonDifference> {
    diff_at("$".to_string(), baseline, modified)
}

fn diff_at(path: String, baseline: &Value, modified: &Value) -> Option<JsonDifference> {
    match (baseline, modified) {
        (Value::Object(a), Value::Object(b)) => {
            for (key, value_a) in a {
                let child = format!("{}.{}", path, key);
                match b.get(key) {
                    Some(value_b) => {
                        if let Some(diff) = diff_at(child, value_a, value_b) {
                            return Some(diff);
                        }
                    }
                    None => return Some(difference(child, render(value_a), "<missing>".into())),
                }
            }
            b.iter()
                .find(|(key, _)| !a.contains_key(*key))
                .map(|(key, value_b)| {
                    difference(format!("{}.{}", path, key), "<missing>".into(), render(value_b))
                })
        }
        (Value::Array(a), Value::Array(b)) => {
            for (i, (value_a, value_b)) in a.iter().zip(b.iter()).enumerate() {
                if let Some(diff) = diff_at(format!("{}[{}]", path, i), value_a, value_b) {
                    return Some(diff);
                }
            }
            if a.len() != b.len() {
                return Some(difference(
                    format!("{}.length", path),
                    a.len().to_string(),
                    b.len().to_string(),
                ));
            }
            None
        }
        (a, b) if a == b => None,
        (a, b) => Some(difference(path, render(a), render(b))),
    }
}

fn difference(path: String, baseline: String, modified: String) -> JsonDifference {
    JsonDifference {
        path,
        baseline,
        modified,
    }
}

fn render(value: &Value) -> String {
    truncate_for_display(&value.to_string(), MAX_VALUE_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_is_insignificant() {
        let a: Value = serde_json::from_str(r#"{"name":"UART0","base":1073741824}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{ "base": 1073741824, "name": "UART0" }"#).unwrap();
        assert_eq!(first_difference(&a, &b), None);
    }

    #[test]
    fn test_nested_value_difference() {
        let a = json!({"peripherals": [{"name": "UART0", "registers": [{"size": 32}]}]});
        let b = json!({"peripherals": [{"name": "UART0", "registers": [{"size": 16}]}]});
        let diff = first_difference(&a, &b).unwrap();
        assert_eq!(diff.path, "$.peripherals[0].registers[0].size");
        assert_eq!(diff.baseline, "32");
        assert_eq!(diff.modified, "16");
    }

    #[test]
    fn test_missing_and_extra_keys() {
        let a = json!({"name": "A", "group": "G"});
        let b = json!({"name": "A"});
        let diff = first_difference(&a, &b).unwrap();
        assert_eq!(diff.path, "$.group");
        assert_eq!(diff.modified, "<missing>");

        let diff = first_difference(&b, &a).unwrap();
        assert_eq!(diff.path, "$.group");
        assert_eq!(diff.baseline, "<missing>");
        assert_eq!(diff.modified, "\"G\"");
    }

    #[test]
    fn test_array_length_difference() {
        let a = json!({"interrupts": [1, 2]});
        let b = json!({"interrupts": [1, 2, 3]});
        let diff = first_difference(&a, &b).unwrap();
        assert_eq!(diff.path, "$.interrupts.length");
        assert_eq!(diff.baseline, "2");
        assert_eq!(diff.modified, "3");
    }

    #[test]
    fn test_type_change() {
        let diff = first_difference(&json!({"v": 1}), &json!({"v": "1"})).unwrap();
        assert_eq!(diff.path, "$.v");
    }
}
