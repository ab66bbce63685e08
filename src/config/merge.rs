//! Configuration merge logic
//!
//! - Objects: deep-merge by key
//! - Arrays: REPLACE (last wins)
//! - Scalars: override (last wins)

use serde_json::Value;

/// Deep merge two JSON values.
///
/// A `[[sequence]]` list in a later layer replaces the whole list of an
/// earlier one. Null overrides any value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge layers in order; the last has highest precedence
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_override() {
        let result = deep_merge(json!({"chunk_size": 100}), json!({"chunk_size": 200}));
        assert_eq!(result["chunk_size"], 200);
    }

    #[test]
    fn test_nested_table_merge() {
        let base = json!({"retry": {"max_attempts": 60, "max_delay_ms": 30000}});
        let overlay = json!({"retry": {"max_attempts": 5}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["retry"]["max_attempts"], 5);
        assert_eq!(result["retry"]["max_delay_ms"], 30000);
    }

    #[test]
    fn test_sequence_list_replaced() {
        let base = json!({"sequence": [{"name": "a"}, {"name": "b"}]});
        let overlay = json!({"sequence": [{"name": "c"}]});
        let result = deep_merge(base, overlay);

        let sequences = result["sequence"].as_array().unwrap();
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0]["name"], "c");
    }

    #[test]
    fn test_null_override() {
        let result = deep_merge(json!({"locale": "en_US"}), json!({"locale": null}));
        assert!(result["locale"].is_null());
    }

    #[test]
    fn test_merge_layers() {
        let builtin = json!({"locale": "en_US", "poll_interval_seconds": 5});
        let file = json!({"locale": "fr_FR"});
        let cli = json!({"poll_interval_seconds": 1});

        let result = merge_layers(vec![builtin, file, cli]);

        assert_eq!(result["locale"], "fr_FR");
        assert_eq!(result["poll_interval_seconds"], 1);
    }
}
