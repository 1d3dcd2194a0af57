//! Layer merge rules
//!
//! - Tables: merged key by key, recursively
//! - Arrays: replaced by the higher layer
//! - Scalars: replaced by the higher layer

use serde_json::Value;

/// Merge `overlay` onto `base`. The overlay wins wherever both define a
/// non-table value; `null` in the overlay clears the base value.
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

/// Fold layers lowest-precedence first.
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_replaced() {
        let result = deep_merge(json!({"normalize": "exact"}), json!({"normalize": "canonical"}));
        assert_eq!(result["normalize"], "canonical");
    }

    #[test]
    fn test_tables_merge_by_key() {
        let base = json!({"wiki": {"branch": "main", "repo_owner": "OrcaSlicer"}});
        let overlay = json!({"wiki": {"branch": "dev"}});
        let result = deep_merge(base, overlay);

        assert_eq!(result["wiki"]["branch"], "dev");
        assert_eq!(result["wiki"]["repo_owner"], "OrcaSlicer");
    }

    #[test]
    fn test_arrays_replaced_whole() {
        let result = deep_merge(json!({"hidden": ["a", "b", "c"]}), json!({"hidden": ["x"]}));
        assert_eq!(result["hidden"], json!(["x"]));
    }

    #[test]
    fn test_null_clears() {
        let result = deep_merge(json!({"wiki": {"data_dir": "/tmp"}}), json!({"wiki": {"data_dir": null}}));
        assert!(result["wiki"]["data_dir"].is_null());
    }

    #[test]
    fn test_layer_precedence() {
        let result = merge_layers(vec![
            json!({"normalize": "exact", "wiki": {"branch": "main", "api_timeout_seconds": 10}}),
            json!({"wiki": {"branch": "release"}}),
            json!({"wiki": {"api_timeout_seconds": 5}}),
            json!({"normalize": "canonical"}),
        ]);

        assert_eq!(result["normalize"], "canonical");
        assert_eq!(result["wiki"]["branch"], "release");
        assert_eq!(result["wiki"]["api_timeout_seconds"], 5);
    }
}
