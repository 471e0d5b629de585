//! Presentation normalization for rendered shapes.
//!
//! Shapes are first built with array positions addressed by index keys
//! (`{"0": ...}`), the same way error paths address them. `object_to_array`
//! turns every such all-digit object back into a sequence.
use serde_json::{Map, Value};

/// Recursively replaces objects whose keys are all decimal digits with an
/// array ordered by numeric key. `null` entries are dropped. Empty objects
/// stay objects.
pub fn object_to_array(value: Value) -> Value {
    match value {
        Value::Object(map) if is_index_keyed(&map) => {
            let mut entries: Vec<(u64, Value)> = map
                .into_iter()
                .filter_map(|(k, v)| k.parse::<u64>().ok().map(|i| (i, v)))
                .collect();
            entries.sort_by_key(|(i, _)| *i);
            Value::Array(
                entries
                    .into_iter()
                    .map(|(_, v)| object_to_array(v))
                    .filter(|v| !v.is_null())
                    .collect(),
            )
        }
        Value::Object(map) => Value::Object(
            map.into_iter().map(|(k, v)| (k, object_to_array(v))).collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(object_to_array).collect()),
        scalar => scalar,
    }
}

fn is_index_keyed(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map.keys().all(|k| !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()) && k.parse::<u64>().is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digit_keys_become_ordered_sequence() {
        let v = json!({ "2": "c", "0": "a", "1": "b" });
        assert_eq!(object_to_array(v), json!(["a", "b", "c"]));
    }

    #[test]
    fn numeric_not_lexicographic_order() {
        let v = json!({ "10": "k", "9": "j" });
        assert_eq!(object_to_array(v), json!(["j", "k"]));
    }

    #[test]
    fn sparse_keys_and_nulls_are_compacted() {
        let v = json!({ "0": "a", "3": null, "5": "f" });
        assert_eq!(object_to_array(v), json!(["a", "f"]));
    }

    #[test]
    fn mixed_keys_stay_objects_but_recurse() {
        let v = json!({ "0": "a", "name": { "0": 1, "1": 2 } });
        assert_eq!(object_to_array(v), json!({ "0": "a", "name": [1, 2] }));
    }

    #[test]
    fn nested_index_objects_and_arrays() {
        let v = json!([{ "0": { "0": "x" } }, {}]);
        assert_eq!(object_to_array(v), json!([[["x"]], {}]));
    }
}
