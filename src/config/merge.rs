//! Layer merge: objects deep-merge by key, everything else is replaced by
//! the later layer

use serde_json::Value;

/// Overlay `overlay` onto `base`.
///
/// Tables merge key by key; arrays, scalars, and `null` from the overlay
/// replace whatever the base had.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut table), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match table.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                table.insert(key, merged);
            }
            Value::Object(table)
        }
        (_, overlay) => overlay,
    }
}

/// Fold layers lowest precedence first
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}
