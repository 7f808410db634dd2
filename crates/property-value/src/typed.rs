//! Self-describing `{type, value}` envelope.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::value::Value;
use crate::value_type::ValueType;

/// A value together with its declared type. `value` is `None` when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTypedValue", into = "RawTypedValue")]
pub struct TypedValue {
    pub value_type: ValueType,
    pub value: Option<Value>,
}

impl TypedValue {
    pub fn new(value_type: ValueType, value: Option<Value>) -> Self {
        Self { value_type, value }
    }

    /// Envelope for a set value, typed by the value itself.
    pub fn of(value: Value) -> Self {
        Self {
            value_type: value.value_type(),
            value: Some(value),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawTypedValue {
    #[serde(rename = "type")]
    value_type: ValueType,
    #[serde(default)]
    value: serde_json::Value,
}

impl TryFrom<RawTypedValue> for TypedValue {
    type Error = ValueError;

    fn try_from(raw: RawTypedValue) -> Result<Self, Self::Error> {
        let value = if raw.value.is_null() {
            None
        } else {
            Some(Value::decode(&raw.value_type, &raw.value)?)
        };
        Ok(Self {
            value_type: raw.value_type,
            value,
        })
    }
}

impl From<TypedValue> for RawTypedValue {
    fn from(typed: TypedValue) -> Self {
        Self {
            value: typed
                .value
                .as_ref()
                .map(Value::to_wire)
                .unwrap_or(serde_json::Value::Null),
            value_type: typed.value_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let typed = TypedValue::of(Value::Number(0.4));
        assert_eq!(
            serde_json::to_value(&typed).unwrap(),
            json!({"type": "number", "value": 0.4})
        );
    }

    #[test]
    fn test_null_value_is_unset() {
        let typed: TypedValue = serde_json::from_value(json!({"type": "latlng", "value": null})).unwrap();
        assert_eq!(typed.value_type, ValueType::LatLng);
        assert!(typed.value.is_none());
    }

    #[test]
    fn test_mismatched_value_rejected() {
        let res = serde_json::from_value::<TypedValue>(json!({"type": "bool", "value": "yes"}));
        assert!(res.is_err());
    }
}
