//! Error types for value decoding.

use crate::value_type::ValueType;

/// Reasons a wire value or type name was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("unknown value type '{0}'")]
    UnknownType(String),

    #[error("expected {expected}, got {found}")]
    WrongShape { expected: ValueType, found: &'static str },

    #[error("invalid {expected}: {reason}")]
    Malformed { expected: ValueType, reason: String },

    #[error("array of {expected} contains a {found} item")]
    MixedArray { expected: ValueType, found: ValueType },
}

impl ValueError {
    pub(crate) fn malformed(expected: &ValueType, reason: impl Into<String>) -> Self {
        Self::Malformed {
            expected: expected.clone(),
            reason: reason.into(),
        }
    }
}

/// Short name of a JSON value's shape, for error messages.
pub(crate) fn shape_of(wire: &serde_json::Value) -> &'static str {
    match wire {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
