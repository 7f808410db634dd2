//! Error code registry and property mutation errors
//!
//! Every error surfaced by the engine maps to a stable machine-readable code
//! so the API layer can report it without parsing messages.

use property_value::ValueType;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{SchemaGroupId, SchemaId};
use crate::property::Pointer;

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Value fails validation against the schema (bounds, choices, wire shape)
    InvalidValue,
    /// Value type differs from the field's declared type
    SchemaMismatch,
    /// Pointer addresses a group, item, or field that does not exist
    PointerNotFound,
    /// List operation on a group that is not a list
    NotAList,
    /// Property and schema ids disagree
    WrongSchema,
    /// Transient dataset I/O failure
    LinkResolutionFailed,
    /// Merge pass cancelled or timed out
    Cancelled,
    /// Layer, property, or schema referenced by id does not exist
    NotFound,
    /// Layer groups contain each other
    LayerCycle,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidValue => "INVALID_VALUE",
            ErrorCode::SchemaMismatch => "SCHEMA_MISMATCH",
            ErrorCode::PointerNotFound => "POINTER_NOT_FOUND",
            ErrorCode::NotAList => "NOT_A_LIST",
            ErrorCode::WrongSchema => "WRONG_SCHEMA",
            ErrorCode::LinkResolutionFailed => "LINK_RESOLUTION_FAILED",
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::LayerCycle => "LAYER_CYCLE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors from pointer-addressed property mutations and lookups.
///
/// Mutations are rejected before any state changes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    #[error("Invalid value at {pointer}: {reason}")]
    InvalidValue { pointer: Pointer, reason: String },

    #[error("Schema mismatch at {pointer}: field expects {expected}, got {found}")]
    SchemaMismatch {
        pointer: Pointer,
        expected: ValueType,
        found: ValueType,
    },

    #[error("Pointer not found: {0}")]
    PointerNotFound(Pointer),

    #[error("Schema group '{0}' is not a list")]
    NotAList(SchemaGroupId),

    #[error("Property uses schema '{actual}', expected '{expected}'")]
    WrongSchema { expected: SchemaId, actual: SchemaId },
}

impl PropertyError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PropertyError::InvalidValue { .. } => ErrorCode::InvalidValue,
            PropertyError::SchemaMismatch { .. } => ErrorCode::SchemaMismatch,
            PropertyError::PointerNotFound(_) => ErrorCode::PointerNotFound,
            PropertyError::NotAList(_) => ErrorCode::NotAList,
            PropertyError::WrongSchema { .. } => ErrorCode::WrongSchema,
        }
    }

    /// The pointer the error is about, if any
    pub fn pointer(&self) -> Option<&Pointer> {
        match self {
            PropertyError::InvalidValue { pointer, .. }
            | PropertyError::SchemaMismatch { pointer, .. }
            | PropertyError::PointerNotFound(pointer) => Some(pointer),
            PropertyError::NotAList(_) | PropertyError::WrongSchema { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_str() {
        assert_eq!(ErrorCode::PointerNotFound.as_str(), "POINTER_NOT_FOUND");
        assert_eq!(
            serde_json::to_value(ErrorCode::LinkResolutionFailed).unwrap(),
            serde_json::json!("LINK_RESOLUTION_FAILED")
        );
    }

    #[test]
    fn test_property_error_carries_pointer() {
        let pointer = Pointer::field("tiles", "tile_opacity");
        let err = PropertyError::SchemaMismatch {
            pointer: pointer.clone(),
            expected: ValueType::Number,
            found: ValueType::String,
        };
        assert_eq!(err.code(), ErrorCode::SchemaMismatch);
        assert_eq!(err.pointer(), Some(&pointer));
        assert!(err.to_string().contains("tiles/tile_opacity"));
    }
}
