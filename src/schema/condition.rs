//! Conditional availability (`available_if`)

use property_value::Value;

use crate::ids::FieldId;

/// Shows a field or group only while another field equals a reference value.
///
/// Two states only: available or hidden. Equality is exact and typed, so a
/// number condition never matches a string sibling.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: FieldId,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<FieldId>, value: Value) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }

    /// Evaluate against the sibling field's current resolved value.
    pub fn is_satisfied(&self, sibling: Option<&Value>) -> bool {
        sibling == Some(&self.value)
    }
}
