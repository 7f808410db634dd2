//! Schema field definitions and value validation

use property_value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::FieldId;

use super::condition::Condition;

/// Editor hint for rendering a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiHint {
    Multiline,
    Selection,
    Color,
    Range,
    Slider,
    Image,
    Video,
    File,
    CameraPose,
    Datetime,
}

/// One allowed value of a selection field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A field of a schema group
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub id: FieldId,
    pub value_type: ValueType,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub choices: Vec<Choice>,
    pub ui: Option<UiHint>,
    pub available_if: Option<Condition>,
}

/// Why a value was rejected by a schema field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldViolation {
    TypeMismatch { expected: ValueType, found: ValueType },
    NotFinite(f64),
    BelowMin { min: f64, value: f64 },
    AboveMax { max: f64, value: f64 },
    NotAChoice(String),
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldViolation::TypeMismatch { expected, found } => {
                write!(f, "expected {}, got {}", expected, found)
            }
            FieldViolation::NotFinite(value) => write!(f, "{} is not a finite number", value),
            FieldViolation::BelowMin { min, value } => write!(f, "{} is below minimum {}", value, min),
            FieldViolation::AboveMax { max, value } => write!(f, "{} is above maximum {}", value, max),
            FieldViolation::NotAChoice(key) => write!(f, "'{}' is not one of the choices", key),
        }
    }
}

impl SchemaField {
    /// A field with only an id and type
    pub fn new(id: impl Into<FieldId>, value_type: ValueType) -> Self {
        Self {
            id: id.into(),
            value_type,
            title: None,
            description: None,
            default: None,
            prefix: None,
            suffix: None,
            min: None,
            max: None,
            choices: Vec::new(),
            ui: None,
            available_if: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_choices(mut self, keys: &[&str]) -> Self {
        self.choices = keys
            .iter()
            .map(|k| Choice {
                key: (*k).to_string(),
                label: (*k).to_string(),
                icon: None,
            })
            .collect();
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.available_if = Some(condition);
        self
    }

    /// Check a value against the declared type, bounds, and choices.
    ///
    /// Numbers must be finite and within bounds; choices apply to strings.
    pub fn validate(&self, value: &Value) -> Result<(), FieldViolation> {
        let found = value.value_type();
        if found != self.value_type {
            return Err(FieldViolation::TypeMismatch {
                expected: self.value_type.clone(),
                found,
            });
        }

        if let Value::Number(n) = value {
            if !n.is_finite() {
                return Err(FieldViolation::NotFinite(*n));
            }
            if let Some(min) = self.min {
                if *n < min {
                    return Err(FieldViolation::BelowMin { min, value: *n });
                }
            }
            if let Some(max) = self.max {
                if *n > max {
                    return Err(FieldViolation::AboveMax { max, value: *n });
                }
            }
        }

        if let Value::String(s) = value {
            if !self.choices.is_empty() && !self.choices.iter().any(|c| &c.key == s) {
                return Err(FieldViolation::NotAChoice(s.clone()));
            }
        }

        Ok(())
    }
}
