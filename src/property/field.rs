//! A single property field

use property_value::{Value, ValueError, ValueType};
use serde::{Deserialize, Serialize};

use crate::ids::FieldId;
use crate::link::Links;
use crate::schema::SchemaField;

/// Stored value and dataset links of one schema field.
///
/// `value_type` is fixed by the schema; `value` is `None` when unset. When
/// `links` is non-empty the field reads from the dataset and `value` is only
/// kept as the value to fall back to once the links are removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldRecord", into = "FieldRecord")]
pub struct Field {
    pub field: FieldId,
    pub value_type: ValueType,
    pub value: Option<Value>,
    pub links: Links,
}

impl Field {
    pub fn new(field: impl Into<FieldId>, value_type: ValueType) -> Self {
        Self {
            field: field.into(),
            value_type,
            value: None,
            links: Links::empty(),
        }
    }

    /// A field holding the schema default
    pub fn from_schema(schema_field: &SchemaField) -> Self {
        Self {
            field: schema_field.id.clone(),
            value_type: schema_field.value_type.clone(),
            value: schema_field.default.clone(),
            links: Links::empty(),
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_links(mut self, links: Links) -> Self {
        self.links = links;
        self
    }

    pub fn is_linked(&self) -> bool {
        !self.links.is_empty()
    }

    /// Neither a value nor links: the field does not contribute to a merge
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.links.is_empty()
    }
}

/// Wire form: the value travels as plain JSON and is decoded with `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FieldRecord {
    field: FieldId,
    #[serde(rename = "type")]
    value_type: ValueType,
    #[serde(default)]
    value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Links::is_empty")]
    links: Links,
}

impl TryFrom<FieldRecord> for Field {
    type Error = ValueError;

    fn try_from(record: FieldRecord) -> Result<Self, Self::Error> {
        let value = match record.value {
            None | Some(serde_json::Value::Null) => None,
            Some(wire) => Some(Value::decode(&record.value_type, &wire)?),
        };
        Ok(Self {
            field: record.field,
            value_type: record.value_type,
            value,
            links: record.links,
        })
    }
}

impl From<Field> for FieldRecord {
    fn from(field: Field) -> Self {
        Self {
            field: field.field,
            value_type: field.value_type,
            value: field.value.as_ref().map(Value::to_wire),
            links: field.links,
        }
    }
}
