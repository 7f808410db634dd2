//! Property schemas
//!
//! A schema is the static, per-extension definition of a property's shape:
//! ordered groups of typed fields with defaults, bounds, choices, and
//! availability conditions. Schemas are immutable once built; every
//! constructor validates the whole definition.

mod condition;
mod field;
mod group;
mod loader;

pub use condition::Condition;
pub use field::{Choice, FieldViolation, SchemaField, UiHint};
pub use group::SchemaGroup;
pub use loader::{SchemaDef, SchemaError};

use property_value::{Value, ValueType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ids::{FieldId, SchemaGroupId, SchemaId};

/// Address of a field within a schema (no instance item)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaFieldRef {
    pub group: SchemaGroupId,
    pub field: FieldId,
}

impl SchemaFieldRef {
    pub fn new(group: impl Into<SchemaGroupId>, field: impl Into<FieldId>) -> Self {
        Self {
            group: group.into(),
            field: field.into(),
        }
    }
}

/// Fields that may be bound to dataset columns when a layer is created from
/// a dataset row (map markers and their link-outs).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkableFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latlng: Option<SchemaFieldRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<SchemaFieldRef>,
}

/// Which linkable slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkableKind {
    LatLng,
    Url,
}

impl LinkableKind {
    /// Type the linkable field must declare
    pub fn value_type(&self) -> ValueType {
        match self {
            LinkableKind::LatLng => ValueType::LatLng,
            LinkableKind::Url => ValueType::Url,
        }
    }
}

/// A validated property schema
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    id: SchemaId,
    groups: Vec<SchemaGroup>,
    linkable: LinkableFields,
}

impl Schema {
    /// Build and validate a schema
    pub fn new(
        id: impl Into<SchemaId>,
        groups: Vec<SchemaGroup>,
        linkable: LinkableFields,
    ) -> Result<Self, SchemaError> {
        let schema = Self {
            id: id.into(),
            groups,
            linkable,
        };
        loader::validate(&schema)?;
        Ok(schema)
    }

    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    pub fn groups(&self) -> &[SchemaGroup] {
        &self.groups
    }

    pub fn linkable(&self) -> &LinkableFields {
        &self.linkable
    }

    pub fn group(&self, id: &SchemaGroupId) -> Option<&SchemaGroup> {
        self.groups.iter().find(|g| &g.id == id)
    }

    pub fn field(&self, group: &SchemaGroupId, field: &FieldId) -> Option<&SchemaField> {
        self.group(group).and_then(|g| g.field(field))
    }

    /// First group declaring `field`, searching in schema order
    pub fn find_field(&self, field: &FieldId) -> Option<(&SchemaGroup, &SchemaField)> {
        self.groups
            .iter()
            .find_map(|g| g.field(field).map(|f| (g, f)))
    }

    /// The field designated for a linkable slot
    pub fn linkable_field(&self, kind: LinkableKind) -> Option<(&SchemaGroup, &SchemaField)> {
        let target = match kind {
            LinkableKind::LatLng => self.linkable.latlng.as_ref(),
            LinkableKind::Url => self.linkable.url.as_ref(),
        }?;
        let group = self.group(&target.group)?;
        group.field(&target.field).map(|f| (group, f))
    }

    /// Whether a group is shown, given a lookup of field values across the
    /// property (group conditions refer to fields of single groups).
    pub fn is_group_available<'a>(
        &self,
        group: &SchemaGroupId,
        lookup: impl Fn(&SchemaGroupId, &FieldId) -> Option<&'a Value>,
    ) -> bool {
        let Some(g) = self.group(group) else {
            return false;
        };
        let Some(cond) = &g.available_if else {
            return true;
        };
        let sibling = self
            .find_field(&cond.field)
            .and_then(|(owner, _)| lookup(&owner.id, &cond.field));
        cond.is_satisfied(sibling)
    }
}

/// Schemas by id
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<SchemaId, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any schema with the same id
    pub fn insert(&mut self, schema: Schema) {
        self.schemas.insert(schema.id().clone(), schema);
    }

    pub fn get(&self, id: &SchemaId) -> Option<&Schema> {
        self.schemas.get(id)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl FromIterator<Schema> for SchemaRegistry {
    fn from_iter<I: IntoIterator<Item = Schema>>(iter: I) -> Self {
        let mut registry = Self::new();
        for schema in iter {
            registry.insert(schema);
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiles_schema() -> Schema {
        Schema::new(
            "reearth/cesium",
            vec![
                SchemaGroup::new(
                    "default",
                    vec![
                        SchemaField::new("terrain", ValueType::Bool).with_default(Value::Bool(false)),
                        SchemaField::new("homepage", ValueType::Url),
                        SchemaField::new("position", ValueType::LatLng),
                    ],
                ),
                SchemaGroup {
                    available_if: Some(Condition::new("terrain", Value::Bool(true))),
                    ..SchemaGroup::new(
                        "tiles",
                        vec![SchemaField::new("tile_opacity", ValueType::Number)
                            .with_default(Value::Number(1.0))
                            .with_range(Some(0.0), Some(1.0))],
                    )
                    .list()
                },
            ],
            LinkableFields {
                latlng: Some(SchemaFieldRef::new("default", "position")),
                url: Some(SchemaFieldRef::new("default", "homepage")),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let schema = tiles_schema();
        assert!(schema.group(&"tiles".into()).unwrap().is_list);
        assert_eq!(
            schema.field(&"tiles".into(), &"tile_opacity".into()).unwrap().default,
            Some(Value::Number(1.0))
        );
        assert!(schema.field(&"default".into(), &"tile_opacity".into()).is_none());
        assert_eq!(schema.find_field(&"terrain".into()).unwrap().0.id.as_str(), "default");
    }

    #[test]
    fn test_linkable_fields() {
        let schema = tiles_schema();
        let (_, field) = schema.linkable_field(LinkableKind::LatLng).unwrap();
        assert_eq!(field.id.as_str(), "position");
        let (_, field) = schema.linkable_field(LinkableKind::Url).unwrap();
        assert_eq!(field.value_type, ValueType::Url);
    }

    #[test]
    fn test_group_availability() {
        let schema = tiles_schema();
        let on = Value::Bool(true);
        let off = Value::Bool(false);
        assert!(schema.is_group_available(&"tiles".into(), |_, _| Some(&on)));
        assert!(!schema.is_group_available(&"tiles".into(), |_, _| Some(&off)));
        assert!(schema.is_group_available(&"default".into(), |_, _| None));
        assert!(!schema.is_group_available(&"nope".into(), |_, _| None));
    }

    #[test]
    fn test_registry() {
        let registry: SchemaRegistry = vec![tiles_schema()].into_iter().collect();
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&"reearth/cesium".into()).is_some());
    }
}
