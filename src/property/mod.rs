//! Property instances
//!
//! A property is the per-owner instance of a schema. It is only changed
//! through pointer-addressed operations, each of which validates first and
//! returns an updated copy; the receiver is never modified.

mod field;
mod group;
mod item;
mod pointer;

pub use field::Field;
pub use group::{Group, GroupList};
pub use item::Item;
pub use pointer::{Pointer, PointerParseError};

use property_value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::PropertyError;
use crate::ids::{DatasetId, ItemId, PropertyId, SchemaGroupId, SchemaId};
use crate::link::{Link, Links};
use crate::schema::{FieldViolation, LinkableKind, Schema, SchemaGroup};

/// A property instance: one item per schema group, in schema order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub schema: SchemaId,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Property {
    /// New property with every single group at its defaults and every list
    /// group empty
    pub fn from_schema(schema: &Schema) -> Self {
        Self {
            id: PropertyId::generate(),
            schema: schema.id().clone(),
            items: schema.groups().iter().map(Item::from_schema).collect(),
        }
    }

    pub fn item(&self, schema_group: &SchemaGroupId) -> Option<&Item> {
        self.items.iter().find(|i| i.schema_group() == schema_group)
    }

    /// The group a pointer lands in
    pub fn group_at(&self, pointer: &Pointer) -> Result<&Group, PropertyError> {
        let not_found = || PropertyError::PointerNotFound(pointer.clone());
        let item = self.item(&pointer.schema_group).ok_or_else(not_found)?;
        match (item, &pointer.item) {
            (Item::Group(group), None) => Ok(group),
            (Item::Group(group), Some(id)) if &group.id == id => Ok(group),
            (Item::GroupList(list), Some(id)) => list.group(id).ok_or_else(not_found),
            _ => Err(not_found()),
        }
    }

    /// The field a pointer addresses. An unset field is still found.
    pub fn get(&self, pointer: &Pointer) -> Result<&Field, PropertyError> {
        let not_found = || PropertyError::PointerNotFound(pointer.clone());
        let field = pointer.field.as_ref().ok_or_else(not_found)?;
        self.group_at(pointer)?.field(field).ok_or_else(not_found)
    }

    /// Every field with its pointer, in property order
    pub fn fields(&self) -> Vec<(Pointer, &Field)> {
        let mut out = Vec::new();
        for item in &self.items {
            match item {
                Item::Group(group) => out.extend(
                    group
                        .fields
                        .iter()
                        .map(|f| (Pointer::field(group.schema_group.clone(), f.field.clone()), f)),
                ),
                Item::GroupList(list) => {
                    for group in &list.groups {
                        out.extend(group.fields.iter().map(|f| {
                            (
                                Pointer::item_field(list.schema_group.clone(), group.id.clone(), f.field.clone()),
                                f,
                            )
                        }));
                    }
                }
            }
        }
        out
    }

    /// Set or clear (`None`) the value of a field. Links are left alone.
    pub fn set_value(&self, schema: &Schema, pointer: &Pointer, value: Option<Value>) -> Result<Property, PropertyError> {
        self.check_schema(schema)?;
        let not_found = || PropertyError::PointerNotFound(pointer.clone());
        let field_id = pointer.field.as_ref().ok_or_else(not_found)?;
        let schema_group = schema.group(&pointer.schema_group).ok_or_else(not_found)?;
        let schema_field = schema_group.field(field_id).ok_or_else(not_found)?;

        if let Some(value) = &value {
            schema_field
                .validate(value)
                .map_err(|violation| violation_error(pointer, violation))?;
        }

        let mut next = self.clone();
        if !schema_group.is_list {
            next.ensure_item(schema, schema_group);
        }
        next.group_at_mut(pointer)?.ensure_field(schema_field).value = value;
        Ok(next)
    }

    /// Replace a field's link chain wholesale. Empty `links` unlinks.
    pub fn set_links(&self, pointer: &Pointer, links: Links) -> Result<Property, PropertyError> {
        let mut next = self.clone();
        let not_found = || PropertyError::PointerNotFound(pointer.clone());
        let field_id = pointer.field.as_ref().ok_or_else(not_found)?;
        let field = next.group_at_mut(pointer)?.field_mut(field_id).ok_or_else(not_found)?;
        field.links = links;
        Ok(next)
    }

    /// Add a fresh item to a list group at `index` (end when absent or out of
    /// range)
    pub fn add_item(
        &self,
        schema: &Schema,
        schema_group: &SchemaGroupId,
        index: Option<usize>,
    ) -> Result<(Property, ItemId), PropertyError> {
        self.check_schema(schema)?;
        let definition = schema
            .group(schema_group)
            .ok_or_else(|| PropertyError::PointerNotFound(Pointer::group(schema_group.clone())))?;
        if !definition.is_list {
            return Err(PropertyError::NotAList(schema_group.clone()));
        }

        let mut next = self.clone();
        next.ensure_item(schema, definition);
        let group = Group::from_schema(definition);
        let id = group.id.clone();
        next.list_mut(schema_group)?.insert(group, index);
        Ok((next, id))
    }

    /// Move a list item; the index is clamped to the list bounds
    pub fn move_item(&self, pointer: &Pointer, index: usize) -> Result<Property, PropertyError> {
        let mut next = self.clone();
        let id = pointer
            .item
            .as_ref()
            .ok_or_else(|| PropertyError::PointerNotFound(pointer.clone()))?;
        next.list_mut(&pointer.schema_group)?
            .move_to(id, index)
            .ok_or_else(|| PropertyError::PointerNotFound(pointer.clone()))?;
        Ok(next)
    }

    pub fn remove_item(&self, pointer: &Pointer) -> Result<Property, PropertyError> {
        let mut next = self.clone();
        let id = pointer
            .item
            .as_ref()
            .ok_or_else(|| PropertyError::PointerNotFound(pointer.clone()))?;
        next.list_mut(&pointer.schema_group)?
            .remove(id)
            .ok_or_else(|| PropertyError::PointerNotFound(pointer.clone()))?;
        Ok(next)
    }

    /// Bind (or unbind) the group at `pointer` to a dataset row
    pub fn bind_item_row(&self, pointer: &Pointer, row: Option<DatasetId>) -> Result<Property, PropertyError> {
        let mut next = self.clone();
        next.group_at_mut(pointer)?.dataset_row = row;
        Ok(next)
    }

    /// Link the schema's designated lat/lng or URL field to a dataset column.
    /// A schema without that slot leaves the property unchanged.
    pub fn link_linkable(&self, schema: &Schema, kind: LinkableKind, link: Link) -> Result<Property, PropertyError> {
        self.check_schema(schema)?;
        let Some((schema_group, schema_field)) = schema.linkable_field(kind) else {
            return Ok(self.clone());
        };
        let mut next = self.clone();
        next.ensure_item(schema, schema_group);
        let pointer = Pointer::field(schema_group.id.clone(), schema_field.id.clone());
        next.group_at_mut(&pointer)?.ensure_field(schema_field).links = Links::single(link);
        Ok(next)
    }

    /// Drop every link chain naming `dataset` and every row binding to it
    pub fn unlink_dataset(&self, dataset: &DatasetId) -> Property {
        let mut next = self.clone();
        for group in next.groups_mut() {
            if group.dataset_row.as_ref() == Some(dataset) {
                group.dataset_row = None;
            }
            for field in &mut group.fields {
                if field.links.touches_dataset(dataset) {
                    field.links = Links::empty();
                }
            }
        }
        next
    }

    /// Datasets referenced by links or row bindings
    pub fn dataset_ids(&self) -> BTreeSet<DatasetId> {
        let mut ids = BTreeSet::new();
        for item in &self.items {
            for group in item.groups() {
                ids.extend(group.dataset_row.iter().cloned());
                for field in &group.fields {
                    ids.extend(field.links.dataset_ids());
                }
            }
        }
        ids
    }

    fn check_schema(&self, schema: &Schema) -> Result<(), PropertyError> {
        if &self.schema != schema.id() {
            return Err(PropertyError::WrongSchema {
                expected: schema.id().clone(),
                actual: self.schema.clone(),
            });
        }
        Ok(())
    }

    fn group_at_mut(&mut self, pointer: &Pointer) -> Result<&mut Group, PropertyError> {
        let not_found = || PropertyError::PointerNotFound(pointer.clone());
        let item = self
            .items
            .iter_mut()
            .find(|i| i.schema_group() == &pointer.schema_group)
            .ok_or_else(not_found)?;
        match (item, &pointer.item) {
            (Item::Group(group), None) => Ok(group),
            (Item::Group(group), Some(id)) if &group.id == id => Ok(group),
            (Item::GroupList(list), Some(id)) => list.group_mut(id).ok_or_else(not_found),
            _ => Err(not_found()),
        }
    }

    fn list_mut(&mut self, schema_group: &SchemaGroupId) -> Result<&mut GroupList, PropertyError> {
        match self.items.iter_mut().find(|i| i.schema_group() == schema_group) {
            Some(Item::GroupList(list)) => Ok(list),
            Some(Item::Group(_)) => Err(PropertyError::NotAList(schema_group.clone())),
            None => Err(PropertyError::PointerNotFound(Pointer::group(schema_group.clone()))),
        }
    }

    fn groups_mut(&mut self) -> impl Iterator<Item = &mut Group> {
        self.items.iter_mut().flat_map(|item| match item {
            Item::Group(group) => std::slice::from_mut(group).iter_mut(),
            Item::GroupList(list) => list.groups.iter_mut(),
        })
    }

    /// Create the item for `definition` if this property predates it, keeping
    /// schema order
    fn ensure_item(&mut self, schema: &Schema, definition: &SchemaGroup) {
        if self.item(&definition.id).is_some() {
            return;
        }
        let rank = |id: &SchemaGroupId| schema.groups().iter().position(|g| &g.id == id).unwrap_or(usize::MAX);
        let target = rank(&definition.id);
        let at = self
            .items
            .iter()
            .position(|i| rank(i.schema_group()) > target)
            .unwrap_or(self.items.len());
        self.items.insert(at, Item::from_schema(definition));
    }
}

fn violation_error(pointer: &Pointer, violation: FieldViolation) -> PropertyError {
    match violation {
        FieldViolation::TypeMismatch { expected, found } => PropertyError::SchemaMismatch {
            pointer: pointer.clone(),
            expected,
            found,
        },
        other => PropertyError::InvalidValue {
            pointer: pointer.clone(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::schema::{LinkableFields, SchemaField, SchemaFieldRef};
    use property_value::{LatLng, ValueType};

    fn schema() -> Schema {
        Schema::new(
            "reearth/marker",
            vec![
                SchemaGroup::new(
                    "default",
                    vec![
                        SchemaField::new("location", ValueType::LatLng),
                        SchemaField::new("label", ValueType::String),
                        SchemaField::new("style", ValueType::String)
                            .with_default(Value::String("point".into()))
                            .with_choices(&["point", "image"]),
                    ],
                ),
                SchemaGroup::new(
                    "tiles",
                    vec![SchemaField::new("tile_opacity", ValueType::Number)
                        .with_default(Value::Number(1.0))
                        .with_range(Some(0.0), Some(1.0))],
                )
                .list(),
            ],
            LinkableFields {
                latlng: Some(SchemaFieldRef::new("default", "location")),
                url: None,
            },
        )
        .unwrap()
    }

    fn ids(property: &Property) -> Vec<ItemId> {
        property
            .item(&"tiles".into())
            .and_then(Item::as_group_list)
            .map(|l| l.groups.iter().map(|g| g.id.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_from_schema_layout() {
        let property = Property::from_schema(&schema());
        assert_eq!(property.items.len(), 2);
        assert!(!property.items[0].is_list());
        assert!(property.items[1].as_group_list().unwrap().is_empty());
        let style = property.get(&Pointer::field("default", "style")).unwrap();
        assert_eq!(style.value, Some(Value::String("point".into())));
        let label = property.get(&Pointer::field("default", "label")).unwrap();
        assert_eq!(label.value, None);
    }

    #[test]
    fn test_tile_opacity_update() {
        let schema = schema();
        let property = Property::from_schema(&schema);
        let (property, item) = property.add_item(&schema, &"tiles".into(), None).unwrap();
        let pointer = Pointer::item_field("tiles", item, "tile_opacity");

        assert_eq!(property.get(&pointer).unwrap().value, Some(Value::Number(1.0)));
        let updated = property.set_value(&schema, &pointer, Some(Value::Number(0.4))).unwrap();
        assert_eq!(updated.get(&pointer).unwrap().value, Some(Value::Number(0.4)));
        // the receiver is untouched
        assert_eq!(property.get(&pointer).unwrap().value, Some(Value::Number(1.0)));
    }

    #[test]
    fn test_set_value_round_trip_preserves_type() {
        let schema = schema();
        let property = Property::from_schema(&schema);
        let pointer = Pointer::field("default", "location");
        let value = Value::LatLng(LatLng { lat: 35.0, lng: 139.0 });
        let updated = property.set_value(&schema, &pointer, Some(value.clone())).unwrap();
        let field = updated.get(&pointer).unwrap();
        assert_eq!(field.value.as_ref().map(Value::value_type), Some(ValueType::LatLng));
        assert_eq!(field.value, Some(value));

        let cleared = updated.set_value(&schema, &pointer, None).unwrap();
        assert_eq!(cleared.get(&pointer).unwrap().value, None);
    }

    #[test]
    fn test_set_value_rejections() {
        let schema = schema();
        let (property, item) = Property::from_schema(&schema)
            .add_item(&schema, &"tiles".into(), None)
            .unwrap();

        let err = property
            .set_value(&schema, &Pointer::field("default", "label"), Some(Value::Number(1.0)))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::SchemaMismatch);

        let err = property
            .set_value(&schema, &Pointer::item_field("tiles", item.clone(), "tile_opacity"), Some(Value::Number(1.5)))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);

        // NaN compares false against both bounds
        let opacity = Pointer::item_field("tiles", item.clone(), "tile_opacity");
        let err = property
            .set_value(&schema, &opacity, Some(Value::Number(f64::NAN)))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);
        let err = property
            .set_value(&schema, &opacity, Some(Value::Number(f64::INFINITY)))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);
        assert_eq!(property.get(&opacity).unwrap().value, Some(Value::Number(1.0)));

        let err = property
            .set_value(&schema, &Pointer::field("default", "style"), Some(Value::String("video".into())))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);

        // a list field needs its item
        let err = property
            .set_value(&schema, &Pointer::field("tiles", "tile_opacity"), Some(Value::Number(0.5)))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PointerNotFound);

        let err = property
            .set_value(&schema, &Pointer::field("default", "nope"), None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PointerNotFound);
    }

    #[test]
    fn test_wrong_schema() {
        let schema = schema();
        let mut property = Property::from_schema(&schema);
        property.schema = "other/schema".into();
        let err = property
            .set_value(&schema, &Pointer::field("default", "label"), None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::WrongSchema);
    }

    #[test]
    fn test_set_value_creates_missing_group_and_field() {
        let schema = schema();
        let mut property = Property::from_schema(&schema);
        property.items.clear();
        let pointer = Pointer::field("default", "label");
        let updated = property
            .set_value(&schema, &pointer, Some(Value::String("Tokyo".into())))
            .unwrap();
        assert_eq!(updated.get(&pointer).unwrap().value, Some(Value::String("Tokyo".into())));
        // defaults of the new group come along
        assert_eq!(
            updated.get(&Pointer::field("default", "style")).unwrap().value,
            Some(Value::String("point".into()))
        );
    }

    #[test]
    fn test_list_ordering() {
        let schema = schema();
        let group: SchemaGroupId = "tiles".into();
        let property = Property::from_schema(&schema);
        let (property, a) = property.add_item(&schema, &group, None).unwrap();
        let (property, b) = property.add_item(&schema, &group, None).unwrap();
        let (property, c) = property.add_item(&schema, &group, Some(0)).unwrap();
        let (property, d) = property.add_item(&schema, &group, Some(42)).unwrap();
        assert_eq!(ids(&property), vec![c.clone(), a.clone(), b.clone(), d.clone()]);

        let property = property.move_item(&Pointer::item("tiles", c.clone()), 99).unwrap();
        assert_eq!(ids(&property), vec![a.clone(), b.clone(), d.clone(), c.clone()]);
        let property = property.move_item(&Pointer::item("tiles", d.clone()), 0).unwrap();
        assert_eq!(ids(&property), vec![d.clone(), a.clone(), b.clone(), c.clone()]);

        let property = property.remove_item(&Pointer::item("tiles", a.clone())).unwrap();
        assert_eq!(ids(&property), vec![d, b, c]);
        assert!(property.remove_item(&Pointer::item("tiles", a)).is_err());
    }

    #[test]
    fn test_add_item_on_single_group_is_not_a_list() {
        let schema = schema();
        let err = Property::from_schema(&schema)
            .add_item(&schema, &"default".into(), None)
            .unwrap_err();
        assert_eq!(err, PropertyError::NotAList("default".into()));
    }

    #[test]
    fn test_links_and_datasets() {
        let schema = schema();
        let property = Property::from_schema(&schema);
        let (property, item) = property.add_item(&schema, &"tiles".into(), None).unwrap();
        let item_pointer = Pointer::item("tiles", item.clone());
        let property = property
            .bind_item_row(&item_pointer, Some(DatasetId::new("row-1")))
            .unwrap()
            .link_linkable(&schema, LinkableKind::LatLng, Link::to_dataset("row-2", "stations", "location"))
            .unwrap()
            .link_linkable(&schema, LinkableKind::Url, Link::to_dataset("row-3", "stations", "url"))
            .unwrap();

        let location = property.get(&Pointer::field("default", "location")).unwrap();
        assert!(location.is_linked());
        assert_eq!(
            property.dataset_ids().into_iter().collect::<Vec<_>>(),
            vec![DatasetId::new("row-1"), DatasetId::new("row-2")]
        );

        let unlinked = property.unlink_dataset(&DatasetId::new("row-2"));
        assert!(!unlinked.get(&Pointer::field("default", "location")).unwrap().is_linked());
        let unlinked = unlinked.unlink_dataset(&DatasetId::new("row-1"));
        assert_eq!(unlinked.group_at(&item_pointer).unwrap().dataset_row, None);
        assert!(unlinked.dataset_ids().is_empty());
    }

    #[test]
    fn test_set_links_replaces_chain() {
        let schema = schema();
        let pointer = Pointer::field("default", "label");
        let property = Property::from_schema(&schema)
            .set_links(&pointer, Links::single(Link::contextual("s", "a")))
            .unwrap()
            .set_links(&pointer, Links::single(Link::contextual("s", "b")))
            .unwrap();
        let links = &property.get(&pointer).unwrap().links;
        assert_eq!(links.len(), 1);
        assert_eq!(links.first().unwrap().field.as_str(), "b");

        let cleared = property.set_links(&pointer, Links::empty()).unwrap();
        assert!(!cleared.get(&pointer).unwrap().is_linked());
    }

    #[test]
    fn test_property_json_round_trip() {
        let schema = schema();
        let (property, _) = Property::from_schema(&schema)
            .add_item(&schema, &"tiles".into(), None)
            .unwrap();
        let json = serde_json::to_string(&property).unwrap();
        let back: Property = serde_json::from_str(&json).unwrap();
        assert_eq!(back, property);
    }
}
