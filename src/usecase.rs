//! Property edit operations
//!
//! Entry points a frontend calls with wire values and pointers. Each one
//! validates against the property's schema and returns the updated property
//! together with what changed; the input property is left as it was.

use property_value::Value;

use crate::error::PropertyError;
use crate::ids::SchemaGroupId;
use crate::link::Links;
use crate::property::{Field, Group, Pointer, Property};
use crate::schema::{Schema, SchemaRegistry};

/// Result of an edit: the new property and the part that changed
#[derive(Debug, Clone, PartialEq)]
pub struct Edited<T> {
    pub property: Property,
    pub changed: T,
}

/// Edits properties of one schema
#[derive(Debug, Clone, Copy)]
pub struct PropertyEditor<'a> {
    schema: &'a Schema,
}

impl<'a> PropertyEditor<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Editor for the schema `property` uses, if registered
    pub fn for_property(schemas: &'a SchemaRegistry, property: &Property) -> Option<Self> {
        schemas.get(&property.schema).map(Self::new)
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Decode `wire` as the field's declared type and store it. JSON null
    /// clears the value.
    pub fn update_value(
        &self,
        property: &Property,
        pointer: &Pointer,
        wire: &serde_json::Value,
    ) -> Result<Edited<Field>, PropertyError> {
        let not_found = || PropertyError::PointerNotFound(pointer.clone());
        let field_id = pointer.field.as_ref().ok_or_else(not_found)?;
        let schema_field = self
            .schema
            .field(&pointer.schema_group, field_id)
            .ok_or_else(not_found)?;

        let value = if wire.is_null() {
            None
        } else {
            let decoded = Value::decode(&schema_field.value_type, wire).map_err(|e| PropertyError::InvalidValue {
                pointer: pointer.clone(),
                reason: e.to_string(),
            })?;
            Some(decoded)
        };

        let updated = property.set_value(self.schema, pointer, value)?;
        tracing::debug!(property = %updated.id, %pointer, "value updated");
        Self::field_edit(updated, pointer)
    }

    /// Replace the link chain of a field
    pub fn set_links(&self, property: &Property, pointer: &Pointer, links: Links) -> Result<Edited<Field>, PropertyError> {
        self.check(property)?;
        let updated = property.set_links(pointer, links)?;
        Self::field_edit(updated, pointer)
    }

    /// Drop the link chain of a field; its stored value shows again
    pub fn unlink(&self, property: &Property, pointer: &Pointer) -> Result<Edited<Field>, PropertyError> {
        self.set_links(property, pointer, Links::empty())
    }

    pub fn add_item(
        &self,
        property: &Property,
        schema_group: &SchemaGroupId,
        index: Option<usize>,
    ) -> Result<Edited<Group>, PropertyError> {
        let (updated, id) = property.add_item(self.schema, schema_group, index)?;
        let group = updated.group_at(&Pointer::item(schema_group.clone(), id))?.clone();
        Ok(Edited {
            property: updated,
            changed: group,
        })
    }

    pub fn move_item(&self, property: &Property, pointer: &Pointer, index: usize) -> Result<Edited<Group>, PropertyError> {
        self.check(property)?;
        let updated = property.move_item(pointer, index)?;
        let group = updated.group_at(pointer)?.clone();
        Ok(Edited {
            property: updated,
            changed: group,
        })
    }

    /// Remove a list item, returning the group that was removed
    pub fn remove_item(&self, property: &Property, pointer: &Pointer) -> Result<Edited<Group>, PropertyError> {
        self.check(property)?;
        let removed = property.group_at(pointer)?.clone();
        let updated = property.remove_item(pointer)?;
        Ok(Edited {
            property: updated,
            changed: removed,
        })
    }

    fn check(&self, property: &Property) -> Result<(), PropertyError> {
        if &property.schema != self.schema.id() {
            return Err(PropertyError::WrongSchema {
                expected: self.schema.id().clone(),
                actual: property.schema.clone(),
            });
        }
        Ok(())
    }

    fn field_edit(property: Property, pointer: &Pointer) -> Result<Edited<Field>, PropertyError> {
        let field = property.get(pointer)?.clone();
        Ok(Edited {
            property,
            changed: field,
        })
    }
}
