//! Groups and group lists

use serde::{Deserialize, Serialize};

use crate::ids::{DatasetId, FieldId, ItemId, SchemaGroupId};
use crate::schema::{SchemaField, SchemaGroup};

use super::Field;

/// One instance of a schema group.
///
/// A group inside a list may be bound to a dataset row; the row is the
/// context for its fields' contextual links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: ItemId,
    pub schema_group: SchemaGroupId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_row: Option<DatasetId>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Group {
    /// Fresh group with every field at its default
    pub fn from_schema(schema_group: &SchemaGroup) -> Self {
        Self {
            id: ItemId::generate(),
            schema_group: schema_group.id.clone(),
            dataset_row: None,
            fields: schema_group.fields.iter().map(Field::from_schema).collect(),
        }
    }

    pub fn field(&self, id: &FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| &f.field == id)
    }

    pub fn field_mut(&mut self, id: &FieldId) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| &f.field == id)
    }

    /// The field for `schema_field`, created unset if this group predates it
    pub(crate) fn ensure_field(&mut self, schema_field: &SchemaField) -> &mut Field {
        let index = match self.fields.iter().position(|f| f.field == schema_field.id) {
            Some(index) => index,
            None => {
                self.fields.push(Field::new(schema_field.id.clone(), schema_field.value_type.clone()));
                self.fields.len() - 1
            }
        };
        &mut self.fields[index]
    }
}

/// Ordered instances of a list schema group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupList {
    pub id: ItemId,
    pub schema_group: SchemaGroupId,
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl GroupList {
    pub fn new(schema_group: impl Into<SchemaGroupId>) -> Self {
        Self {
            id: ItemId::generate(),
            schema_group: schema_group.into(),
            groups: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, id: &ItemId) -> Option<&Group> {
        self.groups.iter().find(|g| &g.id == id)
    }

    pub fn group_mut(&mut self, id: &ItemId) -> Option<&mut Group> {
        self.groups.iter_mut().find(|g| &g.id == id)
    }

    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.groups.iter().position(|g| &g.id == id)
    }

    /// First item bound to `row`
    pub fn group_for_row(&self, row: &DatasetId) -> Option<&Group> {
        self.groups.iter().find(|g| g.dataset_row.as_ref() == Some(row))
    }

    /// Insert at `index`, or append when absent or past the end
    pub fn insert(&mut self, group: Group, index: Option<usize>) -> usize {
        let index = index.map_or(self.groups.len(), |i| i.min(self.groups.len()));
        self.groups.insert(index, group);
        index
    }

    /// Move an item; the target index is clamped to the list
    pub fn move_to(&mut self, id: &ItemId, index: usize) -> Option<usize> {
        let from = self.position(id)?;
        let group = self.groups.remove(from);
        let to = index.min(self.groups.len());
        self.groups.insert(to, group);
        Some(to)
    }

    pub fn remove(&mut self, id: &ItemId) -> Option<Group> {
        let index = self.position(id)?;
        Some(self.groups.remove(index))
    }
}
