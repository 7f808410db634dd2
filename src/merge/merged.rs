//! Read-only merged property tree

use property_value::{Value, ValueType};
use std::fmt;

use crate::ids::{DatasetId, FieldId, ItemId, PropertyId, SchemaGroupId, SchemaId};
use crate::link::Links;
use crate::property::Pointer;

/// Where a merged field came from, for writing edits back
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSource {
    pub property: PropertyId,
    pub pointer: Pointer,
}

impl fmt::Display for FieldSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.property, self.pointer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedField {
    pub field: FieldId,
    pub value_type: ValueType,
    /// Effective value: the dataset cell when linked, else the stored value
    pub value: Option<Value>,
    /// Winning links, bound to the row context
    pub links: Links,
    pub overridden: bool,
    pub original: Option<FieldSource>,
    pub parent: Option<FieldSource>,
}

impl MergedField {
    /// Dataset the field reads from first, if linked to an explicit row
    pub fn linked_dataset(&self) -> Option<&DatasetId> {
        self.links.first().and_then(|l| l.dataset.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedGroup {
    pub schema_group: SchemaGroupId,
    pub original_id: Option<ItemId>,
    pub parent_id: Option<ItemId>,
    /// Row context of this group's fields
    pub linked_dataset: Option<DatasetId>,
    pub fields: Vec<MergedField>,
}

impl MergedGroup {
    pub fn field(&self, id: &FieldId) -> Option<&MergedField> {
        self.fields.iter().find(|f| &f.field == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedGroupList {
    pub schema_group: SchemaGroupId,
    pub original_id: Option<ItemId>,
    pub parent_id: Option<ItemId>,
    pub groups: Vec<MergedGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergedItem {
    Group(MergedGroup),
    GroupList(MergedGroupList),
}

impl MergedItem {
    pub fn schema_group(&self) -> &SchemaGroupId {
        match self {
            MergedItem::Group(g) => &g.schema_group,
            MergedItem::GroupList(l) => &l.schema_group,
        }
    }

    pub fn as_group(&self) -> Option<&MergedGroup> {
        match self {
            MergedItem::Group(g) => Some(g),
            MergedItem::GroupList(_) => None,
        }
    }

    pub fn as_group_list(&self) -> Option<&MergedGroupList> {
        match self {
            MergedItem::GroupList(l) => Some(l),
            MergedItem::Group(_) => None,
        }
    }

    pub fn groups(&self) -> std::slice::Iter<'_, MergedGroup> {
        match self {
            MergedItem::Group(g) => std::slice::from_ref(g).iter(),
            MergedItem::GroupList(l) => l.groups.iter(),
        }
    }

    pub(crate) fn groups_mut(&mut self) -> std::slice::IterMut<'_, MergedGroup> {
        match self {
            MergedItem::Group(g) => std::slice::from_mut(g).iter_mut(),
            MergedItem::GroupList(l) => l.groups.iter_mut(),
        }
    }
}

/// Effective property seen by readers. Derived on every read, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedProperty {
    pub schema: SchemaId,
    pub original_id: Option<PropertyId>,
    pub parent_id: Option<PropertyId>,
    pub linked_dataset: Option<DatasetId>,
    pub items: Vec<MergedItem>,
}

impl MergedProperty {
    pub fn item(&self, schema_group: &SchemaGroupId) -> Option<&MergedItem> {
        self.items.iter().find(|i| i.schema_group() == schema_group)
    }

    /// Field of a single (non-list) group
    pub fn field(&self, schema_group: &SchemaGroupId, field: &FieldId) -> Option<&MergedField> {
        self.item(schema_group)?.as_group()?.field(field)
    }

    /// Every merged field, in tree order
    pub fn fields(&self) -> impl Iterator<Item = &MergedField> {
        self.items.iter().flat_map(|i| i.groups()).flat_map(|g| g.fields.iter())
    }

    pub(crate) fn fields_mut(&mut self) -> impl Iterator<Item = (&SchemaGroupId, &mut MergedField)> {
        self.items
            .iter_mut()
            .flat_map(|i| i.groups_mut())
            .flat_map(|MergedGroup { schema_group, fields, .. }| {
                let group: &SchemaGroupId = schema_group;
                fields.iter_mut().map(move |f| (group, f))
            })
    }
}
