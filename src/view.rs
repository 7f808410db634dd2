//! JSON views of properties and merged properties
//!
//! Views are what a frontend receives: values in their wire form next to
//! their declared type, links spelled out, and merged fields carrying the
//! ids an edit should be written back to.

use property_value::{Value, ValueType};
use serde::{Deserialize, Serialize};

use crate::ids::{DatasetId, FieldId, ItemId, PropertyId, SchemaGroupId, SchemaId};
use crate::link::Links;
use crate::merge::{MergedField, MergedGroup, MergedItem, MergedProperty};
use crate::property::{Field, Group, Item, Pointer, Property};

fn wire(value: Option<&Value>) -> serde_json::Value {
    value.map(Value::to_wire).unwrap_or(serde_json::Value::Null)
}

/// One stored field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldView {
    /// `property:pointer`
    pub id: String,
    pub field_id: FieldId,
    pub schema_id: SchemaId,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    /// Wire form; null when unset
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Links::is_empty")]
    pub links: Links,
}

impl FieldView {
    pub fn new(property: &Property, pointer: &Pointer, field: &Field) -> Self {
        Self {
            id: format!("{}:{}", property.id, pointer),
            field_id: field.field.clone(),
            schema_id: property.schema.clone(),
            value_type: field.value_type.clone(),
            value: wire(field.value.as_ref()),
            links: field.links.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupView {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_row: Option<DatasetId>,
    pub fields: Vec<FieldView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemView {
    Group {
        schema_group: SchemaGroupId,
        group: GroupView,
    },
    GroupList {
        schema_group: SchemaGroupId,
        id: ItemId,
        groups: Vec<GroupView>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyView {
    pub id: PropertyId,
    pub schema_id: SchemaId,
    pub items: Vec<ItemView>,
}

impl PropertyView {
    pub fn new(property: &Property) -> Self {
        let group_view = |group: &Group, list_item: bool| GroupView {
            id: group.id.clone(),
            dataset_row: group.dataset_row.clone(),
            fields: group
                .fields
                .iter()
                .map(|f| {
                    let pointer = if list_item {
                        Pointer::item_field(group.schema_group.clone(), group.id.clone(), f.field.clone())
                    } else {
                        Pointer::field(group.schema_group.clone(), f.field.clone())
                    };
                    FieldView::new(property, &pointer, f)
                })
                .collect(),
        };

        let items = property
            .items
            .iter()
            .map(|item| match item {
                Item::Group(group) => ItemView::Group {
                    schema_group: group.schema_group.clone(),
                    group: group_view(group, false),
                },
                Item::GroupList(list) => ItemView::GroupList {
                    schema_group: list.schema_group.clone(),
                    id: list.id.clone(),
                    groups: list.groups.iter().map(|g| group_view(g, true)).collect(),
                },
            })
            .collect();

        Self {
            id: property.id.clone(),
            schema_id: property.schema.clone(),
            items,
        }
    }
}

/// One merged field. `original_field_id` and `parent_field_id` use the same
/// `property:pointer` form as [`FieldView::id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedFieldView {
    /// Source the field is edited through: the original, else the parent
    pub id: String,
    pub field_id: FieldId,
    pub schema_id: SchemaId,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Links::is_empty")]
    pub links: Links,
    pub overridden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_field_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_dataset_id: Option<DatasetId>,
}

impl MergedFieldView {
    pub fn new(schema: &SchemaId, field: &MergedField) -> Self {
        let original_field_id = field.original.as_ref().map(ToString::to_string);
        let parent_field_id = field.parent.as_ref().map(ToString::to_string);
        Self {
            id: original_field_id
                .clone()
                .or_else(|| parent_field_id.clone())
                .unwrap_or_default(),
            field_id: field.field.clone(),
            schema_id: schema.clone(),
            value_type: field.value_type.clone(),
            value: wire(field.value.as_ref()),
            links: field.links.clone(),
            overridden: field.overridden,
            original_field_id,
            parent_field_id,
            linked_dataset_id: field.linked_dataset().cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedGroupView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_dataset_id: Option<DatasetId>,
    pub fields: Vec<MergedFieldView>,
}

impl MergedGroupView {
    fn new(schema: &SchemaId, group: &MergedGroup) -> Self {
        Self {
            original_id: group.original_id.clone(),
            parent_id: group.parent_id.clone(),
            linked_dataset_id: group.linked_dataset.clone(),
            fields: group.fields.iter().map(|f| MergedFieldView::new(schema, f)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergedItemView {
    Group {
        schema_group: SchemaGroupId,
        group: MergedGroupView,
    },
    GroupList {
        schema_group: SchemaGroupId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        original_id: Option<ItemId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parent_id: Option<ItemId>,
        groups: Vec<MergedGroupView>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedPropertyView {
    pub schema_id: SchemaId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<PropertyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<PropertyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_dataset_id: Option<DatasetId>,
    pub items: Vec<MergedItemView>,
}

impl MergedPropertyView {
    pub fn new(merged: &MergedProperty) -> Self {
        let schema = &merged.schema;
        let items = merged
            .items
            .iter()
            .map(|item| match item {
                MergedItem::Group(group) => MergedItemView::Group {
                    schema_group: group.schema_group.clone(),
                    group: MergedGroupView::new(schema, group),
                },
                MergedItem::GroupList(list) => MergedItemView::GroupList {
                    schema_group: list.schema_group.clone(),
                    original_id: list.original_id.clone(),
                    parent_id: list.parent_id.clone(),
                    groups: list.groups.iter().map(|g| MergedGroupView::new(schema, g)).collect(),
                },
            })
            .collect();

        Self {
            schema_id: schema.clone(),
            original_id: merged.original_id.clone(),
            parent_id: merged.parent_id.clone(),
            linked_dataset_id: merged.linked_dataset.clone(),
            items,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
