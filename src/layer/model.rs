//! Layers and infoboxes
//!
//! Layers point at their properties and children by id. Ownership lives in
//! the stores; a layer tree is only ever walked through them.

use serde::{Deserialize, Serialize};

use crate::ids::{DatasetId, DatasetSchemaId, ExtensionId, InfoboxFieldId, LayerId, PluginId, PropertyId};

/// One block of a layer's infobox, rendered by a plugin extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoboxField {
    pub id: InfoboxFieldId,
    pub plugin: PluginId,
    pub extension: ExtensionId,
    pub property: PropertyId,
}

/// Popup shown for a layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infobox {
    pub property: PropertyId,
    #[serde(default)]
    pub fields: Vec<InfoboxField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerItem {
    pub id: LayerId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<ExtensionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infobox: Option<Infobox>,
    /// Row this item was created from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_dataset: Option<DatasetId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerGroup {
    pub id: LayerId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<ExtensionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infobox: Option<Infobox>,
    #[serde(default)]
    pub children: Vec<LayerId>,
    /// Dataset schema whose rows the children were created from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_dataset_schema: Option<DatasetSchemaId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    Item(LayerItem),
    Group(LayerGroup),
}

impl Layer {
    pub fn id(&self) -> &LayerId {
        match self {
            Layer::Item(l) => &l.id,
            Layer::Group(l) => &l.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Layer::Item(l) => &l.name,
            Layer::Group(l) => &l.name,
        }
    }

    pub fn plugin(&self) -> Option<&PluginId> {
        match self {
            Layer::Item(l) => l.plugin.as_ref(),
            Layer::Group(l) => l.plugin.as_ref(),
        }
    }

    pub fn extension(&self) -> Option<&ExtensionId> {
        match self {
            Layer::Item(l) => l.extension.as_ref(),
            Layer::Group(l) => l.extension.as_ref(),
        }
    }

    pub fn property(&self) -> Option<&PropertyId> {
        match self {
            Layer::Item(l) => l.property.as_ref(),
            Layer::Group(l) => l.property.as_ref(),
        }
    }

    pub fn infobox(&self) -> Option<&Infobox> {
        match self {
            Layer::Item(l) => l.infobox.as_ref(),
            Layer::Group(l) => l.infobox.as_ref(),
        }
    }

    /// Only items carry a row
    pub fn linked_dataset(&self) -> Option<&DatasetId> {
        match self {
            Layer::Item(l) => l.linked_dataset.as_ref(),
            Layer::Group(_) => None,
        }
    }

    pub fn children(&self) -> &[LayerId] {
        match self {
            Layer::Item(_) => &[],
            Layer::Group(g) => &g.children,
        }
    }

    pub fn as_group(&self) -> Option<&LayerGroup> {
        match self {
            Layer::Group(g) => Some(g),
            Layer::Item(_) => None,
        }
    }
}
