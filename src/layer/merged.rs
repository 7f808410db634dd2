//! Merged layer tree

use crate::ids::{DatasetId, ExtensionId, InfoboxFieldId, LayerId, PluginId};
use crate::merge::MergedProperty;

use super::LayerMergeError;

#[derive(Debug, Clone, PartialEq)]
pub struct MergedInfoboxField {
    pub id: InfoboxFieldId,
    pub plugin: PluginId,
    pub extension: ExtensionId,
    pub property: Option<MergedProperty>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedInfobox {
    pub property: Option<MergedProperty>,
    pub fields: Vec<MergedInfoboxField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedLayer {
    pub id: LayerId,
    /// Enclosing group
    pub parent: Option<LayerId>,
    pub name: String,
    pub plugin: Option<PluginId>,
    pub extension: Option<ExtensionId>,
    pub linked_dataset: Option<DatasetId>,
    pub property: Option<MergedProperty>,
    pub infobox: Option<MergedInfobox>,
    pub children: Vec<MergedLayerNode>,
}

impl MergedLayer {
    /// Children that merged, skipping failed subtrees
    pub fn merged_children(&self) -> impl Iterator<Item = &MergedLayer> {
        self.children.iter().filter_map(MergedLayerNode::as_layer)
    }

    /// Failed child subtrees with their errors
    pub fn failures(&self) -> impl Iterator<Item = (&LayerId, &LayerMergeError)> {
        self.children.iter().filter_map(|c| match c {
            MergedLayerNode::Failed { layer, error } => Some((layer, error)),
            MergedLayerNode::Layer(_) => None,
        })
    }
}

/// A child of a merged group: its merged subtree, or why it failed
#[derive(Debug, Clone, PartialEq)]
pub enum MergedLayerNode {
    Layer(MergedLayer),
    Failed { layer: LayerId, error: LayerMergeError },
}

impl MergedLayerNode {
    pub fn id(&self) -> &LayerId {
        match self {
            MergedLayerNode::Layer(l) => &l.id,
            MergedLayerNode::Failed { layer, .. } => layer,
        }
    }

    pub fn as_layer(&self) -> Option<&MergedLayer> {
        match self {
            MergedLayerNode::Layer(l) => Some(l),
            MergedLayerNode::Failed { .. } => None,
        }
    }
}
