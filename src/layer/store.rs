//! Id lookups the layer merge reads through

use std::collections::HashMap;

use crate::ids::{LayerId, PropertyId};
use crate::property::Property;

use super::model::{Layer, LayerGroup};

pub trait LayerStore {
    fn layer(&self, id: &LayerId) -> Option<&Layer>;

    /// The group listing `id` among its children
    fn parent_of(&self, id: &LayerId) -> Option<&LayerGroup>;
}

pub trait PropertyStore {
    fn property(&self, id: &PropertyId) -> Option<&Property>;
}

impl LayerStore for HashMap<LayerId, Layer> {
    fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.get(id)
    }

    fn parent_of(&self, id: &LayerId) -> Option<&LayerGroup> {
        self.values()
            .filter_map(Layer::as_group)
            .find(|g| g.children.contains(id))
    }
}

impl PropertyStore for HashMap<PropertyId, Property> {
    fn property(&self, id: &PropertyId) -> Option<&Property> {
        self.get(id)
    }
}

/// Index a set of layers by id
pub fn layer_index(layers: impl IntoIterator<Item = Layer>) -> HashMap<LayerId, Layer> {
    layers.into_iter().map(|l| (l.id().clone(), l)).collect()
}

/// Index a set of properties by id
pub fn property_index(properties: impl IntoIterator<Item = Property>) -> HashMap<PropertyId, Property> {
    properties.into_iter().map(|p| (p.id.clone(), p)).collect()
}
