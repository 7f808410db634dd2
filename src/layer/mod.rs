//! Layer and infobox merge
//!
//! A layer's property is merged with its enclosing group's property (when
//! both use the same schema) in the context of the dataset row the layer was
//! created from. Infoboxes merge the same way. Groups recurse into their
//! children.
//!
//! The whole subtree is planned first and every link chain in it is resolved
//! in one batched pass. A dataset that fails during the pass only fails the
//! layers whose fields read from it; those become `MergedLayerNode::Failed`
//! and their siblings still merge.

mod merged;
mod model;
mod store;

pub use merged::{MergedInfobox, MergedInfoboxField, MergedLayer, MergedLayerNode};
pub use model::{Infobox, InfoboxField, Layer, LayerGroup, LayerItem};
pub use store::{layer_index, property_index, LayerStore, PropertyStore};

use crate::cancel::{CancelToken, Cancelled};
use crate::error::ErrorCode;
use crate::ids::{LayerId, PropertyId, SchemaId};
use crate::link::{Links, ResolvedCells, Resolver};
use crate::merge::{MergeEngine, MergeError, MergeInput, MergePlan, MergedProperty};
use crate::property::Property;
use crate::schema::{Schema, SchemaRegistry};

/// Errors of a layer merge. Inside a group they are reported per child.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayerMergeError {
    #[error("Layer not found: {0}")]
    LayerNotFound(LayerId),

    #[error("Property '{property}' of layer '{layer}' not found")]
    PropertyNotFound { layer: LayerId, property: PropertyId },

    #[error("Schema '{schema}' of layer '{layer}' is not registered")]
    SchemaNotFound { layer: LayerId, schema: SchemaId },

    #[error("Layer '{0}' contains itself")]
    Cycle(LayerId),

    #[error("Merge of layer '{layer}' failed: {source}")]
    Merge { layer: LayerId, source: MergeError },

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl LayerMergeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LayerMergeError::LayerNotFound(_)
            | LayerMergeError::PropertyNotFound { .. }
            | LayerMergeError::SchemaNotFound { .. } => ErrorCode::NotFound,
            LayerMergeError::Cycle(_) => ErrorCode::LayerCycle,
            LayerMergeError::Merge { source, .. } => source.code(),
            LayerMergeError::Cancelled(_) => ErrorCode::Cancelled,
        }
    }
}

struct PropertyPlan<'a> {
    plan: Option<MergePlan>,
    schema: Option<&'a Schema>,
}

struct InfoboxPlan<'a> {
    property: PropertyPlan<'a>,
    fields: Vec<(&'a InfoboxField, PropertyPlan<'a>)>,
}

struct LayerPlan<'a> {
    layer: &'a Layer,
    parent: Option<&'a LayerGroup>,
    property: PropertyPlan<'a>,
    infobox: Option<InfoboxPlan<'a>>,
    children: Vec<Result<LayerPlan<'a>, (LayerId, LayerMergeError)>>,
}

impl LayerPlan<'_> {
    fn collect_chains(&self, out: &mut Vec<Links>) {
        let mut push = |p: &PropertyPlan<'_>| {
            if let Some(plan) = &p.plan {
                out.extend(plan.chains());
            }
        };
        push(&self.property);
        if let Some(infobox) = &self.infobox {
            push(&infobox.property);
            for (_, field) in &infobox.fields {
                push(field);
            }
        }
        for child in self.children.iter().flatten() {
            child.collect_chains(out);
        }
    }
}

/// Merges layer subtrees read through id lookups
pub struct LayerMerger<'a, R, L, P>
where
    R: Resolver + ?Sized,
    L: LayerStore + ?Sized,
    P: PropertyStore + ?Sized,
{
    engine: MergeEngine<'a, R>,
    layers: &'a L,
    properties: &'a P,
    schemas: Option<&'a SchemaRegistry>,
}

impl<'a, R, L, P> LayerMerger<'a, R, L, P>
where
    R: Resolver + ?Sized,
    L: LayerStore + ?Sized,
    P: PropertyStore + ?Sized,
{
    pub fn new(engine: MergeEngine<'a, R>, layers: &'a L, properties: &'a P) -> Self {
        Self {
            engine,
            layers,
            properties,
            schemas: None,
        }
    }

    /// Look schemas up for default fallback; an unregistered schema then
    /// fails its layer
    pub fn with_schemas(mut self, schemas: &'a SchemaRegistry) -> Self {
        self.schemas = Some(schemas);
        self
    }

    /// Merge the subtree rooted at `root`.
    ///
    /// Errors of the root itself are returned; errors below it are reported
    /// as failed children. Cancellation aborts the whole merge.
    pub fn merge(&self, root: &LayerId, cancel: &CancelToken) -> Result<MergedLayer, LayerMergeError> {
        let token = self.engine.pass_token(cancel);
        token.check()?;

        let layer = self
            .layers
            .layer(root)
            .ok_or_else(|| LayerMergeError::LayerNotFound(root.clone()))?;
        let parent = self.layers.parent_of(root);
        let plan = self.plan_layer(layer, parent, &mut Vec::new())?;

        let mut chains = Vec::new();
        plan.collect_chains(&mut chains);
        let memo = self.engine.batch().prefetch(&chains, &token).map_err(|reason| {
            tracing::warn!(layer = %root, %reason, "layer merge cancelled");
            LayerMergeError::Cancelled(reason)
        })?;

        Self::apply(plan, &memo)
    }

    fn plan_layer(
        &self,
        layer: &'a Layer,
        parent: Option<&'a LayerGroup>,
        visiting: &mut Vec<LayerId>,
    ) -> Result<LayerPlan<'a>, LayerMergeError> {
        let id = layer.id();
        if visiting.contains(id) {
            return Err(LayerMergeError::Cycle(id.clone()));
        }
        visiting.push(id.clone());

        let original = self.required_property(id, layer.property())?;
        let inherited = parent.and_then(|g| self.optional_property(g.property.as_ref()));
        let property = self.plan_property(id, original, inherited, layer)?;

        let infobox = match (layer.infobox(), parent.and_then(|g| g.infobox.as_ref())) {
            (None, None) => None,
            (own, parent_box) => {
                let original = self.required_property(id, own.map(|i| &i.property))?;
                let inherited = self.optional_property(parent_box.map(|i| &i.property));
                let property = self.plan_property(id, original, inherited, layer)?;

                // fields come from the layer's own infobox unless it has none
                let source: &'a [InfoboxField] = match (own, parent_box) {
                    (Some(own), _) if !own.fields.is_empty() => &own.fields,
                    (_, Some(parent_box)) => &parent_box.fields,
                    _ => &[],
                };
                let mut fields = Vec::with_capacity(source.len());
                for field in source {
                    let original = self.required_property(id, Some(&field.property))?;
                    fields.push((field, self.plan_property(id, original, None, layer)?));
                }
                Some(InfoboxPlan { property, fields })
            }
        };

        let mut children = Vec::new();
        if let Layer::Group(group) = layer {
            for child in &group.children {
                let depth = visiting.len();
                let planned = match self.layers.layer(child) {
                    Some(child_layer) => self.plan_layer(child_layer, Some(group), visiting),
                    None => Err(LayerMergeError::LayerNotFound(child.clone())),
                };
                visiting.truncate(depth);
                children.push(planned.map_err(|e| (child.clone(), e)));
            }
        }

        visiting.pop();
        Ok(LayerPlan {
            layer,
            parent,
            property,
            infobox,
            children,
        })
    }

    fn required_property(
        &self,
        layer: &LayerId,
        id: Option<&PropertyId>,
    ) -> Result<Option<&'a Property>, LayerMergeError> {
        let Some(id) = id else {
            return Ok(None);
        };
        self.properties
            .property(id)
            .map(Some)
            .ok_or_else(|| LayerMergeError::PropertyNotFound {
                layer: layer.clone(),
                property: id.clone(),
            })
    }

    fn optional_property(&self, id: Option<&PropertyId>) -> Option<&'a Property> {
        id.and_then(|id| self.properties.property(id))
    }

    /// The inherited property only applies when it shares the schema
    fn plan_property(
        &self,
        layer_id: &LayerId,
        original: Option<&'a Property>,
        inherited: Option<&'a Property>,
        layer: &'a Layer,
    ) -> Result<PropertyPlan<'a>, LayerMergeError> {
        let inherited = match original {
            Some(o) => inherited.filter(|p| p.schema == o.schema),
            None => inherited,
        };
        let schema = match (self.schemas, original.or(inherited)) {
            (Some(registry), Some(base)) => {
                Some(registry.get(&base.schema).ok_or_else(|| LayerMergeError::SchemaNotFound {
                    layer: layer_id.clone(),
                    schema: base.schema.clone(),
                })?)
            }
            _ => None,
        };
        let input = MergeInput::new(original, inherited)
            .with_context(layer.linked_dataset())
            .with_schema(schema);
        let plan = MergePlan::new(&input).map_err(|source| LayerMergeError::Merge {
            layer: layer_id.clone(),
            source,
        })?;
        Ok(PropertyPlan { plan, schema })
    }

    fn resolve_property(
        layer: &LayerId,
        planned: PropertyPlan<'_>,
        memo: &ResolvedCells,
    ) -> Result<Option<MergedProperty>, LayerMergeError> {
        let Some(plan) = planned.plan else {
            return Ok(None);
        };
        plan.resolve(memo, planned.schema)
            .map(Some)
            .map_err(|source| LayerMergeError::Merge {
                layer: layer.clone(),
                source,
            })
    }

    fn apply(plan: LayerPlan<'_>, memo: &ResolvedCells) -> Result<MergedLayer, LayerMergeError> {
        let layer = plan.layer;
        let id = layer.id();
        let property = Self::resolve_property(id, plan.property, memo)?;
        let infobox = match plan.infobox {
            Some(infobox) => {
                let property = Self::resolve_property(id, infobox.property, memo)?;
                let mut fields = Vec::with_capacity(infobox.fields.len());
                for (field, planned) in infobox.fields {
                    fields.push(MergedInfoboxField {
                        id: field.id.clone(),
                        plugin: field.plugin.clone(),
                        extension: field.extension.clone(),
                        property: Self::resolve_property(id, planned, memo)?,
                    });
                }
                Some(MergedInfobox { property, fields })
            }
            None => None,
        };

        let children = plan
            .children
            .into_iter()
            .map(|child| {
                let result = child.and_then(|c| {
                    let child_id = c.layer.id().clone();
                    Self::apply(c, memo).map_err(|e| (child_id, e))
                });
                match result {
                    Ok(merged) => MergedLayerNode::Layer(merged),
                    Err((layer, error)) => {
                        tracing::warn!(layer = %layer, code = %error.code(), %error, "layer subtree failed");
                        MergedLayerNode::Failed { layer, error }
                    }
                }
            })
            .collect();

        Ok(MergedLayer {
            id: id.clone(),
            parent: plan.parent.map(|g| g.id.clone()),
            name: layer.name().to_string(),
            plugin: layer.plugin().cloned(),
            extension: layer.extension().cloned(),
            linked_dataset: layer.linked_dataset().cloned(),
            property,
            infobox,
            children,
        })
    }
}
