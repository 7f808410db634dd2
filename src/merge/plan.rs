//! Structural half of a merge
//!
//! Planning pairs up items, groups, and fields of the two scopes and picks a
//! winner per field. It does no I/O: winning values are left raw and winning
//! links are bound to their row context, ready for one batched pass.

use property_value::Value;

use crate::ids::{DatasetId, FieldId, PropertyId, SchemaGroupId};
use crate::link::{Links, Resolver};
use crate::property::{Field, Group, GroupList, Item, Pointer, Property};
use crate::resolve::resolve;
use crate::schema::Schema;

use super::merged::{FieldSource, MergedField, MergedGroup, MergedGroupList, MergedItem, MergedProperty};
use super::{MergeError, MergeInput};

/// A merged tree whose values are not resolved yet
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    tree: MergedProperty,
}

impl MergePlan {
    /// Pair the inputs. `None` when both properties are absent.
    pub fn new(input: &MergeInput<'_>) -> Result<Option<Self>, MergeError> {
        let ((Some(base), _) | (None, Some(base))) = (input.original, input.parent) else {
            return Ok(None);
        };
        if let (Some(original), Some(parent)) = (input.original, input.parent) {
            if original.schema != parent.schema {
                return Err(MergeError::SchemaMismatch {
                    expected: original.schema.clone(),
                    found: parent.schema.clone(),
                });
            }
        }
        if let Some(schema) = input.schema {
            if schema.id() != &base.schema {
                return Err(MergeError::SchemaMismatch {
                    expected: schema.id().clone(),
                    found: base.schema.clone(),
                });
            }
        }

        let original_id = input.original.map(|p| p.id.clone());
        let parent_id = input.parent.map(|p| p.id.clone());
        let planner = Planner {
            original: original_id.as_ref(),
            parent: parent_id.as_ref(),
        };
        let context = input.context;

        let mut items = Vec::new();
        for group in schema_groups(input.original, input.parent) {
            let o = input.original.and_then(|p| p.item(&group));
            let p = input.parent.and_then(|p| p.item(&group));
            if let Some(item) = planner.item(o, p, context) {
                items.push(item);
            }
        }

        Ok(Some(Self {
            tree: MergedProperty {
                schema: base.schema.clone(),
                original_id,
                parent_id,
                linked_dataset: context.cloned(),
                items,
            },
        }))
    }

    /// Every bound, non-empty link chain in the tree
    pub fn chains(&self) -> Vec<Links> {
        self.tree
            .fields()
            .filter(|f| !f.links.is_empty())
            .map(|f| f.links.clone())
            .collect()
    }

    /// Resolve every field through `lookup` (a live resolver or the memo of
    /// a batch pass). An unset, unlinked field takes the schema default when
    /// a schema is given.
    pub fn resolve<R: Resolver + ?Sized>(self, lookup: &R, schema: Option<&Schema>) -> Result<MergedProperty, MergeError> {
        let mut tree = self.tree;
        for (group, field) in tree.fields_mut() {
            let raw = field.value.take();
            field.value = if field.links.is_empty() {
                raw.or_else(|| default_of(schema, group, &field.field))
            } else {
                resolve(lookup, raw, &field.links, field.overridden)?
            };
        }
        Ok(tree)
    }

    /// The planned tree, values raw
    pub fn tree(&self) -> &MergedProperty {
        &self.tree
    }
}

fn default_of(schema: Option<&Schema>, group: &SchemaGroupId, field: &FieldId) -> Option<Value> {
    schema?.field(group, field)?.default.clone()
}

/// Schema groups present in either input: original order first, then the
/// parent's extras
fn schema_groups(original: Option<&Property>, parent: Option<&Property>) -> Vec<SchemaGroupId> {
    let mut groups: Vec<SchemaGroupId> = Vec::new();
    for property in [original, parent].into_iter().flatten() {
        for item in &property.items {
            if !groups.contains(item.schema_group()) {
                groups.push(item.schema_group().clone());
            }
        }
    }
    groups
}

struct Planner<'a> {
    original: Option<&'a PropertyId>,
    parent: Option<&'a PropertyId>,
}

impl Planner<'_> {
    fn item(&self, original: Option<&Item>, parent: Option<&Item>, context: Option<&DatasetId>) -> Option<MergedItem> {
        match (original, parent) {
            (Some(Item::Group(o)), p) => {
                let p = p.and_then(Item::as_group);
                Some(MergedItem::Group(self.group(Some(o), p, context)))
            }
            (Some(Item::GroupList(o)), p) => {
                let p = p.and_then(Item::as_group_list);
                Some(MergedItem::GroupList(self.list(Some(o), p, context)))
            }
            (None, Some(Item::Group(p))) => Some(MergedItem::Group(self.group(None, Some(p), context))),
            (None, Some(Item::GroupList(p))) => Some(MergedItem::GroupList(self.list(None, Some(p), context))),
            (None, None) => None,
        }
    }

    /// The original list decides the shape. Each original item pairs with
    /// the parent item bound to the same row, or else with the unbound
    /// parent item at the same position.
    fn list(&self, original: Option<&GroupList>, parent: Option<&GroupList>, context: Option<&DatasetId>) -> MergedGroupList {
        let (schema_group, groups) = match (original, parent) {
            (Some(o), _) => {
                let groups = o
                    .groups
                    .iter()
                    .enumerate()
                    .map(|(index, og)| {
                        let partner = parent.and_then(|p| match &og.dataset_row {
                            Some(row) => p.group_for_row(row),
                            None => p.groups.get(index).filter(|pg| pg.dataset_row.is_none()),
                        });
                        self.group(Some(og), partner, context)
                    })
                    .collect();
                (o.schema_group.clone(), groups)
            }
            (None, Some(p)) => (
                p.schema_group.clone(),
                p.groups.iter().map(|pg| self.group(None, Some(pg), context)).collect(),
            ),
            (None, None) => (SchemaGroupId::new(""), Vec::new()),
        };
        MergedGroupList {
            schema_group,
            original_id: original.map(|l| l.id.clone()),
            parent_id: parent.map(|l| l.id.clone()),
            groups,
        }
    }

    fn group(&self, original: Option<&Group>, parent: Option<&Group>, context: Option<&DatasetId>) -> MergedGroup {
        let base = original.or(parent);
        let schema_group = base.map(|g| g.schema_group.clone()).unwrap_or_else(|| SchemaGroupId::new(""));
        let row = original
            .and_then(|g| g.dataset_row.as_ref())
            .or_else(|| parent.and_then(|g| g.dataset_row.as_ref()))
            .or(context);

        let mut field_ids: Vec<&FieldId> = Vec::new();
        for group in [original, parent].into_iter().flatten() {
            for field in &group.fields {
                if !field_ids.contains(&&field.field) {
                    field_ids.push(&field.field);
                }
            }
        }

        let fields = field_ids
            .into_iter()
            .filter_map(|id| {
                let o = original.and_then(|g| g.field(id).map(|f| (g, f)));
                let p = parent.and_then(|g| g.field(id).map(|f| (g, f)));
                self.field(o, p, row)
            })
            .collect();

        MergedGroup {
            schema_group,
            original_id: original.map(|g| g.id.clone()),
            parent_id: parent.map(|g| g.id.clone()),
            linked_dataset: row.cloned(),
            fields,
        }
    }

    /// Parent wins when it has a value or links. The parent's chain replaces
    /// the original's outright.
    fn field(
        &self,
        original: Option<(&Group, &Field)>,
        parent: Option<(&Group, &Field)>,
        row: Option<&DatasetId>,
    ) -> Option<MergedField> {
        let o = original.map(|(_, f)| f);
        let p = parent.map(|(_, f)| f).filter(|f| !f.is_empty());
        let winner = p.or(o).or(parent.map(|(_, f)| f))?;
        let overridden = match (p, o) {
            (Some(p), Some(o)) => p.value != o.value || p.links != o.links,
            (Some(_), None) => true,
            (None, _) => false,
        };

        Some(MergedField {
            field: winner.field.clone(),
            value_type: winner.value_type.clone(),
            value: winner.value.clone(),
            links: winner.links.bind_row(row),
            overridden,
            original: self.original.zip(original).map(|(id, (g, f))| source(id, g, f)),
            parent: self.parent.zip(parent).map(|(id, (g, f))| source(id, g, f)),
        })
    }
}

fn source(property: &PropertyId, group: &Group, field: &Field) -> FieldSource {
    FieldSource {
        property: property.clone(),
        pointer: Pointer {
            schema_group: group.schema_group.clone(),
            item: Some(group.id.clone()),
            field: Some(field.field.clone()),
        },
    }
}
