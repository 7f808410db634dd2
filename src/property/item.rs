//! Top-level property items

use serde::{Deserialize, Serialize};

use crate::ids::{ItemId, SchemaGroupId};
use crate::schema::SchemaGroup;

use super::{Group, GroupList};

/// A property holds one item per schema group; list groups become a
/// `GroupList`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Group(Group),
    GroupList(GroupList),
}

impl Item {
    pub fn from_schema(schema_group: &SchemaGroup) -> Self {
        if schema_group.is_list {
            Item::GroupList(GroupList::new(schema_group.id.clone()))
        } else {
            Item::Group(Group::from_schema(schema_group))
        }
    }

    pub fn id(&self) -> &ItemId {
        match self {
            Item::Group(g) => &g.id,
            Item::GroupList(l) => &l.id,
        }
    }

    pub fn schema_group(&self) -> &SchemaGroupId {
        match self {
            Item::Group(g) => &g.schema_group,
            Item::GroupList(l) => &l.schema_group,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Item::GroupList(_))
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Item::Group(g) => Some(g),
            Item::GroupList(_) => None,
        }
    }

    pub fn as_group_list(&self) -> Option<&GroupList> {
        match self {
            Item::GroupList(l) => Some(l),
            Item::Group(_) => None,
        }
    }

    /// Every group of this item, in order
    pub fn groups(&self) -> std::slice::Iter<'_, Group> {
        match self {
            Item::Group(g) => std::slice::from_ref(g).iter(),
            Item::GroupList(l) => l.groups.iter(),
        }
    }
}
