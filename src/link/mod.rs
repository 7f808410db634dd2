//! Dataset links
//!
//! A field's links form a chain. The first link reads a cell of its own
//! dataset, or of the row the enclosing context is bound to. Each later link
//! without an explicit dataset follows the `Reference` value produced by the
//! link before it. The last link's cell is the field's value.

mod batch;
mod resolver;
mod store;

pub use batch::{BatchResolver, PassStats, ResolvedCells, DEFAULT_MAX_LINK_DEPTH};
pub use resolver::{ResolveError, Resolver};

#[cfg(test)]
pub(crate) use resolver::testing;

use property_value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ids::{DatasetFieldId, DatasetId, DatasetSchemaId};

/// Reference from a field to a dataset column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Absent: resolve against the row the context is bound to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetId>,
    pub schema: DatasetSchemaId,
    pub field: DatasetFieldId,
}

impl Link {
    /// A link resolved against the context row
    pub fn contextual(schema: impl Into<DatasetSchemaId>, field: impl Into<DatasetFieldId>) -> Self {
        Self {
            dataset: None,
            schema: schema.into(),
            field: field.into(),
        }
    }

    /// A link pinned to one dataset row
    pub fn to_dataset(
        dataset: impl Into<DatasetId>,
        schema: impl Into<DatasetSchemaId>,
        field: impl Into<DatasetFieldId>,
    ) -> Self {
        Self {
            dataset: Some(dataset.into()),
            schema: schema.into(),
            field: field.into(),
        }
    }

    pub fn is_contextual(&self) -> bool {
        self.dataset.is_none()
    }

    /// The cell this link reads when its row is `dataset`
    pub fn cell(&self, dataset: &DatasetId) -> CellKey {
        CellKey {
            dataset: dataset.clone(),
            schema: self.schema.clone(),
            field: self.field.clone(),
        }
    }
}

/// Key of one dataset cell; the link-key of bulk resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey {
    pub dataset: DatasetId,
    pub schema: DatasetSchemaId,
    pub field: DatasetFieldId,
}

/// Ordered link chain of one field
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Links(Vec<Link>);

impl Links {
    pub fn new(links: Vec<Link>) -> Self {
        Self(links)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(link: Link) -> Self {
        Self(vec![link])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Link> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&Link> {
        self.0.first()
    }

    pub fn last(&self) -> Option<&Link> {
        self.0.last()
    }

    /// Pin a contextual first link to `row`. Other links are untouched.
    pub fn bind_row(&self, row: Option<&DatasetId>) -> Links {
        let mut bound = self.clone();
        if let (Some(first), Some(row)) = (bound.0.first_mut(), row) {
            if first.dataset.is_none() {
                first.dataset = Some(row.clone());
            }
        }
        bound
    }

    /// Cell read by link `index`, given the value produced by the previous
    /// link. `None` when the chain cannot continue.
    pub fn cell_at(&self, index: usize, previous: Option<&Value>) -> Option<CellKey> {
        let link = self.0.get(index)?;
        let dataset = match &link.dataset {
            Some(dataset) => dataset.clone(),
            None if index > 0 => DatasetId::new(previous?.as_reference()?),
            None => return None,
        };
        Some(link.cell(&dataset))
    }

    /// Datasets named explicitly by the chain
    pub fn dataset_ids(&self) -> BTreeSet<DatasetId> {
        self.0.iter().filter_map(|l| l.dataset.clone()).collect()
    }

    pub fn touches_dataset(&self, dataset: &DatasetId) -> bool {
        self.0.iter().any(|l| l.dataset.as_ref() == Some(dataset))
    }
}

impl From<Vec<Link>> for Links {
    fn from(links: Vec<Link>) -> Self {
        Self(links)
    }
}

impl<'a> IntoIterator for &'a Links {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_row_fills_only_contextual_first_link() {
        let links = Links::new(vec![
            Link::contextual("stations", "operator"),
            Link::contextual("operators", "name"),
        ]);
        let bound = links.bind_row(Some(&DatasetId::new("row-1")));
        assert_eq!(bound.first().unwrap().dataset, Some(DatasetId::new("row-1")));
        assert_eq!(bound.last().unwrap().dataset, None);

        let pinned = Links::single(Link::to_dataset("row-9", "stations", "name"));
        let bound = pinned.bind_row(Some(&DatasetId::new("row-1")));
        assert_eq!(bound.first().unwrap().dataset, Some(DatasetId::new("row-9")));
    }

    #[test]
    fn test_cell_at_follows_reference() {
        let links = Links::new(vec![
            Link::to_dataset("row-1", "stations", "operator"),
            Link::contextual("operators", "name"),
        ]);
        let first = links.cell_at(0, None).unwrap();
        assert_eq!(first.dataset.as_str(), "row-1");

        let op = Value::Reference("op-7".into());
        let second = links.cell_at(1, Some(&op)).unwrap();
        assert_eq!(second.dataset.as_str(), "op-7");
        assert_eq!(second.schema.as_str(), "operators");

        assert!(links.cell_at(1, Some(&Value::String("op-7".into()))).is_none());
        assert!(links.cell_at(1, None).is_none());
        assert!(links.cell_at(2, Some(&op)).is_none());
    }

    #[test]
    fn test_unbound_contextual_link_has_no_cell() {
        let links = Links::single(Link::contextual("stations", "name"));
        assert!(links.cell_at(0, None).is_none());
    }

    #[test]
    fn test_links_serialize_as_array() {
        let links = Links::single(Link::contextual("s", "f"));
        assert_eq!(
            serde_json::to_value(&links).unwrap(),
            serde_json::json!([{"schema": "s", "field": "f"}])
        );
    }
}
