//! Resolver contract for dataset lookups

use property_value::Value;
use std::collections::HashMap;

use crate::error::ErrorCode;
use crate::ids::DatasetId;

use super::{CellKey, Link};

/// Transient I/O failure while reading a dataset.
///
/// A missing dataset, row, or cell is not an error; resolvers report it as
/// `Ok(None)`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Link resolution failed for dataset '{dataset}': {message}")]
pub struct ResolveError {
    pub dataset: DatasetId,
    pub message: String,
}

impl ResolveError {
    pub fn new(dataset: DatasetId, message: impl Into<String>) -> Self {
        Self {
            dataset,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        ErrorCode::LinkResolutionFailed
    }
}

/// Source of dataset cell values.
///
/// `resolve_batch` is the preferred bulk form: the merge engine calls it once
/// per distinct dataset per pass. Implementations backed by a remote service
/// should override it; the default falls back to one `resolve_cell` per cell.
pub trait Resolver: Send + Sync {
    /// Read one cell. `Ok(None)` when the dataset, row, or cell is absent.
    fn resolve_cell(&self, cell: &CellKey) -> Result<Option<Value>, ResolveError>;

    /// Read many cells of one dataset. Absent cells are left out of the map.
    fn resolve_batch(
        &self,
        dataset: &DatasetId,
        cells: &[CellKey],
    ) -> Result<HashMap<CellKey, Value>, ResolveError> {
        let mut found = HashMap::with_capacity(cells.len());
        for cell in cells.iter().filter(|c| &c.dataset == dataset) {
            if let Some(value) = self.resolve_cell(cell)? {
                found.insert(cell.clone(), value);
            }
        }
        Ok(found)
    }

    /// Resolve a single link. A link without its own dataset reads from
    /// `row`; with neither, nothing is found.
    fn resolve_field(&self, link: &Link, row: Option<&DatasetId>) -> Result<Option<Value>, ResolveError> {
        match link.dataset.as_ref().or(row) {
            Some(dataset) => self.resolve_cell(&link.cell(dataset)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Table-backed resolver for unit tests

    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct TableResolver {
        pub cells: HashMap<CellKey, Value>,
        pub failing: HashSet<DatasetId>,
        pub batch_calls: Mutex<Vec<DatasetId>>,
    }

    impl TableResolver {
        pub fn with(mut self, dataset: &str, schema: &str, field: &str, value: Value) -> Self {
            self.cells.insert(
                CellKey {
                    dataset: dataset.into(),
                    schema: schema.into(),
                    field: field.into(),
                },
                value,
            );
            self
        }

        pub fn failing(mut self, dataset: &str) -> Self {
            self.failing.insert(dataset.into());
            self
        }

        pub fn batch_calls(&self) -> Vec<DatasetId> {
            self.batch_calls.lock().map(|c| c.clone()).unwrap_or_default()
        }
    }

    impl Resolver for TableResolver {
        fn resolve_cell(&self, cell: &CellKey) -> Result<Option<Value>, ResolveError> {
            if self.failing.contains(&cell.dataset) {
                return Err(ResolveError::new(cell.dataset.clone(), "connection reset"));
            }
            Ok(self.cells.get(cell).cloned())
        }

        fn resolve_batch(
            &self,
            dataset: &DatasetId,
            cells: &[CellKey],
        ) -> Result<HashMap<CellKey, Value>, ResolveError> {
            if let Ok(mut calls) = self.batch_calls.lock() {
                calls.push(dataset.clone());
            }
            let mut found = HashMap::new();
            for cell in cells {
                if let Some(value) = self.resolve_cell(cell)? {
                    found.insert(cell.clone(), value);
                }
            }
            Ok(found)
        }
    }
}
