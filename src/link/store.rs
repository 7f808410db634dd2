//! `Resolver` over the in-memory dataset store

use dataset_store::{CellRequest, DatasetStore, StoreError};
use property_value::Value;
use std::collections::HashMap;

use crate::ids::DatasetId;

use super::{CellKey, ResolveError, Resolver};

fn resolve_error(dataset: &DatasetId, err: StoreError) -> ResolveError {
    match err {
        StoreError::Unavailable { message, .. } => ResolveError::new(dataset.clone(), message),
        other => ResolveError::new(dataset.clone(), other.to_string()),
    }
}

impl Resolver for DatasetStore {
    fn resolve_cell(&self, cell: &CellKey) -> Result<Option<Value>, ResolveError> {
        self.read_cell(cell.dataset.as_str(), cell.schema.as_str(), cell.field.as_str())
            .map_err(|e| resolve_error(&cell.dataset, e))
    }

    fn resolve_batch(
        &self,
        dataset: &DatasetId,
        cells: &[CellKey],
    ) -> Result<HashMap<CellKey, Value>, ResolveError> {
        let requests: Vec<CellRequest> = cells
            .iter()
            .filter(|c| &c.dataset == dataset)
            .map(|c| CellRequest {
                schema: c.schema.to_string(),
                field: c.field.to_string(),
            })
            .collect();
        let mut found = self
            .read_cells(dataset.as_str(), &requests)
            .map_err(|e| resolve_error(dataset, e))?;

        Ok(cells
            .iter()
            .filter_map(|cell| {
                let request = CellRequest {
                    schema: cell.schema.to_string(),
                    field: cell.field.to_string(),
                };
                found.remove(&request).map(|value| (cell.clone(), value))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::link::{BatchResolver, Link, Links};
    use dataset_store::{DatasetFixture, FailureConfig};

    fn store() -> DatasetStore {
        DatasetFixture::from_json(
            r#"{
                "schemas": [{"id": "cities", "fields": [
                    {"id": "name", "type": "string"},
                    {"id": "pop", "type": "number"}
                ]}],
                "datasets": [{"id": "tokyo", "schema": "cities", "fields": {"name": "Tokyo", "pop": 14.0}}]
            }"#,
        )
        .unwrap()
        .into_store()
        .unwrap()
    }

    #[test]
    fn test_store_resolves_cells() {
        let store = store();
        let link = Link::to_dataset("tokyo", "cities", "name");
        assert_eq!(
            store.resolve_field(&link, None).unwrap(),
            Some(Value::String("Tokyo".into()))
        );
        let wrong_schema = Link::to_dataset("tokyo", "towns", "name");
        assert_eq!(store.resolve_field(&wrong_schema, None).unwrap(), None);
    }

    #[test]
    fn test_batch_pass_uses_one_store_read_per_dataset() {
        let store = store();
        let chains = vec![
            Links::single(Link::to_dataset("tokyo", "cities", "name")),
            Links::single(Link::to_dataset("tokyo", "cities", "pop")),
        ];
        let memo = BatchResolver::new(&store).prefetch(&chains, &CancelToken::new()).unwrap();
        let stats = store.stats();
        assert_eq!(stats.batch_reads, 1);
        assert_eq!(stats.cells_read, 2);
        assert_eq!(stats.single_reads, 0);
        assert_eq!(memo.len(), 2);
    }

    #[test]
    fn test_unavailable_dataset_maps_to_resolve_error() {
        let store = store();
        store.inject_failure("tokyo", FailureConfig::error("connection refused"));
        let err = store
            .resolve_cell(&Link::to_dataset("tokyo", "cities", "name").cell(&"tokyo".into()))
            .unwrap_err();
        assert_eq!(err.dataset.as_str(), "tokyo");
        assert_eq!(err.message, "connection refused");
    }
}
