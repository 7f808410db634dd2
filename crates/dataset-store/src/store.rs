//! In-memory dataset state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use property_value::{Value, ValueType};

use crate::failure::{FailureConfig, FailureInjector};

/// A column of a dataset schema.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSchemaField {
    pub id: String,
    pub name: String,
    pub value_type: ValueType,
}

/// Shape shared by all rows of one dataset source.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSchema {
    pub id: String,
    pub name: String,
    pub fields: Vec<DatasetSchemaField>,
    /// Column used as the row's display label.
    pub representative_field: Option<String>,
}

impl DatasetSchema {
    pub fn field(&self, id: &str) -> Option<&DatasetSchemaField> {
        self.fields.iter().find(|f| f.id == id)
    }
}

/// One cell of a dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetField {
    pub field: String,
    pub value: Option<Value>,
}

/// One dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub id: String,
    pub schema: String,
    pub fields: Vec<DatasetField>,
}

impl Dataset {
    pub fn field(&self, id: &str) -> Option<&DatasetField> {
        self.fields.iter().find(|f| f.field == id)
    }
}

/// A cell addressed within one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRequest {
    pub schema: String,
    pub field: String,
}

/// Read accounting, for asserting batching behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Calls to `read_cell`
    pub single_reads: usize,
    /// Calls to `read_cells`
    pub batch_reads: usize,
    /// Cells requested through `read_cells`
    pub cells_read: usize,
}

/// Errors returned by the store
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("dataset '{dataset}' unavailable: {message}")]
    Unavailable { dataset: String, message: String },

    #[error("unknown dataset schema '{0}'")]
    UnknownSchema(String),

    #[error("field '{field}' of dataset '{dataset}' expects {expected}, got {found}")]
    FieldType {
        dataset: String,
        field: String,
        expected: ValueType,
        found: ValueType,
    },
}

/// Thread-safe dataset store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    data: Arc<RwLock<StoreData>>,
    failures: Arc<Mutex<FailureInjector>>,
    stats: Arc<Mutex<StoreStats>>,
}

#[derive(Debug, Default)]
struct StoreData {
    schemas: HashMap<String, DatasetSchema>,
    datasets: HashMap<String, Dataset>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a dataset schema
    pub fn insert_schema(&self, schema: DatasetSchema) {
        self.write_data().schemas.insert(schema.id.clone(), schema);
    }

    /// Insert or replace a dataset row after checking it against its schema
    pub fn insert_dataset(&self, dataset: Dataset) -> Result<(), StoreError> {
        let mut data = self.write_data();
        let schema = data
            .schemas
            .get(&dataset.schema)
            .ok_or_else(|| StoreError::UnknownSchema(dataset.schema.clone()))?;

        for cell in &dataset.fields {
            let (Some(column), Some(value)) = (schema.field(&cell.field), &cell.value) else {
                continue;
            };
            if value.value_type() != column.value_type {
                return Err(StoreError::FieldType {
                    dataset: dataset.id.clone(),
                    field: cell.field.clone(),
                    expected: column.value_type.clone(),
                    found: value.value_type(),
                });
            }
        }

        data.datasets.insert(dataset.id.clone(), dataset);
        Ok(())
    }

    /// Delete a dataset row, returning it if it existed
    pub fn remove_dataset(&self, dataset_id: &str) -> Option<Dataset> {
        self.write_data().datasets.remove(dataset_id)
    }

    pub fn dataset(&self, dataset_id: &str) -> Option<Dataset> {
        self.read_data().datasets.get(dataset_id).cloned()
    }

    pub fn schema(&self, schema_id: &str) -> Option<DatasetSchema> {
        self.read_data().schemas.get(schema_id).cloned()
    }

    /// All rows of a schema, ordered by id
    pub fn datasets_of_schema(&self, schema_id: &str) -> Vec<Dataset> {
        let mut rows: Vec<Dataset> = self
            .read_data()
            .datasets
            .values()
            .filter(|d| d.schema == schema_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }

    /// Inject a failure or delay for reads of one dataset
    pub fn inject_failure(&self, dataset_id: impl Into<String>, config: FailureConfig) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.inject(dataset_id, config);
        }
    }

    /// Clear all failure injections
    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.clear();
        }
    }

    /// Snapshot of the read counters
    pub fn stats(&self) -> StoreStats {
        self.stats.lock().map(|s| *s).unwrap_or_default()
    }

    pub fn reset_stats(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            *stats = StoreStats::default();
        }
    }

    /// Read one cell. `Ok(None)` when the dataset, schema, or field is absent.
    pub fn read_cell(
        &self,
        dataset_id: &str,
        schema_id: &str,
        field_id: &str,
    ) -> Result<Option<Value>, StoreError> {
        if let Ok(mut stats) = self.stats.lock() {
            stats.single_reads += 1;
        }
        self.disturb(dataset_id)?;

        let data = self.read_data();
        Ok(Self::lookup(&data, dataset_id, schema_id, field_id))
    }

    /// Read many cells of one dataset in a single call. Only found cells are
    /// present in the result.
    pub fn read_cells(
        &self,
        dataset_id: &str,
        cells: &[CellRequest],
    ) -> Result<HashMap<CellRequest, Value>, StoreError> {
        if let Ok(mut stats) = self.stats.lock() {
            stats.batch_reads += 1;
            stats.cells_read += cells.len();
        }
        self.disturb(dataset_id)?;

        let data = self.read_data();
        Ok(cells
            .iter()
            .filter_map(|cell| {
                Self::lookup(&data, dataset_id, &cell.schema, &cell.field)
                    .map(|value| (cell.clone(), value))
            })
            .collect())
    }

    fn read_data(&self) -> std::sync::RwLockReadGuard<'_, StoreData> {
        match self.data.read() {
            Ok(data) => data,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_data(&self) -> std::sync::RwLockWriteGuard<'_, StoreData> {
        match self.data.write() {
            Ok(data) => data,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lookup(data: &StoreData, dataset_id: &str, schema_id: &str, field_id: &str) -> Option<Value> {
        let dataset = data.datasets.get(dataset_id)?;
        if dataset.schema != schema_id {
            return None;
        }
        dataset.field(field_id)?.value.clone()
    }

    /// Apply an injected delay or error. The lock is released before sleeping.
    fn disturb(&self, dataset_id: &str) -> Result<(), StoreError> {
        let config = self
            .failures
            .lock()
            .ok()
            .and_then(|mut failures| failures.check(dataset_id));
        let Some(config) = config else {
            return Ok(());
        };

        if let Some(delay) = config.delay {
            std::thread::sleep(delay);
        }
        match config.error_message {
            Some(message) => Err(StoreError::Unavailable {
                dataset: dataset_id.to_string(),
                message,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_row() -> DatasetStore {
        let store = DatasetStore::new();
        store.insert_schema(DatasetSchema {
            id: "cities".into(),
            name: "Cities".into(),
            fields: vec![
                DatasetSchemaField {
                    id: "name".into(),
                    name: "Name".into(),
                    value_type: ValueType::String,
                },
                DatasetSchemaField {
                    id: "population".into(),
                    name: "Population".into(),
                    value_type: ValueType::Number,
                },
            ],
            representative_field: Some("name".into()),
        });
        store
            .insert_dataset(Dataset {
                id: "tokyo".into(),
                schema: "cities".into(),
                fields: vec![
                    DatasetField {
                        field: "name".into(),
                        value: Some(Value::String("Tokyo".into())),
                    },
                    DatasetField {
                        field: "population".into(),
                        value: None,
                    },
                ],
            })
            .unwrap();
        store
    }

    #[test]
    fn test_writes_survive_poisoned_lock() {
        let store = store_with_row();
        let shared = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.data.write();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(store.data.is_poisoned());

        store.insert_schema(DatasetSchema {
            id: "lines".into(),
            name: "Lines".into(),
            fields: vec![],
            representative_field: None,
        });
        assert!(store.schema("lines").is_some());
        assert!(store.remove_dataset("tokyo").is_some());
        assert!(store.dataset("tokyo").is_none());
    }

    #[test]
    fn test_read_cell_found_and_missing() {
        let store = store_with_row();
        assert_eq!(
            store.read_cell("tokyo", "cities", "name").unwrap(),
            Some(Value::String("Tokyo".into()))
        );
        assert_eq!(store.read_cell("tokyo", "cities", "population").unwrap(), None);
        assert_eq!(store.read_cell("osaka", "cities", "name").unwrap(), None);
        assert_eq!(store.read_cell("tokyo", "other", "name").unwrap(), None);
        assert_eq!(store.stats().single_reads, 4);
    }

    #[test]
    fn test_read_cells_counts_one_batch() {
        let store = store_with_row();
        let cells = vec![
            CellRequest { schema: "cities".into(), field: "name".into() },
            CellRequest { schema: "cities".into(), field: "population".into() },
        ];
        let found = store.read_cells("tokyo", &cells).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(
            store.stats(),
            StoreStats { single_reads: 0, batch_reads: 1, cells_read: 2 }
        );
    }

    #[test]
    fn test_insert_rejects_wrong_cell_type() {
        let store = store_with_row();
        let err = store
            .insert_dataset(Dataset {
                id: "bad".into(),
                schema: "cities".into(),
                fields: vec![DatasetField {
                    field: "population".into(),
                    value: Some(Value::String("many".into())),
                }],
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::FieldType { .. }));
    }

    #[test]
    fn test_injected_error_then_removal() {
        let store = store_with_row();
        store.inject_failure("tokyo", FailureConfig::error("timeout").with_fail_count(1));
        assert!(matches!(
            store.read_cell("tokyo", "cities", "name"),
            Err(StoreError::Unavailable { .. })
        ));
        assert!(store.read_cell("tokyo", "cities", "name").unwrap().is_some());

        assert!(store.remove_dataset("tokyo").is_some());
        assert_eq!(store.read_cell("tokyo", "cities", "name").unwrap(), None);
    }
}
