//! JSON fixtures for seeding a store
//!
//! ```json
//! {
//!   "schemas": [
//!     {"id": "cities", "name": "Cities", "representative_field": "name",
//!      "fields": [{"id": "name", "name": "Name", "type": "string"}]}
//!   ],
//!   "datasets": [
//!     {"id": "tokyo", "schema": "cities", "fields": {"name": "Tokyo"}}
//!   ]
//! }
//! ```
//!
//! Cell values are decoded with the column type declared by the schema; a
//! `null` cell is stored as unset.

use serde::Deserialize;
use std::collections::BTreeMap;

use property_value::{Value, ValueError, ValueType};

use crate::store::{Dataset, DatasetField, DatasetSchema, DatasetSchemaField, DatasetStore, StoreError};

/// Fixture file contents
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetFixture {
    #[serde(default)]
    pub schemas: Vec<SchemaFixture>,
    #[serde(default)]
    pub datasets: Vec<DatasetRowFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaFixture {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub representative_field: Option<String>,
    pub fields: Vec<ColumnFixture>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnFixture {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetRowFixture {
    pub id: String,
    pub schema: String,
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Fixture loading errors
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("fixture parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("dataset '{dataset}' references unknown column '{field}'")]
    UnknownColumn { dataset: String, field: String },

    #[error("dataset '{dataset}' column '{field}': {source}")]
    Cell {
        dataset: String,
        field: String,
        source: ValueError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DatasetFixture {
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a fresh store holding every schema and dataset of the fixture
    pub fn into_store(self) -> Result<DatasetStore, FixtureError> {
        let store = DatasetStore::new();
        self.load_into(&store)?;
        Ok(store)
    }

    /// Insert every schema and dataset into an existing store
    pub fn load_into(self, store: &DatasetStore) -> Result<(), FixtureError> {
        for schema in self.schemas {
            store.insert_schema(DatasetSchema {
                id: schema.id,
                name: schema.name,
                representative_field: schema.representative_field,
                fields: schema
                    .fields
                    .into_iter()
                    .map(|c| DatasetSchemaField {
                        id: c.id,
                        name: c.name,
                        value_type: c.value_type,
                    })
                    .collect(),
            });
        }

        for row in self.datasets {
            let schema = store
                .schema(&row.schema)
                .ok_or_else(|| StoreError::UnknownSchema(row.schema.clone()))?;

            let mut fields = Vec::with_capacity(row.fields.len());
            for (field, wire) in row.fields {
                let column = schema.field(&field).ok_or_else(|| FixtureError::UnknownColumn {
                    dataset: row.id.clone(),
                    field: field.clone(),
                })?;
                let value = if wire.is_null() {
                    None
                } else {
                    let decoded = Value::decode(&column.value_type, &wire).map_err(|source| {
                        FixtureError::Cell {
                            dataset: row.id.clone(),
                            field: field.clone(),
                            source,
                        }
                    })?;
                    Some(decoded)
                };
                fields.push(DatasetField { field, value });
            }

            store.insert_dataset(Dataset {
                id: row.id,
                schema: row.schema,
                fields,
            })?;
        }
        Ok(())
    }
}
