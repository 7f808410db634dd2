//! Dataset Store
//!
//! In-memory stand-in for the dataset service that linked property fields
//! read from. Holds dataset schemas and dataset rows, answers single-cell and
//! per-dataset bulk reads, and records how often it was asked.
//!
//! Failure injection lets tests simulate transient I/O errors and latency per
//! dataset without a real backend.

pub mod failure;
pub mod fixture;
pub mod store;

pub use failure::{FailureConfig, FailureInjector};
pub use fixture::{DatasetFixture, FixtureError};
pub use store::{
    CellRequest, Dataset, DatasetField, DatasetSchema, DatasetSchemaField, DatasetStore,
    StoreError, StoreStats,
};
