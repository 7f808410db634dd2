//! Scene fixtures shared by the integration tests
//!
//! - `schema.json`: marker schema with a `tiles` list group
//! - `datasets.json`: station rows plus the operator rows they reference
//! - `group_property.json`: a group template linking every field to the row
//! - `item_property.json`: an item's own property

#![allow(dead_code)]

use dataset_store::{DatasetFixture, DatasetStore};
use scene_property::{Property, Schema};
use std::fs;
use std::path::{Path, PathBuf};

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/scene")
        .join(name)
}

fn read(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).expect("fixture readable")
}

pub fn schema() -> Schema {
    Schema::from_json(&read("schema.json")).expect("schema fixture valid")
}

pub fn group_property() -> Property {
    serde_json::from_str(&read("group_property.json")).expect("group property fixture valid")
}

pub fn item_property() -> Property {
    serde_json::from_str(&read("item_property.json")).expect("item property fixture valid")
}

pub fn store() -> DatasetStore {
    DatasetFixture::from_json(&read("datasets.json"))
        .and_then(DatasetFixture::into_store)
        .expect("dataset fixture valid")
}
