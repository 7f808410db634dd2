//! Identifier newtypes
//!
//! Every id is an opaque string. Ids of entities created by this crate
//! (properties, list items, layers) are lowercase ULIDs.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh id
            pub fn generate() -> Self {
                Self(ulid::Ulid::new().to_string().to_lowercase())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Property instance id
    PropertyId
);
string_id!(
    /// Id of a Group or GroupList inside a property
    ItemId
);
string_id!(
    /// Property schema id (`plugin/extension` by convention)
    SchemaId
);
string_id!(
    /// Group id within a property schema
    SchemaGroupId
);
string_id!(
    /// Field id within a schema group
    FieldId
);
string_id!(
    /// Dataset row id
    DatasetId
);
string_id!(
    /// Dataset schema id
    DatasetSchemaId
);
string_id!(
    /// Column id within a dataset schema
    DatasetFieldId
);
string_id!(
    /// Layer id
    LayerId
);
string_id!(
    /// Infobox field id
    InfoboxFieldId
);
string_id!(
    /// Plugin id
    PluginId
);
string_id!(
    /// Extension id within a plugin
    ExtensionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_unique_and_lowercase() {
        let a = ItemId::generate();
        let b = ItemId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 26);
        assert!(a.as_str().chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = DatasetId::new("ds-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ds-1\"");
    }
}
