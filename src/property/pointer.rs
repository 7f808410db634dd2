//! Pointers into a property instance
//!
//! Text form: `group/field`, `group[item]/field`, or `group[item]` for a list
//! item without a field.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{FieldId, ItemId, SchemaGroupId};

/// Address of a field (or of a list item when `field` is absent).
///
/// `item` is required when the group is a GroupList; for a plain Group it may
/// be omitted or must equal the group's item id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pointer {
    pub schema_group: SchemaGroupId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldId>,
}

impl Pointer {
    /// Field of a single (non-list) group
    pub fn field(group: impl Into<SchemaGroupId>, field: impl Into<FieldId>) -> Self {
        Self {
            schema_group: group.into(),
            item: None,
            field: Some(field.into()),
        }
    }

    /// Field of a specific item
    pub fn item_field(
        group: impl Into<SchemaGroupId>,
        item: impl Into<ItemId>,
        field: impl Into<FieldId>,
    ) -> Self {
        Self {
            schema_group: group.into(),
            item: Some(item.into()),
            field: Some(field.into()),
        }
    }

    /// A list item as a whole
    pub fn item(group: impl Into<SchemaGroupId>, item: impl Into<ItemId>) -> Self {
        Self {
            schema_group: group.into(),
            item: Some(item.into()),
            field: None,
        }
    }

    /// A schema group as a whole
    pub fn group(group: impl Into<SchemaGroupId>) -> Self {
        Self {
            schema_group: group.into(),
            item: None,
            field: None,
        }
    }

    /// Same pointer addressing `field`
    pub fn with_field(&self, field: impl Into<FieldId>) -> Self {
        Self {
            field: Some(field.into()),
            ..self.clone()
        }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.schema_group)?;
        if let Some(item) = &self.item {
            write!(f, "[{}]", item)?;
        }
        if let Some(field) = &self.field {
            write!(f, "/{}", field)?;
        }
        Ok(())
    }
}

/// Pointer text parse error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pointer '{0}'")]
pub struct PointerParseError(pub String);

impl FromStr for Pointer {
    type Err = PointerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PointerParseError(s.to_string());
        let (head, field) = match s.split_once('/') {
            Some((head, field)) if !field.is_empty() && !field.contains('/') => {
                (head, Some(FieldId::new(field)))
            }
            Some(_) => return Err(err()),
            None => (s, None),
        };

        let (group, item) = match head.split_once('[') {
            Some((group, rest)) => {
                let item = rest.strip_suffix(']').filter(|i| !i.is_empty()).ok_or_else(err)?;
                (group, Some(ItemId::new(item)))
            }
            None => (head, None),
        };
        if group.is_empty() || group.contains(']') {
            return Err(err());
        }

        Ok(Self {
            schema_group: SchemaGroupId::new(group),
            item,
            field,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_forms() {
        assert_eq!(Pointer::field("tiles", "tile_opacity").to_string(), "tiles/tile_opacity");
        assert_eq!(
            Pointer::item_field("tiles", "i1", "tile_opacity").to_string(),
            "tiles[i1]/tile_opacity"
        );
        assert_eq!(Pointer::item("tiles", "i1").to_string(), "tiles[i1]");
        assert_eq!(Pointer::group("tiles").to_string(), "tiles");
    }

    #[test]
    fn test_parse_round_trip() {
        for text in ["default/location", "tiles[01abc]/tile_url", "tiles[01abc]", "default"] {
            let pointer: Pointer = text.parse().unwrap();
            assert_eq!(pointer.to_string(), text);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in ["", "/field", "g/", "g[]/f", "g[i/f", "g/a/b"] {
            assert!(text.parse::<Pointer>().is_err(), "{} should not parse", text);
        }
    }
}
