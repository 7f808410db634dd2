//! Value type tags.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// Declared type of a property field.
///
/// The string form is stable and used on the wire:
/// `bool`, `number`, `string`, `latlng`, `latlngheight`, `url`, `ref`,
/// `camera`, `typography`, and `array<T>` for homogeneous arrays.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Number,
    String,
    LatLng,
    LatLngHeight,
    Url,
    Reference,
    Camera,
    Typography,
    Array(Box<ValueType>),
}

impl ValueType {
    /// Array type holding items of `item`.
    pub fn array_of(item: ValueType) -> Self {
        Self::Array(Box::new(item))
    }

    /// Item type if this is an array type.
    pub fn item_type(&self) -> Option<&ValueType> {
        match self {
            Self::Array(item) => Some(item),
            _ => None,
        }
    }

    /// Composite kinds are decoded from objects with named subfields.
    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            Self::LatLng | Self::LatLngHeight | Self::Camera | Self::Typography
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
            Self::LatLng => write!(f, "latlng"),
            Self::LatLngHeight => write!(f, "latlngheight"),
            Self::Url => write!(f, "url"),
            Self::Reference => write!(f, "ref"),
            Self::Camera => write!(f, "camera"),
            Self::Typography => write!(f, "typography"),
            Self::Array(item) => write!(f, "array<{}>", item),
        }
    }
}

impl FromStr for ValueType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_prefix("array<").and_then(|r| r.strip_suffix('>')) {
            return Ok(Self::array_of(inner.parse()?));
        }
        match s {
            "bool" => Ok(Self::Bool),
            "number" => Ok(Self::Number),
            "string" => Ok(Self::String),
            "latlng" => Ok(Self::LatLng),
            "latlngheight" => Ok(Self::LatLngHeight),
            "url" => Ok(Self::Url),
            "ref" => Ok(Self::Reference),
            "camera" => Ok(Self::Camera),
            "typography" => Ok(Self::Typography),
            other => Err(ValueError::UnknownType(other.to_string())),
        }
    }
}

impl Serialize for ValueType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ValueType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
