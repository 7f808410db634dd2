//! The typed value union and its wire codec.

use serde_json::json;
use url::Url;

use crate::error::{shape_of, ValueError};
use crate::kinds::{all_finite, Camera, LatLng, LatLngHeight, Typography};
use crate::value_type::ValueType;

/// A property value. The variant is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
    LatLng(LatLng),
    LatLngHeight(LatLngHeight),
    Url(Url),
    /// Id of another entity (dataset, layer, asset).
    Reference(String),
    Camera(Camera),
    Typography(Typography),
    Array(ArrayValue),
}

/// Homogeneous array that remembers its item type even when empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    item_type: ValueType,
    items: Vec<Value>,
}

impl ArrayValue {
    /// Build an array, rejecting items of another type.
    pub fn new(item_type: ValueType, items: Vec<Value>) -> Result<Self, ValueError> {
        if let Some(bad) = items.iter().find(|v| v.value_type() != item_type) {
            return Err(ValueError::MixedArray {
                expected: item_type,
                found: bad.value_type(),
            });
        }
        Ok(Self { item_type, items })
    }

    /// Empty array of the given item type.
    pub fn empty(item_type: ValueType) -> Self {
        Self {
            item_type,
            items: Vec::new(),
        }
    }

    pub fn item_type(&self) -> &ValueType {
        &self.item_type
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Value {
    /// Type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::LatLng(_) => ValueType::LatLng,
            Value::LatLngHeight(_) => ValueType::LatLngHeight,
            Value::Url(_) => ValueType::Url,
            Value::Reference(_) => ValueType::Reference,
            Value::Camera(_) => ValueType::Camera,
            Value::Typography(_) => ValueType::Typography,
            Value::Array(a) => ValueType::array_of(a.item_type.clone()),
        }
    }

    /// Decode a wire value as `ty`. `None` means the wire value is invalid
    /// for that type.
    pub fn from_wire(ty: &ValueType, wire: &serde_json::Value) -> Option<Value> {
        Self::decode(ty, wire).ok()
    }

    /// Decode a wire value as `ty`, reporting why it was rejected.
    pub fn decode(ty: &ValueType, wire: &serde_json::Value) -> Result<Value, ValueError> {
        let wrong_shape = || ValueError::WrongShape {
            expected: ty.clone(),
            found: shape_of(wire),
        };

        match ty {
            ValueType::Bool => wire.as_bool().map(Value::Bool).ok_or_else(wrong_shape),
            ValueType::Number => {
                let n = wire.as_f64().ok_or_else(wrong_shape)?;
                if n.is_finite() {
                    Ok(Value::Number(n))
                } else {
                    Err(ValueError::malformed(ty, "number is not finite"))
                }
            }
            ValueType::String => wire
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(wrong_shape),
            ValueType::Url => {
                let s = wire.as_str().ok_or_else(wrong_shape)?;
                Url::parse(s)
                    .map(Value::Url)
                    .map_err(|e| ValueError::malformed(ty, e.to_string()))
            }
            ValueType::Reference => {
                let s = wire.as_str().ok_or_else(wrong_shape)?;
                if s.is_empty() {
                    Err(ValueError::malformed(ty, "reference id is empty"))
                } else {
                    Ok(Value::Reference(s.to_string()))
                }
            }
            ValueType::LatLng => {
                let v: LatLng = decode_object(ty, wire)?;
                finite_or_err(ty, &[v.lat, v.lng])?;
                Ok(Value::LatLng(v))
            }
            ValueType::LatLngHeight => {
                let v: LatLngHeight = decode_object(ty, wire)?;
                finite_or_err(ty, &[v.lat, v.lng, v.height])?;
                Ok(Value::LatLngHeight(v))
            }
            ValueType::Camera => {
                let v: Camera = decode_object(ty, wire)?;
                finite_or_err(
                    ty,
                    &[v.lat, v.lng, v.altitude, v.heading, v.pitch, v.roll, v.fov],
                )?;
                Ok(Value::Camera(v))
            }
            ValueType::Typography => {
                let v: Typography = decode_object(ty, wire)?;
                finite_or_err(ty, &[v.size])?;
                Ok(Value::Typography(v))
            }
            ValueType::Array(item_type) => {
                let raw = wire.as_array().ok_or_else(wrong_shape)?;
                let items = raw
                    .iter()
                    .map(|item| Self::decode(item_type, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(ArrayValue {
                    item_type: (**item_type).clone(),
                    items,
                }))
            }
        }
    }

    /// Encode to the wire representation.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => json!(b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => json!(s),
            Value::Url(u) => json!(u.as_str()),
            Value::Reference(id) => json!(id),
            Value::LatLng(v) => json!({"lat": v.lat, "lng": v.lng}),
            Value::LatLngHeight(v) => json!({"lat": v.lat, "lng": v.lng, "height": v.height}),
            Value::Camera(v) => json!({
                "lat": v.lat,
                "lng": v.lng,
                "altitude": v.altitude,
                "heading": v.heading,
                "pitch": v.pitch,
                "roll": v.roll,
                "fov": v.fov,
            }),
            Value::Typography(v) => json!({
                "font": v.font,
                "size": v.size,
                "weight": v.weight,
                "color": v.color,
                "align": v.align,
                "bold": v.bold,
                "italic": v.italic,
                "underline": v.underline,
            }),
            Value::Array(a) => serde_json::Value::Array(a.items.iter().map(Value::to_wire).collect()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Referenced id, if this is a reference.
    pub fn as_reference(&self) -> Option<&str> {
        match self {
            Value::Reference(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_latlng(&self) -> Option<LatLng> {
        match self {
            Value::LatLng(v) => Some(*v),
            Value::LatLngHeight(v) => Some(v.lat_lng()),
            _ => None,
        }
    }
}

fn decode_object<T: serde::de::DeserializeOwned>(
    ty: &ValueType,
    wire: &serde_json::Value,
) -> Result<T, ValueError> {
    if !wire.is_object() {
        return Err(ValueError::WrongShape {
            expected: ty.clone(),
            found: shape_of(wire),
        });
    }
    serde_json::from_value(wire.clone()).map_err(|e| ValueError::malformed(ty, e.to_string()))
}

fn finite_or_err(ty: &ValueType, values: &[f64]) -> Result<(), ValueError> {
    if all_finite(values) {
        Ok(())
    } else {
        Err(ValueError::malformed(ty, "number is not finite"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::TextAlign;
    use serde_json::json;

    #[test]
    fn test_scalar_decode() {
        assert_eq!(
            Value::from_wire(&ValueType::Number, &json!(0.4)),
            Some(Value::Number(0.4))
        );
        assert_eq!(
            Value::from_wire(&ValueType::Bool, &json!(true)),
            Some(Value::Bool(true))
        );
        assert_eq!(
            Value::from_wire(&ValueType::String, &json!("hello")),
            Some(Value::String("hello".into()))
        );
    }

    #[test]
    fn test_wrong_shape_is_invalid() {
        assert_eq!(Value::from_wire(&ValueType::Number, &json!("1")), None);
        assert_eq!(Value::from_wire(&ValueType::Bool, &json!(1)), None);
        assert_eq!(Value::from_wire(&ValueType::String, &json!(null)), None);
        assert_eq!(Value::from_wire(&ValueType::LatLng, &json!([1.0, 2.0])), None);
    }

    #[test]
    fn test_url_must_be_absolute() {
        assert!(Value::from_wire(&ValueType::Url, &json!("https://example.com/a.png")).is_some());
        assert!(Value::from_wire(&ValueType::Url, &json!("a.png")).is_none());
    }

    #[test]
    fn test_empty_reference_rejected() {
        assert!(Value::from_wire(&ValueType::Reference, &json!("")).is_none());
        assert_eq!(
            Value::from_wire(&ValueType::Reference, &json!("ds-1")),
            Some(Value::Reference("ds-1".into()))
        );
    }

    #[test]
    fn test_camera_requires_every_subfield() {
        let partial = json!({"lat": 1, "lng": 2, "altitude": 3, "heading": 0, "pitch": 0, "roll": 0});
        assert!(Value::from_wire(&ValueType::Camera, &partial).is_none());

        let mut full = partial.clone();
        full["fov"] = json!(1.04);
        let v = Value::from_wire(&ValueType::Camera, &full).unwrap();
        assert_eq!(v.value_type(), ValueType::Camera);
        assert_eq!(Value::from_wire(&ValueType::Camera, &v.to_wire()), Some(v));
    }

    #[test]
    fn test_typography_encodes_align_name() {
        let v = Value::Typography(Typography {
            font: "Inter".into(),
            size: 12.0,
            weight: "700".into(),
            color: "#000".into(),
            align: TextAlign::Center,
            bold: true,
            italic: false,
            underline: false,
        });
        assert_eq!(v.to_wire()["align"], json!("center"));
    }

    #[test]
    fn test_array_items_checked() {
        let ty = ValueType::array_of(ValueType::Number);
        let v = Value::from_wire(&ty, &json!([1, 2, 3])).unwrap();
        assert_eq!(v.value_type(), ty);
        assert!(Value::from_wire(&ty, &json!([1, "two"])).is_none());

        let empty = Value::from_wire(&ty, &json!([])).unwrap();
        assert_eq!(empty.value_type(), ty);
    }

    #[test]
    fn test_array_value_rejects_mixed_items() {
        let err = ArrayValue::new(
            ValueType::Bool,
            vec![Value::Bool(true), Value::Number(1.0)],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValueError::MixedArray {
                expected: ValueType::Bool,
                found: ValueType::Number
            }
        );
    }

    #[test]
    fn test_latlng_accessor_accepts_height() {
        let v = Value::LatLngHeight(LatLngHeight { lat: 1.0, lng: 2.0, height: 3.0 });
        assert_eq!(v.as_latlng(), Some(LatLng { lat: 1.0, lng: 2.0 }));
        assert_eq!(Value::Number(1.0).as_latlng(), None);
    }
}
