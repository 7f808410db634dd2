//! Composite value kinds.
//!
//! Each kind decodes from a JSON object that carries every named subfield.
//! Unknown subfields are rejected so a misspelled key cannot silently drop
//! data.

use serde::{Deserialize, Serialize};

/// Geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Geographic coordinate with height in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LatLngHeight {
    pub lat: f64,
    pub lng: f64,
    pub height: f64,
}

impl LatLngHeight {
    /// Drop the height component.
    pub fn lat_lng(&self) -> LatLng {
        LatLng {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// Camera pose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Camera {
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
    pub fov: f64,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
    JustifyAll,
}

/// Text styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Typography {
    pub font: String,
    pub size: f64,
    pub weight: String,
    pub color: String,
    pub align: TextAlign,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

/// True when every number in a composite is finite.
pub(crate) fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_latlng_requires_both_fields() {
        assert!(serde_json::from_value::<LatLng>(json!({"lat": 1.0})).is_err());
        let ll: LatLng = serde_json::from_value(json!({"lat": 1, "lng": 2.5})).unwrap();
        assert_eq!(ll, LatLng { lat: 1.0, lng: 2.5 });
    }

    #[test]
    fn test_unknown_subfield_rejected() {
        let wire = json!({"lat": 1.0, "lng": 2.0, "alt": 3.0});
        assert!(serde_json::from_value::<LatLng>(wire).is_err());
    }

    #[test]
    fn test_typography_align_names() {
        let wire = json!({
            "font": "Noto Sans",
            "size": 14,
            "weight": "400",
            "color": "#ffffff",
            "align": "justify_all",
            "bold": false,
            "italic": true,
            "underline": false
        });
        let t: Typography = serde_json::from_value(wire).unwrap();
        assert_eq!(t.align, TextAlign::JustifyAll);
        assert!(t.italic);
    }
}
