//! Property Value Types
//!
//! Defines the closed set of value kinds a property field can hold and their
//! JSON wire representation.
//!
//! Decoding is strict: a wire value either decodes into exactly the requested
//! type or it is rejected. Nothing is coerced and nothing falls back to a
//! default.

pub mod error;
pub mod kinds;
pub mod typed;
pub mod value;
pub mod value_type;

pub use error::ValueError;
pub use kinds::{Camera, LatLng, LatLngHeight, TextAlign, Typography};
pub use typed::TypedValue;
pub use value::{ArrayValue, Value};
pub use value_type::ValueType;

/// Re-exported so callers can build `Value::Url` without a direct dependency.
pub use url::Url;
