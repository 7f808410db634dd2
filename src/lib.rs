//! Scene Property - property value resolution and merge engine
//!
//! Layers in a scene are configured through schema-typed properties. A
//! field's effective value is its stored value, or the dataset cell its link
//! chain points to. Layers created from dataset rows inherit their group's
//! property; merging the two yields the tree a frontend renders.
//!
//! The crate covers the property model and its pointer-addressed edits, link
//! resolution against a [`link::Resolver`], the property and layer merges,
//! and the JSON views handed to callers.

pub mod cancel;
pub mod config;
pub mod error;
pub mod ids;
pub mod layer;
pub mod link;
pub mod merge;
pub mod property;
pub mod resolve;
pub mod schema;
pub mod usecase;
pub mod view;

pub use cancel::{CancelToken, Cancelled};
pub use config::{EffectiveConfig, EngineConfig};
pub use error::{ErrorCode, PropertyError};
pub use layer::{LayerMergeError, LayerMerger, MergedLayer};
pub use link::{Link, Links, ResolveError, Resolver};
pub use merge::{MergeEngine, MergeError, MergeInput, MergedProperty};
pub use property::{Pointer, Property};
pub use resolve::resolve;
pub use schema::{Schema, SchemaRegistry};
pub use usecase::{Edited, PropertyEditor};
pub use view::{FieldView, MergedFieldView, MergedPropertyView, PropertyView};

pub use property_value::{TypedValue, Value, ValueType};
