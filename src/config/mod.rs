//! Layered engine configuration
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. User config (`~/.config/scene-property/engine.toml`)
//! 3. Project config (`.scene-property.toml`)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::{EngineConfig, LogConfig};
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, PROJECT_CONFIG_FILE};
pub use merge::{deep_merge, merge_layers};
