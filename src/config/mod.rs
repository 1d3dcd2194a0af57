//! Layered configuration
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. User config (`<config_dir>/tmf-settings/config.toml`)
//! 3. `ORCASLICER_*` environment variables
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;

pub use defaults::{BuiltinDefaults, DEFAULT_WIKI_BASE};
pub use effective::{
    default_config_path, env_layer, ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig,
};
pub use merge::{deep_merge, merge_layers};
