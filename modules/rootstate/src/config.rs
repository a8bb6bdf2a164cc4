use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use typed_builder::TypedBuilder;

/// Nested dispatches allowed on one store before it refuses to recurse.
pub const DEFAULT_MAX_DISPATCH_DEPTH: usize = 128;

/// Construction-time settings for a [`Store`](crate::Store). Fixed for the
/// store's lifetime.
#[derive(Debug, Clone, Deserialize, TypedBuilder)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Retain every change record. Off by default.
    #[builder(default)]
    pub use_change_log: bool,
    /// Default path for modifiers registered without one.
    #[builder(default, setter(strip_option, into))]
    pub path: Option<String>,
    #[builder(default = DEFAULT_MAX_DISPATCH_DEPTH)]
    pub max_dispatch_depth: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            use_change_log: false,
            path: None,
            max_dispatch_depth: DEFAULT_MAX_DISPATCH_DEPTH,
        }
    }
}

impl StoreConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse store config")
    }
}

/// Load and parse a TOML store config file.
pub fn load_config(path: &Path) -> Result<StoreConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: StoreConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    Ok(config)
}
