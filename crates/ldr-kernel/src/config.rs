use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, KernelResult};

/// Configuration for the resource kernel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// When `true`, every lifecycle write also records a version, and
    /// membership of a modified container is ended and re-added instead of
    /// rebuilt from history.
    pub auto_versioning: bool,
    /// Maximum number of cached user-type sets. `0` disables caching.
    pub user_types_cache_capacity: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            auto_versioning: false,
            user_types_cache_capacity: 1024,
        }
    }
}

impl KernelConfig {
    /// Default configuration with auto-versioning switched on.
    pub fn auto_versioning() -> Self {
        Self {
            auto_versioning: true,
            ..Default::default()
        }
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> KernelResult<Self> {
        toml::from_str(source).map_err(|e| KernelError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> KernelResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| KernelError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> KernelResult<String> {
        toml::to_string(self).map_err(|e| KernelError::Config(e.to_string()))
    }
}
