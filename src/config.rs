//! Configuration for the reference index.
//!
//! Settings are layered:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `MI_` and use double underscores
//! to separate nested levels:
//! - `MI_INDEX__USE_CREATION_TIME_FOR_HASH=true` sets `index.use_creation_time_for_hash`
//! - `MI_LOGGING__DEFAULT=debug` sets `logging.default`

use crate::error::{IndexError, IndexResult};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Reference index configuration
    #[serde(default)]
    pub index: IndexConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Extensions (without dot) of files whose references are extracted.
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,

    /// Extensions (with dot) tried, in order, when a reference omits one.
    #[serde(default = "default_probe_extensions")]
    pub probe_extensions: Vec<String>,

    /// Call expressions treated as module references, e.g. `require`, `jest.mock`.
    #[serde(default = "default_expression_references")]
    pub expression_references: Vec<String>,

    /// Prefix content hashes with the file creation time.
    ///
    /// Reduces false duplicate-content reports between unrelated files with
    /// identical bytes, but a rename that also touches the file is no longer
    /// recognised as a move.
    #[serde(default)]
    pub use_creation_time_for_hash: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Default level for every target
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `move_imports::indexing = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_version() -> u32 {
    1
}

fn default_source_extensions() -> Vec<String> {
    ["tsx", "ts", "jsx", "js"].map(String::from).to_vec()
}

fn default_probe_extensions() -> Vec<String> {
    [".tsx", ".ts", ".jsx", ".js"].map(String::from).to_vec()
}

fn default_expression_references() -> Vec<String> {
    [
        "require",
        "jest.mock",
        "jest.setMock",
        "jest.unmock",
        "jest.genMockFromModule",
    ]
    .map(String::from)
    .to_vec()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index: IndexConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            source_extensions: default_source_extensions(),
            probe_extensions: default_probe_extensions(),
            expression_references: default_expression_references(),
            use_creation_time_for_hash: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl IndexConfig {
    /// True when the file at `path` should have its references extracted.
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.source_extensions.iter().any(|e| e == ext))
    }
}

impl Settings {
    /// Load configuration from a specific file, then apply `MI_` overrides.
    ///
    /// A missing file is not an error; defaults are used for everything it
    /// would have set.
    pub fn load_from(path: impl AsRef<Path>) -> IndexResult<Self> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(
                Env::prefixed("MI_").map(|key| key.as_str().to_lowercase().replace("__", ".").into()),
            )
            .extract()
            .map_err(|e| IndexError::Config(e.to_string()))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> IndexResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| IndexError::Config(format!("cannot create {}: {e}", parent.display())))?;
        }

        let toml_string =
            toml::to_string_pretty(self).map_err(|e| IndexError::Config(e.to_string()))?;
        std::fs::write(path, toml_string)
            .map_err(|e| IndexError::Config(format!("cannot write {}: {e}", path.display())))?;

        Ok(())
    }
}
