//! Mind and ontology configuration, loadable from TOML.
//!
//! Every field has a serde default, so a config file only needs the keys it
//! wants to change:
//!
//! ```toml
//! name = "dimo"
//!
//! [ontology]
//! depth_limit = 4
//! persist_cache = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Upper bound for `depth_limit`, `max_reduce_depth` and per-command depths.
pub const MAX_DEPTH_LIMIT: usize = 256;

/// Tuning knobs for one ontology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyConfig {
    /// Default association depth for resolve/assemble walks.
    #[serde(default = "default_depth_limit")]
    pub depth_limit: usize,
    /// Bound on nested metapattern reduction.
    #[serde(default = "default_max_reduce_depth")]
    pub max_reduce_depth: usize,
    /// Retry text seeks with surrounding spaces.
    #[serde(default = "default_true")]
    pub isolate_text: bool,
    /// Keep interpretations cached across calls until the next build.
    #[serde(default = "default_true")]
    pub persist_cache: bool,
    /// NFC-normalize text before building or looking it up.
    #[serde(default = "default_true")]
    pub normalize_unicode: bool,
}

fn default_depth_limit() -> usize {
    8
}
fn default_max_reduce_depth() -> usize {
    32
}
fn default_true() -> bool {
    true
}
fn default_name() -> String {
    "mind".into()
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            depth_limit: default_depth_limit(),
            max_reduce_depth: default_max_reduce_depth(),
            isolate_text: true,
            persist_cache: true,
            normalize_unicode: true,
        }
    }
}

impl OntologyConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.depth_limit == 0 {
            return Err(ConfigError::Invalid {
                message: "depth_limit must be > 0".into(),
            });
        }
        if self.max_reduce_depth == 0 {
            return Err(ConfigError::Invalid {
                message: "max_reduce_depth must be > 0".into(),
            });
        }
        if self.depth_limit > MAX_DEPTH_LIMIT || self.max_reduce_depth > MAX_DEPTH_LIMIT {
            return Err(ConfigError::Invalid {
                message: format!("depth_limit and max_reduce_depth must be <= {MAX_DEPTH_LIMIT}"),
            });
        }
        Ok(())
    }
}

/// Configuration of a mind: its name and its ontology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub ontology: OntologyConfig,
}

impl Default for MindConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            ontology: OntologyConfig::default(),
        }
    }
}

impl MindConfig {
    /// Create a config with a specific name (other fields default).
    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::parse(content, "<inline>")
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    fn parse(content: &str, origin: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "name must not be empty".into(),
            });
        }
        self.ontology.validate()
    }

    /// Render as pretty TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: "<memory>".into(),
            message: e.to_string(),
        })
    }
}
