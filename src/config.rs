//! Core configuration, persisted as TOML.
//!
//! ```toml
//! space_name = "kb"
//! read_only = false
//! log_filter = "hyperatom=debug"
//!
//! [[types]]
//! name = "WordNode"
//! parent = "Node"
//! ```

use std::path::Path;
use std::sync::Arc;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AtomError;
use crate::space::AtomSpace;
use crate::types::TypeRegistry;

/// Errors from loading or applying a [`CoreConfig`].
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(hyperatom::config::read),
        help("Check that the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(hyperatom::config::parse),
        help("The config file contains invalid TOML: {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(hyperatom::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid type declaration \"{name}\"")]
    #[diagnostic(
        code(hyperatom::config::types),
        help("Each [[types]] entry needs a unique name and a parent that is already known.")
    )]
    Types {
        name: String,
        #[source]
        source: AtomError,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// A user-declared atom type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub parent: String,
}

/// Settings for one atom space and the types it understands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Name of the root atom space.
    #[serde(default = "default_space_name")]
    pub space_name: String,
    /// Refuse admissions and mutations.
    #[serde(default)]
    pub read_only: bool,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Extra types, registered in order after the builtins.
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

fn default_space_name() -> String {
    "default".into()
}
fn default_log_filter() -> String {
    "info".into()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            space_name: default_space_name(),
            read_only: false,
            log_filter: default_log_filter(),
            types: Vec::new(),
        }
    }
}

impl CoreConfig {
    /// Parse TOML text; `origin` names the source in errors.
    pub fn from_toml_str(content: &str, origin: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_owned(),
            message: e.to_string(),
        })
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Builtin types plus every declared extra.
    pub fn type_registry(&self) -> ConfigResult<TypeRegistry> {
        let mut registry = TypeRegistry::new();
        for decl in &self.types {
            registry
                .add_type(&decl.name, &decl.parent)
                .map_err(|source| ConfigError::Types {
                    name: decl.name.clone(),
                    source,
                })?;
        }
        Ok(registry)
    }

    /// Root atom space described by this config.
    pub fn new_space(&self) -> ConfigResult<Arc<AtomSpace>> {
        let types = Arc::new(self.type_registry()?);
        let space = AtomSpace::new(&self.space_name, types).map_err(|source| ConfigError::Types {
            name: self.space_name.clone(),
            source,
        })?;
        space.set_read_only(self.read_only);
        tracing::info!(
            space = %self.space_name,
            read_only = self.read_only,
            extra_types = self.types.len(),
            "atom space configured"
        );
        Ok(Arc::new(space))
    }
}
