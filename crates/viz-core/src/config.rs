//! Module declaration files
//!
//! ```json
//! {
//!   "aliases": { "bar": "viz/models/bar" },
//!   "types": [
//!     { "id": "viz/model", "isAbstract": true },
//!     { "id": "viz/models/bar", "ancestor": "viz/model" }
//!   ],
//!   "instances": [ { "id": "viz/defaults/bar", "type": "bar" } ]
//! }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VizError};
use crate::module::TypeSpec;

/// A type declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub id: String,

    #[serde(flatten)]
    pub spec: TypeSpec,
}

/// An instance declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDecl {
    pub id: String,

    #[serde(rename = "type")]
    pub type_id: String,
}

/// Declarations to feed into a [`ModuleRegistry`](crate::ModuleRegistry)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Alias → id, applied in file order
    #[serde(default)]
    pub aliases: IndexMap<String, String>,

    /// Types in declaration order; ancestors must come first
    #[serde(default)]
    pub types: Vec<TypeDecl>,

    #[serde(default)]
    pub instances: Vec<InstanceDecl>,
}

impl ModuleConfig {
    /// Parse a configuration from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: ModuleConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize back to pretty JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        for decl in &self.types {
            if decl.id.is_empty() {
                return Err(VizError::ArgumentRequired("types[].id".to_string()));
            }
        }
        for decl in &self.instances {
            if decl.id.is_empty() {
                return Err(VizError::ArgumentRequired("instances[].id".to_string()));
            }
            if decl.type_id.is_empty() {
                return Err(VizError::ArgumentRequired(format!("type of instance '{}'", decl.id)));
            }
        }
        Ok(())
    }
}
