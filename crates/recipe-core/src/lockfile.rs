use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use recipe_util::errors::RecipeError;

use crate::variant::ScalarValue;

/// The external resolver's concrete choice for one build, as a TOML file.
///
/// ```toml
/// package = "fairroot"
/// version = "18.4.1"
/// platform = "linux"
/// prefix = "/opt/fairroot/18.4.1"
///
/// [variants]
/// cxxstd = 14
/// pin = "none"
///
/// [dependencies.root]
/// version = "6.20.08"
/// prefix = "/opt/root/6.20.08"
/// variants = { http = true }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildLock {
    pub package: String,
    pub version: String,
    pub platform: String,
    pub prefix: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(default)]
    pub variants: BTreeMap<String, ScalarValue>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, LockedDependency>,
}

/// One resolved dependency with its install prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockedDependency {
    pub version: String,
    pub prefix: PathBuf,
    #[serde(default)]
    pub variants: BTreeMap<String, ScalarValue>,
}

impl BuildLock {
    /// Load and parse a lock file from the given path.
    pub fn from_path(path: &Path) -> Result<Self, RecipeError> {
        let content = std::fs::read_to_string(path).map_err(|e| RecipeError::Manifest {
            message: format!("Failed to read lock file {}: {e}", path.display()),
        })?;
        Self::from_str(&content)
    }

    /// Parse a lock file from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, RecipeError> {
        toml::from_str(content).map_err(|e| RecipeError::Manifest {
            message: format!("Failed to parse lock file: {e}"),
        })
    }

    /// Serialize the lock file to a pretty-printed TOML string.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Stringify the scalar values of a `variants` table.
pub(crate) fn variant_strings(values: &BTreeMap<String, ScalarValue>) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(k, v)| (k.clone(), v.to_string()))
        .collect()
}
