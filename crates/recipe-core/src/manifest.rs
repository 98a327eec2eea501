use serde::{Deserialize, Serialize};
use std::path::Path;

use recipe_util::errors::RecipeError;

use crate::expr::{ConstraintSpec, Predicate};
use crate::package::{PackageMetadata, PackageSpec, VersionSource};
use crate::rule::{DepType, DependencyRule, EnvRule, FlagKind, FlagRule, MutationKind, PatchRule, Phase};
use crate::variant::{ScalarValue, VariantDef};

/// Default recipe file name looked up by the CLI.
pub const RECIPE_FILE: &str = "Recipe.toml";

/// The parsed representation of a `Recipe.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeManifest {
    pub package: PackageSection,

    #[serde(default, rename = "version")]
    pub versions: Vec<VersionEntry>,

    /// Variants in the order the file declares them.
    #[serde(default, with = "ordered_table")]
    pub variants: Vec<(String, VariantEntry)>,

    #[serde(default)]
    pub depends: Vec<DependsEntry>,

    #[serde(default)]
    pub patch: Vec<PatchEntry>,

    #[serde(default)]
    pub flag: Vec<FlagEntry>,

    #[serde(default)]
    pub env: Vec<EnvEntry>,
}

/// Package identity from the `[package]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub git: Option<String>,
}

/// A `[[version]]` entry: exactly one of `sha256`, `branch` or `tag`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

/// A `[variants.<name>]` table. Without `values`, the default must be a boolean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantEntry {
    #[serde(default)]
    pub values: Option<Vec<ScalarValue>>,
    pub default: ScalarValue,
    #[serde(default)]
    pub description: Option<String>,
}

/// A `[[depends]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependsEntry {
    pub spec: String,
    #[serde(default)]
    pub when: String,
    #[serde(default, rename = "type")]
    pub types: Option<Vec<DepType>>,
}

/// A `[[patch]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchEntry {
    pub file: String,
    #[serde(default = "default_patch_level")]
    pub level: u32,
    #[serde(default)]
    pub when: String,
}

fn default_patch_level() -> u32 {
    1
}

/// A `[[flag]]` entry, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FlagEntry {
    VariantSwitch {
        variant: String,
        define: String,
        #[serde(default, rename = "cmake-type")]
        cmake_type: Option<String>,
        #[serde(default)]
        when: String,
    },
    VariantValue {
        variant: String,
        define: String,
        #[serde(default)]
        when: String,
    },
    DependencyPrefix {
        dependency: String,
        define: String,
        #[serde(default)]
        when: String,
    },
    Define {
        define: String,
        value: String,
        #[serde(default)]
        when: String,
    },
}

/// An `[[env]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvEntry {
    pub phases: Vec<Phase>,
    pub action: MutationKind,
    pub var: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub when: String,
}

impl RecipeManifest {
    /// Load and parse a `Recipe.toml` file from the given path.
    pub fn from_path(path: &Path) -> Result<Self, RecipeError> {
        let content = std::fs::read_to_string(path).map_err(|e| RecipeError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::from_str(&content)
    }

    /// Parse a `Recipe.toml` from a string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, RecipeError> {
        toml::from_str(content).map_err(|e| RecipeError::Manifest {
            message: format!("Failed to parse recipe: {e}"),
        })
    }

    /// Build the recipe through the same declaration calls as hand-written
    /// recipes, so the same validation applies.
    pub fn into_spec(self) -> Result<PackageSpec, RecipeError> {
        let mut metadata = PackageMetadata::new(self.package.name);
        metadata.description = self.package.description;
        metadata.homepage = self.package.homepage;
        metadata.url = self.package.url;
        metadata.git = self.package.git;
        let mut spec = PackageSpec::new(metadata);

        for entry in self.versions {
            let source = match (entry.sha256, entry.branch, entry.tag) {
                (Some(sha256), None, None) => VersionSource::Checksum { sha256 },
                (None, Some(branch), None) => VersionSource::Branch { branch },
                (None, None, Some(tag)) => VersionSource::Tag { tag },
                _ => {
                    return Err(RecipeError::Manifest {
                        message: format!(
                            "version {} needs exactly one of sha256, branch or tag",
                            entry.id
                        ),
                    })
                }
            };
            spec.declare_version(&entry.id, source)?;
        }

        for (name, entry) in self.variants {
            let def = match entry.values {
                Some(values) => VariantDef::new(
                    name.as_str(),
                    values.iter().map(ToString::to_string),
                    entry.default.to_string(),
                )?,
                None => match entry.default {
                    ScalarValue::Bool(default) => VariantDef::boolean(name.as_str(), default),
                    _ => {
                        return Err(RecipeError::invalid_variant(
                            name,
                            "non-boolean variants must list their values",
                        ))
                    }
                },
            };
            let def = match entry.description {
                Some(description) => def.with_description(description),
                None => def,
            };
            spec.add_variant(def)?;
        }

        for entry in self.depends {
            let mut rule = DependencyRule::new(ConstraintSpec::parse(&entry.spec)?)
                .when(Predicate::parse(&entry.when)?);
            if let Some(types) = entry.types {
                rule = rule.with_types(&types);
            }
            spec.add_dependency_rule(rule)?;
        }

        for entry in self.patch {
            spec.add_patch_rule(PatchRule::parse(&entry.file, &entry.when)?.with_level(entry.level))?;
        }

        for entry in self.flag {
            let (kind, when) = match entry {
                FlagEntry::VariantSwitch {
                    variant,
                    define,
                    cmake_type,
                    when,
                } => (
                    FlagKind::VariantSwitch {
                        variant,
                        define,
                        cmake_type,
                    },
                    when,
                ),
                FlagEntry::VariantValue {
                    variant,
                    define,
                    when,
                } => (FlagKind::VariantValue { variant, define }, when),
                FlagEntry::DependencyPrefix {
                    dependency,
                    define,
                    when,
                } => (
                    FlagKind::DependencyPrefix {
                        dependency: dependency.to_lowercase(),
                        define,
                    },
                    when,
                ),
                FlagEntry::Define {
                    define,
                    value,
                    when,
                } => (FlagKind::Define { define, value }, when),
            };
            spec.add_flag_rule(FlagRule::new(kind).when(Predicate::parse(&when)?))?;
        }

        for entry in self.env {
            let rule = EnvRule::new(&entry.phases, entry.action, &entry.var, entry.value.as_deref())
                .when(Predicate::parse(&entry.when)?);
            spec.add_env_rule(rule)?;
        }

        tracing::debug!(
            "loaded recipe {} with {} dependency rules",
            spec.name(),
            spec.dependency_rules().len()
        );
        Ok(spec)
    }
}

/// A TOML table kept as a list of entries in document order.
mod ordered_table {
    use std::fmt;
    use std::marker::PhantomData;

    use serde::de::{Error, MapAccess, Visitor};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(entries: &[(String, T)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        serializer.collect_map(entries.iter().map(|(k, v)| (k, v)))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Vec<(String, T)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries: Vec<(String, T)> = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    if entries.iter().any(|(k, _)| *k == key) {
                        return Err(A::Error::custom(format!("duplicate key '{key}'")));
                    }
                    entries.push((key, value));
                }
                Ok(entries)
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}
