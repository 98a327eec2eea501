//! Conditional rules attached to a recipe. Each rule pairs an effect with the
//! `when` predicate that gates it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use recipe_util::errors::RecipeError;

use crate::expr::{ConstraintSpec, Predicate};

/// How a dependency is used by the package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepType {
    Build,
    Link,
    Run,
    Test,
}

impl DepType {
    /// `build` and `link`, used when a rule does not say otherwise.
    pub const DEFAULT: &'static [DepType] = &[DepType::Build, DepType::Link];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Link => "link",
            Self::Run => "run",
            Self::Test => "test",
        }
    }
}

impl FromStr for DepType {
    type Err = RecipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "build" => Ok(Self::Build),
            "link" => Ok(Self::Link),
            "run" => Ok(Self::Run),
            "test" => Ok(Self::Test),
            other => Err(RecipeError::parse(other, "unknown dependency type")),
        }
    }
}

impl fmt::Display for DepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `depends_on(spec, when=...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRule {
    pub spec: ConstraintSpec,
    pub types: Vec<DepType>,
    pub when: Predicate,
}

impl DependencyRule {
    pub fn new(spec: ConstraintSpec) -> Self {
        Self {
            spec,
            types: DepType::DEFAULT.to_vec(),
            when: Predicate::always(),
        }
    }

    /// Parse both the constraint and its condition.
    pub fn parse(spec: &str, when: &str) -> Result<Self, RecipeError> {
        Ok(Self::new(ConstraintSpec::parse(spec)?).when(Predicate::parse(when)?))
    }

    pub fn when(mut self, when: Predicate) -> Self {
        self.when = when;
        self
    }

    pub fn with_types(mut self, types: &[DepType]) -> Self {
        self.types = types.to_vec();
        self
    }

    pub fn is_build_only(&self) -> bool {
        self.types.iter().all(|t| *t == DepType::Build)
    }
}

/// `patch(file, level=..., when=...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRule {
    pub id: String,
    pub level: u32,
    pub when: Predicate,
}

impl PatchRule {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level: 1,
            when: Predicate::always(),
        }
    }

    pub fn parse(id: &str, when: &str) -> Result<Self, RecipeError> {
        Ok(Self::new(id).when(Predicate::parse(when)?))
    }

    pub fn when(mut self, when: Predicate) -> Self {
        self.when = when;
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }
}

/// The argument a flag rule contributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagKind {
    /// `-D<define>[:<type>]=ON|OFF` from a boolean variant.
    VariantSwitch {
        variant: String,
        define: String,
        cmake_type: Option<String>,
    },
    /// `-D<define>=<value of variant>`.
    VariantValue { variant: String, define: String },
    /// `-D<define>=<install prefix of dependency>`.
    DependencyPrefix { dependency: String, define: String },
    /// `-D<define>=<value>`.
    Define { define: String, value: String },
}

/// A build-tool argument gated by a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagRule {
    pub kind: FlagKind,
    pub when: Predicate,
}

impl FlagRule {
    pub fn new(kind: FlagKind) -> Self {
        Self {
            kind,
            when: Predicate::always(),
        }
    }

    pub fn when(mut self, when: Predicate) -> Self {
        self.when = when;
        self
    }

    pub fn variant_switch(variant: &str, define: &str, cmake_type: Option<&str>) -> Self {
        Self::new(FlagKind::VariantSwitch {
            variant: variant.to_string(),
            define: define.to_string(),
            cmake_type: cmake_type.map(str::to_string),
        })
    }

    pub fn dependency_prefix(dependency: &str, define: &str) -> Self {
        Self::new(FlagKind::DependencyPrefix {
            dependency: dependency.to_lowercase(),
            define: define.to_string(),
        })
    }

    pub fn define(define: &str, value: &str) -> Self {
        Self::new(FlagKind::Define {
            define: define.to_string(),
            value: value.to_string(),
        })
    }
}

/// The point in a package's life an environment applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// While this package itself builds.
    Build,
    /// When this package is used at run time.
    Run,
    /// While a package depending on this one builds.
    DependentBuild,
    /// When a package depending on this one runs.
    DependentRun,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Build,
        Phase::Run,
        Phase::DependentBuild,
        Phase::DependentRun,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Run => "run",
            Self::DependentBuild => "dependent-build",
            Self::DependentRun => "dependent-run",
        }
    }
}

impl FromStr for Phase {
    type Err = RecipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| {
                RecipeError::parse(
                    s,
                    "unknown phase (expected build, run, dependent-build or dependent-run)",
                )
            })
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of change made to an environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationKind {
    Set,
    Unset,
    AppendPath,
    PrependPath,
    /// Append to a space-separated flags variable such as `CXXFLAGS`.
    AppendFlags,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Unset => "unset",
            Self::AppendPath => "append-path",
            Self::PrependPath => "prepend-path",
            Self::AppendFlags => "append-flags",
        }
    }

    pub fn takes_value(&self) -> bool {
        !matches!(self, Self::Unset)
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An environment change for one or more phases, gated by a predicate.
///
/// `value` is a template: `{prefix}`, `{version}`, `{variant:NAME}` and
/// `{dep:NAME}` are expanded against the resolved build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvRule {
    pub phases: Vec<Phase>,
    pub kind: MutationKind,
    pub var: String,
    pub value: Option<String>,
    pub when: Predicate,
}

impl EnvRule {
    pub fn new(phases: &[Phase], kind: MutationKind, var: &str, value: Option<&str>) -> Self {
        Self {
            phases: phases.to_vec(),
            kind,
            var: var.to_string(),
            value: value.map(str::to_string),
            when: Predicate::always(),
        }
    }

    pub fn when(mut self, when: Predicate) -> Self {
        self.when = when;
        self
    }

    pub fn applies_to(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }
}
