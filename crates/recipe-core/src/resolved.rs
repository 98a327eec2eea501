use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use recipe_util::errors::RecipeError;

use crate::context::{BuildContext, DependencyState};
use crate::expr::{EvalScope, Predicate, Truth};
use crate::lockfile::{variant_strings, BuildLock};
use crate::package::PackageSpec;
use crate::platform::Platform;
use crate::resolution::PatchApplication;
use crate::variant::VariantAssignment;
use crate::version::Version;

/// A dependency as installed for this build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub name: String,
    pub version: Version,
    pub variants: BTreeMap<String, String>,
    pub prefix: PathBuf,
}

impl ResolvedDependency {
    pub fn new(name: &str, version: Version, prefix: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_lowercase(),
            version,
            variants: BTreeMap::new(),
            prefix: prefix.into(),
        }
    }

    pub fn with_variant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variants.insert(name.into(), value.into());
        self
    }

    fn state(&self) -> DependencyState {
        DependencyState {
            version: self.version.clone(),
            variants: self.variants.clone(),
        }
    }
}

/// One concrete, fully specified build of a recipe. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBuild {
    package: String,
    version: Version,
    variants: VariantAssignment,
    platform: Platform,
    prefix: PathBuf,
    dependencies: BTreeMap<String, ResolvedDependency>,
    dependency_states: BTreeMap<String, DependencyState>,
    patches: Vec<PatchApplication>,
}

impl ResolvedBuild {
    /// Check the resolver's choice against the recipe and freeze it.
    ///
    /// `ctx` supplies version, platform, pin and variants; its dependency
    /// field is replaced by `dependencies`. Every matched constraint must be
    /// met by the dependency it names, and every dependency needed beyond
    /// build time must be present.
    pub fn new(
        spec: &PackageSpec,
        ctx: &BuildContext,
        prefix: impl Into<PathBuf>,
        dependencies: Vec<ResolvedDependency>,
    ) -> Result<Self, RecipeError> {
        let dependencies: BTreeMap<String, ResolvedDependency> = dependencies
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();
        let dependency_states: BTreeMap<String, DependencyState> = dependencies
            .iter()
            .map(|(name, d)| (name.clone(), d.state()))
            .collect();

        let mut full = ctx.clone();
        full.dependencies = Some(dependency_states.clone());
        let resolution = spec.resolve_predicates(&full)?;
        let merged = resolution.merged()?;

        for (name, required) in &merged {
            match dependencies.get(name) {
                Some(dep) => {
                    if !required.spec.versions.contains(&dep.version) {
                        return Err(RecipeError::UnsatisfiableConstraint {
                            dependency: name.clone(),
                            message: format!(
                                "resolved version {} is outside {} (rules {:?})",
                                dep.version, required.spec.versions, required.rules
                            ),
                        });
                    }
                    if let Some(req) = required.spec.variant_mismatch(&dep.variants) {
                        return Err(RecipeError::UnsatisfiableConstraint {
                            dependency: name.clone(),
                            message: format!(
                                "resolved with {}={} but {} is required",
                                req.name,
                                dep.variants.get(&req.name).map_or("?", String::as_str),
                                req.to_string().trim_start()
                            ),
                        });
                    }
                }
                None if required.is_build_only() => {
                    tracing::debug!("build-only dependency {name} not in resolved set");
                }
                None => {
                    return Err(RecipeError::MissingDependency {
                        dependency: name.clone(),
                    })
                }
            }
        }
        for name in dependencies.keys() {
            if !merged.contains_key(name) {
                tracing::warn!("{name} is resolved but no rule of {} requires it", spec.name());
            }
        }

        Ok(Self {
            package: resolution.package,
            version: resolution.version,
            variants: resolution.variants,
            platform: resolution.platform,
            prefix: prefix.into(),
            dependencies,
            dependency_states,
            patches: resolution.patches,
        })
    }

    /// Build from a lock file written by the external resolver.
    pub fn from_lock(spec: &PackageSpec, lock: &BuildLock) -> Result<Self, RecipeError> {
        if lock.package.to_lowercase() != spec.name() {
            return Err(RecipeError::Manifest {
                message: format!(
                    "lock file is for '{}' but the recipe is '{}'",
                    lock.package,
                    spec.name()
                ),
            });
        }
        let mut ctx = BuildContext::new()
            .with_version(Version::parse(&lock.version)?)
            .with_platform(lock.platform.parse()?);
        ctx.pin = lock.pin.clone();
        ctx.variants = variant_strings(&lock.variants);

        let dependencies = lock
            .dependencies
            .iter()
            .map(|(name, locked)| {
                Ok(ResolvedDependency {
                    name: name.to_lowercase(),
                    version: Version::parse(&locked.version)?,
                    variants: variant_strings(&locked.variants),
                    prefix: locked.prefix.clone(),
                })
            })
            .collect::<Result<Vec<_>, RecipeError>>()?;

        Self::new(spec, &ctx, lock.prefix.clone(), dependencies)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn variants(&self) -> &VariantAssignment {
        &self.variants
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Install prefix of this package.
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Directory holding the shared libraries this package installs.
    pub fn lib_dir(&self) -> PathBuf {
        self.prefix.join("lib")
    }

    pub fn dependency(&self, name: &str) -> Option<&ResolvedDependency> {
        self.dependencies.get(&name.to_lowercase())
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &ResolvedDependency> {
        self.dependencies.values()
    }

    /// Patches to apply, in declaration order.
    pub fn patches(&self) -> &[PatchApplication] {
        &self.patches
    }

    /// Evaluate a condition against this build. `^dep` clauses on dependencies
    /// outside the build are false.
    pub fn satisfies(&self, when: &Predicate) -> bool {
        let scope = EvalScope {
            version: &self.version,
            variants: &self.variants,
            platform: &self.platform,
            dependencies: Some(&self.dependency_states),
        };
        when.evaluate(&scope) == Truth::Satisfied
    }
}
