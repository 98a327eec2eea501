//! Build-tool arguments and per-phase environments for a resolved build.
//!
//! Everything here is derived from the recipe's flag and environment rules
//! evaluated against one [`ResolvedBuild`]; nothing is executed.

use recipe_core::package::PackageSpec;
use recipe_core::resolved::ResolvedBuild;
use recipe_core::rule::{FlagKind, Phase};
use recipe_util::errors::RecipeError;

use crate::mutation::EnvMutation;

/// Variable made to point at the package's shared libraries.
pub const LIBRARY_PATH_VAR: &str = "LD_LIBRARY_PATH";

/// Build type used when the recipe has no `build_type` variant.
pub const DEFAULT_BUILD_TYPE: &str = "RelWithDebInfo";

const BUILD_TYPE_VARIANT: &str = "build_type";

/// Derives CMake arguments and environment mutations from a recipe.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentComposer<'a> {
    spec: &'a PackageSpec,
}

impl<'a> EnvironmentComposer<'a> {
    pub fn new(spec: &'a PackageSpec) -> Self {
        Self { spec }
    }

    /// Ordered CMake arguments: the standard install prefix and build type,
    /// then every matching flag rule in declaration order.
    pub fn build_flags(&self, build: &ResolvedBuild) -> Result<Vec<String>, RecipeError> {
        self.check_package(build)?;
        let build_type = build
            .variants()
            .get(BUILD_TYPE_VARIANT)
            .unwrap_or(DEFAULT_BUILD_TYPE);
        let mut flags = vec![
            format!("-DCMAKE_INSTALL_PREFIX={}", build.prefix().display()),
            format!("-DCMAKE_BUILD_TYPE={build_type}"),
        ];

        for rule in self.spec.flag_rules() {
            if !build.satisfies(&rule.when) {
                continue;
            }
            let flag = match &rule.kind {
                FlagKind::VariantSwitch {
                    variant,
                    define,
                    cmake_type,
                } => {
                    let state = if build.variants().is_enabled(variant) {
                        "ON"
                    } else {
                        "OFF"
                    };
                    match cmake_type {
                        Some(ty) => format!("-D{define}:{ty}={state}"),
                        None => format!("-D{define}={state}"),
                    }
                }
                FlagKind::VariantValue { variant, define } => {
                    let value = build.variants().get(variant).ok_or_else(|| {
                        RecipeError::invalid_variant(variant, "no value in resolved build")
                    })?;
                    format!("-D{define}={value}")
                }
                FlagKind::DependencyPrefix { dependency, define } => {
                    match build.dependency(dependency) {
                        Some(dep) => format!("-D{define}={}", dep.prefix.display()),
                        None => {
                            tracing::debug!("{define} skipped: {dependency} is not in the build");
                            continue;
                        }
                    }
                }
                FlagKind::Define { define, value } => format!("-D{define}={value}"),
            };
            flags.push(flag);
        }
        tracing::debug!("{} build flags for {}", flags.len(), build.package());
        Ok(flags)
    }

    /// Ordered environment changes for `phase`.
    ///
    /// Every phase but `build` starts by putting the package's library
    /// directory on the library search path.
    pub fn environment_mutations(
        &self,
        build: &ResolvedBuild,
        phase: Phase,
    ) -> Result<Vec<EnvMutation>, RecipeError> {
        self.check_package(build)?;
        let mut mutations = Vec::new();
        if phase != Phase::Build {
            mutations.push(EnvMutation::prepend_path(
                LIBRARY_PATH_VAR,
                build.lib_dir().display().to_string(),
            ));
        }
        for rule in self.spec.env_rules() {
            if !rule.applies_to(phase) || !build.satisfies(&rule.when) {
                continue;
            }
            let value = rule
                .value
                .as_deref()
                .map(|template| expand(template, build))
                .transpose()?;
            mutations.push(EnvMutation::new(rule.kind, rule.var.clone(), value));
        }
        Ok(mutations)
    }

    fn check_package(&self, build: &ResolvedBuild) -> Result<(), RecipeError> {
        if build.package() == self.spec.name() {
            Ok(())
        } else {
            Err(RecipeError::Generic {
                message: format!(
                    "resolved build of '{}' passed to the '{}' recipe",
                    build.package(),
                    self.spec.name()
                ),
            })
        }
    }
}

/// Expand `{prefix}`, `{version}`, `{variant:NAME}` and `{dep:NAME}`.
pub fn expand(template: &str, build: &ResolvedBuild) -> Result<String, RecipeError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| RecipeError::parse(template, "unclosed '{'"))?;
        let key = &after[..end];
        let value = match key.split_once(':') {
            None if key == "prefix" => build.prefix().display().to_string(),
            None if key == "version" => build.version().to_string(),
            Some(("variant", name)) => build
                .variants()
                .get(name)
                .ok_or_else(|| RecipeError::invalid_variant(name, "no value in resolved build"))?
                .to_string(),
            Some(("dep", name)) => build
                .dependency(name)
                .ok_or_else(|| RecipeError::MissingDependency {
                    dependency: name.to_string(),
                })?
                .prefix
                .display()
                .to_string(),
            _ => {
                return Err(RecipeError::parse(
                    template,
                    format!("unknown placeholder '{{{key}}}'"),
                ))
            }
        };
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
