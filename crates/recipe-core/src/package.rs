use recipe_util::errors::RecipeError;

use crate::context::BuildContext;
use crate::expr::{EvalScope, Predicate, Truth};
use crate::resolution::{DeferredRule, MatchedConstraint, PatchApplication, Resolution, RuleKind};
use crate::rule::{DependencyRule, EnvRule, FlagKind, FlagRule, PatchRule};
use crate::variant::{VariantAssignment, VariantDef, PIN_VARIANT};
use crate::version::Version;

/// Package identity and source metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: String,
    pub description: Option<String>,
    pub homepage: Option<String>,
    /// Archive URL template; `{version}` is replaced by the version id.
    pub url: Option<String>,
    pub git: Option<String>,
}

impl PackageMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            ..Self::default()
        }
    }
}

/// Where the source of a declared version comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSource {
    Checksum { sha256: String },
    Branch { branch: String },
    Tag { tag: String },
}

/// A concrete fetch location, passed through to the fetcher untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Archive { url: String, sha256: String },
    Git { repository: String, reference: String },
}

/// A declared version and its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredVersion {
    pub version: Version,
    pub source: VersionSource,
}

/// A package recipe: versions, variants and the ordered rule lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub metadata: PackageMetadata,
    versions: Vec<DeclaredVersion>,
    variants: Vec<VariantDef>,
    dependency_rules: Vec<DependencyRule>,
    patch_rules: Vec<PatchRule>,
    flag_rules: Vec<FlagRule>,
    env_rules: Vec<EnvRule>,
}

impl PackageSpec {
    pub fn new(metadata: PackageMetadata) -> Self {
        Self {
            metadata,
            versions: Vec::new(),
            variants: Vec::new(),
            dependency_rules: Vec::new(),
            patch_rules: Vec::new(),
            flag_rules: Vec::new(),
            env_rules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Register an available version.
    pub fn declare_version(&mut self, id: &str, source: VersionSource) -> Result<(), RecipeError> {
        let version = Version::parse(id)?;
        if self.find_version(&version).is_some() {
            return Err(RecipeError::DuplicateVersion {
                version: id.to_string(),
            });
        }
        tracing::trace!("{}: declared version {version}", self.metadata.name);
        self.versions.push(DeclaredVersion { version, source });
        Ok(())
    }

    /// Declare a variant with its allowed values and default.
    pub fn declare_variant(
        &mut self,
        name: &str,
        allowed_values: &[&str],
        default: &str,
    ) -> Result<(), RecipeError> {
        let def = VariantDef::new(name, allowed_values.iter().copied(), default)?;
        self.add_variant(def)
    }

    /// Add an already-built variant definition.
    pub fn add_variant(&mut self, def: VariantDef) -> Result<(), RecipeError> {
        if self.variant(&def.name).is_some() {
            return Err(RecipeError::invalid_variant(&def.name, "declared more than once"));
        }
        self.variants.push(def);
        Ok(())
    }

    pub fn add_dependency_rule(&mut self, mut rule: DependencyRule) -> Result<(), RecipeError> {
        self.canonicalize(&mut rule.when)?;
        self.dependency_rules.push(rule);
        Ok(())
    }

    pub fn add_patch_rule(&mut self, mut rule: PatchRule) -> Result<(), RecipeError> {
        self.canonicalize(&mut rule.when)?;
        self.patch_rules.push(rule);
        Ok(())
    }

    pub fn add_flag_rule(&mut self, mut rule: FlagRule) -> Result<(), RecipeError> {
        self.canonicalize(&mut rule.when)?;
        match &rule.kind {
            FlagKind::VariantSwitch { variant, .. } => {
                let def = self.variant(variant).ok_or_else(|| {
                    RecipeError::invalid_variant(variant, "flag refers to an undeclared variant")
                })?;
                if !def.is_bool() {
                    return Err(RecipeError::invalid_variant(
                        variant,
                        "ON/OFF flags need a boolean variant",
                    ));
                }
            }
            FlagKind::VariantValue { variant, .. } => {
                if self.variant(variant).is_none() {
                    return Err(RecipeError::invalid_variant(
                        variant,
                        "flag refers to an undeclared variant",
                    ));
                }
            }
            FlagKind::DependencyPrefix { .. } | FlagKind::Define { .. } => {}
        }
        self.flag_rules.push(rule);
        Ok(())
    }

    pub fn add_env_rule(&mut self, mut rule: EnvRule) -> Result<(), RecipeError> {
        self.canonicalize(&mut rule.when)?;
        if rule.kind.takes_value() && rule.value.is_none() {
            return Err(RecipeError::Manifest {
                message: format!("{} of {} needs a value", rule.kind, rule.var),
            });
        }
        self.env_rules.push(rule);
        Ok(())
    }

    /// Variants named in a condition must exist and the value must be
    /// allowed. Values are rewritten to their canonical spelling, so
    /// `sim=on` is stored as `+sim`.
    fn canonicalize(&self, when: &mut Predicate) -> Result<(), RecipeError> {
        for req in &mut when.variants {
            req.value = self.declared_variant(&req.name)?.normalize(&req.value)?;
        }
        if let Some(pin) = when.pin.as_mut() {
            *pin = self.declared_variant(PIN_VARIANT)?.normalize(pin)?;
        }
        Ok(())
    }

    fn declared_variant(&self, name: &str) -> Result<&VariantDef, RecipeError> {
        self.variant(name).ok_or_else(|| {
            RecipeError::invalid_variant(name, "condition refers to an undeclared variant")
        })
    }

    pub fn versions(&self) -> &[DeclaredVersion] {
        &self.versions
    }

    pub fn variants(&self) -> &[VariantDef] {
        &self.variants
    }

    pub fn variant(&self, name: &str) -> Option<&VariantDef> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn dependency_rules(&self) -> &[DependencyRule] {
        &self.dependency_rules
    }

    pub fn patch_rules(&self) -> &[PatchRule] {
        &self.patch_rules
    }

    pub fn flag_rules(&self) -> &[FlagRule] {
        &self.flag_rules
    }

    pub fn env_rules(&self) -> &[EnvRule] {
        &self.env_rules
    }

    /// True if the recipe has a pin-profile variant.
    pub fn has_pin_profiles(&self) -> bool {
        self.variant(PIN_VARIANT).is_some()
    }

    fn find_version(&self, version: &Version) -> Option<&DeclaredVersion> {
        self.versions
            .iter()
            .find(|d| d.version == *version)
    }

    /// The highest numbered release; branch versions are only picked if
    /// nothing else is declared.
    pub fn preferred_version(&self) -> Option<&Version> {
        self.versions
            .iter()
            .map(|d| &d.version)
            .filter(|v| !v.is_branch())
            .max()
            .or_else(|| self.versions.iter().map(|d| &d.version).max())
    }

    /// Where to fetch the source of `version` from.
    pub fn source_for(&self, version: &Version) -> Result<SourceLocation, RecipeError> {
        let declared = self
            .find_version(version)
            .ok_or_else(|| RecipeError::UnknownVersion {
                version: version.to_string(),
            })?;
        let missing = |what: &str| RecipeError::Manifest {
            message: format!("{} declares no {what} for version {version}", self.metadata.name),
        };
        match &declared.source {
            VersionSource::Checksum { sha256 } => {
                let template = self.metadata.url.as_ref().ok_or_else(|| missing("url"))?;
                Ok(SourceLocation::Archive {
                    url: template.replace("{version}", version.as_str()),
                    sha256: sha256.clone(),
                })
            }
            VersionSource::Branch { branch: reference } | VersionSource::Tag { tag: reference } => {
                let repository = self.metadata.git.as_ref().ok_or_else(|| missing("git repository"))?;
                Ok(SourceLocation::Git {
                    repository: repository.clone(),
                    reference: reference.clone(),
                })
            }
        }
    }

    /// Complete variant assignment for a context: defaults, then overrides,
    /// with the pin profile taken from the context.
    pub fn assign_variants(&self, ctx: &BuildContext) -> Result<VariantAssignment, RecipeError> {
        let mut assignment = VariantAssignment::from_defaults(&self.variants);
        for (name, value) in &ctx.variants {
            let def = self
                .variant(name)
                .ok_or_else(|| RecipeError::invalid_variant(name, "not declared by this recipe"))?;
            assignment.set(name, def.normalize(value)?);
        }

        match self.variant(PIN_VARIANT) {
            Some(def) => {
                let pin = match (&ctx.pin, ctx.variants.get(PIN_VARIANT)) {
                    (Some(a), Some(b)) if a != b => {
                        return Err(RecipeError::invalid_variant(
                            PIN_VARIANT,
                            format!("pin profile given as both '{a}' and '{b}'"),
                        ))
                    }
                    (Some(pin), _) | (None, Some(pin)) => pin,
                    (None, None) => {
                        return Err(RecipeError::IncompleteBuildContext {
                            axis: "pin profile".to_string(),
                        })
                    }
                };
                assignment.set(PIN_VARIANT, def.normalize(pin)?);
            }
            None => {
                if let Some(pin) = &ctx.pin {
                    return Err(RecipeError::invalid_variant(
                        PIN_VARIANT,
                        format!("recipe has no pin profiles, got '{pin}'"),
                    ));
                }
            }
        }
        Ok(assignment)
    }

    /// Evaluate every dependency and patch rule against `ctx`.
    ///
    /// All matching rules contribute, in declaration order; the result does
    /// not depend on anything but `ctx`.
    pub fn resolve_predicates(&self, ctx: &BuildContext) -> Result<Resolution, RecipeError> {
        let version = ctx
            .version
            .as_ref()
            .ok_or_else(|| RecipeError::IncompleteBuildContext {
                axis: "version".to_string(),
            })?;
        let platform = ctx
            .platform
            .as_ref()
            .ok_or_else(|| RecipeError::IncompleteBuildContext {
                axis: "platform".to_string(),
            })?;
        let declared = self
            .find_version(version)
            .ok_or_else(|| RecipeError::UnknownVersion {
                version: version.to_string(),
            })?;
        let variants = self.assign_variants(ctx)?;

        let scope = EvalScope {
            version: &declared.version,
            variants: &variants,
            platform,
            dependencies: ctx.dependencies.as_ref(),
        };
        tracing::debug!(
            "resolving {}@{} on {} with {}",
            self.metadata.name,
            version,
            platform,
            variants
        );

        let mut constraints = Vec::new();
        let mut deferred = Vec::new();
        for (index, rule) in self.dependency_rules.iter().enumerate() {
            match rule.when.evaluate(&scope) {
                Truth::Satisfied => {
                    tracing::debug!("rule #{index} adds {}", rule.spec);
                    constraints.push(MatchedConstraint {
                        rule: index,
                        spec: rule.spec.clone(),
                        types: rule.types.clone(),
                        when: rule.when.clone(),
                    });
                }
                Truth::Unsatisfied => {
                    tracing::trace!("rule #{index} ({}) skipped", rule.spec);
                }
                Truth::Deferred { dependency } => deferred.push(DeferredRule {
                    kind: RuleKind::Dependency,
                    rule: index,
                    subject: rule.spec.name.clone(),
                    waiting_on: dependency,
                    when: rule.when.clone(),
                }),
            }
        }

        let mut patches = Vec::new();
        for (index, rule) in self.patch_rules.iter().enumerate() {
            match rule.when.evaluate(&scope) {
                Truth::Satisfied => {
                    tracing::debug!("patch {} (level {}) applies", rule.id, rule.level);
                    patches.push(PatchApplication {
                        rule: index,
                        id: rule.id.clone(),
                        level: rule.level,
                    });
                }
                Truth::Unsatisfied => {}
                Truth::Deferred { dependency } => deferred.push(DeferredRule {
                    kind: RuleKind::Patch,
                    rule: index,
                    subject: rule.id.clone(),
                    waiting_on: dependency,
                    when: rule.when.clone(),
                }),
            }
        }

        Ok(Resolution {
            package: self.metadata.name.clone(),
            version: declared.version.clone(),
            platform: platform.clone(),
            variants,
            constraints,
            patches,
            deferred,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DependencyState;
    use crate::platform::Platform;

    fn demo() -> PackageSpec {
        let mut spec = PackageSpec::new(PackageMetadata::new("demo"));
        spec.declare_version("2.0", VersionSource::Checksum { sha256: "bb".into() })
            .unwrap();
        spec.declare_version("1.0", VersionSource::Checksum { sha256: "aa".into() })
            .unwrap();
        spec.declare_version("develop", VersionSource::Branch { branch: "dev".into() })
            .unwrap();
        spec.add_variant(VariantDef::boolean("sim", true)).unwrap();
        spec.declare_variant("pin", &["develop", "none"], "develop")
            .unwrap();
        spec
    }

    fn ctx(version: &str) -> BuildContext {
        BuildContext::new()
            .with_version(Version::parse(version).unwrap())
            .with_platform(Platform::Linux)
            .with_pin("none")
    }

    #[test]
    fn duplicate_version_rejected() {
        let mut spec = demo();
        let err = spec
            .declare_version("1.0", VersionSource::Checksum { sha256: "cc".into() })
            .unwrap_err();
        assert!(matches!(err, RecipeError::DuplicateVersion { .. }));
    }

    #[test]
    fn duplicate_variant_rejected() {
        let mut spec = demo();
        assert!(spec.add_variant(VariantDef::boolean("sim", false)).is_err());
    }

    #[test]
    fn rule_with_undeclared_variant_rejected() {
        let mut spec = demo();
        let rule = DependencyRule::parse("qt", "+gui").unwrap();
        assert!(matches!(
            spec.add_dependency_rule(rule).unwrap_err(),
            RecipeError::InvalidVariant { .. }
        ));
    }

    #[test]
    fn preferred_version_skips_branches() {
        assert_eq!(demo().preferred_version().unwrap().as_str(), "2.0");
    }

    #[test]
    fn source_locations() {
        let mut spec = demo();
        spec.metadata.url = Some("https://example.org/demo-{version}.tar.gz".into());
        spec.metadata.git = Some("https://example.org/demo.git".into());
        let archive = spec.source_for(&Version::parse("1.0").unwrap()).unwrap();
        assert_eq!(
            archive,
            SourceLocation::Archive {
                url: "https://example.org/demo-1.0.tar.gz".into(),
                sha256: "aa".into()
            }
        );
        let git = spec.source_for(&Version::parse("develop").unwrap()).unwrap();
        assert!(matches!(git, SourceLocation::Git { reference, .. } if reference == "dev"));
    }

    #[test]
    fn missing_axes_fail() {
        let spec = demo();
        let no_version = BuildContext::new().with_platform(Platform::Linux).with_pin("none");
        assert!(matches!(
            spec.resolve_predicates(&no_version).unwrap_err(),
            RecipeError::IncompleteBuildContext { axis } if axis == "version"
        ));
        let no_pin = BuildContext::new()
            .with_version(Version::parse("1.0").unwrap())
            .with_platform(Platform::Linux);
        assert!(matches!(
            spec.resolve_predicates(&no_pin).unwrap_err(),
            RecipeError::IncompleteBuildContext { axis } if axis == "pin profile"
        ));
    }

    #[test]
    fn pin_from_variant_override() {
        let spec = demo();
        let c = BuildContext::new()
            .with_version(Version::parse("1.0").unwrap())
            .with_platform(Platform::Linux)
            .with_variant("pin", "none");
        let res = spec.resolve_predicates(&c).unwrap();
        assert_eq!(res.variants.pin(), Some("none"));
    }

    #[test]
    fn conflicting_pin_sources_rejected() {
        let spec = demo();
        let c = ctx("1.0").with_variant("pin", "develop");
        assert!(spec.resolve_predicates(&c).is_err());
    }

    #[test]
    fn unknown_version_rejected() {
        let spec = demo();
        assert!(matches!(
            spec.resolve_predicates(&ctx("3.0")).unwrap_err(),
            RecipeError::UnknownVersion { .. }
        ));
    }

    #[test]
    fn dependency_condition_defers_then_decides() {
        let mut spec = demo();
        spec.add_dependency_rule(DependencyRule::parse("vmc", "^root@6.18:").unwrap())
            .unwrap();

        let res = spec.resolve_predicates(&ctx("2.0")).unwrap();
        assert!(!res.depends_on("vmc"));
        assert_eq!(res.deferred.len(), 1);
        assert_eq!(res.deferred[0].waiting_on, "root");

        let new_root = ctx("2.0").with_dependency(
            "root",
            DependencyState::new(Version::parse("6.20.08").unwrap()),
        );
        let res = spec.resolve_predicates(&new_root).unwrap();
        assert!(res.depends_on("vmc"));
        assert!(res.deferred.is_empty());

        let old_root = ctx("2.0").with_dependency(
            "root",
            DependencyState::new(Version::parse("6.16.00").unwrap()),
        );
        let res = spec.resolve_predicates(&old_root).unwrap();
        assert!(!res.depends_on("vmc"));
    }
}
