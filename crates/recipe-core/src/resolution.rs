//! The result of evaluating a recipe's rules against one build context.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use recipe_util::errors::RecipeError;

use crate::conflict::{ConflictReport, ConstraintConflict};
use crate::expr::{ConstraintSpec, Predicate};
use crate::platform::Platform;
use crate::rule::DepType;
use crate::variant::VariantAssignment;
use crate::version::Version;

/// A dependency constraint contributed by a matching rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedConstraint {
    /// Index of the contributing rule in declaration order.
    pub rule: usize,
    pub spec: ConstraintSpec,
    pub types: Vec<DepType>,
    pub when: Predicate,
}

/// A patch selected for the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchApplication {
    pub rule: usize,
    pub id: String,
    pub level: u32,
}

/// Which rule list a deferred rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Dependency,
    Patch,
}

/// A rule whose condition needs a dependency version the context lacked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredRule {
    pub kind: RuleKind,
    pub rule: usize,
    /// Dependency name or patch id the rule would contribute.
    pub subject: String,
    pub waiting_on: String,
    pub when: Predicate,
}

/// Everything `resolve_predicates` derives for one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub package: String,
    pub version: Version,
    pub platform: Platform,
    pub variants: VariantAssignment,
    pub constraints: Vec<MatchedConstraint>,
    pub patches: Vec<PatchApplication>,
    pub deferred: Vec<DeferredRule>,
}

/// All matched constraints on one dependency, intersected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedDependency {
    pub spec: ConstraintSpec,
    pub types: BTreeSet<DepType>,
    pub rules: Vec<usize>,
}

impl MergedDependency {
    fn from_matched(c: &MatchedConstraint) -> Self {
        Self {
            spec: c.spec.clone(),
            types: c.types.iter().copied().collect(),
            rules: vec![c.rule],
        }
    }

    /// Fold another constraint in; leaves `self` untouched on contradiction.
    fn absorb(&mut self, c: &MatchedConstraint) -> Result<(), String> {
        let versions = self.spec.versions.intersect(&c.spec.versions).ok_or_else(|| {
            format!(
                "versions {} and {} do not overlap",
                self.spec.versions, c.spec.versions
            )
        })?;
        for req in &c.spec.variants {
            if let Some(existing) = self.spec.variants.iter().find(|r| r.name == req.name) {
                if existing.value != req.value {
                    return Err(format!(
                        "variant '{}' required as both '{}' and '{}'",
                        req.name, existing.value, req.value
                    ));
                }
            }
        }

        self.spec.versions = versions;
        for req in &c.spec.variants {
            if !self.spec.variants.contains(req) {
                self.spec.variants.push(req.clone());
            }
        }
        for dep in &c.spec.dependencies {
            if !self.spec.dependencies.contains(dep) {
                self.spec.dependencies.push(dep.clone());
            }
        }
        self.types.extend(c.types.iter().copied());
        self.rules.push(c.rule);
        Ok(())
    }

    pub fn is_build_only(&self) -> bool {
        self.types.iter().all(|t| *t == DepType::Build)
    }
}

impl fmt::Display for MergedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec)
    }
}

impl Resolution {
    /// True if any matched rule names `dependency`.
    pub fn depends_on(&self, dependency: &str) -> bool {
        self.constraints.iter().any(|c| c.spec.name == dependency)
    }

    pub fn constraints_for<'a>(
        &'a self,
        dependency: &'a str,
    ) -> impl Iterator<Item = &'a MatchedConstraint> + 'a {
        self.constraints
            .iter()
            .filter(move |c| c.spec.name == dependency)
    }

    /// Names of all dependencies with at least one matched constraint.
    pub fn dependency_names(&self) -> BTreeSet<&str> {
        self.constraints.iter().map(|c| c.spec.name.as_str()).collect()
    }

    pub fn patch_ids(&self) -> Vec<&str> {
        self.patches.iter().map(|p| p.id.as_str()).collect()
    }

    fn merge_all(&self) -> (BTreeMap<String, MergedDependency>, Vec<ConstraintConflict>) {
        let mut merged: BTreeMap<String, MergedDependency> = BTreeMap::new();
        let mut conflicts = Vec::new();
        for c in &self.constraints {
            match merged.entry(c.spec.name.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(MergedDependency::from_matched(c));
                }
                Entry::Occupied(mut slot) => {
                    let dep = slot.get_mut();
                    if let Err(reason) = dep.absorb(c) {
                        let mut rules = dep.rules.clone();
                        rules.push(c.rule);
                        conflicts.push(ConstraintConflict {
                            dependency: c.spec.name.clone(),
                            existing: dep.to_string(),
                            incoming: c.spec.to_string(),
                            rules,
                            reason,
                        });
                    }
                }
            }
        }
        (merged, conflicts)
    }

    /// Every contradiction between matched constraints.
    pub fn conflicts(&self) -> ConflictReport {
        let mut report = ConflictReport::new();
        for conflict in self.merge_all().1 {
            report.add(conflict);
        }
        report
    }

    /// The matched constraints intersected per dependency.
    ///
    /// Fails with `UnsatisfiableConstraint` on the first contradiction.
    pub fn merged(&self) -> Result<BTreeMap<String, MergedDependency>, RecipeError> {
        let (merged, conflicts) = self.merge_all();
        match conflicts.into_iter().next() {
            Some(conflict) => Err(RecipeError::UnsatisfiableConstraint {
                dependency: conflict.dependency.clone(),
                message: conflict.to_string(),
            }),
            None => Ok(merged),
        }
    }
}
