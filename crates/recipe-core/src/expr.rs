//! The spec expression language shared by dependency constraints and `when`
//! predicates.
//!
//! ```text
//! boost@1.68.0: cxxstd=11 +container          constraint on a dependency
//! root@6.16.00+fortran~vdt ^mesa~llvm         constraint with a nested requirement
//! @18.4: +sim pin=jun19 platform=linux ^root@6.18:   predicate
//! ```

use std::collections::BTreeMap;
use std::fmt;

use recipe_util::errors::RecipeError;

use crate::platform::Platform;
use crate::variant::{normalize_bool, VariantAssignment, PIN_VARIANT};
use crate::version::{Version, VersionConstraint};

/// A required variant value: `+name`, `~name` or `name=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantRequirement {
    pub name: String,
    pub value: String,
}

impl VariantRequirement {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn enabled(name: impl Into<String>) -> Self {
        Self::new(name, "true")
    }

    pub fn disabled(name: impl Into<String>) -> Self {
        Self::new(name, "false")
    }

    /// Does a concrete value meet this requirement? An on/off requirement
    /// also accepts `on`, `yes`, `1` and their negations.
    pub fn accepts(&self, value: &str) -> bool {
        match self.value.as_str() {
            "true" | "false" => normalize_bool(value).as_deref() == Some(self.value.as_str()),
            expected => value == expected,
        }
    }
}

impl fmt::Display for VariantRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value.as_str() {
            "true" => write!(f, "+{}", self.name),
            "false" => write!(f, "~{}", self.name),
            value => write!(f, " {}={}", self.name, value),
        }
    }
}

/// A requirement on one dependency: name, versions, variants and nested
/// requirements on its own dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSpec {
    pub name: String,
    pub versions: VersionConstraint,
    pub variants: Vec<VariantRequirement>,
    pub dependencies: Vec<ConstraintSpec>,
}

impl ConstraintSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            versions: VersionConstraint::any(),
            variants: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, RecipeError> {
        let terms = tokenize(input)?;
        let mut iter = terms.into_iter();
        let mut root = match iter.next() {
            Some(Term::Name(name)) => ConstraintSpec::named(name),
            _ => return Err(RecipeError::parse(input, "expected a package name")),
        };
        let mut nested: Option<ConstraintSpec> = None;
        while let Some(term) = iter.next() {
            let target = nested.as_mut().unwrap_or(&mut root);
            match term {
                Term::Versions(v) => target.set_versions(input, v)?,
                Term::Flag { name, enabled } => target.variants.push(VariantRequirement::new(
                    name,
                    if enabled { "true" } else { "false" },
                )),
                Term::KeyValue(key, value) => {
                    target.variants.push(VariantRequirement::new(key, value))
                }
                Term::Caret => {
                    if let Some(done) = nested.take() {
                        root.dependencies.push(done);
                    }
                    nested = Some(expect_dependency_name(input, iter.next())?);
                }
                Term::Name(name) => {
                    return Err(RecipeError::parse(
                        input,
                        format!("unexpected package name '{name}' (missing '^'?)"),
                    ))
                }
            }
        }
        if let Some(done) = nested {
            root.dependencies.push(done);
        }
        Ok(root)
    }

    fn set_versions(&mut self, input: &str, versions: VersionConstraint) -> Result<(), RecipeError> {
        if !self.versions.is_any() {
            return Err(RecipeError::parse(
                input,
                format!("'{}' has more than one version constraint", self.name),
            ));
        }
        self.versions = versions;
        Ok(())
    }

    /// Does a concrete dependency satisfy this constraint?
    ///
    /// Variants the caller knows nothing about are not treated as a mismatch;
    /// nested `^` requirements are not checked.
    pub fn satisfied_by(&self, version: &Version, variants: &BTreeMap<String, String>) -> bool {
        self.versions.contains(version)
            && self
                .variants
                .iter()
                .all(|req| variants.get(&req.name).map_or(true, |v| req.accepts(v)))
    }

    /// The name of the first variant that contradicts `variants`, if any.
    pub fn variant_mismatch(&self, variants: &BTreeMap<String, String>) -> Option<&VariantRequirement> {
        self.variants
            .iter()
            .find(|req| variants.get(&req.name).is_some_and(|v| !req.accepts(v)))
    }
}

impl fmt::Display for ConstraintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.versions.is_any() {
            write!(f, "@{}", self.versions)?;
        }
        for req in &self.variants {
            write!(f, "{req}")?;
        }
        for dep in &self.dependencies {
            write!(f, " ^{dep}")?;
        }
        Ok(())
    }
}

/// A `when` condition gating a rule. Every present clause must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    pub versions: Option<VersionConstraint>,
    pub variants: Vec<VariantRequirement>,
    pub pin: Option<String>,
    pub platform: Option<Platform>,
    pub dependencies: Vec<ConstraintSpec>,
}

/// Outcome of evaluating a predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Truth {
    Satisfied,
    Unsatisfied,
    /// Depends on the version of a dependency the caller did not supply.
    Deferred { dependency: String },
}

/// Everything a predicate can look at.
#[derive(Debug, Clone, Copy)]
pub struct EvalScope<'a> {
    pub version: &'a Version,
    pub variants: &'a VariantAssignment,
    pub platform: &'a Platform,
    /// `None` when dependency versions are not known yet.
    pub dependencies: Option<&'a BTreeMap<String, crate::context::DependencyState>>,
}

impl Predicate {
    /// The predicate that always holds.
    pub fn always() -> Self {
        Self::default()
    }

    pub fn parse(input: &str) -> Result<Self, RecipeError> {
        let mut pred = Predicate::default();
        let mut nested: Option<ConstraintSpec> = None;
        let mut iter = tokenize(input)?.into_iter();
        while let Some(term) = iter.next() {
            if let Some(dep) = nested.as_mut() {
                match term {
                    Term::Versions(v) => {
                        dep.set_versions(input, v)?;
                        continue;
                    }
                    Term::Flag { name, enabled } => {
                        dep.variants.push(VariantRequirement::new(
                            name,
                            if enabled { "true" } else { "false" },
                        ));
                        continue;
                    }
                    Term::KeyValue(key, value) => {
                        dep.variants.push(VariantRequirement::new(key, value));
                        continue;
                    }
                    Term::Caret => {
                        pred.dependencies.extend(nested.take());
                        nested = Some(expect_dependency_name(input, iter.next())?);
                        continue;
                    }
                    Term::Name(_) => {}
                }
            }
            match term {
                Term::Versions(v) => {
                    if pred.versions.is_some() {
                        return Err(RecipeError::parse(input, "more than one version clause"));
                    }
                    pred.versions = Some(v);
                }
                Term::Flag { name, enabled } => pred.variants.push(VariantRequirement::new(
                    name,
                    if enabled { "true" } else { "false" },
                )),
                Term::KeyValue(key, value) => match key.as_str() {
                    "platform" => pred.platform = Some(value.parse()?),
                    PIN_VARIANT => pred.pin = Some(value),
                    _ => pred.variants.push(VariantRequirement::new(key, value)),
                },
                Term::Caret => nested = Some(expect_dependency_name(input, iter.next())?),
                Term::Name(name) => {
                    return Err(RecipeError::parse(
                        input,
                        format!("unexpected name '{name}' in condition"),
                    ))
                }
            }
        }
        pred.dependencies.extend(nested);
        Ok(pred)
    }

    pub fn is_always(&self) -> bool {
        *self == Self::default()
    }

    pub fn evaluate(&self, scope: &EvalScope<'_>) -> Truth {
        if let Some(ref versions) = self.versions {
            if !versions.contains(scope.version) {
                return Truth::Unsatisfied;
            }
        }
        if let Some(ref platform) = self.platform {
            if platform != scope.platform {
                return Truth::Unsatisfied;
            }
        }
        if let Some(ref pin) = self.pin {
            if scope.variants.pin() != Some(pin.as_str()) {
                return Truth::Unsatisfied;
            }
        }
        for req in &self.variants {
            if scope.variants.get(&req.name) != Some(req.value.as_str()) {
                return Truth::Unsatisfied;
            }
        }
        let Some(known) = scope.dependencies else {
            return match self.dependencies.first() {
                Some(dep) => Truth::Deferred {
                    dependency: dep.name.clone(),
                },
                None => Truth::Satisfied,
            };
        };
        for dep in &self.dependencies {
            match known.get(&dep.name) {
                Some(state) if dep.satisfied_by(&state.version, &state.variants) => {}
                _ => return Truth::Unsatisfied,
            }
        }
        Truth::Satisfied
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(ref v) = self.versions {
            parts.push(format!("@{v}"));
        }
        for req in &self.variants {
            parts.push(req.to_string().trim_start().to_string());
        }
        if let Some(ref pin) = self.pin {
            parts.push(format!("{PIN_VARIANT}={pin}"));
        }
        if let Some(ref platform) = self.platform {
            parts.push(format!("platform={platform}"));
        }
        for dep in &self.dependencies {
            parts.push(format!("^{dep}"));
        }
        f.write_str(&parts.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Term {
    Name(String),
    Versions(VersionConstraint),
    Flag { name: String, enabled: bool },
    KeyValue(String, String),
    Caret,
}

fn expect_dependency_name(input: &str, term: Option<Term>) -> Result<ConstraintSpec, RecipeError> {
    match term {
        Some(Term::Name(name)) => Ok(ConstraintSpec::named(name)),
        _ => Err(RecipeError::parse(input, "expected a dependency name after '^'")),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | ',')
}

fn take_while(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, pred: fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if !pred(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

fn tokenize(input: &str) -> Result<Vec<Term>, RecipeError> {
    let mut terms = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '@' => {
                chars.next();
                let raw = take_while(&mut chars, is_version_char);
                if raw.is_empty() {
                    return Err(RecipeError::parse(input, "'@' must be followed by versions"));
                }
                terms.push(Term::Versions(VersionConstraint::parse(&raw)?));
            }
            '+' | '~' => {
                chars.next();
                let name = take_while(&mut chars, is_name_char);
                if name.is_empty() {
                    return Err(RecipeError::parse(
                        input,
                        format!("'{c}' must be followed by a variant name"),
                    ));
                }
                terms.push(Term::Flag {
                    name,
                    enabled: c == '+',
                });
            }
            '^' => {
                chars.next();
                terms.push(Term::Caret);
            }
            c if is_name_char(c) => {
                let name = take_while(&mut chars, is_name_char);
                if chars.peek() == Some(&'=') {
                    chars.next();
                    let value = take_while(&mut chars, is_version_char);
                    if value.is_empty() {
                        return Err(RecipeError::parse(
                            input,
                            format!("'{name}=' must be followed by a value"),
                        ));
                    }
                    terms.push(Term::KeyValue(name, value));
                } else {
                    terms.push(Term::Name(name));
                }
            }
            other => {
                return Err(RecipeError::parse(
                    input,
                    format!("unexpected character '{other}'"),
                ))
            }
        }
    }
    Ok(terms)
}
