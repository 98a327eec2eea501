use std::collections::BTreeMap;

use crate::platform::Platform;
use crate::version::Version;

/// What is known about a dependency when evaluating `^dep` conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyState {
    pub version: Version,
    pub variants: BTreeMap<String, String>,
}

impl DependencyState {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            variants: BTreeMap::new(),
        }
    }

    pub fn with_variant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variants.insert(name.into(), value.into());
        self
    }
}

/// A candidate build request: the axes a recipe's rules are evaluated against.
///
/// Version, platform and (for recipes with pin profiles) the pin are required;
/// variants left out take their declared defaults. When `dependencies` is
/// `Some`, it is the complete set of dependencies of the build and `^dep`
/// conditions are decided against it.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    pub version: Option<Version>,
    pub platform: Option<Platform>,
    pub pin: Option<String>,
    pub variants: BTreeMap<String, String>,
    pub dependencies: Option<BTreeMap<String, DependencyState>>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    pub fn with_variant(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variants.insert(name.into(), value.into());
        self
    }

    /// Record a dependency; marks the dependency set as known.
    pub fn with_dependency(mut self, name: impl Into<String>, state: DependencyState) -> Self {
        self.dependencies
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into().to_lowercase(), state);
        self
    }
}
