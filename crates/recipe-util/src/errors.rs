use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all recipe operations.
#[derive(Debug, Error, Diagnostic)]
pub enum RecipeError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A version id was declared twice in the same recipe.
    #[error("Duplicate version: {version} is already declared")]
    DuplicateVersion { version: String },

    /// A version was requested that the recipe does not declare.
    #[error("Unknown version: {version}")]
    #[diagnostic(help("Run `recipe info` to list the declared versions"))]
    UnknownVersion { version: String },

    /// A variant declaration or assignment is invalid.
    #[error("Invalid variant '{name}': {message}")]
    InvalidVariant { name: String, message: String },

    /// The build context lacks a value for a required axis.
    #[error("Incomplete build context: no {axis} given")]
    #[diagnostic(help("Every build context needs a version, a platform and, if the recipe declares one, a pin profile"))]
    IncompleteBuildContext { axis: String },

    /// The constraints placed on a dependency cannot all hold at once.
    #[error("Unsatisfiable constraint on '{dependency}': {message}")]
    UnsatisfiableConstraint { dependency: String, message: String },

    /// A required dependency is absent from a resolved build.
    #[error("Missing dependency '{dependency}' in resolved build")]
    #[diagnostic(help("Add a [dependencies.{dependency}] entry to the lock file"))]
    MissingDependency { dependency: String },

    /// A spec or predicate expression could not be parsed.
    #[error("Parse error in '{input}': {message}")]
    Parse { input: String, message: String },

    /// Invalid or malformed recipe or lock file.
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check the recipe file for syntax errors"))]
    Manifest { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl RecipeError {
    pub fn parse(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            message: message.into(),
        }
    }

    pub fn invalid_variant(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidVariant {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for `miette::Result<T>`.
pub type RecipeResult<T> = miette::Result<T>;
