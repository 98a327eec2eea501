use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use recipe_util::errors::RecipeError;

/// Name of the variant that selects the pin profile.
pub const PIN_VARIANT: &str = "pin";

/// A named build option with a fixed set of allowed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDef {
    pub name: String,
    allowed: Vec<String>,
    default: String,
    pub description: Option<String>,
}

impl VariantDef {
    /// Declare a variant. Fails if `allowed` is empty or does not contain `default`.
    pub fn new(
        name: impl Into<String>,
        allowed: impl IntoIterator<Item = impl Into<String>>,
        default: impl Into<String>,
    ) -> Result<Self, RecipeError> {
        let name = name.into();
        let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
        let default = default.into();
        if name.trim().is_empty() {
            return Err(RecipeError::invalid_variant(name, "variant name is empty"));
        }
        if allowed.is_empty() {
            return Err(RecipeError::invalid_variant(name, "no allowed values"));
        }
        let is_bool = is_bool_domain(&allowed);
        let default = if is_bool {
            normalize_bool(&default).unwrap_or(default)
        } else {
            default
        };
        if !allowed.contains(&default) {
            return Err(RecipeError::invalid_variant(
                name,
                format!(
                    "default '{default}' is not one of {}",
                    allowed.join(", ")
                ),
            ));
        }
        Ok(Self {
            name,
            allowed,
            default,
            description: None,
        })
    }

    /// Declare an on/off variant.
    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            allowed: vec!["true".to_string(), "false".to_string()],
            default: default.to_string(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_bool(&self) -> bool {
        is_bool_domain(&self.allowed)
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    pub fn default_value(&self) -> &str {
        &self.default
    }

    /// Validate `value` against the allowed set, returning its canonical form.
    ///
    /// Boolean variants also accept `on`/`off`, `yes`/`no` and `1`/`0`.
    pub fn normalize(&self, value: &str) -> Result<String, RecipeError> {
        let candidate = if self.is_bool() {
            normalize_bool(value).unwrap_or_else(|| value.to_string())
        } else {
            value.to_string()
        };
        if self.allowed.contains(&candidate) {
            Ok(candidate)
        } else {
            Err(RecipeError::invalid_variant(
                &self.name,
                format!(
                    "value '{value}' is not one of {}",
                    self.allowed.join(", ")
                ),
            ))
        }
    }
}

fn is_bool_domain(allowed: &[String]) -> bool {
    allowed.len() == 2
        && allowed.iter().any(|v| v == "true")
        && allowed.iter().any(|v| v == "false")
}

pub(crate) fn normalize_bool(value: &str) -> Option<String> {
    match value.trim().to_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some("true".to_string()),
        "false" | "off" | "no" | "0" => Some("false".to_string()),
        _ => None,
    }
}

/// A complete selection of one value per declared variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VariantAssignment {
    values: BTreeMap<String, String>,
}

impl VariantAssignment {
    /// Start from every variant's default.
    pub(crate) fn from_defaults<'a>(defs: impl IntoIterator<Item = &'a VariantDef>) -> Self {
        let values = defs
            .into_iter()
            .map(|d| (d.name.clone(), d.default.clone()))
            .collect();
        Self { values }
    }

    pub(crate) fn set(&mut self, name: &str, value: String) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// True if the boolean variant `name` is on.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.get(name) == Some("true")
    }

    /// The selected pin profile, if the recipe declares one.
    pub fn pin(&self) -> Option<&str> {
        self.get(PIN_VARIANT)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for VariantAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| match v.as_str() {
                "true" => format!("+{k}"),
                "false" => format!("~{k}"),
                _ => format!("{k}={v}"),
            })
            .collect();
        f.write_str(&parts.join(" "))
    }
}

/// A scalar as written in TOML recipe and lock files (`sim = true`, `cxxstd = 14`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_enumerated_variant() {
        let def = VariantDef::new("cxxstd", ["11", "14", "17"], "11").unwrap();
        assert!(!def.is_bool());
        assert_eq!(def.default_value(), "11");
        assert_eq!(def.normalize("14").unwrap(), "14");
    }

    #[test]
    fn empty_allowed_values_rejected() {
        let err = VariantDef::new("cxxstd", Vec::<String>::new(), "11").unwrap_err();
        assert!(matches!(err, RecipeError::InvalidVariant { .. }));
    }

    #[test]
    fn default_outside_allowed_rejected() {
        let err = VariantDef::new("cxxstd", ["11", "14"], "20").unwrap_err();
        assert!(err.to_string().contains("default '20'"), "got: {err}");
    }

    #[test]
    fn boolean_variant_accepts_aliases() {
        let def = VariantDef::boolean("sim", true);
        assert!(def.is_bool());
        assert_eq!(def.normalize("off").unwrap(), "false");
        assert_eq!(def.normalize("1").unwrap(), "true");
        assert!(def.normalize("maybe").is_err());
    }

    #[test]
    fn assignment_display() {
        let defs = [
            VariantDef::boolean("sim", true),
            VariantDef::boolean("examples", false),
            VariantDef::new("cxxstd", ["11", "14"], "11").unwrap(),
        ];
        let assignment = VariantAssignment::from_defaults(&defs);
        assert_eq!(assignment.to_string(), "cxxstd=11 ~examples +sim");
        assert!(assignment.is_enabled("sim"));
        assert!(!assignment.is_enabled("examples"));
    }

    #[test]
    fn scalar_display() {
        assert_eq!(ScalarValue::Bool(true).to_string(), "true");
        assert_eq!(ScalarValue::Int(14).to_string(), "14");
        assert_eq!(ScalarValue::Str("jun19".into()).to_string(), "jun19");
    }
}
