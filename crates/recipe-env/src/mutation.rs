//! Environment variable changes and how they are applied.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use recipe_core::rule::MutationKind;

/// Separator for path-list variables such as `LD_LIBRARY_PATH`.
pub const PATH_SEPARATOR: char = ':';

/// One change to one environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvMutation {
    pub kind: MutationKind,
    pub var: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl EnvMutation {
    pub fn new(kind: MutationKind, var: impl Into<String>, value: Option<String>) -> Self {
        Self {
            kind,
            var: var.into(),
            value,
        }
    }

    pub fn set(var: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(MutationKind::Set, var, Some(value.into()))
    }

    pub fn unset(var: impl Into<String>) -> Self {
        Self::new(MutationKind::Unset, var, None)
    }

    pub fn prepend_path(var: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(MutationKind::PrependPath, var, Some(value.into()))
    }

    pub fn append_path(var: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(MutationKind::AppendPath, var, Some(value.into()))
    }

    pub fn append_flags(var: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(MutationKind::AppendFlags, var, Some(value.into()))
    }

    /// Apply this change to an in-memory set of variables.
    pub fn apply(&self, vars: &mut BTreeMap<String, String>) {
        let value = self.value.clone().unwrap_or_default();
        let current = vars.get(&self.var).filter(|v| !v.is_empty());
        let updated = match self.kind {
            MutationKind::Unset => {
                vars.remove(&self.var);
                return;
            }
            MutationKind::Set => value,
            MutationKind::PrependPath => match current {
                Some(old) => format!("{value}{PATH_SEPARATOR}{old}"),
                None => value,
            },
            MutationKind::AppendPath => match current {
                Some(old) => format!("{old}{PATH_SEPARATOR}{value}"),
                None => value,
            },
            MutationKind::AppendFlags => match current {
                Some(old) => format!("{old} {value}"),
                None => value,
            },
        };
        vars.insert(self.var.clone(), updated);
    }

    /// Render as one line of POSIX shell.
    pub fn render_sh(&self) -> String {
        let var = &self.var;
        let value = shell_quote(self.value.as_deref().unwrap_or_default());
        match self.kind {
            MutationKind::Set => format!("export {var}={value}"),
            MutationKind::Unset => format!("unset {var}"),
            MutationKind::PrependPath => {
                format!("export {var}={value}\"${{{var}:+{PATH_SEPARATOR}${var}}}\"")
            }
            MutationKind::AppendPath => {
                format!("export {var}=\"${{{var}:+${var}{PATH_SEPARATOR}}}\"{value}")
            }
            MutationKind::AppendFlags => format!("export {var}=\"${{{var}:+${var} }}\"{value}"),
        }
    }
}

impl fmt::Display for EnvMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.var)?;
        if let Some(ref value) = self.value {
            write!(f, " {value}")?;
        }
        Ok(())
    }
}

/// Apply every mutation in order.
pub fn apply_all(mutations: &[EnvMutation], vars: &mut BTreeMap<String, String>) {
    for mutation in mutations {
        mutation.apply(vars);
    }
}

/// Render a whole mutation list as a shell script body.
pub fn render_script(mutations: &[EnvMutation]) -> String {
    let mut out = String::new();
    for mutation in mutations {
        out.push_str(&mutation.render_sh());
        out.push('\n');
    }
    out
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
