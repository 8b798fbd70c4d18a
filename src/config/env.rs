//! Environment access and `${VAR}` interpolation.
//!
//! Redirect targets, proxy origins and env-supplied credentials are resolved
//! at request time, because values such as an upstream's address may only be
//! known after the configuration was loaded. The environment is injected as an
//! [`Environment`] so tests substitute a fixed [`MapEnv`].

use std::collections::HashMap;

use crate::error::SiteError;

/// Read-only source of environment variables.
pub trait Environment: Send + Sync + std::fmt::Debug {
    /// Value of `name`, if set.
    fn get(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed set of variables.
#[derive(Debug, Default, Clone)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnv {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl Environment for MapEnv {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Replace every `${NAME}` in `template` with its value from `env`.
///
/// Substitution is single-pass: values are inserted verbatim and are not
/// scanned again. A placeholder whose variable is unset, or whose name is not
/// a valid identifier, is left in the output as written.
pub fn interpolate(template: &str, env: &dyn Environment) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        let placeholder = &rest[start..start + 2 + end + 1];
        if is_identifier(name) {
            match env.get(name) {
                Some(value) => out.push_str(&value),
                None => {
                    tracing::debug!(
                        error = %SiteError::InterpolationMissingVariable(name.to_string()),
                        "Leaving placeholder in place"
                    );
                    out.push_str(placeholder);
                }
            }
        } else {
            out.push_str(placeholder);
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
