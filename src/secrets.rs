// src/secrets.rs
//! Resolves variable values from the operator's environment, literals or
//! placeholders, and masks secrets for display.

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::VariableSpec;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "env", rename_all = "snake_case")]
pub enum ValueOrigin {
    Environment(String),
    Literal,
    Placeholder,
}

impl fmt::Display for ValueOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueOrigin::Environment(var) => write!(f, "env ${}", var),
            ValueOrigin::Literal => write!(f, "literal"),
            ValueOrigin::Placeholder => write!(f, "placeholder"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedValue {
    pub value: String,
    pub origin: ValueOrigin,
}

impl ResolvedValue {
    pub fn is_placeholder(&self) -> bool {
        self.origin == ValueOrigin::Placeholder
    }
}

/// Reads from the real process environment.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// `from_env` wins when set and non-empty, then `value`, then `placeholder`.
pub fn resolve<F>(spec: &VariableSpec, lookup: F) -> Result<ResolvedValue>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(env_name) = &spec.from_env {
        match lookup(env_name) {
            Some(v) if !v.is_empty() => {
                debug!("{} resolved from environment variable {}", spec.name, env_name);
                return Ok(ResolvedValue {
                    value: v,
                    origin: ValueOrigin::Environment(env_name.clone()),
                });
            }
            _ => debug!("{}: ${} is not set", spec.name, env_name),
        }
    }

    if let Some(value) = &spec.value {
        return Ok(ResolvedValue {
            value: value.clone(),
            origin: ValueOrigin::Literal,
        });
    }

    if let Some(placeholder) = &spec.placeholder {
        return Ok(ResolvedValue {
            value: placeholder.clone(),
            origin: ValueOrigin::Placeholder,
        });
    }

    anyhow::bail!("Variable '{}' has no value, environment source or placeholder", spec.name)
}

pub fn mask(value: &str) -> String {
    let count = value.chars().count();
    if count >= 12 {
        let tail: String = value.chars().skip(count - 4).collect();
        format!("****{}", tail)
    } else {
        "****".to_string()
    }
}

/// What may be shown on screen or written to disk for this variable.
/// Placeholders are stand-ins, not secrets, and are shown as written.
pub fn display_value(spec: &VariableSpec, resolved: &ResolvedValue) -> String {
    if spec.secret && !resolved.is_placeholder() {
        mask(&resolved.value)
    } else {
        resolved.value.clone()
    }
}
