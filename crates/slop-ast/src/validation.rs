//! Precondition rules checked before an action runs

use std::collections::HashMap;

use crate::env::Environment;
use crate::program::ActionKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    MissingConfig {
        kind: ActionKind,
        keys: Vec<&'static str>,
    },
    MissingEnv {
        kind: ActionKind,
        vars: Vec<&'static str>,
    },
}

impl std::fmt::Display for PreconditionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingConfig { kind, keys } => write!(
                f,
                "action {}: missing required config value: {}",
                kind,
                keys.join(", ")
            ),
            Self::MissingEnv { kind, vars } => {
                write!(f, "action {}: missing env vars: {}", kind, vars.join(", "))
            }
        }
    }
}

impl std::error::Error for PreconditionError {}

/// Check that `kind` may run. With any config declared, its required config
/// keys must be non-empty; with none, its required environment variables
/// must be set.
pub fn check_preconditions(
    kind: ActionKind,
    config: &HashMap<String, String>,
    env: &dyn Environment,
) -> Result<(), PreconditionError> {
    if !config.is_empty() {
        let keys: Vec<&'static str> = kind
            .required_config()
            .iter()
            .copied()
            .filter(|key| config.get(*key).is_none_or(|v| v.is_empty()))
            .collect();
        if !keys.is_empty() {
            return Err(PreconditionError::MissingConfig { kind, keys });
        }
        return Ok(());
    }

    let vars: Vec<&'static str> = kind
        .required_env()
        .iter()
        .copied()
        .filter(|name| env.non_empty(name).is_none())
        .collect();
    if !vars.is_empty() {
        return Err(PreconditionError::MissingEnv { kind, vars });
    }
    Ok(())
}
