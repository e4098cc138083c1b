//! Environment access used while resolving `$env.NAME` references,
//! loading `source::env[...]` files and checking action preconditions.
//!
//! Parsing and execution never touch the process environment directly; the
//! binary supplies a provider backed by the real environment and tests use
//! [`MapEnv`].

use std::collections::HashMap;

pub trait Environment {
    /// Value of `name`, if set
    fn var(&self, name: &str) -> Option<String>;

    /// Load the key/value pairs of an env file. Variables that are already
    /// set keep their value.
    fn load_file(&mut self, path: &str) -> Result<(), EnvLoadError>;

    /// Value of `name` if it is set to something other than the empty string
    fn non_empty(&self, name: &str) -> Option<String> {
        self.var(name).filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvLoadError {
    NotFound(String),
    Invalid { path: String, message: String },
}

impl std::fmt::Display for EnvLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "env file not found: {}", path),
            Self::Invalid { path, message } => write!(f, "{}: {}", path, message),
        }
    }
}

impl std::error::Error for EnvLoadError {}

/// In-memory environment. Env files are registered up front with
/// [`MapEnv::with_file`].
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
    files: HashMap<String, Vec<(String, String)>>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_file<K, V>(mut self, path: impl Into<String>, pairs: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let pairs = pairs
            .iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        self.files.insert(path.into(), pairs);
        self
    }
}

impl Environment for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }

    fn load_file(&mut self, path: &str) -> Result<(), EnvLoadError> {
        let pairs = self
            .files
            .get(path)
            .ok_or_else(|| EnvLoadError::NotFound(path.to_string()))?;
        for (key, value) in pairs {
            self.vars
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_file_keeps_existing_values() {
        let mut env = MapEnv::new()
            .with_var("DB_USER", "root")
            .with_file(".env", &[("DB_USER", "app"), ("DB_NAME", "shop")]);

        env.load_file(".env").unwrap();

        assert_eq!(env.var("DB_USER").as_deref(), Some("root"));
        assert_eq!(env.var("DB_NAME").as_deref(), Some("shop"));
    }

    #[test]
    fn missing_file() {
        let mut env = MapEnv::new();
        assert_eq!(
            env.load_file(".env.missing"),
            Err(EnvLoadError::NotFound(".env.missing".to_string()))
        );
    }

    #[test]
    fn empty_values_are_not_usable() {
        let env = MapEnv::new().with_var("DB_PASSWORD", "");
        assert_eq!(env.var("DB_PASSWORD").as_deref(), Some(""));
        assert!(env.non_empty("DB_PASSWORD").is_none());
    }
}
