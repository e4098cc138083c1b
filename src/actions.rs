//! Action handlers - one per action kind the engine can execute.
//!
//! `task` calls are expanded by the engine itself; every other kind is
//! looked up in a [`Handlers`] registry, so supporting a new kind means
//! registering a handler for it.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::seed::{SeedError, SeedOptions, SeedRequest, run_seed};
use slop_ast::program::{
    CFG_DB_HOST, CFG_DB_NAME, CFG_DB_PASSWORD, CFG_DB_PORT, CFG_DB_USER, ENV_DB_HOST, ENV_DB_NAME,
    ENV_DB_PASSWORD, ENV_DB_PORT, ENV_DB_USER,
};
use slop_ast::{Action, ActionKind, Environment};

#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Seed(#[from] SeedError),
}

/// Database connection settings handed to every action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbSettings {
    pub user: String,
    pub name: String,
    pub password: String,
    pub host: Option<String>,
    pub port: Option<String>,
}

impl DbSettings {
    /// Each setting comes from its config key when that is non-empty,
    /// otherwise from the matching `DB_*` environment variable.
    pub fn resolve(config: &HashMap<String, String>, env: &dyn Environment) -> Self {
        let lookup = |key: &str, var: &str| {
            config
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .or_else(|| env.non_empty(var))
        };

        DbSettings {
            user: lookup(CFG_DB_USER, ENV_DB_USER).unwrap_or_default(),
            name: lookup(CFG_DB_NAME, ENV_DB_NAME).unwrap_or_default(),
            password: lookup(CFG_DB_PASSWORD, ENV_DB_PASSWORD).unwrap_or_default(),
            host: lookup(CFG_DB_HOST, ENV_DB_HOST),
            port: lookup(CFG_DB_PORT, ENV_DB_PORT),
        }
    }
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn execute(&self, action: &Action, db: &DbSettings) -> Result<(), ActionError>;
}

#[derive(Default)]
pub struct Handlers {
    handlers: HashMap<ActionKind, Box<dyn ActionHandler>>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers for every kind slop implements today
    pub fn standard(seed: SeedOptions) -> Self {
        let mut handlers = Self::new();
        handlers.register(ActionKind::Seed, SeedHandler::new(seed));
        handlers
    }

    pub fn register(&mut self, kind: ActionKind, handler: impl ActionHandler + 'static) {
        self.handlers.insert(kind, Box::new(handler));
    }

    pub fn get(&self, kind: ActionKind) -> Option<&dyn ActionHandler> {
        self.handlers.get(&kind).map(|h| h.as_ref())
    }
}

pub struct SeedHandler {
    options: SeedOptions,
}

impl SeedHandler {
    pub fn new(options: SeedOptions) -> Self {
        SeedHandler { options }
    }
}

#[async_trait]
impl ActionHandler for SeedHandler {
    async fn execute(&self, action: &Action, db: &DbSettings) -> Result<(), ActionError> {
        let request = SeedRequest::new(action.argument.clone(), db.clone());
        run_seed(&request, &self.options).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slop_ast::MapEnv;

    fn config(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_prefers_config() {
        let cfg = config(&[
            ("db.user", "cfg-user"),
            ("db.name", "cfg-db"),
            ("db.password", "cfg-pass"),
            ("db.port", "3307"),
        ]);
        let env = MapEnv::new()
            .with_var("DB_USER", "env-user")
            .with_var("DB_HOST", "env-host");

        let db = DbSettings::resolve(&cfg, &env);
        assert_eq!(db.user, "cfg-user");
        assert_eq!(db.name, "cfg-db");
        assert_eq!(db.password, "cfg-pass");
        assert_eq!(db.host.as_deref(), Some("env-host"));
        assert_eq!(db.port.as_deref(), Some("3307"));
    }

    #[test]
    fn test_resolve_from_env() {
        let env = MapEnv::new()
            .with_var("DB_USER", "u")
            .with_var("DB_NAME", "n")
            .with_var("DB_PASSWORD", "p");

        let db = DbSettings::resolve(&HashMap::new(), &env);
        assert_eq!(db.user, "u");
        assert_eq!(db.name, "n");
        assert_eq!(db.password, "p");
        assert!(db.host.is_none());
    }

    #[test]
    fn test_standard_handlers() {
        let handlers = Handlers::standard(SeedOptions::default());
        assert!(handlers.get(ActionKind::Seed).is_some());
        assert!(handlers.get(ActionKind::Migrate).is_none());
        assert!(handlers.get(ActionKind::Task).is_none());
    }
}
