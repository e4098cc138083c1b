//! Program model - what a parsed Slopfile turns into.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const CFG_DB_USER: &str = "db.user";
pub const CFG_DB_NAME: &str = "db.name";
pub const CFG_DB_PASSWORD: &str = "db.password";
pub const CFG_DB_HOST: &str = "db.host";
pub const CFG_DB_PORT: &str = "db.port";

pub const ENV_DB_USER: &str = "DB_USER";
pub const ENV_DB_NAME: &str = "DB_NAME";
pub const ENV_DB_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_PORT: &str = "DB_PORT";

/// Maximum number of dot-separated segments in a key
pub const MAX_KEY_SEGMENTS: usize = 3;

/// Leading keyword of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Run,
    Config,
    Var,
    Source,
    TaskBegin,
    TaskEnd,
}

impl Directive {
    pub const KEYWORDS: &'static [&'static str] = &["run", "config", "var", "source"];

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "run" => Some(Self::Run),
            "config" => Some(Self::Config),
            "var" => Some(Self::Var),
            "source" => Some(Self::Source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Seed,
    Task,
    Migrate,
    Backup,
    Dump,
    Env,
}

impl ActionKind {
    /// Kinds accepted by `run::`
    pub const RUNNABLE: &'static [ActionKind] = &[
        ActionKind::Seed,
        ActionKind::Task,
        ActionKind::Migrate,
        ActionKind::Backup,
        ActionKind::Dump,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Task => "task",
            Self::Migrate => "migrate",
            Self::Backup => "backup",
            Self::Dump => "dump",
            Self::Env => "env",
        }
    }

    /// Config keys that must be present and non-empty when the Slopfile
    /// declares any config at all
    pub fn required_config(&self) -> &'static [&'static str] {
        match self {
            Self::Seed | Self::Migrate | Self::Backup => {
                &[CFG_DB_USER, CFG_DB_NAME, CFG_DB_PASSWORD]
            }
            Self::Dump => &[CFG_DB_USER, CFG_DB_NAME],
            Self::Task | Self::Env => &[],
        }
    }

    /// Environment variables that must be set when the Slopfile declares no
    /// config
    pub fn required_env(&self) -> &'static [&'static str] {
        match self {
            Self::Seed => &[ENV_DB_USER, ENV_DB_NAME, ENV_DB_PASSWORD],
            _ => &[],
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "seed" => Ok(Self::Seed),
            "task" => Ok(Self::Task),
            "migrate" => Ok(Self::Migrate),
            "backup" => Ok(Self::Backup),
            "dump" => Ok(Self::Dump),
            "env" => Ok(Self::Env),
            _ => Err(format!("unknown action: {}", s)),
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single executable step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub kind: ActionKind,
    /// File path, task name, ... depending on the kind
    pub argument: String,
    pub line: usize,
}

impl Action {
    pub fn new(kind: ActionKind, argument: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            argument: argument.into(),
            line,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.argument)
    }
}

/// Bracketed operand of a declaration before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `"text"`
    Literal(String),
    /// `$name` or `$env.NAME`, stored without the `$`
    Reference(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// `config::db.user["x"]` -> `config["db.user"] = "x"`
    pub config: HashMap<String, String>,
    /// `var::seed.path["x"]` -> `vars["seed.path"] = "x"`
    pub vars: HashMap<String, String>,
    /// top-level `run::` declarations, in order
    pub default_queue: Vec<Action>,
    /// `@name { ... }` blocks
    pub tasks: BTreeMap<String, Vec<Action>>,
    /// env files loaded by `source::env[...]`, in order
    pub sourced: Vec<String>,
    /// actions completed by the current run
    pub completed: usize,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_config(&self) -> bool {
        !self.config.is_empty()
    }

    pub fn task(&self, name: &str) -> Option<&[Action]> {
        self.tasks.get(name).map(Vec::as_slice)
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_kind_round_trips_through_keyword() {
        for kind in ActionKind::RUNNABLE {
            assert_eq!(kind.as_str().parse::<ActionKind>(), Ok(*kind));
        }
        assert!("deploy".parse::<ActionKind>().is_err());
    }

    #[test]
    fn requirements() {
        assert_eq!(ActionKind::Dump.required_config(), &[CFG_DB_USER, CFG_DB_NAME]);
        assert!(ActionKind::Task.required_config().is_empty());
        assert!(ActionKind::Migrate.required_env().is_empty());
        assert_eq!(ActionKind::Seed.required_env().len(), 3);
    }

    #[test]
    fn directive_keywords() {
        assert_eq!(Directive::from_keyword("source"), Some(Directive::Source));
        assert_eq!(Directive::from_keyword("task"), None);
    }
}
