//! Seed executor: pipes a `.sql` file into the database client

use std::fs::File;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::actions::DbSettings;

pub const DEFAULT_CLIENT: &str = "mariadb";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("{0} needs to be a valid SQL file")]
    NotSql(String),
    #[error("file does not exist: {path}: {source}")]
    FileNotFound {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to start {client}: {source}")]
    Spawn {
        client: String,
        #[source]
        source: io::Error,
    },
    #[error("{client} timed out after {timeout:?}")]
    Timeout { client: String, timeout: Duration },
    #[error("{client} failed: {status}")]
    ClientFailed { client: String, status: ExitStatus },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// How the database client is invoked
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub client: String,
    pub timeout: Duration,
}

impl Default for SeedOptions {
    fn default() -> Self {
        SeedOptions {
            client: DEFAULT_CLIENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedRequest {
    pub seed_file: String,
    pub db: DbSettings,
}

impl SeedRequest {
    pub fn new(seed_file: impl Into<String>, db: DbSettings) -> Self {
        SeedRequest {
            seed_file: seed_file.into(),
            db,
        }
    }

    /// Field and extension checks; the file itself is checked when opened
    pub fn validate(&self) -> Result<(), SeedError> {
        let mut missing = Vec::new();
        if self.seed_file.is_empty() {
            missing.push("seed file");
        }
        if self.db.user.is_empty() {
            missing.push("database user");
        }
        if self.db.name.is_empty() {
            missing.push("database name");
        }
        if self.db.password.is_empty() {
            missing.push("database password");
        }
        if !missing.is_empty() {
            return Err(SeedError::MissingFields(missing));
        }

        if !self.seed_file.contains(".sql") {
            return Err(SeedError::NotSql(self.seed_file.clone()));
        }

        Ok(())
    }

    /// Arguments for the client: `-u user -pPASSWORD [-h host] [-P port] name`
    pub fn client_args(&self) -> Vec<String> {
        let mut args = vec![
            "-u".to_string(),
            self.db.user.clone(),
            format!("-p{}", self.db.password),
        ];
        if let Some(host) = &self.db.host {
            args.push("-h".to_string());
            args.push(host.clone());
        }
        if let Some(port) = &self.db.port {
            args.push("-P".to_string());
            args.push(port.clone());
        }
        args.push(self.db.name.clone());
        args
    }
}

pub async fn run_seed(request: &SeedRequest, options: &SeedOptions) -> Result<(), SeedError> {
    request.validate()?;

    let file = File::open(&request.seed_file).map_err(|source| SeedError::FileNotFound {
        path: request.seed_file.clone(),
        source,
    })?;

    debug!(
        client = %options.client,
        seed = %request.seed_file,
        database = %request.db.name,
        "starting database client"
    );

    // the child is killed if the wait below is abandoned
    let mut child = Command::new(&options.client)
        .args(request.client_args())
        .stdin(Stdio::from(file))
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| SeedError::Spawn {
            client: options.client.clone(),
            source,
        })?;

    let status = match timeout(options.timeout, child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            let _ = child.kill().await;
            return Err(SeedError::Timeout {
                client: options.client.clone(),
                timeout: options.timeout,
            });
        }
    };

    if !status.success() {
        return Err(SeedError::ClientFailed {
            client: options.client.clone(),
            status,
        });
    }

    Ok(())
}
