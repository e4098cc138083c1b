//! Process environment and dotenv support

use std::path::Path;
use tracing::info;

use slop_ast::{EnvLoadError, Environment};

/// Reads the real process environment; `source::env[...]` files are loaded
/// into it with dotenvy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn load_file(&mut self, path: &str) -> Result<(), EnvLoadError> {
        let p = Path::new(path);
        if !p.exists() {
            return Err(EnvLoadError::NotFound(path.to_string()));
        }

        dotenvy::from_path(p).map_err(|e| EnvLoadError::Invalid {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        info!(path = %path, "loaded env file");
        Ok(())
    }
}
