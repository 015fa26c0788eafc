//! Configuration loading and management
//!
//! Handles parsing of `.origins.toml` configuration files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ref under which ledger snapshots are stored
    #[serde(default = "default_ledger_ref", rename = "ref")]
    pub ledger_ref: String,

    /// Default remote for push/pull
    #[serde(default = "default_remote")]
    pub remote: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger_ref: default_ledger_ref(),
            remote: default_remote(),
        }
    }
}

fn default_ledger_ref() -> String {
    "refs/notes/origins".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

impl Config {
    /// Load configuration from a specific file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a repository workdir, falling back to
    /// defaults when no config file exists or it fails to parse.
    pub fn load_from_repo(workdir: &Path) -> Self {
        let path = workdir.join(".origins.toml");
        if path.exists() {
            Config::load(&path).unwrap_or_default()
        } else {
            Config::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.ledger_ref.starts_with("refs/") {
            return Err(Error::InvalidConfig(format!(
                "ref must live under refs/, got '{}'",
                self.ledger_ref
            )));
        }
        if self.remote.is_empty() {
            return Err(Error::InvalidConfig("remote must not be empty".to_string()));
        }
        Ok(())
    }
}
