//! CLI command implementations

pub mod config;
pub mod init;
pub mod run;
pub mod trash;
pub mod tree;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use cloudstash_core::config::{expand_home, Config};
use cloudstash_store::{DatabasePool, SqliteRemoteStore};

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Settings shared by every command
pub struct CommandContext {
    pub format: OutputFormat,
    pub config_path: PathBuf,
}

impl CommandContext {
    pub fn new(format: OutputFormat, config_path: PathBuf) -> Self {
        Self {
            format,
            config_path,
        }
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Loads the configuration, falling back to defaults only when the
    /// file does not exist
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load_config(&self) -> Result<Config> {
        if !self.config_path.exists() {
            info!(config_path = %self.config_path.display(), "No configuration file, using defaults");
            return Ok(Config::default());
        }
        let config = Config::load(&self.config_path).with_context(|| {
            format!(
                "Failed to load configuration from {}",
                self.config_path.display()
            )
        })?;
        info!(config_path = %self.config_path.display(), "Loaded configuration");
        Ok(config)
    }
}

/// Opens the remote store database named by `remote.store_path`
pub async fn open_store(config: &Config) -> Result<(DatabasePool, SqliteRemoteStore)> {
    let path = expand_home(&config.remote.store_path);
    let pool = DatabasePool::new(&path)
        .await
        .with_context(|| format!("Failed to open remote store {}", path.display()))?;
    let store = SqliteRemoteStore::new(pool.pool().clone());
    Ok((pool, store))
}
