//! CLI command implementations

pub mod badges;
pub mod init;
pub mod progress;
pub mod seed;
pub mod serve;
pub mod submit;
pub mod user;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use learnpath::config::Config;
use learnpath::{SqliteStore, Store, SubmissionPipeline};

/// Global flags shared by every command
pub struct Context {
    config_path: Option<PathBuf>,
    db_path: Option<PathBuf>,
}

impl Context {
    pub fn new(config_path: Option<PathBuf>, db_path: Option<PathBuf>) -> Self {
        Self {
            config_path,
            db_path,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(Config::global_config_path)
    }

    /// Load (or auto-create) the config, applying `--db`
    pub fn config(&self) -> Result<Config> {
        let mut config = Config::load(Some(&self.config_path()))?;
        if let Some(db) = &self.db_path {
            config.store.path = Some(db.clone());
        }
        Ok(config)
    }

    pub fn open_store(&self, config: &Config) -> Result<Arc<dyn Store>> {
        let store = SqliteStore::open(&config.database_path(), &config.store)?;
        Ok(Arc::new(store))
    }

    pub fn pipeline(&self) -> Result<SubmissionPipeline> {
        let config = self.config()?;
        let store = self.open_store(&config)?;
        Ok(SubmissionPipeline::new(store, &config.scoring))
    }
}
