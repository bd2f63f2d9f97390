//! Configuration loading and management

mod io;
mod settings;

pub use settings::{ResubmissionPolicy, ScoringSettings, ServerSettings, StoreSettings};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Database settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Scoring and crediting rules
    #[serde(default)]
    pub scoring: ScoringSettings,

    /// HTTP API settings
    #[serde(default)]
    pub server: ServerSettings,
}

impl Config {
    /// Resolved database path: the configured one, else `~/.learnpath/learnpath.db`
    pub fn database_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| Self::global_config_dir().join("learnpath.db"))
    }
}
