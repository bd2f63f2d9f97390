//! Settings sections of the config file

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Database location and timeouts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreSettings {
    /// Database file; empty means `~/.learnpath/learnpath.db`
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Upper bound on a single store operation before it fails with a timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How long SQLite waits on a locked database before returning busy
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_busy_timeout_ms() -> u64 {
    2000
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: None,
            timeout_ms: default_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// How repeated submissions of a completed exercise are credited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResubmissionPolicy {
    /// Points only on the first completion; the credited score is kept
    #[default]
    AwardOnce,
    /// Every submission overwrites the score and credits its points again
    AwardEverySubmission,
}

impl ResubmissionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwardOnce => "award_once",
            Self::AwardEverySubmission => "award_every_submission",
        }
    }
}

/// Scoring behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringSettings {
    #[serde(default)]
    pub resubmission: ResubmissionPolicy,

    /// Retries when recording progress hits a uniqueness race
    #[serde(default = "default_max_record_retries")]
    pub max_record_retries: u32,
}

fn default_max_record_retries() -> u32 {
    3
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            resubmission: ResubmissionPolicy::default(),
            max_record_retries: default_max_record_retries(),
        }
    }
}

/// HTTP API settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret for `X-Learnpath-Token`; auth is only enforced when set
    #[serde(default)]
    pub auth_token: String,

    /// Requests with larger bodies are rejected with 413
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    9877
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            auth_token: String::new(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}
