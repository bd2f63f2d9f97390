//! Shared test utilities: a seeded store in a temp dir

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use learnpath::catalog::CatalogFile;
use learnpath::config::{ResubmissionPolicy, ScoringSettings, StoreSettings};
use learnpath::{SqliteStore, Store, SubmissionPipeline, User};

pub const CATALOG: &str = r#"
[[modules]]
id = "modeling"
name = "System Modeling"
order = 1
difficulty = 2

[[modules]]
id = "data"
name = "Data Design"
order = 2
difficulty = 3

[[exercises]]
id = "e1"
module_id = "modeling"
title = "Model a web shop"
points = 20
difficulty = 2
order = 1
content = { type = "system_modeling", expected_output = { components = ["api", "db"] } }

[[exercises]]
id = "e2"
module_id = "modeling"
title = "Add messaging"
points = 10
difficulty = 2
order = 2
content = { type = "system_modeling", expected_output = { components = ["queue", "worker"] } }

[[exercises]]
id = "d1"
module_id = "data"
title = "Reflect on your schema"
points = 10
difficulty = 3
order = 1
content = { type = "requirement_abstraction" }

[[badges]]
id = "first-steps"
name = "First Steps"
criteria = { type = "exercises_completed", count = 1 }

[[badges]]
id = "twenty"
name = "Twenty Points"
criteria = { type = "points", points = 20 }

[[badges]]
id = "modeler"
name = "Modeler"
criteria = { type = "module_completed", module_id = "modeling" }

[[badges]]
id = "regular"
name = "Regular"
criteria = { type = "consecutive_logins", days = 3 }
"#;

pub struct TestEnv {
    _dir: TempDir,
    pub store: Arc<dyn Store>,
    pub pipeline: SubmissionPipeline,
}

impl TestEnv {
    pub async fn new() -> Self {
        Self::with_policy(ResubmissionPolicy::AwardOnce).await
    }

    pub async fn with_policy(policy: ResubmissionPolicy) -> Self {
        Self::with_settings(policy, &StoreSettings::default()).await
    }

    pub async fn with_settings(policy: ResubmissionPolicy, settings: &StoreSettings) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = SqliteStore::open(&dir.path().join("learnpath.db"), settings)
            .expect("Failed to open store");
        let store: Arc<dyn Store> = Arc::new(store);

        CatalogFile::parse(CATALOG)
            .expect("Failed to parse catalog")
            .seed(store.as_ref())
            .await
            .expect("Failed to seed catalog");

        let scoring = ScoringSettings {
            resubmission: policy,
            ..ScoringSettings::default()
        };
        let pipeline = SubmissionPipeline::new(store.clone(), &scoring);
        Self {
            _dir: dir,
            store,
            pipeline,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self._dir.path().join("learnpath.db")
    }

    pub async fn user(&self, name: &str) -> User {
        self.pipeline
            .register(name, &format!("{}@example.com", name.to_lowercase()))
            .await
            .expect("Failed to register user")
    }

    /// Sum of scores over the user's completed progress
    pub async fn completed_score_sum(&self, user: &User) -> u64 {
        self.store
            .list_progress(&user.id)
            .await
            .expect("Failed to list progress")
            .iter()
            .filter(|p| p.status.is_completed())
            .map(|p| u64::from(p.score))
            .sum()
    }
}

/// Full-credit answer for `e1`
pub fn e1_full() -> Value {
    json!({ "content": { "components": ["API", "db"] } })
}

/// Half-credit answer for `e1`
pub fn e1_half() -> Value {
    json!({ "content": { "components": ["api"] } })
}

pub fn e2_full() -> Value {
    json!({ "content": { "components": ["worker", "queue"] } })
}
