//! Catalog seeding from a TOML file
//!
//! ```toml
//! [[modules]]
//! id = "modeling"
//! name = "System Modeling"
//! order = 1
//! difficulty = 2
//!
//! [[exercises]]
//! id = "shop-model"
//! module_id = "modeling"
//! title = "Model an online shop"
//! points = 20
//! difficulty = 2
//! order = 1
//! content = { type = "system_modeling", expected_output = { components = ["catalog", "cart"] } }
//!
//! [[badges]]
//! id = "first-steps"
//! name = "First Steps"
//! criteria = { type = "exercises_completed", count = 1 }
//! ```
//!
//! Entries are upserted by id, so seeding the same file twice is a no-op.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::domain::{valid_difficulty, Badge, BadgeCriteria, Exercise, Module, ModuleId};
use crate::error::LearnError;
use crate::store::Store;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub modules: Vec<Module>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub badges: Vec<Badge>,
}

/// Counts of upserted entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub modules: usize,
    pub exercises: usize,
    pub badges: usize,
}

impl CatalogFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse catalog file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check the file on its own. Module references that are not defined in
    /// the file are resolved against the store by [`CatalogFile::seed`].
    pub fn validate(&self) -> Result<(), LearnError> {
        let mut module_ids = HashSet::new();
        for module in &self.modules {
            if !module_ids.insert(&module.id) {
                return Err(invalid(format!("duplicate module id '{}'", module.id)));
            }
            if module.name.trim().is_empty() {
                return Err(invalid(format!("module '{}' has no name", module.id)));
            }
            if !valid_difficulty(module.difficulty) {
                return Err(invalid(format!(
                    "module '{}' difficulty {} is outside 1-5",
                    module.id, module.difficulty
                )));
            }
        }

        let mut exercise_ids = HashSet::new();
        for exercise in &self.exercises {
            if !exercise_ids.insert(&exercise.id) {
                return Err(invalid(format!("duplicate exercise id '{}'", exercise.id)));
            }
            if !valid_difficulty(exercise.difficulty) {
                return Err(invalid(format!(
                    "exercise '{}' difficulty {} is outside 1-5",
                    exercise.id, exercise.difficulty
                )));
            }
        }

        let mut badge_ids = HashSet::new();
        let mut badge_names = HashSet::new();
        for badge in &self.badges {
            if !badge_ids.insert(&badge.id) {
                return Err(invalid(format!("duplicate badge id '{}'", badge.id)));
            }
            if !badge_names.insert(badge.name.as_str()) {
                return Err(invalid(format!("duplicate badge name '{}'", badge.name)));
            }
        }

        Ok(())
    }

    /// Module ids referenced by exercises or badges but not defined here
    fn external_module_refs(&self) -> Vec<&ModuleId> {
        let defined: HashSet<&ModuleId> = self.modules.iter().map(|m| &m.id).collect();
        let mut refs: Vec<&ModuleId> = self
            .exercises
            .iter()
            .map(|e| &e.module_id)
            .chain(self.badges.iter().filter_map(|b| match &b.criteria {
                BadgeCriteria::ModuleCompleted { module_id, .. } => Some(module_id),
                _ => None,
            }))
            .filter(|id| !defined.contains(id))
            .collect();
        refs.sort();
        refs.dedup();
        refs
    }

    /// Validate and upsert everything into `store`
    pub async fn seed(&self, store: &dyn Store) -> Result<SeedReport, LearnError> {
        self.validate()?;
        for module_id in self.external_module_refs() {
            if store.get_module(module_id).await?.is_none() {
                return Err(invalid(format!("unknown module '{module_id}'")));
            }
        }

        for module in &self.modules {
            store.upsert_module(module).await?;
        }
        for exercise in &self.exercises {
            store.upsert_exercise(exercise).await?;
        }
        for badge in &self.badges {
            store.upsert_badge(badge).await?;
        }

        let report = SeedReport {
            modules: self.modules.len(),
            exercises: self.exercises.len(),
            badges: self.badges.len(),
        };
        info!(
            "[learnpath:catalog] Seeded {} modules, {} exercises, {} badges",
            report.modules, report.exercises, report.badges
        );
        Ok(report)
    }
}

fn invalid(msg: String) -> LearnError {
    LearnError::Invalid(format!("catalog: {msg}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreSettings;
    use crate::domain::{ExerciseId, ExerciseKind};
    use crate::store::SqliteStore;
    use tempfile::tempdir;

    const CATALOG: &str = r#"
        [[modules]]
        id = "modeling"
        name = "System Modeling"
        order = 1
        difficulty = 2

        [[exercises]]
        id = "shop-model"
        module_id = "modeling"
        title = "Model an online shop"
        points = 20
        difficulty = 2
        order = 1

        [exercises.content]
        type = "system_modeling"
        hints = ["Start from the nouns"]
        expected_output = { components = ["catalog", "cart"] }

        [[badges]]
        id = "modeler"
        name = "Modeler"
        criteria = { type = "module_completed", module_id = "modeling" }

        [[badges]]
        id = "century"
        name = "Century"
        criteria = { type = "points", points = 100 }
    "#;

    #[test]
    fn test_parse_catalog() {
        let catalog = CatalogFile::parse(CATALOG).unwrap();
        assert_eq!(catalog.modules.len(), 1);
        assert_eq!(catalog.exercises[0].content.kind, ExerciseKind::SystemModeling);
        assert!(catalog.exercises[0].content.expected_output.is_some());
        assert_eq!(
            catalog.badges[1].criteria,
            BadgeCriteria::PointsThreshold { points: 100 }
        );
        catalog.validate().unwrap();
    }

    #[test]
    fn test_bad_difficulty_rejected() {
        let mut catalog = CatalogFile::parse(CATALOG).unwrap();
        catalog.modules[0].difficulty = 9;
        assert!(matches!(catalog.validate(), Err(LearnError::Invalid(_))));
    }

    #[test]
    fn test_duplicate_badge_name_rejected() {
        let mut catalog = CatalogFile::parse(CATALOG).unwrap();
        catalog.badges[1].name = "Modeler".to_string();
        assert!(catalog.validate().is_err());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("t.db"), &StoreSettings::default()).unwrap();
        let catalog = CatalogFile::parse(CATALOG).unwrap();

        catalog.seed(&store).await.unwrap();
        let report = catalog.seed(&store).await.unwrap();
        assert_eq!(report.exercises, 1);
        assert_eq!(store.list_badges().await.unwrap().len(), 2);
        assert!(store
            .get_exercise(&ExerciseId::new("shop-model"))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_seed_rejects_unknown_module() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("t.db"), &StoreSettings::default()).unwrap();
        let mut catalog = CatalogFile::parse(CATALOG).unwrap();
        catalog.modules.clear();

        let err = catalog.seed(&store).await.unwrap_err();
        assert!(err.to_string().contains("unknown module 'modeling'"));
        assert!(store.list_badges().await.unwrap().is_empty());
    }
}
