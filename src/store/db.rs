//! SQLite database connection and schema management
//!
//! Manages the `~/.learnpath/learnpath.db` database with automatic schema migration.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::config::{Config, StoreSettings};
use crate::error::LearnError;

/// SQLite-backed [`Store`](super::Store)
///
/// Blocking rusqlite calls run on tokio's blocking pool, each bounded by
/// `timeout`. Clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) conn: Arc<Mutex<Connection>>,
    timeout: Duration,
}

impl SqliteStore {
    /// Open or create the database at the default location (~/.learnpath/learnpath.db)
    pub fn open_default(settings: &StoreSettings) -> Result<Self> {
        let db_path = Config::global_config_dir().join("learnpath.db");
        Self::open(&db_path, settings)
    }

    /// Open or create the database at a specific path
    pub fn open(path: &Path, settings: &StoreSettings) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // WAL so the CLI and a running server can share the file
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_millis(settings.busy_timeout_ms))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            timeout: Duration::from_millis(settings.timeout_ms),
        };
        store.init_schema()?;
        debug!("[learnpath:store] Opened {}", path.display());
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("database lock poisoned"))?;
        conn.execute_batch(SCHEMA_SQL)?;
        Self::run_migrations(&conn)?;
        Ok(())
    }

    /// Run any pending migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        let version: i32 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))
            .unwrap_or(0);

        // Migration 2: points already credited per progress record
        if version < 2 {
            let has_credited: bool = conn
                .prepare("SELECT COUNT(*) FROM pragma_table_info('progress') WHERE name = 'credited'")
                .and_then(|mut s| s.query_row([], |r| r.get::<_, i32>(0)))
                .map(|c| c > 0)
                .unwrap_or(false);

            if !has_credited {
                // Earlier databases credited every completed score on write
                conn.execute_batch(
                    "ALTER TABLE progress ADD COLUMN credited INTEGER NOT NULL DEFAULT 0;
                     UPDATE progress SET credited = score WHERE status = 'completed';",
                )?;
            }
            conn.execute("INSERT OR REPLACE INTO schema_version VALUES (2)", [])?;
        }

        Ok(())
    }

    /// Run a blocking database operation off the async runtime.
    ///
    /// Expiry of `timeout` is reported as [`LearnError::Timeout`]; the
    /// operation itself may still complete afterwards.
    pub(crate) async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T, LearnError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, LearnError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let task = tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| LearnError::Backend("database lock poisoned".to_string()))?;
            f(&mut guard)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(LearnError::Transient(format!("{op}: {join_err}"))),
            Err(_) => {
                warn!("[learnpath:store] {} timed out after {:?}", op, self.timeout);
                Err(LearnError::Timeout {
                    op,
                    after: self.timeout,
                })
            }
        }
    }
}

/// SQL schema for the learnpath database
const SCHEMA_SQL: &str = r#"
-- Registered learners
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    credential_hash TEXT,
    points INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
    created_at INTEGER NOT NULL
);

-- Training modules
CREATE TABLE IF NOT EXISTS modules (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    sort_order INTEGER NOT NULL,
    difficulty INTEGER NOT NULL CHECK (difficulty BETWEEN 1 AND 5)
);
CREATE INDEX IF NOT EXISTS idx_module_order ON modules(sort_order);

-- Exercises (content is JSON)
CREATE TABLE IF NOT EXISTS exercises (
    id TEXT PRIMARY KEY,
    module_id TEXT NOT NULL REFERENCES modules(id),
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL,
    points INTEGER NOT NULL CHECK (points >= 0),
    difficulty INTEGER NOT NULL CHECK (difficulty BETWEEN 1 AND 5),
    sort_order INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_exercise_module ON exercises(module_id, sort_order);

-- One row per (user, exercise)
CREATE TABLE IF NOT EXISTS progress (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    exercise_id TEXT NOT NULL REFERENCES exercises(id),
    status TEXT NOT NULL DEFAULT 'not_started',
    submission TEXT,
    score INTEGER NOT NULL DEFAULT 0 CHECK (score >= 0),
    attempts INTEGER NOT NULL DEFAULT 0,
    completed_at INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (user_id, exercise_id)
);
CREATE INDEX IF NOT EXISTS idx_progress_user_status ON progress(user_id, status);

-- Badge catalog (criteria is JSON)
CREATE TABLE IF NOT EXISTS badges (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    image_url TEXT NOT NULL DEFAULT '',
    criteria TEXT NOT NULL
);

-- Held badges; the primary key makes a grant a set-add
CREATE TABLE IF NOT EXISTS user_badges (
    user_id TEXT NOT NULL REFERENCES users(id),
    badge_id TEXT NOT NULL REFERENCES badges(id),
    granted_at INTEGER NOT NULL,
    PRIMARY KEY (user_id, badge_id)
);

-- Schema version
CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);
INSERT OR IGNORE INTO schema_version VALUES (1);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_and_init() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = SqliteStore::open(&db_path, &StoreSettings::default()).unwrap();

        // Verify tables exist
        let conn = store.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in ["users", "modules", "exercises", "progress", "badges", "user_badges"] {
            assert!(tables.contains(&table.to_string()), "missing table {table}");
        }

        let credited: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('progress') WHERE name = 'credited'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(credited, 1);

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn test_migration_backfills_credited_scores() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        {
            // Version 1 layout: no credited column
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch(
                r#"CREATE TABLE progress (
                       id TEXT PRIMARY KEY, user_id TEXT NOT NULL, exercise_id TEXT NOT NULL,
                       status TEXT NOT NULL DEFAULT 'not_started', submission TEXT,
                       score INTEGER NOT NULL DEFAULT 0, attempts INTEGER NOT NULL DEFAULT 0,
                       completed_at INTEGER, created_at INTEGER NOT NULL, updated_at INTEGER NOT NULL,
                       UNIQUE (user_id, exercise_id));
                   CREATE TABLE schema_version (version INTEGER PRIMARY KEY);
                   INSERT INTO schema_version VALUES (1);
                   INSERT INTO progress (id, user_id, exercise_id, status, score, created_at, updated_at)
                       VALUES ('p1', 'u1', 'e1', 'completed', 15, 0, 0),
                              ('p2', 'u1', 'e2', 'not_started', 0, 0, 0);"#,
            )
            .unwrap();
        }

        let store = SqliteStore::open(&db_path, &StoreSettings::default()).unwrap();
        let conn = store.conn.lock().unwrap();
        let credited: Vec<(String, u32)> = conn
            .prepare("SELECT id, credited FROM progress ORDER BY id")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(credited, vec![("p1".to_string(), 15), ("p2".to_string(), 0)]);
    }

    #[tokio::test]
    async fn test_run_times_out_while_writer_holds_lock() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let settings = StoreSettings {
            timeout_ms: 50,
            busy_timeout_ms: 2000,
            ..StoreSettings::default()
        };
        let store = SqliteStore::open(&db_path, &settings).unwrap();

        let writer = Connection::open(&db_path).unwrap();
        writer.execute_batch("BEGIN IMMEDIATE").unwrap();

        let err = store
            .run("write", |conn| {
                conn.execute_batch("BEGIN IMMEDIATE; COMMIT;")?;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(
            matches!(err, LearnError::Timeout { op: "write", .. }),
            "unexpected error: {err:?}"
        );
        assert!(err.is_retryable());

        writer.execute_batch("COMMIT").unwrap();
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        drop(SqliteStore::open(&db_path, &StoreSettings::default()).unwrap());
        assert!(SqliteStore::open(&db_path, &StoreSettings::default()).is_ok());
    }
}
