//! [`Store`] implementation over SQLite

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};

use super::db::SqliteStore;
use super::{Completion, Credit, CreditMode, Store, UpsertOutcome};
use crate::achievements::AchievementState;
use crate::domain::{
    Badge, BadgeId, Exercise, ExerciseId, Module, ModuleId, NewUser, Progress, ProgressId,
    ProgressStatus, User, UserId,
};
use crate::error::{LearnError, Result};

const PROGRESS_COLUMNS: &str = "id, user_id, exercise_id, status, submission, score, attempts, \
     completed_at, created_at, updated_at";
const EXERCISE_COLUMNS: &str =
    "id, module_id, title, description, content, points, difficulty, sort_order";

fn datetime_from_ms(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn progress_from_row(row: &Row<'_>) -> rusqlite::Result<Progress> {
    let status: String = row.get(3)?;
    let status = status
        .parse::<ProgressStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?;
    let submission = match row.get::<_, Option<String>>(4)? {
        Some(raw) => Some(
            serde_json::from_str(&raw)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        ),
        None => None,
    };

    Ok(Progress {
        id: ProgressId::new(row.get::<_, String>(0)?),
        user_id: UserId::new(row.get::<_, String>(1)?),
        exercise_id: ExerciseId::new(row.get::<_, String>(2)?),
        status,
        submission,
        score: row.get(5)?,
        attempts: row.get(6)?,
        completed_at: row.get::<_, Option<i64>>(7)?.map(datetime_from_ms),
        created_at: datetime_from_ms(row.get(8)?),
        updated_at: datetime_from_ms(row.get(9)?),
    })
}

fn exercise_from_row(row: &Row<'_>) -> rusqlite::Result<Exercise> {
    Ok(Exercise {
        id: ExerciseId::new(row.get::<_, String>(0)?),
        module_id: ModuleId::new(row.get::<_, String>(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        content: json_column(row, 4)?,
        points: row.get(5)?,
        difficulty: row.get(6)?,
        order: row.get(7)?,
    })
}

fn module_from_row(row: &Row<'_>) -> rusqlite::Result<Module> {
    Ok(Module {
        id: ModuleId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        order: row.get(3)?,
        difficulty: row.get(4)?,
    })
}

fn badge_from_row(row: &Row<'_>) -> rusqlite::Result<Badge> {
    Ok(Badge {
        id: BadgeId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
        criteria: json_column(row, 4)?,
    })
}

fn load_user(conn: &rusqlite::Connection, id: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, email, credential_hash, points, created_at FROM users WHERE id = ?1",
            [id],
            |row| {
                Ok(User {
                    id: UserId::new(row.get::<_, String>(0)?),
                    name: row.get(1)?,
                    email: row.get(2)?,
                    credential_hash: row.get(3)?,
                    points: row.get(4)?,
                    badges: Vec::new(),
                    created_at: datetime_from_ms(row.get(5)?),
                })
            },
        )
        .optional()?;

    let Some(mut user) = user else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT badge_id FROM user_badges WHERE user_id = ?1 ORDER BY granted_at, rowid",
    )?;
    user.badges = stmt
        .query_map([id], |row| row.get::<_, String>(0))?
        .map(|r| r.map(BadgeId::new))
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Some(user))
}

#[async_trait]
impl Store for SqliteStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let id = UserId::generate();
        let now = Utc::now();
        self.run("create_user", move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (id, name, email, credential_hash, points, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                params![id.as_str(), user.name, user.email, user.credential_hash, now.timestamp_millis()],
            )?;
            if inserted == 0 {
                return Err(LearnError::Conflict(format!(
                    "email already registered: {}",
                    user.email
                )));
            }
            load_user(conn, id.as_str())?.ok_or_else(|| LearnError::not_found("user", &id))
        })
        .await
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let id = id.clone();
        self.run("get_user", move |conn| load_user(conn, id.as_str()))
            .await
    }

    async fn upsert_module(&self, module: &Module) -> Result<()> {
        let module = module.clone();
        self.run("upsert_module", move |conn| {
            conn.execute(
                r#"INSERT INTO modules (id, name, description, sort_order, difficulty)
                   VALUES (?1, ?2, ?3, ?4, ?5)
                   ON CONFLICT(id) DO UPDATE SET
                       name = ?2, description = ?3, sort_order = ?4, difficulty = ?5"#,
                params![
                    module.id.as_str(),
                    module.name,
                    module.description,
                    module.order,
                    module.difficulty
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_module(&self, id: &ModuleId) -> Result<Option<Module>> {
        let id = id.clone();
        self.run("get_module", move |conn| {
            Ok(conn
                .query_row(
                    "SELECT id, name, description, sort_order, difficulty FROM modules WHERE id = ?1",
                    [id.as_str()],
                    module_from_row,
                )
                .optional()?)
        })
        .await
    }

    async fn list_modules(&self) -> Result<Vec<Module>> {
        self.run("list_modules", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, sort_order, difficulty FROM modules ORDER BY sort_order, id",
            )?;
            let modules = stmt
                .query_map([], module_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(modules)
        })
        .await
    }

    async fn upsert_exercise(&self, exercise: &Exercise) -> Result<()> {
        let exercise = exercise.clone();
        let content = serde_json::to_string(&exercise.content)?;
        self.run("upsert_exercise", move |conn| {
            conn.execute(
                r#"INSERT INTO exercises (id, module_id, title, description, content, points, difficulty, sort_order)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                   ON CONFLICT(id) DO UPDATE SET
                       module_id = ?2, title = ?3, description = ?4, content = ?5,
                       points = ?6, difficulty = ?7, sort_order = ?8"#,
                params![
                    exercise.id.as_str(),
                    exercise.module_id.as_str(),
                    exercise.title,
                    exercise.description,
                    content,
                    exercise.points,
                    exercise.difficulty,
                    exercise.order
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_exercise(&self, id: &ExerciseId) -> Result<Option<Exercise>> {
        let id = id.clone();
        self.run("get_exercise", move |conn| {
            let sql = format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = ?1");
            Ok(conn
                .query_row(&sql, [id.as_str()], exercise_from_row)
                .optional()?)
        })
        .await
    }

    async fn list_exercises(&self, module: &ModuleId) -> Result<Vec<Exercise>> {
        let module = module.clone();
        self.run("list_exercises", move |conn| {
            let sql = format!(
                "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE module_id = ?1 ORDER BY sort_order, id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let exercises = stmt
                .query_map([module.as_str()], exercise_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(exercises)
        })
        .await
    }

    async fn upsert_badge(&self, badge: &Badge) -> Result<()> {
        let badge = badge.clone();
        let criteria = serde_json::to_string(&badge.criteria)?;
        self.run("upsert_badge", move |conn| {
            conn.execute(
                r#"INSERT INTO badges (id, name, description, image_url, criteria)
                   VALUES (?1, ?2, ?3, ?4, ?5)
                   ON CONFLICT(id) DO UPDATE SET
                       name = ?2, description = ?3, image_url = ?4, criteria = ?5"#,
                params![badge.id.as_str(), badge.name, badge.description, badge.image_url, criteria],
            )?;
            Ok(())
        })
        .await
    }

    async fn list_badges(&self) -> Result<Vec<Badge>> {
        self.run("list_badges", |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, description, image_url, criteria FROM badges ORDER BY id",
            )?;
            let badges = stmt
                .query_map([], badge_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(badges)
        })
        .await
    }

    async fn get_progress(
        &self,
        user: &UserId,
        exercise: &ExerciseId,
    ) -> Result<Option<Progress>> {
        let (user, exercise) = (user.clone(), exercise.clone());
        self.run("get_progress", move |conn| {
            let sql = format!(
                "SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = ?1 AND exercise_id = ?2"
            );
            Ok(conn
                .query_row(&sql, [user.as_str(), exercise.as_str()], progress_from_row)
                .optional()?)
        })
        .await
    }

    async fn list_progress(&self, user: &UserId) -> Result<Vec<Progress>> {
        let user = user.clone();
        self.run("list_progress", move |conn| {
            let sql = format!(
                "SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = ?1 ORDER BY created_at, id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user.as_str()], progress_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn open_progress(&self, user: &UserId, exercise: &ExerciseId) -> Result<Progress> {
        let (user, exercise) = (user.clone(), exercise.clone());
        let id = ProgressId::generate();
        let now = Utc::now().timestamp_millis();
        self.run("open_progress", move |conn| {
            conn.execute(
                r#"INSERT OR IGNORE INTO progress (id, user_id, exercise_id, status, created_at, updated_at)
                   VALUES (?1, ?2, ?3, 'not_started', ?4, ?4)"#,
                params![id.as_str(), user.as_str(), exercise.as_str(), now],
            )?;
            let sql = format!(
                "SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = ?1 AND exercise_id = ?2"
            );
            Ok(conn.query_row(&sql, [user.as_str(), exercise.as_str()], progress_from_row)?)
        })
        .await
    }

    async fn upsert_completion(&self, completion: Completion) -> Result<UpsertOutcome> {
        let id = ProgressId::generate();
        let submission = serde_json::to_string(&completion.submission)?;
        self.run("upsert_completion", move |conn| {
            // Immediate: take the write lock before reading the prior status
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let previous_status = tx
                .query_row(
                    "SELECT status FROM progress WHERE user_id = ?1 AND exercise_id = ?2",
                    [completion.user_id.as_str(), completion.exercise_id.as_str()],
                    |r| r.get::<_, String>(0),
                )
                .optional()?
                .and_then(|s| s.parse::<ProgressStatus>().ok());

            let sql = format!(
                r#"INSERT INTO progress (id, user_id, exercise_id, status, submission, score, attempts,
                                         completed_at, created_at, updated_at)
                   VALUES (?1, ?2, ?3, 'completed', ?4, ?5, 1, ?6, ?6, ?6)
                   ON CONFLICT(user_id, exercise_id) DO UPDATE SET
                       submission = excluded.submission,
                       score = CASE
                           WHEN ?7 = 1 OR progress.status <> 'completed' THEN excluded.score
                           ELSE progress.score
                       END,
                       status = 'completed',
                       attempts = progress.attempts + 1,
                       completed_at = COALESCE(progress.completed_at, excluded.completed_at),
                       updated_at = excluded.updated_at
                   RETURNING {PROGRESS_COLUMNS}"#
            );
            let progress = tx.query_row(
                &sql,
                params![
                    id.as_str(),
                    completion.user_id.as_str(),
                    completion.exercise_id.as_str(),
                    submission,
                    completion.score,
                    completion.at.timestamp_millis(),
                    completion.overwrite_score as i32,
                ],
                progress_from_row,
            )?;
            tx.commit()?;

            Ok(UpsertOutcome {
                progress,
                previous_status,
            })
        })
        .await
    }

    async fn increment_points(&self, user: &UserId, amount: u64) -> Result<u64> {
        let user = user.clone();
        self.run("increment_points", move |conn| {
            conn.query_row(
                "UPDATE users SET points = points + ?1 WHERE id = ?2 RETURNING points",
                params![amount, user.as_str()],
                |r| r.get::<_, u64>(0),
            )
            .optional()?
            .ok_or_else(|| LearnError::not_found("user", &user))
        })
        .await
    }

    async fn credit_progress(&self, progress: &ProgressId, mode: CreditMode) -> Result<Credit> {
        let progress = progress.clone();
        self.run("credit_progress", move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let (user, status, score, credited) = tx
                .query_row(
                    "SELECT user_id, status, score, credited FROM progress WHERE id = ?1",
                    [progress.as_str()],
                    |r| {
                        Ok((
                            r.get::<_, String>(0)?,
                            r.get::<_, String>(1)?,
                            r.get::<_, u32>(2)?,
                            r.get::<_, u32>(3)?,
                        ))
                    },
                )
                .optional()?
                .ok_or_else(|| LearnError::not_found("progress", &progress))?;

            let awarded = match mode {
                _ if status != ProgressStatus::Completed.as_str() => 0,
                CreditMode::Outstanding => score.saturating_sub(credited),
                CreditMode::Amount(amount) => amount,
            };

            let total = if awarded > 0 {
                tx.execute(
                    "UPDATE progress SET credited = credited + ?1 WHERE id = ?2",
                    params![awarded, progress.as_str()],
                )?;
                tx.query_row(
                    "UPDATE users SET points = points + ?1 WHERE id = ?2 RETURNING points",
                    params![awarded, user],
                    |r| r.get::<_, u64>(0),
                )
                .optional()?
            } else {
                tx.query_row("SELECT points FROM users WHERE id = ?1", [&user], |r| {
                    r.get::<_, u64>(0)
                })
                .optional()?
            };
            let total = total.ok_or_else(|| LearnError::not_found("user", &user))?;

            tx.commit()?;
            Ok(Credit { awarded, total })
        })
        .await
    }

    async fn achievement_state(&self, user: &UserId) -> Result<AchievementState> {
        let user = user.clone();
        self.run("achievement_state", move |conn| {
            let points: u64 = conn
                .query_row("SELECT points FROM users WHERE id = ?1", [user.as_str()], |r| {
                    r.get(0)
                })
                .optional()?
                .ok_or_else(|| LearnError::not_found("user", &user))?;

            let completed: u64 = conn.query_row(
                "SELECT COUNT(*) FROM progress WHERE user_id = ?1 AND status = 'completed'",
                [user.as_str()],
                |r| r.get(0),
            )?;

            let mut stmt = conn.prepare(
                r#"SELECT e.module_id, COUNT(*) FROM progress p
                   JOIN exercises e ON e.id = p.exercise_id
                   WHERE p.user_id = ?1 AND p.status = 'completed'
                   GROUP BY e.module_id"#,
            )?;
            let completed_by_module = stmt
                .query_map([user.as_str()], |r| {
                    Ok((ModuleId::new(r.get::<_, String>(0)?), r.get::<_, u64>(1)?))
                })?
                .collect::<rusqlite::Result<HashMap<_, _>>>()?;

            let mut stmt =
                conn.prepare("SELECT module_id, COUNT(*) FROM exercises GROUP BY module_id")?;
            let module_sizes = stmt
                .query_map([], |r| {
                    Ok((ModuleId::new(r.get::<_, String>(0)?), r.get::<_, u64>(1)?))
                })?
                .collect::<rusqlite::Result<HashMap<_, _>>>()?;

            Ok(AchievementState {
                points,
                completed,
                completed_by_module,
                module_sizes,
            })
        })
        .await
    }

    async fn held_badges(&self, user: &UserId) -> Result<HashSet<BadgeId>> {
        let user = user.clone();
        self.run("held_badges", move |conn| {
            let mut stmt = conn.prepare("SELECT badge_id FROM user_badges WHERE user_id = ?1")?;
            let held = stmt
                .query_map([user.as_str()], |r| r.get::<_, String>(0))?
                .map(|r| r.map(BadgeId::new))
                .collect::<rusqlite::Result<HashSet<_>>>()?;
            Ok(held)
        })
        .await
    }

    async fn add_badge(&self, user: &UserId, badge: &BadgeId) -> Result<bool> {
        let (user, badge) = (user.clone(), badge.clone());
        let now = Utc::now().timestamp_millis();
        self.run("add_badge", move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO user_badges (user_id, badge_id, granted_at) VALUES (?1, ?2, ?3)",
                params![user.as_str(), badge.as_str(), now],
            )?;
            Ok(inserted == 1)
        })
        .await
    }
}
