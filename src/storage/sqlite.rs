//! SQLite-backed skill store
//!
//! Stores proficiency levels in a single `user_skills` relation. rusqlite is
//! synchronous, so every call runs on the blocking pool; the connection is
//! shared behind an `Arc<Mutex<_>>`.

use crate::error::{EvaluationError, Result};
use crate::storage::SkillStore;
use crate::types::{SkillSnapshot, UserId};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::task;
use tracing::{debug, info};

/// SQLite implementation of the skill store
pub struct SqliteSkillStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSkillStore {
    /// Open (or create) a skill database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| EvaluationError::SkillStore(format!("Failed to open database: {}", e)))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        info!("Skill store opened at {:?}", path.as_ref());
        Ok(store)
    }

    /// Open an in-memory store; used by tests and ephemeral deployments
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EvaluationError::SkillStore(format!("Failed to open database: {}", e)))?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| EvaluationError::SkillStore(format!("Lock poisoned: {}", e)))?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS user_skills (
                user_id     TEXT NOT NULL,
                skill       TEXT NOT NULL,
                proficiency INTEGER NOT NULL CHECK (proficiency BETWEEN 1 AND 5),
                updated_at  TEXT NOT NULL,
                PRIMARY KEY (user_id, skill)
            );
            "#,
        )
        .map_err(|e| EvaluationError::SkillStore(format!("Failed to create schema: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl SkillStore for SqliteSkillStore {
    async fn get_skills(&self, user: UserId) -> Result<SkillSnapshot> {
        let conn = Arc::clone(&self.conn);
        let user_id = user.to_string();

        task::spawn_blocking(move || -> Result<SkillSnapshot> {
            let conn = conn
                .lock()
                .map_err(|e| EvaluationError::SkillStore(format!("Lock poisoned: {}", e)))?;

            let mut stmt = conn
                .prepare("SELECT skill, proficiency FROM user_skills WHERE user_id = ?1")
                .map_err(|e| EvaluationError::SkillStore(e.to_string()))?;

            let rows = stmt
                .query_map([&user_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })
                .map_err(|e| EvaluationError::SkillStore(e.to_string()))?;

            let mut snapshot = SkillSnapshot::new();
            for row in rows {
                let (skill, proficiency) =
                    row.map_err(|e| EvaluationError::SkillStore(e.to_string()))?;
                snapshot.insert(skill, proficiency.clamp(1, 5) as u8);
            }
            Ok(snapshot)
        })
        .await
        .map_err(|e| EvaluationError::SkillStore(format!("Task join error: {}", e)))?
    }

    async fn upsert_skill(&self, user: UserId, skill: &str, level: u8) -> Result<()> {
        if !(1..=5).contains(&level) {
            return Err(EvaluationError::SkillStore(format!(
                "Proficiency must be in 1..=5, got {}",
                level
            )));
        }

        let conn = Arc::clone(&self.conn);
        let user_id = user.to_string();
        let skill = skill.to_string();
        let updated_at = Utc::now().to_rfc3339();

        task::spawn_blocking(move || -> Result<()> {
            let conn = conn
                .lock()
                .map_err(|e| EvaluationError::SkillStore(format!("Lock poisoned: {}", e)))?;

            // Last writer wins on the (user_id, skill) key.
            conn.execute(
                r#"
                INSERT INTO user_skills (user_id, skill, proficiency, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (user_id, skill)
                DO UPDATE SET proficiency = excluded.proficiency,
                              updated_at = excluded.updated_at
                "#,
                rusqlite::params![user_id, skill, i64::from(level), updated_at],
            )
            .map_err(|e| EvaluationError::SkillStore(e.to_string()))?;

            debug!("Upserted skill '{}' -> {} for user {}", skill, level, user_id);
            Ok(())
        })
        .await
        .map_err(|e| EvaluationError::SkillStore(format!("Task join error: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_skills_empty_for_unknown_user() {
        let store = SqliteSkillStore::open_in_memory().unwrap();
        let snapshot = store.get_skills(UserId::new()).await.unwrap();
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_and_read_back() {
        let store = SqliteSkillStore::open_in_memory().unwrap();
        let user = UserId::new();

        store.upsert_skill(user, "Python", 3).await.unwrap();
        store.upsert_skill(user, "SQL", 2).await.unwrap();

        let snapshot = store.get_skills(user).await.unwrap();
        assert_eq!(snapshot.get("Python"), Some(&3));
        assert_eq!(snapshot.get("SQL"), Some(&2));
    }

    #[tokio::test]
    async fn test_upsert_is_last_writer_wins() {
        let store = SqliteSkillStore::open_in_memory().unwrap();
        let user = UserId::new();

        store.upsert_skill(user, "Python", 2).await.unwrap();
        store.upsert_skill(user, "Python", 4).await.unwrap();

        let snapshot = store.get_skills(user).await.unwrap();
        assert_eq!(snapshot.get("Python"), Some(&4));
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_rejects_out_of_range_level() {
        let store = SqliteSkillStore::open_in_memory().unwrap();
        let user = UserId::new();

        assert!(store.upsert_skill(user, "Python", 0).await.is_err());
        assert!(store.upsert_skill(user, "Python", 6).await.is_err());
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let store = SqliteSkillStore::open_in_memory().unwrap();
        let alice = UserId::new();
        let bob = UserId::new();

        store.upsert_skill(alice, "Rust", 5).await.unwrap();

        assert!(store.get_skills(bob).await.unwrap().is_empty());
        assert_eq!(store.get_skills(alice).await.unwrap().get("Rust"), Some(&5));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skills.db");
        let user = UserId::new();

        {
            let store = SqliteSkillStore::open(&path).unwrap();
            store.upsert_skill(user, "Kubernetes", 2).await.unwrap();
        }

        let store = SqliteSkillStore::open(&path).unwrap();
        let snapshot = store.get_skills(user).await.unwrap();
        assert_eq!(snapshot.get("Kubernetes"), Some(&2));
    }
}
