//! Skill persistence layer
//!
//! Provides the storage seam the skill updater writes through, plus the
//! SQLite implementation used in production.

pub mod sqlite;

use crate::error::Result;
use crate::types::{SkillSnapshot, UserId};
use async_trait::async_trait;

pub use sqlite::SqliteSkillStore;

/// Skill store trait defining the persistence operations the engine needs
///
/// Implementations must provide at least last-writer-wins semantics per
/// `(user, skill)` key; the engine does not serialize concurrent
/// evaluations for the same user.
#[async_trait]
pub trait SkillStore: Send + Sync {
    /// Current proficiency levels for a user; empty snapshot if none stored
    async fn get_skills(&self, user: UserId) -> Result<SkillSnapshot>;

    /// Insert or overwrite one skill level for a user
    async fn upsert_skill(&self, user: UserId, skill: &str, level: u8) -> Result<()>;
}
