//! Project-ownership collaborator.
//!
//! SYSTEM CONTEXT
//! ==============
//! Project CRUD lives in the dashboard application; the relay only asks one
//! question — who owns the project backing a room, if any. The trait keeps
//! that question behind a seam so tests can answer it in memory while
//! production reads the dashboard's `projects` table.

use async_trait::async_trait;
use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("project directory unavailable: {0}")]
    Unavailable(String),
}

/// Lookup of a room's backing project owner.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Owner user id of the project backing `room_id`, or `None` when the
    /// room has no backing project (ad-hoc room).
    async fn project_owner(&self, room_id: &str) -> Result<Option<String>, DirectoryError>;
}

/// Postgres-backed directory reading the dashboard's `projects` table.
pub struct PgProjectDirectory {
    pool: PgPool,
}

impl PgProjectDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectDirectory for PgProjectDirectory {
    async fn project_owner(&self, room_id: &str) -> Result<Option<String>, DirectoryError> {
        let owner = sqlx::query_scalar::<_, String>("SELECT owner_id FROM projects WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }
}
