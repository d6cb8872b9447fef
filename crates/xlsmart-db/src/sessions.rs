//! Upload-session ledger repository implementation.
//!
//! This repository is the enforcement point for the ledger invariants:
//! terminal sessions accept no further writes, status transitions never
//! leave a terminal state, and progress counters must stay consistent
//! (`completed + errors == processed`, `processed <= total_rows`).

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use xlsmart_core::{
    new_v7, Error, Result, SessionProgress, SessionRepository, SessionStatus, UploadSession,
};

/// PostgreSQL implementation of SessionRepository.
#[derive(Clone)]
pub struct PgSessionRepository {
    pool: Pool<Postgres>,
}

const SESSION_COLUMNS: &str =
    "id, session_name, status, total_rows, ai_analysis, error_message, created_at, updated_at";

impl PgSessionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert string from database to SessionStatus.
    fn str_to_status(s: &str) -> SessionStatus {
        match s {
            "uploading" => SessionStatus::Uploading,
            "processing" => SessionStatus::Processing,
            "analyzing" => SessionStatus::Analyzing,
            "standardizing" => SessionStatus::Standardizing,
            "assigning_roles" => SessionStatus::AssigningRoles,
            "completed" => SessionStatus::Completed,
            "completed_with_errors" => SessionStatus::CompletedWithErrors,
            "failed" => SessionStatus::Failed,
            "error" => SessionStatus::Error,
            _ => SessionStatus::Error, // fallback
        }
    }

    /// Parse a session row into an UploadSession struct.
    fn parse_row(row: sqlx::postgres::PgRow) -> UploadSession {
        let progress: SessionProgress =
            serde_json::from_value(row.get("ai_analysis")).unwrap_or_default();
        UploadSession {
            id: row.get("id"),
            session_name: row.get("session_name"),
            status: Self::str_to_status(row.get("status")),
            total_rows: row.get("total_rows"),
            progress,
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    /// Lock the session row and return its current status and total_rows.
    async fn lock_session(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<(SessionStatus, i64)> {
        let row = sqlx::query(
            "SELECT status, total_rows FROM xlsmart_upload_sessions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::SessionNotFound(id))?;

        Ok((
            Self::str_to_status(row.get("status")),
            row.get("total_rows"),
        ))
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(
        &self,
        session_name: &str,
        total_rows: i64,
        status: SessionStatus,
    ) -> Result<UploadSession> {
        if status.is_terminal() {
            return Err(Error::InvalidInput(format!(
                "cannot create session in terminal status {status}"
            )));
        }
        if total_rows < 0 {
            return Err(Error::InvalidInput(format!(
                "negative total_rows: {total_rows}"
            )));
        }

        let id = new_v7();
        let now = Utc::now();
        let progress = SessionProgress {
            started_at: Some(now),
            updated_at: Some(now),
            ..Default::default()
        };

        let row = sqlx::query(&format!(
            "INSERT INTO xlsmart_upload_sessions
                 (id, session_name, status, total_rows, ai_analysis, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(id)
        .bind(session_name)
        .bind(status.to_string())
        .bind(total_rows)
        .bind(serde_json::to_value(&progress)?)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Self::parse_row(row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<UploadSession>> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM xlsmart_upload_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_row))
    }

    async fn set_status(&self, id: Uuid, status: SessionStatus) -> Result<()> {
        if status.is_terminal() {
            return Err(Error::InvalidInput(format!(
                "use finalize() for terminal status {status}"
            )));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let (current, _) = Self::lock_session(&mut tx, id).await?;

        if !current.can_transition_to(status) {
            return Err(Error::SessionState(format!(
                "session {id} is {current}, cannot move to {status}"
            )));
        }

        sqlx::query(
            "UPDATE xlsmart_upload_sessions SET status = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(status.to_string())
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn update_progress(&self, id: Uuid, progress: &SessionProgress) -> Result<()> {
        if !progress.is_consistent() {
            return Err(Error::InvalidInput(format!(
                "inconsistent progress counters: {} completed + {} errors != {} processed",
                progress.completed, progress.errors, progress.processed
            )));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let (current, total_rows) = Self::lock_session(&mut tx, id).await?;

        if current.is_terminal() {
            return Err(Error::SessionState(format!(
                "session {id} is {current}, progress is frozen"
            )));
        }
        if progress.processed > total_rows {
            return Err(Error::InvalidInput(format!(
                "processed {} exceeds total_rows {}",
                progress.processed, total_rows
            )));
        }

        sqlx::query(
            "UPDATE xlsmart_upload_sessions SET ai_analysis = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(serde_json::to_value(progress)?)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn finalize(
        &self,
        id: Uuid,
        status: SessionStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        if !status.is_terminal() {
            return Err(Error::InvalidInput(format!(
                "finalize() requires a terminal status, got {status}"
            )));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let (current, _) = Self::lock_session(&mut tx, id).await?;

        if current.is_terminal() {
            return Err(Error::SessionState(format!(
                "session {id} already finalized as {current}"
            )));
        }

        sqlx::query(
            "UPDATE xlsmart_upload_sessions
             SET status = $1, error_message = $2, updated_at = $3
             WHERE id = $4",
        )
        .bind(status.to_string())
        .bind(error_message)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<UploadSession>> {
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM xlsmart_upload_sessions
             ORDER BY created_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_row).collect())
    }
}
