//! Bulk-job queue repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use xlsmart_core::{
    defaults, new_v7, AnalysisKind, BulkJob, BulkJobRepository, BulkJobStatus, Error, QueueStats,
    Result,
};

/// PostgreSQL implementation of BulkJobRepository.
#[derive(Clone)]
pub struct PgBulkJobRepository {
    pool: Pool<Postgres>,
}

impl PgBulkJobRepository {
    /// Create a new PgBulkJobRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert AnalysisKind to string for database.
    fn kind_to_str(kind: AnalysisKind) -> &'static str {
        match kind {
            AnalysisKind::RoleAssignment => "role_assignment",
            AnalysisKind::RoleStandardization => "role_standardization",
            AnalysisKind::CareerPath => "career_path",
            AnalysisKind::MobilityPlan => "mobility_plan",
            AnalysisKind::DevelopmentPathway => "development_pathway",
            AnalysisKind::TrainingAnalysis => "training_analysis",
            AnalysisKind::RetentionPlan => "retention_plan",
        }
    }

    /// Convert string from database to AnalysisKind.
    fn str_to_kind(s: &str) -> AnalysisKind {
        match s {
            "role_assignment" => AnalysisKind::RoleAssignment,
            "role_standardization" => AnalysisKind::RoleStandardization,
            "career_path" => AnalysisKind::CareerPath,
            "mobility_plan" => AnalysisKind::MobilityPlan,
            "development_pathway" => AnalysisKind::DevelopmentPathway,
            "training_analysis" => AnalysisKind::TrainingAnalysis,
            "retention_plan" => AnalysisKind::RetentionPlan,
            _ => AnalysisKind::CareerPath, // fallback
        }
    }

    /// Convert string from database to BulkJobStatus.
    fn str_to_status(s: &str) -> BulkJobStatus {
        match s {
            "pending" => BulkJobStatus::Pending,
            "running" => BulkJobStatus::Running,
            "completed" => BulkJobStatus::Completed,
            "failed" => BulkJobStatus::Failed,
            _ => BulkJobStatus::Pending, // fallback
        }
    }

    /// Parse a job row into a BulkJob struct.
    fn parse_job_row(row: sqlx::postgres::PgRow) -> BulkJob {
        BulkJob {
            id: row.get("id"),
            session_id: row.get("session_id"),
            kind: Self::str_to_kind(row.get("kind")),
            status: Self::str_to_status(row.get("status")),
            payload: row.get("payload"),
            error_message: row.get("error_message"),
            retry_count: row.get("retry_count"),
            max_retries: row.get("max_retries"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
        }
    }
}

#[async_trait]
impl BulkJobRepository for PgBulkJobRepository {
    async fn queue(
        &self,
        session_id: Uuid,
        kind: AnalysisKind,
        payload: JsonValue,
    ) -> Result<Uuid> {
        let job_id = new_v7();

        sqlx::query(
            "INSERT INTO bulk_job_queue
                 (id, session_id, kind, status, payload, max_retries, created_at)
             VALUES ($1, $2, $3, 'pending'::bulk_job_status, $4, $5, $6)",
        )
        .bind(job_id)
        .bind(session_id)
        .bind(Self::kind_to_str(kind))
        .bind(&payload)
        .bind(defaults::JOB_MAX_RETRIES)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(job_id)
    }

    async fn claim_next(&self) -> Result<Option<BulkJob>> {
        // FOR UPDATE SKIP LOCKED lets multiple workers claim concurrently
        // without serializing on the same row.
        let row = sqlx::query(
            "UPDATE bulk_job_queue
             SET status = 'running'::bulk_job_status, started_at = $1
             WHERE id = (
                 SELECT id FROM bulk_job_queue
                 WHERE status = 'pending'::bulk_job_status
                 ORDER BY created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING id, session_id, kind, status::text, payload, error_message,
                       retry_count, max_retries, created_at, started_at, completed_at",
        )
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE bulk_job_queue
             SET status = 'completed'::bulk_job_status, completed_at = $1
             WHERE id = $2",
        )
        .bind(Utc::now())
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::Job(format!("unknown job {job_id}")));
        }
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let (retry_count, max_retries): (i32, i32) =
            sqlx::query_as("SELECT retry_count, max_retries FROM bulk_job_queue WHERE id = $1")
                .bind(job_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;

        if retry_count < max_retries {
            // Retry: reset to pending with incremented retry count
            sqlx::query(
                "UPDATE bulk_job_queue
                 SET status = 'pending'::bulk_job_status, retry_count = $1,
                     error_message = $2, started_at = NULL
                 WHERE id = $3",
            )
            .bind(retry_count + 1)
            .bind(error)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        } else {
            // Max retries exceeded: mark as failed
            sqlx::query(
                "UPDATE bulk_job_queue
                 SET status = 'failed'::bulk_job_status, completed_at = $1, error_message = $2
                 WHERE id = $3",
            )
            .bind(now)
            .bind(error)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<BulkJob>> {
        let row = sqlx::query(
            "SELECT id, session_id, kind, status::text, payload, error_message,
                    retry_count, max_retries, created_at, started_at, completed_at
             FROM bulk_job_queue WHERE id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_job_row))
    }

    async fn pending_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bulk_job_queue WHERE status = 'pending'::bulk_job_status",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(count)
    }

    async fn queue_stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) FILTER (WHERE status = 'pending') as pending,
                COUNT(*) FILTER (WHERE status = 'running') as running,
                COUNT(*) FILTER (WHERE status = 'completed' AND completed_at > NOW() - INTERVAL '1 hour') as completed_last_hour,
                COUNT(*) FILTER (WHERE status = 'failed' AND completed_at > NOW() - INTERVAL '1 hour') as failed_last_hour,
                COUNT(*) as total
             FROM bulk_job_queue"
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(QueueStats {
            pending: row.get::<i64, _>("pending"),
            running: row.get::<i64, _>("running"),
            completed_last_hour: row.get::<i64, _>("completed_last_hour"),
            failed_last_hour: row.get::<i64, _>("failed_last_hour"),
            total: row.get::<i64, _>("total"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trip() {
        for kind in AnalysisKind::all() {
            let s = PgBulkJobRepository::kind_to_str(*kind);
            assert_eq!(PgBulkJobRepository::str_to_kind(s), *kind);
        }
    }

    #[test]
    fn kind_strings_are_unique() {
        let mut strings: Vec<&str> = AnalysisKind::all()
            .iter()
            .map(|k| PgBulkJobRepository::kind_to_str(*k))
            .collect();
        let total = strings.len();
        strings.sort();
        strings.dedup();
        assert_eq!(strings.len(), total);
    }

    #[test]
    fn unknown_kind_falls_back() {
        assert_eq!(
            PgBulkJobRepository::str_to_kind("unknown"),
            AnalysisKind::CareerPath
        );
    }

    #[test]
    fn unknown_status_falls_back_to_pending() {
        assert_eq!(
            PgBulkJobRepository::str_to_status("unknown"),
            BulkJobStatus::Pending
        );
    }

    #[test]
    fn status_round_trip() {
        for (s, status) in [
            ("pending", BulkJobStatus::Pending),
            ("running", BulkJobStatus::Running),
            ("completed", BulkJobStatus::Completed),
            ("failed", BulkJobStatus::Failed),
        ] {
            assert_eq!(PgBulkJobRepository::str_to_status(s), status);
        }
    }
}
