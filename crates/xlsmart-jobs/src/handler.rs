//! Bulk-job handler trait and execution context.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use xlsmart_core::{AnalysisKind, BulkJob};

/// Context provided to bulk-job handlers.
pub struct JobContext {
    /// The claimed job being processed.
    pub job: BulkJob,
}

impl JobContext {
    /// Create a new job context.
    pub fn new(job: BulkJob) -> Self {
        Self { job }
    }

    /// The session this job reports into.
    pub fn session_id(&self) -> Uuid {
        self.job.session_id
    }

    /// Get the job payload.
    pub fn payload(&self) -> &JsonValue {
        &self.job.payload
    }
}

/// Result of bulk-job execution.
#[derive(Debug)]
pub enum JobResult {
    /// Job completed; the session ledger holds the per-entity outcome.
    Success,
    /// Job failed with an error message (requeued while retries remain).
    Failed(String),
}

/// Trait for bulk-analysis job handlers.
#[async_trait]
pub trait BulkJobHandler: Send + Sync {
    /// The analysis kind this handler processes.
    fn kind(&self) -> AnalysisKind;

    /// Execute the job.
    async fn execute(&self, ctx: JobContext) -> JobResult;
}

/// No-op handler for worker tests.
pub struct NoOpHandler {
    kind: AnalysisKind,
}

impl NoOpHandler {
    /// Create a new no-op handler for the given analysis kind.
    pub fn new(kind: AnalysisKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl BulkJobHandler for NoOpHandler {
    fn kind(&self) -> AnalysisKind {
        self.kind
    }

    async fn execute(&self, _ctx: JobContext) -> JobResult {
        JobResult::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use xlsmart_core::BulkJobStatus;

    fn test_job(kind: AnalysisKind) -> BulkJob {
        BulkJob {
            id: Uuid::now_v7(),
            session_id: Uuid::now_v7(),
            kind,
            status: BulkJobStatus::Running,
            payload: json!({"scope": "all"}),
            error_message: None,
            retry_count: 0,
            max_retries: 1,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: None,
        }
    }

    #[test]
    fn context_exposes_session_and_payload() {
        let job = test_job(AnalysisKind::CareerPath);
        let session_id = job.session_id;
        let ctx = JobContext::new(job);
        assert_eq!(ctx.session_id(), session_id);
        assert_eq!(ctx.payload()["scope"], "all");
    }

    #[tokio::test]
    async fn noop_handler_succeeds() {
        let handler = NoOpHandler::new(AnalysisKind::CareerPath);
        assert_eq!(handler.kind(), AnalysisKind::CareerPath);

        let result = handler.execute(JobContext::new(test_job(AnalysisKind::CareerPath))).await;
        assert!(matches!(result, JobResult::Success));
    }
}
