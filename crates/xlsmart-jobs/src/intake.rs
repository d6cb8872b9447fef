//! Bulk-job intake: validation, session creation, and durable queueing.
//!
//! Intake is the synchronous half of a bulk run: it resolves and validates
//! the requested entity scope, creates the session ledger row, and queues a
//! durable job for the worker. Nothing is analyzed here; the caller gets a
//! receipt immediately and polls the session afterwards.
//!
//! Scope validation happens before the session is created, so a rejected
//! request leaves no ledger row behind.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use xlsmart_core::{
    defaults, AnalysisKind, BulkJobRepository, EmployeeRepository, EntityScope, Error, Result,
    SessionRepository, SessionStatus,
};

/// Receipt returned to the caller at intake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeReceipt {
    pub session_id: Uuid,
    pub job_id: Uuid,
    pub entity_count: usize,
    pub estimated_duration_secs: u64,
}

/// Payload persisted on the queued job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub scope: EntityScope,
    /// Caller override for the per-kind default batch size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
}

/// Accepts bulk-analysis requests and turns them into durable jobs.
pub struct JobIntake {
    employees: Arc<dyn EmployeeRepository>,
    sessions: Arc<dyn SessionRepository>,
    jobs: Arc<dyn BulkJobRepository>,
}

impl JobIntake {
    pub fn new(
        employees: Arc<dyn EmployeeRepository>,
        sessions: Arc<dyn SessionRepository>,
        jobs: Arc<dyn BulkJobRepository>,
    ) -> Self {
        Self {
            employees,
            sessions,
            jobs,
        }
    }

    /// Validate the scope, create a session, and queue a durable job.
    pub async fn submit(
        &self,
        kind: AnalysisKind,
        scope: EntityScope,
        session_name: Option<String>,
        batch_size: Option<usize>,
    ) -> Result<IntakeReceipt> {
        if batch_size == Some(0) {
            return Err(Error::InvalidInput("batch_size must be at least 1".to_string()));
        }

        let employees = self.employees.resolve_scope(&scope).await?;
        if employees.is_empty() {
            return Err(Error::InvalidInput(
                "No employees found for the requested scope".to_string(),
            ));
        }
        let entity_count = employees.len();

        let name = session_name.unwrap_or_else(|| {
            format!("{} {}", kind.function_name(), Utc::now().format("%Y-%m-%d %H:%M"))
        });

        let session = self
            .sessions
            .create(&name, entity_count as i64, SessionStatus::Processing)
            .await?;

        let payload = json!(JobPayload { scope, batch_size });
        let job_id = self.jobs.queue(session.id, kind, payload).await?;

        info!(
            session_id = %session.id,
            job_id = %job_id,
            kind = kind.function_name(),
            entity_count,
            "Bulk job queued"
        );

        let effective_batch = batch_size.unwrap_or_else(|| kind.default_batch_size());
        Ok(IntakeReceipt {
            session_id: session.id,
            job_id,
            entity_count,
            estimated_duration_secs: estimate_duration_secs(entity_count, effective_batch),
        })
    }
}

/// Rough wall-clock estimate for a run: per-entity gateway time plus the
/// fixed delays between batches.
pub fn estimate_duration_secs(entity_count: usize, batch_size: usize) -> u64 {
    let batches = entity_count.div_ceil(batch_size.max(1)) as u64;
    let inter_batch = batches.saturating_sub(1) * defaults::BATCH_DELAY_MS / 1_000;
    entity_count as u64 * defaults::PER_ENTITY_ESTIMATE_SECS + inter_batch
}
