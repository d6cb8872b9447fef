//! Repository and inference trait definitions.
//!
//! These are the seams between the job runner and its collaborators: the
//! database layer implements the repository traits, the inference crate
//! implements [`CompletionBackend`], and tests substitute in-memory fakes.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::models::*;
use crate::Result;

// =============================================================================
// EMPLOYEE / CATALOG REPOSITORIES
// =============================================================================

/// Repository for employee rows.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// Get an employee by id.
    async fn get(&self, id: Uuid) -> Result<Option<Employee>>;

    /// Resolve the employee set selected by a scope, in a stable order.
    async fn resolve_scope(&self, scope: &EntityScope) -> Result<Vec<Employee>>;

    /// Write a role assignment back onto the employee row.
    async fn assign_role(
        &self,
        employee_id: Uuid,
        role_id: Uuid,
        status: AssignmentStatus,
    ) -> Result<()>;

    /// Reset an employee to unassigned/pending (the NO_MATCH outcome).
    async fn mark_pending(&self, employee_id: Uuid) -> Result<()>;
}

/// Repository for the standard-role reference catalog.
#[async_trait]
pub trait StandardRoleRepository: Send + Sync {
    /// List active catalog roles.
    async fn list_active(&self) -> Result<Vec<StandardRole>>;

    /// Get a role by id.
    async fn get(&self, id: Uuid) -> Result<Option<StandardRole>>;
}

/// Creation request for a role mapping. Confidence must already be
/// normalized to the 0–100 scale (see [`crate::confidence`]).
#[derive(Debug, Clone)]
pub struct NewRoleMapping {
    pub original_role_title: String,
    pub standardized_role_title: String,
    pub standard_role_id: Option<Uuid>,
    pub mapping_confidence: f32,
    pub mapping_status: MappingStatus,
    pub requires_manual_review: bool,
}

/// Repository for role-title mappings.
#[async_trait]
pub trait RoleMappingRepository: Send + Sync {
    /// Insert a mapping row. Rejects confidence outside [0, 100].
    async fn insert(&self, mapping: NewRoleMapping) -> Result<Uuid>;

    /// Update the review status of a mapping.
    async fn update_status(&self, id: Uuid, status: MappingStatus) -> Result<()>;
}

// =============================================================================
// SESSION / RESULT REPOSITORIES
// =============================================================================

/// Repository for the upload-session ledger.
///
/// Implementations enforce the ledger invariants: `processed ≤ total_rows`,
/// counter consistency, and no writes once the status is terminal.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a session in the given non-terminal phase.
    async fn create(
        &self,
        session_name: &str,
        total_rows: i64,
        status: SessionStatus,
    ) -> Result<UploadSession>;

    /// Get a session by id.
    async fn get(&self, id: Uuid) -> Result<Option<UploadSession>>;

    /// Move a session to another non-terminal phase.
    async fn set_status(&self, id: Uuid, status: SessionStatus) -> Result<()>;

    /// Overwrite the progress counters (called after every batch).
    async fn update_progress(&self, id: Uuid, progress: &SessionProgress) -> Result<()>;

    /// Enter a terminal status; no further writes will be accepted.
    async fn finalize(
        &self,
        id: Uuid,
        status: SessionStatus,
        error_message: Option<&str>,
    ) -> Result<()>;

    /// List recent sessions, newest first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<UploadSession>>;
}

/// Creation request for an analysis-result row.
#[derive(Debug, Clone)]
pub struct NewAnalysisResult {
    pub session_id: Uuid,
    pub analysis_kind: AnalysisKind,
    pub input_parameters: JsonValue,
    pub analysis_result: JsonValue,
}

/// Repository for immutable per-entity analysis results.
#[async_trait]
pub trait AnalysisResultRepository: Send + Sync {
    /// Insert a result row (immutable after creation).
    async fn insert(&self, result: NewAnalysisResult) -> Result<Uuid>;

    /// List results for a session, oldest first.
    async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<AnalysisResultRecord>>;
}

// =============================================================================
// BULK JOB QUEUE
// =============================================================================

/// Repository for the durable bulk-job queue.
#[async_trait]
pub trait BulkJobRepository: Send + Sync {
    /// Queue a new bulk job for a session.
    async fn queue(&self, session_id: Uuid, kind: AnalysisKind, payload: JsonValue)
        -> Result<Uuid>;

    /// Claim the next pending job for processing.
    async fn claim_next(&self) -> Result<Option<BulkJob>>;

    /// Mark a job as completed.
    async fn complete(&self, job_id: Uuid) -> Result<()>;

    /// Mark a job as failed (requeues while retries remain).
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Get a job by id.
    async fn get(&self, job_id: Uuid) -> Result<Option<BulkJob>>;

    /// Get pending job count.
    async fn pending_count(&self) -> Result<i64>;

    /// Get queue statistics.
    async fn queue_stats(&self) -> Result<QueueStats>;
}

// =============================================================================
// INFERENCE
// =============================================================================

/// Backend for chat-completion text generation (the LLM gateway seam).
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send a system + user prompt pair and return the raw completion text.
    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String>;

    /// The model identifier in use.
    fn model_name(&self) -> &str;
}
