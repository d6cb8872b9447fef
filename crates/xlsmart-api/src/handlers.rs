//! HTTP handlers for the bulk-analysis API.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use xlsmart_core::{
    defaults, AnalysisKind, AnalysisResultRecord, AnalysisResultRepository, BulkJob,
    BulkJobRepository, EntityScope, Error, QueueStats, SessionRepository, UploadSession,
};
use xlsmart_db::Database;
use xlsmart_jobs::{IntakeReceipt, JobIntake};

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub intake: Arc<JobIntake>,
}

/// API error envelope mapping domain errors onto status codes.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) | Error::EmployeeNotFound(_) | Error::SessionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Error::SessionState(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// =============================================================================
// HEALTH
// =============================================================================

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// BULK ANALYSIS SUBMISSION
// =============================================================================

/// Flat request body: `{"scope": "department", "identifier": "Network"}`,
/// `{"scope": "employee_ids", "employee_ids": [...]}`, or `{"scope": "all"}`.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitAnalysisRequest {
    /// Entity scope; omitted means every employee.
    #[serde(flatten)]
    pub scope: Option<EntityScope>,
    pub session_name: Option<String>,
    pub batch_size: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SubmitAnalysisResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub job_id: Uuid,
    pub entity_count: usize,
    pub estimated_duration_secs: u64,
    pub message: String,
}

/// POST /bulk/:kind — validate, create a session, queue a job.
///
/// Responds immediately; the work happens on the worker and the caller
/// polls the session for progress.
pub async fn submit_analysis(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    payload: Option<Json<SubmitAnalysisRequest>>,
) -> ApiResult<impl IntoResponse> {
    let kind = AnalysisKind::from_path_segment(&kind)
        .ok_or_else(|| Error::NotFound(format!("unknown analysis kind: {kind}")))?;

    let Json(request) = payload.unwrap_or_default();
    let scope = request.scope.unwrap_or(EntityScope::All);

    let receipt: IntakeReceipt = state
        .intake
        .submit(kind, scope, request.session_name, request.batch_size)
        .await?;

    Ok((
        StatusCode::OK,
        Json(SubmitAnalysisResponse {
            success: true,
            session_id: receipt.session_id,
            job_id: receipt.job_id,
            entity_count: receipt.entity_count,
            estimated_duration_secs: receipt.estimated_duration_secs,
            message: format!(
                "{} queued for {} employees",
                kind.function_name(),
                receipt.entity_count
            ),
        }),
    ))
}

// =============================================================================
// SESSIONS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub limit: Option<i64>,
}

/// GET /sessions — recent sessions, newest first.
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> ApiResult<Json<Vec<UploadSession>>> {
    let limit = query
        .limit
        .unwrap_or(defaults::SESSION_LIST_LIMIT)
        .clamp(1, 500);
    Ok(Json(state.db.sessions.list_recent(limit).await?))
}

/// GET /sessions/:id — the progress ledger the frontend polls.
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UploadSession>> {
    let session = state
        .db
        .sessions
        .get(id)
        .await?
        .ok_or(Error::SessionNotFound(id))?;
    Ok(Json(session))
}

/// GET /sessions/:id/results — persisted per-entity results.
pub async fn get_session_results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<AnalysisResultRecord>>> {
    // 404 on unknown session rather than an empty list.
    state
        .db
        .sessions
        .get(id)
        .await?
        .ok_or(Error::SessionNotFound(id))?;
    Ok(Json(state.db.analysis.list_for_session(id).await?))
}

// =============================================================================
// JOBS
// =============================================================================

/// GET /jobs/stats — queue counters for dashboards.
pub async fn queue_stats(State(state): State<AppState>) -> ApiResult<Json<QueueStats>> {
    Ok(Json(state.db.jobs.queue_stats().await?))
}

/// GET /jobs/:id
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BulkJob>> {
    let job = state
        .db
        .jobs
        .get(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("job {id} not found")))?;
    Ok(Json(job))
}
