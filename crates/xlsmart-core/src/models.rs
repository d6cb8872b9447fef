//! Core data models for the XLSMART analysis backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// EMPLOYEE TYPES
// =============================================================================

/// Role-assignment state of an employee row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// No standard role assigned yet (initial state, and the NO_MATCH outcome).
    Pending,
    /// Standard role assigned by a bulk job.
    Assigned,
    /// Assignment suggested but confidence below the manual-review threshold.
    NeedsReview,
}

/// An employee record to be processed by bulk jobs.
///
/// Attribute fields are free-form; missing values default to empty
/// strings/lists rather than being rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub employee_number: String,
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub experience_years: i32,
    #[serde(default)]
    pub certifications: Vec<String>,
    pub assigned_role_id: Option<Uuid>,
    pub assignment_status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// ROLE CATALOG TYPES
// =============================================================================

/// A canonical role definition in the reference catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardRole {
    pub id: Uuid,
    pub role_title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub job_family: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub experience_range: String,
    #[serde(default)]
    pub description: String,
    pub active: bool,
}

/// Review state of a raw-title → standard-role mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStatus {
    AutoMapped,
    ManualReview,
    Approved,
    Rejected,
}

/// A mapping from an original role title to a standard role.
///
/// `mapping_confidence` is always on the 0–100 scale (see
/// [`crate::confidence::normalize_confidence`]); `requires_manual_review`
/// is derived from the confidence at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleMapping {
    pub id: Uuid,
    pub original_role_title: String,
    pub standardized_role_title: String,
    pub standard_role_id: Option<Uuid>,
    pub mapping_confidence: f32,
    pub mapping_status: MappingStatus,
    pub requires_manual_review: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SESSION TYPES
// =============================================================================

/// Status of an upload session (the bulk-job progress ledger).
///
/// The non-terminal variants are the legacy phase vocabulary the frontend
/// polls on; transitions are monotone and terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Uploading,
    Processing,
    Analyzing,
    Standardizing,
    AssigningRoles,
    Completed,
    CompletedWithErrors,
    Failed,
    Error,
}

impl SessionStatus {
    /// Whether this status is terminal (no further writes allowed).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed
                | SessionStatus::CompletedWithErrors
                | SessionStatus::Failed
                | SessionStatus::Error
        )
    }

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Non-terminal → non-terminal and non-terminal → terminal are allowed;
    /// any transition out of a terminal state is a regression and rejected.
    pub fn can_transition_to(&self, _next: SessionStatus) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Uploading => "uploading",
            SessionStatus::Processing => "processing",
            SessionStatus::Analyzing => "analyzing",
            SessionStatus::Standardizing => "standardizing",
            SessionStatus::AssigningRoles => "assigning_roles",
            SessionStatus::Completed => "completed",
            SessionStatus::CompletedWithErrors => "completed_with_errors",
            SessionStatus::Failed => "failed",
            SessionStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Progress counters stored in the session's `ai_analysis` JSON column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionProgress {
    /// Entities accounted for so far (success or failure).
    pub processed: i64,
    /// Entities that produced a persisted result.
    pub completed: i64,
    /// Entities that failed.
    pub errors: i64,
    /// Most recent error messages (truncated to the newest entries).
    #[serde(default)]
    pub error_details: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionProgress {
    /// Counter consistency invariant: completed + errors == processed.
    pub fn is_consistent(&self) -> bool {
        self.completed + self.errors == self.processed
    }
}

/// The persisted progress/status ledger for a bulk job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: Uuid,
    pub session_name: String,
    pub status: SessionStatus,
    pub total_rows: i64,
    pub progress: SessionProgress,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// ANALYSIS TYPES
// =============================================================================

/// Kind of bulk AI analysis to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Assign a standard role to each employee
    RoleAssignment,
    /// Map raw role titles onto the standard catalog
    RoleStandardization,
    /// Career path projection per employee
    CareerPath,
    /// Mobility (rotation/relocation) planning per employee
    MobilityPlan,
    /// Development pathway recommendation per employee
    DevelopmentPathway,
    /// Training needs analysis per employee
    TrainingAnalysis,
    /// Retention risk and plan per employee
    RetentionPlan,
}

impl AnalysisKind {
    /// The legacy function name recorded on analysis-result rows.
    pub fn function_name(&self) -> &'static str {
        match self {
            AnalysisKind::RoleAssignment => "employee-role-assignment",
            AnalysisKind::RoleStandardization => "standardize-roles",
            AnalysisKind::CareerPath => "bulk-career-paths",
            AnalysisKind::MobilityPlan => "bulk-mobility-planning",
            AnalysisKind::DevelopmentPathway => "bulk-development-pathways",
            AnalysisKind::TrainingAnalysis => "bulk-training-analysis",
            AnalysisKind::RetentionPlan => "bulk-retention-planning",
        }
    }

    /// Default batch size for this kind (items processed concurrently).
    pub fn default_batch_size(&self) -> usize {
        match self {
            // Assignment prompts carry the whole role catalog, keep batches small
            AnalysisKind::RoleAssignment | AnalysisKind::RoleStandardization => 5,
            // Free-text analyses tolerate wider batches
            AnalysisKind::CareerPath
            | AnalysisKind::MobilityPlan
            | AnalysisKind::DevelopmentPathway => 10,
            AnalysisKind::TrainingAnalysis | AnalysisKind::RetentionPlan => 15,
        }
    }

    /// The non-terminal session phase advertised while this kind runs.
    pub fn running_status(&self) -> SessionStatus {
        match self {
            AnalysisKind::RoleAssignment => SessionStatus::AssigningRoles,
            AnalysisKind::RoleStandardization => SessionStatus::Standardizing,
            _ => SessionStatus::Analyzing,
        }
    }

    /// All kinds, for registries and route parsing.
    pub fn all() -> &'static [AnalysisKind] {
        &[
            AnalysisKind::RoleAssignment,
            AnalysisKind::RoleStandardization,
            AnalysisKind::CareerPath,
            AnalysisKind::MobilityPlan,
            AnalysisKind::DevelopmentPathway,
            AnalysisKind::TrainingAnalysis,
            AnalysisKind::RetentionPlan,
        ]
    }

    /// Parse a kind from a URL path segment (kebab- or snake-case).
    pub fn from_path_segment(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "role_assignment" => Some(AnalysisKind::RoleAssignment),
            "role_standardization" | "standardize_roles" => {
                Some(AnalysisKind::RoleStandardization)
            }
            "career_path" | "career_paths" => Some(AnalysisKind::CareerPath),
            "mobility_plan" | "mobility_planning" => Some(AnalysisKind::MobilityPlan),
            "development_pathway" | "development_pathways" => {
                Some(AnalysisKind::DevelopmentPathway)
            }
            "training_analysis" => Some(AnalysisKind::TrainingAnalysis),
            "retention_plan" | "retention_planning" => Some(AnalysisKind::RetentionPlan),
            _ => None,
        }
    }
}

/// An immutable per-entity analysis result row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResultRecord {
    pub id: Uuid,
    pub session_id: Uuid,
    pub analysis_kind: AnalysisKind,
    pub function_name: String,
    pub input_parameters: JsonValue,
    pub analysis_result: JsonValue,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// BULK JOB QUEUE TYPES
// =============================================================================

/// Status of a durable bulk job in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkJobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// A durable bulk job record.
///
/// The HTTP layer creates one of these (plus a session) and returns
/// immediately; the worker claims and executes it. The record survives a
/// crash, so a restarted worker picks pending jobs back up instead of
/// leaving an orphaned ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkJob {
    pub id: Uuid,
    pub session_id: Uuid,
    pub kind: AnalysisKind,
    pub status: BulkJobStatus,
    pub payload: JsonValue,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Queue statistics summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: i64,
    pub running: i64,
    pub completed_last_hour: i64,
    pub failed_last_hour: i64,
    pub total: i64,
}

// =============================================================================
// INTAKE TYPES
// =============================================================================

/// Selection criteria resolving the employee set a bulk job targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum EntityScope {
    /// Every employee.
    All,
    /// Employees in a named department.
    Department { identifier: String },
    /// An explicit list of employee ids.
    EmployeeIds { employee_ids: Vec<Uuid> },
}
