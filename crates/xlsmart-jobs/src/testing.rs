//! In-memory repository implementations for tests.
//!
//! These mirror the semantics of the PostgreSQL repositories closely
//! enough to exercise handlers and the worker without a database: the
//! session store enforces terminal write-protection and counter
//! invariants, and the job store implements claim/retry state moves.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use xlsmart_core::{
    new_v7, AnalysisKind, AnalysisResultRecord, AnalysisResultRepository, AssignmentStatus,
    BulkJob, BulkJobRepository, BulkJobStatus, Employee, EmployeeRepository, EntityScope, Error,
    NewAnalysisResult, NewRoleMapping, QueueStats, Result, RoleMappingRepository,
    SessionProgress, SessionRepository, SessionStatus, StandardRole, StandardRoleRepository,
    UploadSession,
};

/// Build a test employee with a deterministic employee number.
pub fn test_employee(n: u32) -> Employee {
    Employee {
        id: new_v7(),
        employee_number: format!("EMP-{n:04}"),
        name: format!("Employee {n}"),
        position: format!("Position {n}"),
        department: "Network".to_string(),
        skills: vec!["BGP".to_string()],
        experience_years: 5,
        certifications: vec![],
        assigned_role_id: None,
        assignment_status: AssignmentStatus::Pending,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Build an active test role.
pub fn test_role(title: &str) -> StandardRole {
    StandardRole {
        id: new_v7(),
        role_title: title.to_string(),
        department: "Network".to_string(),
        job_family: "Engineering".to_string(),
        required_skills: vec!["BGP".to_string()],
        experience_range: "3-8".to_string(),
        description: String::new(),
        active: true,
    }
}

// =============================================================================
// EMPLOYEES
// =============================================================================

/// In-memory employee store recording role writes.
#[derive(Default)]
pub struct InMemoryEmployees {
    pub employees: Vec<Employee>,
    /// (employee_id, role_id, status) per assign_role call.
    pub assignments: Mutex<Vec<(Uuid, Uuid, AssignmentStatus)>>,
    /// Employee ids reset to pending.
    pub marked_pending: Mutex<Vec<Uuid>>,
}

impl InMemoryEmployees {
    pub fn with_employees(employees: Vec<Employee>) -> Self {
        Self {
            employees,
            ..Default::default()
        }
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryEmployees {
    async fn get(&self, id: Uuid) -> Result<Option<Employee>> {
        Ok(self.employees.iter().find(|e| e.id == id).cloned())
    }

    async fn resolve_scope(&self, scope: &EntityScope) -> Result<Vec<Employee>> {
        Ok(match scope {
            EntityScope::All => self.employees.clone(),
            EntityScope::Department { identifier } => self
                .employees
                .iter()
                .filter(|e| e.department.eq_ignore_ascii_case(identifier))
                .cloned()
                .collect(),
            EntityScope::EmployeeIds { employee_ids } => self
                .employees
                .iter()
                .filter(|e| employee_ids.contains(&e.id))
                .cloned()
                .collect(),
        })
    }

    async fn assign_role(
        &self,
        employee_id: Uuid,
        role_id: Uuid,
        status: AssignmentStatus,
    ) -> Result<()> {
        if !self.employees.iter().any(|e| e.id == employee_id) {
            return Err(Error::EmployeeNotFound(employee_id));
        }
        self.assignments
            .lock()
            .unwrap()
            .push((employee_id, role_id, status));
        Ok(())
    }

    async fn mark_pending(&self, employee_id: Uuid) -> Result<()> {
        self.marked_pending.lock().unwrap().push(employee_id);
        Ok(())
    }
}

// =============================================================================
// ROLES / MAPPINGS
// =============================================================================

/// In-memory standard-role catalog.
#[derive(Default)]
pub struct InMemoryRoles {
    pub roles: Vec<StandardRole>,
}

impl InMemoryRoles {
    pub fn with_roles(roles: Vec<StandardRole>) -> Self {
        Self { roles }
    }
}

#[async_trait]
impl StandardRoleRepository for InMemoryRoles {
    async fn list_active(&self) -> Result<Vec<StandardRole>> {
        Ok(self.roles.iter().filter(|r| r.active).cloned().collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<StandardRole>> {
        Ok(self.roles.iter().find(|r| r.id == id).cloned())
    }
}

/// In-memory mapping store recording inserts.
#[derive(Default)]
pub struct InMemoryMappings {
    pub inserted: Mutex<Vec<NewRoleMapping>>,
}

#[async_trait]
impl RoleMappingRepository for InMemoryMappings {
    async fn insert(&self, mapping: NewRoleMapping) -> Result<Uuid> {
        if !(0.0..=100.0).contains(&mapping.mapping_confidence) {
            return Err(Error::InvalidInput(format!(
                "mapping_confidence {} outside [0, 100]",
                mapping.mapping_confidence
            )));
        }
        self.inserted.lock().unwrap().push(mapping);
        Ok(new_v7())
    }

    async fn update_status(
        &self,
        _id: Uuid,
        _status: xlsmart_core::MappingStatus,
    ) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// SESSIONS
// =============================================================================

/// In-memory session ledger enforcing the same invariants as the
/// PostgreSQL repository.
#[derive(Default)]
pub struct InMemorySessions {
    pub sessions: Mutex<HashMap<Uuid, UploadSession>>,
}

#[async_trait]
impl SessionRepository for InMemorySessions {
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
        let now = Utc::now();
        let session = UploadSession {
            id: new_v7(),
            session_name: session_name.to_string(),
            status,
            total_rows,
            progress: SessionProgress {
                started_at: Some(now),
                updated_at: Some(now),
                ..Default::default()
            },
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn get(&self, id: Uuid) -> Result<Option<UploadSession>> {
        Ok(self.sessions.lock().unwrap().get(&id).cloned())
    }

    async fn set_status(&self, id: Uuid, status: SessionStatus) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(&id).ok_or(Error::SessionNotFound(id))?;
        if !session.status.can_transition_to(status) {
            return Err(Error::SessionState(format!(
                "session {id} is {}, cannot move to {status}",
                session.status
            )));
        }
        session.status = status;
        session.updated_at = Utc::now();
        Ok(())
    }

    async fn update_progress(&self, id: Uuid, progress: &SessionProgress) -> Result<()> {
        if !progress.is_consistent() {
            return Err(Error::InvalidInput("inconsistent progress counters".into()));
        }
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(&id).ok_or(Error::SessionNotFound(id))?;
        if session.status.is_terminal() {
            return Err(Error::SessionState(format!(
                "session {id} is {}, progress is frozen",
                session.status
            )));
        }
        if progress.processed > session.total_rows {
            return Err(Error::InvalidInput(format!(
                "processed {} exceeds total_rows {}",
                progress.processed, session.total_rows
            )));
        }
        session.progress = progress.clone();
        session.updated_at = Utc::now();
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
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.get_mut(&id).ok_or(Error::SessionNotFound(id))?;
        if session.status.is_terminal() {
            return Err(Error::SessionState(format!(
                "session {id} already finalized as {}",
                session.status
            )));
        }
        session.status = status;
        session.error_message = error_message.map(String::from);
        session.updated_at = Utc::now();
        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<UploadSession>> {
        let mut all: Vec<UploadSession> =
            self.sessions.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit as usize);
        Ok(all)
    }
}

// =============================================================================
// ANALYSIS RESULTS
// =============================================================================

/// In-memory analysis-result store.
#[derive(Default)]
pub struct InMemoryAnalysisResults {
    pub inserted: Mutex<Vec<NewAnalysisResult>>,
}

#[async_trait]
impl AnalysisResultRepository for InMemoryAnalysisResults {
    async fn insert(&self, result: NewAnalysisResult) -> Result<Uuid> {
        self.inserted.lock().unwrap().push(result);
        Ok(new_v7())
    }

    async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<AnalysisResultRecord>> {
        Ok(self
            .inserted
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.session_id == session_id)
            .map(|r| AnalysisResultRecord {
                id: new_v7(),
                session_id: r.session_id,
                analysis_kind: r.analysis_kind,
                function_name: r.analysis_kind.function_name().to_string(),
                input_parameters: r.input_parameters.clone(),
                analysis_result: r.analysis_result.clone(),
                status: "completed".to_string(),
                created_at: Utc::now(),
            })
            .collect())
    }
}

// =============================================================================
// BULK JOB QUEUE
// =============================================================================

/// In-memory bulk-job queue with claim/retry semantics.
#[derive(Default)]
pub struct InMemoryJobs {
    pub jobs: Mutex<Vec<BulkJob>>,
}

#[async_trait]
impl BulkJobRepository for InMemoryJobs {
    async fn queue(
        &self,
        session_id: Uuid,
        kind: AnalysisKind,
        payload: JsonValue,
    ) -> Result<Uuid> {
        let job = BulkJob {
            id: new_v7(),
            session_id,
            kind,
            status: BulkJobStatus::Pending,
            payload,
            error_message: None,
            retry_count: 0,
            max_retries: xlsmart_core::defaults::JOB_MAX_RETRIES,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        let id = job.id;
        self.jobs.lock().unwrap().push(job);
        Ok(id)
    }

    async fn claim_next(&self) -> Result<Option<BulkJob>> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs
            .iter_mut()
            .filter(|j| j.status == BulkJobStatus::Pending)
            .min_by_key(|j| j.created_at)
        {
            job.status = BulkJobStatus::Running;
            job.started_at = Some(Utc::now());
            return Ok(Some(job.clone()));
        }
        Ok(None)
    }

    async fn complete(&self, job_id: Uuid) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| Error::Job(format!("unknown job {job_id}")))?;
        job.status = BulkJobStatus::Completed;
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| Error::Job(format!("unknown job {job_id}")))?;
        if job.retry_count < job.max_retries {
            job.status = BulkJobStatus::Pending;
            job.retry_count += 1;
            job.error_message = Some(error.to_string());
            job.started_at = None;
        } else {
            job.status = BulkJobStatus::Failed;
            job.error_message = Some(error.to_string());
            job.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<BulkJob>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.id == job_id)
            .cloned())
    }

    async fn pending_count(&self) -> Result<i64> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| j.status == BulkJobStatus::Pending)
            .count() as i64)
    }

    async fn queue_stats(&self) -> Result<QueueStats> {
        let jobs = self.jobs.lock().unwrap();
        let count = |status: BulkJobStatus| {
            jobs.iter().filter(|j| j.status == status).count() as i64
        };
        Ok(QueueStats {
            pending: count(BulkJobStatus::Pending),
            running: count(BulkJobStatus::Running),
            completed_last_hour: count(BulkJobStatus::Completed),
            failed_last_hour: count(BulkJobStatus::Failed),
            total: jobs.len() as i64,
        })
    }
}
