//! Bulk-analysis job handlers.
//!
//! Each analysis kind gets a [`BulkJobHandler`](crate::handler::BulkJobHandler)
//! implementation: role assignment and role standardization write structured
//! rows (employee assignments, title mappings), and the five free-text kinds
//! share a generic handler that persists analysis-result JSON per employee.
//! All of them report into the session ledger through
//! [`SessionTracker`](crate::tracker::SessionTracker).

mod analysis;
mod role_assignment;
mod standardization;

pub use analysis::AnalysisHandler;
pub use role_assignment::RoleAssignmentHandler;
pub use standardization::RoleStandardizationHandler;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use xlsmart_core::{
    AnalysisKind, AnalysisResultRepository, CompletionBackend, EmployeeRepository,
    RoleMappingRepository, SessionRepository, StandardRoleRepository,
};
use xlsmart_db::{
    PgAnalysisResultRepository, PgEmployeeRepository, PgRoleMappingRepository,
    PgSessionRepository, PgStandardRoleRepository,
};

use crate::worker::JobWorker;

/// Shared collaborators for the bulk-analysis handlers.
#[derive(Clone)]
pub struct HandlerDeps {
    pub employees: Arc<dyn EmployeeRepository>,
    pub roles: Arc<dyn StandardRoleRepository>,
    pub mappings: Arc<dyn RoleMappingRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub analysis: Arc<dyn AnalysisResultRepository>,
    pub gateway: Arc<dyn CompletionBackend>,
}

impl HandlerDeps {
    /// Wire the handler dependencies against PostgreSQL repositories.
    pub fn from_pool(pool: Pool<Postgres>, gateway: Arc<dyn CompletionBackend>) -> Self {
        Self {
            employees: Arc::new(PgEmployeeRepository::new(pool.clone())),
            roles: Arc::new(PgStandardRoleRepository::new(pool.clone())),
            mappings: Arc::new(PgRoleMappingRepository::new(pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(pool.clone())),
            analysis: Arc::new(PgAnalysisResultRepository::new(pool)),
            gateway,
        }
    }
}

/// Register the full handler set on a worker: both structured kinds plus
/// one generic analysis handler per free-text kind.
pub async fn register_all(worker: &JobWorker, deps: HandlerDeps) {
    worker
        .register_handler(RoleAssignmentHandler::new(deps.clone()))
        .await;
    worker
        .register_handler(RoleStandardizationHandler::new(deps.clone()))
        .await;
    for kind in [
        AnalysisKind::CareerPath,
        AnalysisKind::MobilityPlan,
        AnalysisKind::DevelopmentPathway,
        AnalysisKind::TrainingAnalysis,
        AnalysisKind::RetentionPlan,
    ] {
        worker
            .register_handler(AnalysisHandler::new(kind, deps.clone()))
            .await;
    }
}
