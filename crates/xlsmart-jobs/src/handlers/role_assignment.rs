//! Role-assignment handler: match each employee to a catalog role.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use xlsmart_core::{
    confidence, defaults, AnalysisKind, AssignmentStatus, Employee, NewRoleMapping, StandardRole,
};
use xlsmart_inference::repair::parse_llm_json;

use crate::batch::BatchScheduler;
use crate::handler::{BulkJobHandler, JobContext, JobResult};
use crate::intake::JobPayload;
use crate::prompts;
use crate::tracker::SessionTracker;

use super::HandlerDeps;

/// Model verdict for one employee-to-role match.
#[derive(Debug, Deserialize)]
struct RoleVerdict {
    #[serde(default)]
    role_id: String,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    #[allow(dead_code)]
    reasoning: Option<String>,
}

impl RoleVerdict {
    /// The model declined to match; an empty id counts as declining too.
    fn is_no_match(&self) -> bool {
        let id = self.role_id.trim();
        id.is_empty() || id.eq_ignore_ascii_case("no_match")
    }
}

/// Assigns a standard role to each employee in scope.
///
/// Per employee: prompt the gateway with the profile and the active
/// catalog, parse the verdict, and either write the assignment plus a
/// mapping row or (on NO_MATCH) leave the employee pending. A verdict
/// naming a role id outside the catalog is an entity error, never a
/// substitute assignment.
pub struct RoleAssignmentHandler {
    deps: HandlerDeps,
}

impl RoleAssignmentHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    async fn process_employee(
        &self,
        employee: &Employee,
        roles: &[StandardRole],
    ) -> Result<(), String> {
        let who = &employee.employee_number;

        let prompt = prompts::role_assignment_prompt(employee, roles);
        let raw = self
            .deps
            .gateway
            .complete(
                &prompt.system,
                &prompt.user,
                defaults::GATEWAY_MAX_COMPLETION_TOKENS,
            )
            .await
            .map_err(|e| format!("{who}: gateway: {e}"))?;

        let verdict: RoleVerdict =
            parse_llm_json(&raw).map_err(|e| format!("{who}: unparseable verdict: {e}"))?;

        if verdict.is_no_match() {
            self.deps
                .employees
                .mark_pending(employee.id)
                .await
                .map_err(|e| format!("{who}: {e}"))?;
            info!("No catalog match for employee {who}, left pending");
            return Ok(());
        }

        let role_id = Uuid::parse_str(verdict.role_id.trim())
            .map_err(|_| format!("{who}: verdict role id {:?} is not a uuid", verdict.role_id))?;
        let role = roles
            .iter()
            .find(|r| r.id == role_id)
            .ok_or_else(|| format!("{who}: verdict role id {role_id} is not in the catalog"))?;

        let conf = confidence::normalize_confidence(verdict.confidence);
        let needs_review = confidence::requires_manual_review(conf);
        let status = if needs_review {
            AssignmentStatus::NeedsReview
        } else {
            AssignmentStatus::Assigned
        };

        self.deps
            .employees
            .assign_role(employee.id, role.id, status)
            .await
            .map_err(|e| format!("{who}: {e}"))?;

        self.deps
            .mappings
            .insert(NewRoleMapping {
                original_role_title: employee.position.clone(),
                standardized_role_title: role.role_title.clone(),
                standard_role_id: Some(role.id),
                mapping_confidence: conf,
                mapping_status: confidence::initial_mapping_status(conf),
                requires_manual_review: needs_review,
            })
            .await
            .map_err(|e| format!("{who}: {e}"))?;

        debug!(
            "Assigned {} to {who} (confidence {conf:.1}, review: {needs_review})",
            role.role_title
        );
        Ok(())
    }
}

#[async_trait]
impl BulkJobHandler for RoleAssignmentHandler {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::RoleAssignment
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let kind = self.kind();
        let tracker = SessionTracker::new(self.deps.sessions.clone(), ctx.session_id());

        let payload: JobPayload = match serde_json::from_value(ctx.payload().clone()) {
            Ok(payload) => payload,
            Err(e) => return JobResult::Failed(format!("invalid job payload: {e}")),
        };

        if let Err(e) = tracker.begin_phase(kind.running_status()).await {
            return JobResult::Failed(format!("cannot enter running phase: {e}"));
        }

        let roles = match self.deps.roles.list_active().await {
            Ok(roles) if roles.is_empty() => {
                return JobResult::Failed("no active roles in the standard catalog".to_string())
            }
            Ok(roles) => roles,
            Err(e) => return JobResult::Failed(format!("cannot load role catalog: {e}")),
        };

        let employees = match self.deps.employees.resolve_scope(&payload.scope).await {
            Ok(employees) => employees,
            Err(e) => return JobResult::Failed(format!("cannot resolve scope: {e}")),
        };

        let batch_size = payload.batch_size.unwrap_or_else(|| kind.default_batch_size());
        let roles_ref = &roles;
        let tracker_ref = &tracker;
        let outcome = BatchScheduler::new(batch_size)
            .run(
                employees,
                |employee| async move { self.process_employee(&employee, roles_ref).await },
                |snapshot| async move { tracker_ref.record_progress(&snapshot).await },
            )
            .await;

        match tracker.finish(&outcome).await {
            Ok(()) => JobResult::Success,
            Err(e) => JobResult::Failed(format!("cannot finalize session: {e}")),
        }
    }
}
