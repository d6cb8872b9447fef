//! Role-standardization handler: map raw position titles onto the catalog.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use xlsmart_core::{confidence, defaults, AnalysisKind, NewRoleMapping, StandardRole};
use xlsmart_inference::repair::parse_llm_json;

use crate::batch::BatchScheduler;
use crate::handler::{BulkJobHandler, JobContext, JobResult};
use crate::intake::JobPayload;
use crate::prompts;
use crate::tracker::SessionTracker;

use super::HandlerDeps;

/// Model verdict for one raw-title mapping.
#[derive(Debug, Deserialize)]
struct StandardizationVerdict {
    #[serde(default)]
    role_id: String,
    #[serde(default)]
    confidence: f32,
}

impl StandardizationVerdict {
    fn is_no_match(&self) -> bool {
        let id = self.role_id.trim();
        id.is_empty() || id.eq_ignore_ascii_case("no_match")
    }
}

/// Maps the distinct raw position titles in scope onto catalog roles.
///
/// The unit of work is a title, not an employee: duplicates collapse, so
/// the processed count is at most the session's total_rows. A NO_MATCH
/// verdict is a successful outcome with no mapping row; the stored
/// standardized title always comes from the catalog, never from the model.
pub struct RoleStandardizationHandler {
    deps: HandlerDeps,
}

impl RoleStandardizationHandler {
    pub fn new(deps: HandlerDeps) -> Self {
        Self { deps }
    }

    async fn process_title(&self, title: &str, roles: &[StandardRole]) -> Result<(), String> {
        let prompt = prompts::role_standardization_prompt(title, roles);
        let raw = self
            .deps
            .gateway
            .complete(
                &prompt.system,
                &prompt.user,
                defaults::GATEWAY_MAX_COMPLETION_TOKENS,
            )
            .await
            .map_err(|e| format!("{title:?}: gateway: {e}"))?;

        let verdict: StandardizationVerdict =
            parse_llm_json(&raw).map_err(|e| format!("{title:?}: unparseable verdict: {e}"))?;

        if verdict.is_no_match() {
            info!("No catalog match for title {title:?}");
            return Ok(());
        }

        let role_id = Uuid::parse_str(verdict.role_id.trim())
            .map_err(|_| format!("{title:?}: verdict role id {:?} is not a uuid", verdict.role_id))?;
        let role = roles
            .iter()
            .find(|r| r.id == role_id)
            .ok_or_else(|| format!("{title:?}: verdict role id {role_id} is not in the catalog"))?;

        let conf = confidence::normalize_confidence(verdict.confidence);
        self.deps
            .mappings
            .insert(NewRoleMapping {
                original_role_title: title.to_string(),
                standardized_role_title: role.role_title.clone(),
                standard_role_id: Some(role.id),
                mapping_confidence: conf,
                mapping_status: confidence::initial_mapping_status(conf),
                requires_manual_review: confidence::requires_manual_review(conf),
            })
            .await
            .map_err(|e| format!("{title:?}: {e}"))?;

        debug!("Mapped {title:?} onto {} (confidence {conf:.1})", role.role_title);
        Ok(())
    }
}

#[async_trait]
impl BulkJobHandler for RoleStandardizationHandler {
    fn kind(&self) -> AnalysisKind {
        AnalysisKind::RoleStandardization
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

        // Distinct non-empty titles, in a stable order.
        let titles: Vec<String> = employees
            .into_iter()
            .map(|e| e.position.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let batch_size = payload.batch_size.unwrap_or_else(|| kind.default_batch_size());
        let roles_ref = &roles;
        let tracker_ref = &tracker;
        let outcome = BatchScheduler::new(batch_size)
            .run(
                titles,
                |title| async move { self.process_title(&title, roles_ref).await },
                |snapshot| async move { tracker_ref.record_progress(&snapshot).await },
            )
            .await;

        match tracker.finish(&outcome).await {
            Ok(()) => JobResult::Success,
            Err(e) => JobResult::Failed(format!("cannot finalize session: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        test_employee, test_role, InMemoryAnalysisResults, InMemoryEmployees, InMemoryMappings,
        InMemoryRoles, InMemorySessions,
    };
    use std::sync::Arc;
    use xlsmart_core::{
        BulkJob, BulkJobStatus, EntityScope, SessionRepository, SessionStatus,
    };
    use xlsmart_inference::MockGateway;

    async fn run_with(
        employees: Vec<xlsmart_core::Employee>,
        roles: Vec<xlsmart_core::StandardRole>,
        gateway: MockGateway,
    ) -> (JobResult, Arc<InMemorySessions>, Arc<InMemoryMappings>, uuid::Uuid) {
        let sessions = Arc::new(InMemorySessions::default());
        let mappings = Arc::new(InMemoryMappings::default());
        let total = employees.len() as i64;
        let deps = HandlerDeps {
            employees: Arc::new(InMemoryEmployees::with_employees(employees)),
            roles: Arc::new(InMemoryRoles::with_roles(roles)),
            mappings: mappings.clone(),
            sessions: sessions.clone(),
            analysis: Arc::new(InMemoryAnalysisResults::default()),
            gateway: Arc::new(gateway),
        };

        let session = sessions
            .create("standardization run", total, SessionStatus::Processing)
            .await
            .unwrap();
        let job = BulkJob {
            id: xlsmart_core::new_v7(),
            session_id: session.id,
            kind: AnalysisKind::RoleStandardization,
            status: BulkJobStatus::Running,
            payload: serde_json::to_value(JobPayload {
                scope: EntityScope::All,
                batch_size: None,
            })
            .unwrap(),
            error_message: None,
            retry_count: 0,
            max_retries: 1,
            created_at: chrono::Utc::now(),
            started_at: Some(chrono::Utc::now()),
            completed_at: None,
        };

        let handler = RoleStandardizationHandler::new(deps);
        let result = handler.execute(JobContext::new(job)).await;
        (result, sessions, mappings, session.id)
    }

    #[tokio::test]
    async fn duplicate_titles_collapse_to_one_unit_of_work() {
        let role = test_role("Network Engineer");
        let mut employees: Vec<_> = (0..3).map(test_employee).collect();
        for e in &mut employees {
            e.position = "Sr. Ntwk Eng".to_string();
        }

        let gateway = MockGateway::new().with_default_response(format!(
            r#"{{"role_id": "{}", "standardized_title": "Network Engineer", "confidence": 90}}"#,
            role.id
        ));

        let (result, sessions, mappings, session_id) =
            run_with(employees, vec![role.clone()], gateway).await;
        assert!(matches!(result, JobResult::Success));

        // Three employees, one distinct title, one mapping row.
        let inserted = mappings.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].original_role_title, "Sr. Ntwk Eng");
        assert_eq!(inserted[0].standardized_role_title, "Network Engineer");

        let session = sessions.get(session_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.progress.processed, 1);
        assert!(session.progress.processed <= session.total_rows);
    }

    #[tokio::test]
    async fn catalog_title_wins_over_model_claim() {
        let role = test_role("Network Engineer");
        let mut employee = test_employee(1);
        employee.position = "Ntwk Guru".to_string();

        // The model invents its own standardized title; the catalog's wins.
        let gateway = MockGateway::new().with_default_response(format!(
            r#"{{"role_id": "{}", "standardized_title": "Supreme Network Wizard", "confidence": 85}}"#,
            role.id
        ));

        let (result, _, mappings, _) = run_with(vec![employee], vec![role], gateway).await;
        assert!(matches!(result, JobResult::Success));
        assert_eq!(
            mappings.inserted.lock().unwrap()[0].standardized_role_title,
            "Network Engineer"
        );
    }

    #[tokio::test]
    async fn no_match_title_produces_no_mapping() {
        let mut employee = test_employee(1);
        employee.position = "Astronaut".to_string();

        let gateway = MockGateway::new().with_default_response(
            r#"{"role_id": "NO_MATCH", "standardized_title": "", "confidence": 0}"#,
        );

        let (result, sessions, mappings, session_id) =
            run_with(vec![employee], vec![test_role("Network Engineer")], gateway).await;
        assert!(matches!(result, JobResult::Success));
        assert!(mappings.inserted.lock().unwrap().is_empty());

        let session = sessions.get(session_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn empty_titles_are_skipped_entirely() {
        let mut employee = test_employee(1);
        employee.position = "   ".to_string();

        let gateway = MockGateway::always_failing();
        let (result, sessions, _, session_id) =
            run_with(vec![employee], vec![test_role("Network Engineer")], gateway).await;

        // No title to process means a trivially clean run (and the
        // failing gateway proves it was never called).
        assert!(matches!(result, JobResult::Success));
        let session = sessions.get(session_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.progress.processed, 0);
    }
}
