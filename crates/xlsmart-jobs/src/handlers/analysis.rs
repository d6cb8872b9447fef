//! Generic per-employee analysis handler for the free-text kinds.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use xlsmart_core::{defaults, AnalysisKind, Employee, NewAnalysisResult};
use xlsmart_inference::repair::parse_llm_json_or;

use crate::batch::BatchScheduler;
use crate::handler::{BulkJobHandler, JobContext, JobResult};
use crate::intake::JobPayload;
use crate::prompts;
use crate::tracker::SessionTracker;

use super::HandlerDeps;

/// Runs one of the free-text analysis kinds (career path, mobility,
/// development, training, retention) over every employee in scope.
///
/// Each employee gets one gateway call and one persisted result row.
/// Malformed JSON that survives repair degrades to a placeholder result
/// rather than failing the entity; only gateway and storage errors count
/// as entity errors.
pub struct AnalysisHandler {
    kind: AnalysisKind,
    deps: HandlerDeps,
}

impl AnalysisHandler {
    pub fn new(kind: AnalysisKind, deps: HandlerDeps) -> Self {
        Self { kind, deps }
    }

    fn degraded_result(raw: &str) -> JsonValue {
        json!({
            "summary": "analysis output could not be parsed",
            "degraded": true,
            "raw_excerpt": raw.chars().take(200).collect::<String>(),
        })
    }

    async fn process_employee(&self, session_id: Uuid, employee: &Employee) -> Result<(), String> {
        let who = &employee.employee_number;

        let prompt = prompts::analysis_prompt(self.kind, employee);
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

        let result: JsonValue = parse_llm_json_or(&raw, Self::degraded_result(&raw));

        self.deps
            .analysis
            .insert(NewAnalysisResult {
                session_id,
                analysis_kind: self.kind,
                input_parameters: json!({
                    "employee_id": employee.id,
                    "employee_number": employee.employee_number,
                }),
                analysis_result: result,
            })
            .await
            .map_err(|e| format!("{who}: {e}"))?;

        debug!("Stored {} result for {who}", self.kind.function_name());
        Ok(())
    }
}

#[async_trait]
impl BulkJobHandler for AnalysisHandler {
    fn kind(&self) -> AnalysisKind {
        self.kind
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let session_id = ctx.session_id();
        let tracker = SessionTracker::new(self.deps.sessions.clone(), session_id);

        let payload: JobPayload = match serde_json::from_value(ctx.payload().clone()) {
            Ok(payload) => payload,
            Err(e) => return JobResult::Failed(format!("invalid job payload: {e}")),
        };

        if let Err(e) = tracker.begin_phase(self.kind.running_status()).await {
            return JobResult::Failed(format!("cannot enter running phase: {e}"));
        }

        let employees = match self.deps.employees.resolve_scope(&payload.scope).await {
            Ok(employees) => employees,
            Err(e) => return JobResult::Failed(format!("cannot resolve scope: {e}")),
        };

        let batch_size = payload
            .batch_size
            .unwrap_or_else(|| self.kind.default_batch_size());
        let tracker_ref = &tracker;
        let outcome = BatchScheduler::new(batch_size)
            .run(
                employees,
                |employee| async move { self.process_employee(session_id, &employee).await },
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
        test_employee, InMemoryAnalysisResults, InMemoryEmployees, InMemoryMappings,
        InMemoryRoles, InMemorySessions,
    };
    use std::sync::Arc;
    use xlsmart_core::{
        BulkJob, BulkJobStatus, EntityScope, SessionRepository, SessionStatus,
    };
    use xlsmart_inference::MockGateway;

    struct Harness {
        results: Arc<InMemoryAnalysisResults>,
        sessions: Arc<InMemorySessions>,
        session_id: Uuid,
        result: JobResult,
    }

    async fn run(
        kind: AnalysisKind,
        employees: Vec<xlsmart_core::Employee>,
        gateway: MockGateway,
    ) -> Harness {
        let sessions = Arc::new(InMemorySessions::default());
        let results = Arc::new(InMemoryAnalysisResults::default());
        let total = employees.len() as i64;
        let deps = HandlerDeps {
            employees: Arc::new(InMemoryEmployees::with_employees(employees)),
            roles: Arc::new(InMemoryRoles::default()),
            mappings: Arc::new(InMemoryMappings::default()),
            sessions: sessions.clone(),
            analysis: results.clone(),
            gateway: Arc::new(gateway),
        };

        let session = sessions
            .create("analysis run", total, SessionStatus::Processing)
            .await
            .unwrap();
        let job = BulkJob {
            id: xlsmart_core::new_v7(),
            session_id: session.id,
            kind,
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

        let result = AnalysisHandler::new(kind, deps)
            .execute(JobContext::new(job))
            .await;
        Harness {
            results,
            sessions,
            session_id: session.id,
            result,
        }
    }

    #[tokio::test]
    async fn stores_one_result_row_per_employee() {
        let employees: Vec<_> = (0..3).map(test_employee).collect();
        let ids: Vec<_> = employees.iter().map(|e| e.id).collect();
        let gateway = MockGateway::new().with_default_response(
            r#"{"current_role": "Network Ops", "recommended_path": ["Senior Ops"], "key_strengths": [], "summary": "solid"}"#,
        );

        let h = run(AnalysisKind::CareerPath, employees, gateway).await;
        assert!(matches!(h.result, JobResult::Success));

        let inserted = h.results.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 3);
        for row in inserted.iter() {
            assert_eq!(row.session_id, h.session_id);
            assert_eq!(row.analysis_kind, AnalysisKind::CareerPath);
            assert_eq!(row.analysis_result["summary"], "solid");
            assert!(ids.contains(
                &row.input_parameters["employee_id"]
                    .as_str()
                    .unwrap()
                    .parse()
                    .unwrap()
            ));
        }

        let session = h.sessions.get(h.session_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.progress.completed, 3);
    }

    #[tokio::test]
    async fn unparseable_output_degrades_instead_of_failing() {
        let gateway =
            MockGateway::new().with_default_response("I'm sorry, I cannot produce JSON today.");

        let h = run(AnalysisKind::RetentionPlan, vec![test_employee(1)], gateway).await;
        assert!(matches!(h.result, JobResult::Success));

        let inserted = h.results.inserted.lock().unwrap();
        assert_eq!(inserted.len(), 1);
        assert_eq!(inserted[0].analysis_result["degraded"], true);

        // Degraded parses still count as completed entities.
        let session = h.sessions.get(h.session_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.progress.errors, 0);
    }

    #[tokio::test]
    async fn gateway_outage_fails_entities_and_session() {
        let h = run(
            AnalysisKind::MobilityPlan,
            vec![test_employee(1), test_employee(2)],
            MockGateway::always_failing(),
        )
        .await;
        assert!(matches!(h.result, JobResult::Success));
        assert!(h.results.inserted.lock().unwrap().is_empty());

        let session = h.sessions.get(h.session_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.progress.errors, 2);
        assert!(session.progress.is_consistent());
    }

    #[tokio::test]
    async fn partial_gateway_failure_completes_with_errors() {
        let employees = vec![test_employee(1), test_employee(2)];
        let gateway = MockGateway::new()
            .with_default_response(r#"{"summary": "ok"}"#)
            .with_failure_after(1);

        let h = run(AnalysisKind::TrainingAnalysis, employees, gateway).await;
        assert!(matches!(h.result, JobResult::Success));

        let session = h.sessions.get(h.session_id).await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::CompletedWithErrors);
        assert_eq!(session.progress.processed, 2);
        assert_eq!(session.progress.completed, 1);
        assert_eq!(session.progress.errors, 1);
        assert!(session.progress.is_consistent());
        assert!(session
            .error_message
            .as_deref()
            .unwrap()
            .contains("1 of 2 entities failed"));
    }
}
