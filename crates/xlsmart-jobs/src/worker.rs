//! Bulk-job worker: claims queued jobs and drives registered handlers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use xlsmart_core::{
    defaults, AnalysisKind, BulkJob, BulkJobRepository, BulkJobStatus, Result, SessionRepository,
};

use crate::handler::{BulkJobHandler, JobContext, JobResult};
use crate::tracker::SessionTracker;

/// Configuration for the bulk-job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds when the queue is empty.
    pub poll_interval_ms: u64,
    /// Maximum number of concurrently executing jobs.
    pub max_concurrent_jobs: usize,
    /// Whether to process jobs at all.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::JOB_POLL_INTERVAL_MS,
            max_concurrent_jobs: defaults::JOB_MAX_CONCURRENT,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `JOB_MAX_CONCURRENT` | `2` | Max concurrent bulk jobs |
    /// | `JOB_POLL_INTERVAL_MS` | `500` | Polling interval when queue is empty |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent_jobs = std::env::var("JOB_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::JOB_MAX_CONCURRENT)
            .max(1);

        let poll_interval_ms = std::env::var("JOB_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_POLL_INTERVAL_MS);

        Self {
            poll_interval_ms,
            max_concurrent_jobs,
            enabled,
        }
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set maximum concurrent jobs.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the bulk-job worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A job was claimed and handed to a handler.
    JobStarted { job_id: Uuid, kind: AnalysisKind },
    /// A job completed successfully.
    JobCompleted { job_id: Uuid, kind: AnalysisKind },
    /// A job failed (it may still be requeued for retry).
    JobFailed {
        job_id: Uuid,
        kind: AnalysisKind,
        error: String,
    },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| xlsmart_core::Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Worker that pulls bulk jobs off the durable queue and runs them.
pub struct JobWorker {
    jobs: Arc<dyn BulkJobRepository>,
    sessions: Arc<dyn SessionRepository>,
    config: WorkerConfig,
    handlers: Arc<RwLock<HashMap<AnalysisKind, Arc<dyn BulkJobHandler>>>>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorker {
    pub fn new(
        jobs: Arc<dyn BulkJobRepository>,
        sessions: Arc<dyn SessionRepository>,
        config: WorkerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            jobs,
            sessions,
            config,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
        }
    }

    /// Register a handler for an analysis kind.
    pub async fn register_handler<H: BulkJobHandler + 'static>(&self, handler: H) {
        let kind = handler.kind();
        let mut handlers = self.handlers.write().await;
        handlers.insert(kind, Arc::new(handler));
        debug!(?kind, "Registered bulk-job handler");
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let worker = Arc::new(self);
        tokio::spawn(async move {
            worker.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Run the worker loop with concurrent job processing.
    ///
    /// Claims up to `max_concurrent_jobs` at a time and processes them
    /// concurrently. Only sleeps when the queue is empty.
    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Bulk-job worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.config.max_concurrent_jobs,
            "Bulk-job worker started"
        );

        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Bulk-job worker received shutdown signal");
                break;
            }

            let mut claimed = 0;
            let mut tasks = tokio::task::JoinSet::new();

            for _ in 0..self.config.max_concurrent_jobs {
                match self.claim_job().await {
                    Some(job) => {
                        claimed += 1;
                        let worker = self.clone_refs();
                        tasks.spawn(async move {
                            worker.execute_job(job).await;
                        });
                    }
                    None => break,
                }
            }

            if claimed == 0 {
                // Queue empty, sleep before polling again
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Bulk-job worker received shutdown signal");
                        break;
                    }
                    _ = sleep(poll_interval) => {}
                }
            } else {
                debug!(claimed, "Processing concurrent bulk-job batch");
                while let Some(result) = tasks.join_next().await {
                    if let Err(e) = result {
                        error!(error = ?e, "Bulk-job task panicked");
                    }
                }
                // No sleep: immediately try to claim more jobs
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Bulk-job worker stopped");
    }

    /// Claim the next available job without processing it.
    async fn claim_job(&self) -> Option<BulkJob> {
        match self.jobs.claim_next().await {
            Ok(Some(job)) => Some(job),
            Ok(None) => None,
            Err(e) => {
                error!(error = ?e, "Failed to claim bulk job");
                None
            }
        }
    }

    /// Clone references needed for spawned job tasks.
    fn clone_refs(&self) -> JobWorkerRef {
        JobWorkerRef {
            jobs: self.jobs.clone(),
            sessions: self.sessions.clone(),
            handlers: self.handlers.clone(),
            event_tx: self.event_tx.clone(),
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Get the pending job count.
    pub async fn pending_count(&self) -> Result<i64> {
        self.jobs.pending_count().await
    }
}

/// Lightweight reference bundle for executing a single job in a spawned task.
struct JobWorkerRef {
    jobs: Arc<dyn BulkJobRepository>,
    sessions: Arc<dyn SessionRepository>,
    handlers: Arc<RwLock<HashMap<AnalysisKind, Arc<dyn BulkJobHandler>>>>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorkerRef {
    /// Execute a single claimed job.
    async fn execute_job(self, job: BulkJob) {
        let start = Instant::now();
        let job_id = job.id;
        let kind = job.kind;
        let session_id = job.session_id;

        info!(%job_id, ?kind, %session_id, "Processing bulk job");

        let _ = self.event_tx.send(WorkerEvent::JobStarted { job_id, kind });

        let handler = {
            let handlers = self.handlers.read().await;
            handlers.get(&kind).cloned()
        };

        let result = match handler {
            Some(handler) => {
                let job_timeout = Duration::from_secs(defaults::JOB_TIMEOUT_SECS);
                match tokio::time::timeout(job_timeout, handler.execute(JobContext::new(job))).await
                {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            %job_id,
                            ?kind,
                            "Bulk job exceeded timeout of {}s",
                            defaults::JOB_TIMEOUT_SECS
                        );
                        JobResult::Failed(format!(
                            "Job exceeded timeout of {}s",
                            defaults::JOB_TIMEOUT_SECS
                        ))
                    }
                }
            }
            None => {
                warn!(?kind, "No handler registered for analysis kind");
                JobResult::Failed(format!("No handler for analysis kind: {:?}", kind))
            }
        };

        match result {
            JobResult::Success => {
                if let Err(e) = self.jobs.complete(job_id).await {
                    error!(error = ?e, %job_id, "Failed to mark bulk job as completed");
                } else {
                    info!(
                        %job_id,
                        ?kind,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Bulk job completed"
                    );
                    let _ = self.event_tx.send(WorkerEvent::JobCompleted { job_id, kind });
                }
            }
            JobResult::Failed(error) => {
                if let Err(e) = self.jobs.fail(job_id, &error).await {
                    error!(error = ?e, %job_id, "Failed to mark bulk job as failed");
                } else {
                    warn!(
                        %job_id,
                        ?kind,
                        %error,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Bulk job failed"
                    );
                    self.finalize_if_exhausted(job_id, session_id, &error).await;
                    let _ = self.event_tx.send(WorkerEvent::JobFailed {
                        job_id,
                        kind,
                        error,
                    });
                }
            }
        }
    }

    /// If the job has run out of retries, make sure its session ends up
    /// terminal rather than stuck in a running phase forever.
    async fn finalize_if_exhausted(&self, job_id: Uuid, session_id: Uuid, error: &str) {
        let exhausted = match self.jobs.get(job_id).await {
            Ok(Some(job)) => job.status == BulkJobStatus::Failed,
            Ok(None) => false,
            Err(e) => {
                error!(error = ?e, %job_id, "Failed to re-read bulk job after failure");
                false
            }
        };
        if !exhausted {
            return;
        }

        // The handler may already have finalized it; fail() tolerates that.
        SessionTracker::new(self.sessions.clone(), session_id)
            .fail(error)
            .await;
        warn!(%session_id, %job_id, "Session marked failed after retry exhaustion");
    }
}

/// Builder for creating a worker with handlers.
pub struct WorkerBuilder {
    jobs: Arc<dyn BulkJobRepository>,
    sessions: Arc<dyn SessionRepository>,
    config: WorkerConfig,
    handlers: Vec<Box<dyn BulkJobHandler>>,
}

impl WorkerBuilder {
    pub fn new(jobs: Arc<dyn BulkJobRepository>, sessions: Arc<dyn SessionRepository>) -> Self {
        Self {
            jobs,
            sessions,
            config: WorkerConfig::default(),
            handlers: Vec::new(),
        }
    }

    /// Set the worker configuration.
    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a handler.
    pub fn with_handler<H: BulkJobHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Build and return the worker.
    pub async fn build(self) -> JobWorker {
        let worker = JobWorker::new(self.jobs, self.sessions, self.config);

        for handler in self.handlers {
            let kind = handler.kind();
            let mut handlers = worker.handlers.write().await;
            handlers.insert(kind, Arc::from(handler));
        }

        worker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryJobs, InMemorySessions};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use xlsmart_core::SessionStatus;

    #[test]
    fn worker_config_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval_ms, defaults::JOB_POLL_INTERVAL_MS);
        assert_eq!(config.max_concurrent_jobs, defaults::JOB_MAX_CONCURRENT);
        assert!(config.enabled);
    }

    #[test]
    fn worker_config_builder_chains() {
        let config = WorkerConfig::default()
            .with_poll_interval(50)
            .with_max_concurrent(8)
            .with_enabled(false);

        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.max_concurrent_jobs, 8);
        assert!(!config.enabled);
    }

    struct CountingHandler {
        kind: AnalysisKind,
        calls: Arc<AtomicUsize>,
        result: fn() -> JobResult,
    }

    #[async_trait]
    impl BulkJobHandler for CountingHandler {
        fn kind(&self) -> AnalysisKind {
            self.kind
        }

        async fn execute(&self, _ctx: JobContext) -> JobResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    async fn wait_for<F: Fn() -> bool>(predicate: F) {
        for _ in 0..200 {
            if predicate() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within 2s");
    }

    #[tokio::test]
    async fn worker_completes_queued_job() {
        let jobs = Arc::new(InMemoryJobs::default());
        let sessions = Arc::new(InMemorySessions::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let session = sessions
            .create("run", 1, SessionStatus::Processing)
            .await
            .unwrap();
        let job_id = jobs
            .queue(session.id, AnalysisKind::CareerPath, json!({}))
            .await
            .unwrap();

        let worker = WorkerBuilder::new(jobs.clone(), sessions.clone())
            .with_config(WorkerConfig::default().with_poll_interval(10))
            .with_handler(CountingHandler {
                kind: AnalysisKind::CareerPath,
                calls: calls.clone(),
                result: || JobResult::Success,
            })
            .build()
            .await;
        let handle = worker.start();

        let jobs_ref = jobs.clone();
        wait_for(move || {
            jobs_ref
                .jobs
                .lock()
                .unwrap()
                .iter()
                .any(|j| j.id == job_id && j.status == BulkJobStatus::Completed)
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn failing_job_retries_then_finalizes_session() {
        let jobs = Arc::new(InMemoryJobs::default());
        let sessions = Arc::new(InMemorySessions::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let session = sessions
            .create("run", 1, SessionStatus::Processing)
            .await
            .unwrap();
        let job_id = jobs
            .queue(session.id, AnalysisKind::RetentionPlan, json!({}))
            .await
            .unwrap();

        let worker = WorkerBuilder::new(jobs.clone(), sessions.clone())
            .with_config(WorkerConfig::default().with_poll_interval(10))
            .with_handler(CountingHandler {
                kind: AnalysisKind::RetentionPlan,
                calls: calls.clone(),
                result: || JobResult::Failed("gateway unreachable".to_string()),
            })
            .build()
            .await;
        let handle = worker.start();

        // Session finalization is the last write after retry exhaustion,
        // so waiting on it covers the job status too.
        let sessions_ref = sessions.clone();
        let session_id = session.id;
        wait_for(move || {
            sessions_ref
                .sessions
                .lock()
                .unwrap()
                .get(&session_id)
                .is_some_and(|s| s.status == SessionStatus::Failed)
        })
        .await;
        handle.shutdown().await.unwrap();

        // One initial attempt plus the configured retries.
        assert_eq!(
            calls.load(Ordering::SeqCst) as i32,
            1 + defaults::JOB_MAX_RETRIES
        );

        let job = jobs.get(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, BulkJobStatus::Failed);

        // The orphaned session was finalized, not left in a running phase.
        let final_session = sessions.get(session.id).await.unwrap().unwrap();
        assert_eq!(final_session.status, SessionStatus::Failed);
        assert_eq!(
            final_session.error_message.as_deref(),
            Some("gateway unreachable")
        );
    }

    #[tokio::test]
    async fn unhandled_kind_fails_the_job() {
        let jobs = Arc::new(InMemoryJobs::default());
        let sessions = Arc::new(InMemorySessions::default());

        let session = sessions
            .create("run", 1, SessionStatus::Processing)
            .await
            .unwrap();
        let job_id = jobs
            .queue(session.id, AnalysisKind::MobilityPlan, json!({}))
            .await
            .unwrap();

        // No handler registered at all.
        let worker = WorkerBuilder::new(jobs.clone(), sessions.clone())
            .with_config(WorkerConfig::default().with_poll_interval(10))
            .build()
            .await;
        let handle = worker.start();

        let jobs_ref = jobs.clone();
        wait_for(move || {
            jobs_ref
                .jobs
                .lock()
                .unwrap()
                .iter()
                .any(|j| j.id == job_id && j.status == BulkJobStatus::Failed)
        })
        .await;
        handle.shutdown().await.unwrap();

        let job = jobs.get(job_id).await.unwrap().unwrap();
        assert!(job
            .error_message
            .unwrap()
            .contains("No handler for analysis kind"));
    }

    #[tokio::test]
    async fn disabled_worker_leaves_queue_alone() {
        let jobs = Arc::new(InMemoryJobs::default());
        let sessions = Arc::new(InMemorySessions::default());

        let session = sessions
            .create("run", 1, SessionStatus::Processing)
            .await
            .unwrap();
        jobs.queue(session.id, AnalysisKind::CareerPath, json!({}))
            .await
            .unwrap();

        let worker = WorkerBuilder::new(jobs.clone(), sessions.clone())
            .with_config(WorkerConfig::default().with_enabled(false))
            .build()
            .await;
        let _handle = worker.start();

        sleep(Duration::from_millis(50)).await;
        assert_eq!(jobs.pending_count().await.unwrap(), 1);
    }
}
