//! Session progress tracking for bulk jobs.
//!
//! The tracker is the single writer of ledger progress during a job run:
//! it pushes batch counters into the session row and picks the terminal
//! status when the run ends.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use xlsmart_core::{Error, Result, SessionProgress, SessionRepository, SessionStatus};

use crate::batch::BatchOutcome;

/// Tracks a single session through a bulk-job run.
pub struct SessionTracker {
    sessions: Arc<dyn SessionRepository>,
    session_id: Uuid,
}

impl SessionTracker {
    pub fn new(sessions: Arc<dyn SessionRepository>, session_id: Uuid) -> Self {
        Self {
            sessions,
            session_id,
        }
    }

    /// The session being tracked.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Move the session into the given running phase.
    pub async fn begin_phase(&self, status: SessionStatus) -> Result<()> {
        self.sessions.set_status(self.session_id, status).await
    }

    /// Write batch counters into the ledger.
    ///
    /// A failed progress write is logged but never aborts the run; the
    /// next batch will overwrite with fresher counters anyway.
    pub async fn record_progress(&self, outcome: &BatchOutcome) {
        let progress = Self::to_progress(outcome);
        if let Err(e) = self
            .sessions
            .update_progress(self.session_id, &progress)
            .await
        {
            warn!(
                session_id = %self.session_id,
                error = %e,
                "Failed to write session progress"
            );
        }
    }

    /// Finalize the session from the run outcome.
    ///
    /// - no errors: `completed`
    /// - some errors, some successes: `completed_with_errors`
    /// - every entity failed: `failed`
    pub async fn finish(&self, outcome: &BatchOutcome) -> Result<()> {
        let (status, error_message) = if outcome.errors == 0 {
            (SessionStatus::Completed, None)
        } else if outcome.all_failed() {
            (
                SessionStatus::Failed,
                Some(format!("all {} entities failed", outcome.processed)),
            )
        } else {
            (
                SessionStatus::CompletedWithErrors,
                Some(format!(
                    "{} of {} entities failed",
                    outcome.errors, outcome.processed
                )),
            )
        };

        info!(
            session_id = %self.session_id,
            %status,
            processed = outcome.processed,
            errors = outcome.errors,
            "Finalizing session"
        );

        self.sessions
            .finalize(self.session_id, status, error_message.as_deref())
            .await
    }

    /// Finalize the session as failed with an explicit message (fatal
    /// setup errors, retry exhaustion).
    pub async fn fail(&self, message: &str) {
        match self
            .sessions
            .finalize(self.session_id, SessionStatus::Failed, Some(message))
            .await
        {
            Ok(()) => {}
            // Already-terminal sessions are fine here; anything else is not.
            Err(Error::SessionState(_)) => {}
            Err(e) => {
                error!(
                    session_id = %self.session_id,
                    error = %e,
                    "Failed to finalize session as failed"
                );
            }
        }
    }

    fn to_progress(outcome: &BatchOutcome) -> SessionProgress {
        SessionProgress {
            processed: outcome.processed,
            completed: outcome.completed,
            errors: outcome.errors,
            error_details: outcome.error_details.clone(),
            started_at: None,
            updated_at: Some(Utc::now()),
        }
    }
}
