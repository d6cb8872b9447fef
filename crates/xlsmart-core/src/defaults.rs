//! Centralized default constants for the XLSMART analysis backend.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// BATCH PROCESSING
// =============================================================================

/// Default number of entities processed concurrently per batch.
pub const BATCH_SIZE: usize = 10;

/// Fixed delay between batches in milliseconds.
///
/// The only throttling control toward the LLM gateway; there is no
/// backoff or circuit breaker by design.
pub const BATCH_DELAY_MS: u64 = 2_000;

/// Maximum error detail messages retained on a session (newest kept).
pub const MAX_ERROR_DETAILS: usize = 20;

/// Rough per-entity processing estimate in seconds, used for the
/// `estimated_duration_secs` figure returned at job intake.
pub const PER_ENTITY_ESTIMATE_SECS: u64 = 3;

// =============================================================================
// JOB QUEUE
// =============================================================================

/// Default maximum retry count for failed bulk jobs.
pub const JOB_MAX_RETRIES: i32 = 1;

/// Default job worker poll interval in milliseconds (queue empty).
pub const JOB_POLL_INTERVAL_MS: u64 = 500;

/// Default maximum concurrent bulk jobs per worker.
pub const JOB_MAX_CONCURRENT: usize = 2;

/// Default bulk job execution timeout in seconds (30 minutes — bulk jobs
/// over large departments are slow by construction).
pub const JOB_TIMEOUT_SECS: u64 = 1_800;

// =============================================================================
// LLM GATEWAY
// =============================================================================

/// Default chat-completions request timeout in seconds.
pub const GATEWAY_TIMEOUT_SECS: u64 = 30;

/// Default model identifier sent to the gateway.
pub const GATEWAY_MODEL: &str = "gpt-4o-mini";

/// Default sampling temperature.
pub const GATEWAY_TEMPERATURE: f32 = 0.3;

/// Default completion-token cap per request.
pub const GATEWAY_MAX_COMPLETION_TOKENS: u32 = 1_500;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// SESSIONS
// =============================================================================

/// Default page size when listing recent sessions.
pub const SESSION_LIST_LIMIT: i64 = 50;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_within_observed_range() {
        const {
            assert!(BATCH_SIZE >= 5 && BATCH_SIZE <= 15);
        }
    }

    #[test]
    fn batch_delay_within_observed_range() {
        // The legacy functions slept 1–3 seconds between batches
        const {
            assert!(BATCH_DELAY_MS >= 1_000 && BATCH_DELAY_MS <= 3_000);
        }
    }

    #[test]
    fn job_timeout_exceeds_gateway_timeout() {
        const {
            assert!(JOB_TIMEOUT_SECS > GATEWAY_TIMEOUT_SECS);
        }
    }
}
