//! Batch scheduler for bulk entity processing.
//!
//! Entities are processed in fixed-size batches: all entities within a
//! batch run concurrently, batches run strictly in sequence, and a fixed
//! delay separates consecutive batches (the only throttling toward the
//! LLM gateway). A per-entity failure is recorded and never aborts the
//! batch or the run.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;
use tracing::debug;

use xlsmart_core::defaults;

/// Running counters for a batch run.
///
/// Invariant: `completed + errors == processed` after every batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Entities accounted for so far (success or failure).
    pub processed: i64,
    /// Entities processed successfully.
    pub completed: i64,
    /// Entities that failed.
    pub errors: i64,
    /// Most recent error messages (oldest dropped beyond the cap).
    pub error_details: Vec<String>,
}

impl BatchOutcome {
    fn record(&mut self, result: Result<(), String>) {
        self.processed += 1;
        match result {
            Ok(()) => self.completed += 1,
            Err(message) => {
                self.errors += 1;
                if self.error_details.len() >= defaults::MAX_ERROR_DETAILS {
                    self.error_details.remove(0);
                }
                self.error_details.push(message);
            }
        }
    }

    /// Whether every entity failed.
    pub fn all_failed(&self) -> bool {
        self.processed > 0 && self.completed == 0
    }
}

/// Sequential batch scheduler with intra-batch concurrency.
pub struct BatchScheduler {
    batch_size: usize,
    batch_delay: Duration,
}

impl BatchScheduler {
    /// Create a scheduler with the given batch size and the default
    /// inter-batch delay.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_delay: Duration::from_millis(defaults::BATCH_DELAY_MS),
        }
    }

    /// Override the inter-batch delay.
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }

    /// Number of batches a run over `item_count` entities will take.
    pub fn batch_count(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.batch_size)
    }

    /// Process `items`, calling `after_batch` with the running counters
    /// after every batch (for ledger progress writes).
    pub async fn run<T, F, Fut, C, CFut>(
        &self,
        items: Vec<T>,
        process: F,
        mut after_batch: C,
    ) -> BatchOutcome
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<(), String>>,
        C: FnMut(BatchOutcome) -> CFut,
        CFut: Future<Output = ()>,
    {
        let total_batches = self.batch_count(items.len());
        let mut outcome = BatchOutcome::default();

        let mut iter = items.into_iter().peekable();
        let mut batch_index = 0usize;

        while iter.peek().is_some() {
            let batch: Vec<T> = iter.by_ref().take(self.batch_size).collect();
            let batch_len = batch.len();

            let results = join_all(batch.into_iter().map(&process)).await;
            for result in results {
                outcome.record(result);
            }

            debug!(
                batch_index,
                total_batches,
                batch_len,
                processed = outcome.processed,
                errors = outcome.errors,
                "Batch complete"
            );

            after_batch(outcome.clone()).await;

            batch_index += 1;
            if batch_index < total_batches {
                sleep(self.batch_delay).await;
            }
        }

        outcome
    }
}
