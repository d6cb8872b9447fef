//! # xlsmart-jobs
//!
//! Bulk analysis job runner for the XLSMART analysis backend.
//!
//! This crate provides:
//! - [`JobIntake`], the synchronous half of a bulk run: scope validation,
//!   session creation, and durable queueing
//! - [`JobWorker`], which claims queued jobs and drives registered
//!   handlers with bounded concurrency
//! - [`BatchScheduler`], sequential batches with intra-batch concurrency
//!   and a fixed inter-batch delay
//! - [`SessionTracker`], the single writer of ledger progress during a run
//! - [`handlers`], one handler per analysis kind
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use xlsmart_jobs::{handlers, JobIntake, WorkerBuilder, WorkerConfig};
//!
//! let worker = WorkerBuilder::new(jobs.clone(), sessions.clone())
//!     .with_config(WorkerConfig::from_env())
//!     .build()
//!     .await;
//! handlers::register_all(&worker, deps).await;
//! let handle = worker.start();
//! ```

pub mod batch;
pub mod handler;
pub mod handlers;
pub mod intake;
pub mod prompts;
pub mod testing;
pub mod tracker;
pub mod worker;

pub use batch::{BatchOutcome, BatchScheduler};
pub use handler::{BulkJobHandler, JobContext, JobResult, NoOpHandler};
pub use handlers::HandlerDeps;
pub use intake::{estimate_duration_secs, IntakeReceipt, JobIntake, JobPayload};
pub use tracker::SessionTracker;
pub use worker::{JobWorker, WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle};
