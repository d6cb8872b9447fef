//! # xlsmart-core
//!
//! Core types, traits, and abstractions for the XLSMART bulk analysis
//! backend.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other xlsmart crates depend on: employee and
//! role models, the upload-session ledger state machine, the bulk job
//! queue types, and the repository/inference seams.

pub mod confidence;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use confidence::{normalize_confidence, requires_manual_review, MANUAL_REVIEW_THRESHOLD};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use uuid_utils::new_v7;
