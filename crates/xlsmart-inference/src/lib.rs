//! # xlsmart-inference
//!
//! LLM gateway client for the XLSMART analysis backend.
//!
//! This crate provides:
//! - [`GatewayClient`], an OpenAI-compatible chat-completions client
//! - [`GatewayConfig`], explicit configuration built from the environment
//! - [`repair`], staged parsing of imperfect LLM JSON output into typed
//!   result structs with explicit fallback semantics
//! - [`MockGateway`], a scripted backend for tests

pub mod config;
pub mod gateway;
pub mod mock;
pub mod repair;
pub mod types;

pub use config::GatewayConfig;
pub use gateway::GatewayClient;
pub use mock::MockGateway;
pub use repair::{parse_llm_json, parse_llm_json_or, strip_markdown_fences};

// Re-export the backend seam
pub use xlsmart_core::CompletionBackend;
