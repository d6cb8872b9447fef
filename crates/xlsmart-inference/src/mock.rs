//! Mock gateway backend for deterministic testing.
//!
//! Scripts completions by prompt substring, records every call for
//! assertion, and can inject failures to exercise error paths.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use xlsmart_core::{CompletionBackend, Error, Result};

/// Mock completion backend for testing.
#[derive(Clone)]
pub struct MockGateway {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    default_response: String,
    scripted: Vec<(String, String)>,
    fail_after: Option<usize>,
    failure_message: String,
}

/// A recorded completion call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            default_response: "{}".to_string(),
            scripted: Vec::new(),
            fail_after: None,
            failure_message: "mock gateway failure".to_string(),
        }
    }
}

impl MockGateway {
    /// Create a mock that answers `{}` to everything.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the response returned when no scripted match applies.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Return `response` whenever the user prompt contains `substring`.
    /// Scripted entries are checked in insertion order.
    pub fn with_scripted_response(
        mut self,
        substring: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .scripted
            .push((substring.into(), response.into()));
        self
    }

    /// Fail every call after the first `n` successes.
    pub fn with_failure_after(mut self, n: usize) -> Self {
        Arc::make_mut(&mut self.config).fail_after = Some(n);
        self
    }

    /// Fail every call.
    pub fn always_failing() -> Self {
        Self::new().with_failure_after(0)
    }

    /// Get all recorded calls for assertion.
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Number of completion calls made so far.
    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for MockGateway {
    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let call_index = {
            let mut log = self.call_log.lock().unwrap();
            log.push(MockCall {
                system: system.to_string(),
                user: user.to_string(),
                max_tokens,
            });
            log.len() - 1
        };

        if let Some(n) = self.config.fail_after {
            if call_index >= n {
                return Err(Error::Inference(self.config.failure_message.clone()));
            }
        }

        for (substring, response) in &self.config.scripted {
            if user.contains(substring.as_str()) {
                return Ok(response.clone());
            }
        }

        Ok(self.config.default_response.clone())
    }

    fn model_name(&self) -> &str {
        "mock-gateway"
    }
}
