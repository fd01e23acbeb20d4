//! Mock classifier backend for testing
//!
//! Returns canned responses per model without any network access. Useful for:
//! - Unit testing validation and the primary-key policy
//! - Pipeline tests that need deterministic classifications
//! - Simulating transient failures to exercise the retry loop
//!
//! ## Usage
//!
//! ```rust,ignore
//! use semview_classifier::{MockClassifierBackend, MockClassifierBackendBuilder};
//! use semview_core::Classification::*;
//!
//! let backend = MockClassifierBackendBuilder::new()
//!     .with_response("customers", MockClassifierBackend::response_for(&[
//!         ("customer_id", Dimension),
//!         ("total_revenue", Fact),
//!     ]))
//!     .build();
//! ```
//!
//! Each model holds a queue of outcomes. Outcomes are consumed in order and
//! the last one repeats, so `[error, error, response]` fails twice and then
//! keeps succeeding.

use crate::backend::{ClassificationRequest, ClassifierBackend, ClassifierError};
use semview_core::Classification;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

type Outcome = Result<String, ClassifierError>;

/// Mock classification backend
pub struct MockClassifierBackend {
    /// Queued outcomes by model name
    outcomes: Arc<RwLock<HashMap<String, VecDeque<Outcome>>>>,

    /// Calls received by model name
    calls: Arc<RwLock<HashMap<String, usize>>>,

    /// Outcome for models without a queue
    default_outcome: Option<Outcome>,
}

impl MockClassifierBackend {
    /// Create a mock with no canned outcomes
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(HashMap::new())),
            default_outcome: None,
        }
    }

    /// Queue a response for a model
    pub async fn push_response(&self, model: &str, content: impl Into<String>) {
        self.push(model, Ok(content.into())).await;
    }

    /// Queue an error for a model
    pub async fn push_error(&self, model: &str, error: ClassifierError) {
        self.push(model, Err(error)).await;
    }

    async fn push(&self, model: &str, outcome: Outcome) {
        self.outcomes
            .write()
            .await
            .entry(model.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Number of calls made for a model
    pub async fn call_count(&self, model: &str) -> usize {
        self.calls.read().await.get(model).copied().unwrap_or(0)
    }

    /// Number of calls across all models
    pub async fn total_calls(&self) -> usize {
        self.calls.read().await.values().sum()
    }

    /// Build a well-formed response body classifying the given columns
    pub fn response_for(columns: &[(&str, Classification)]) -> String {
        let entries: serde_json::Map<String, serde_json::Value> = columns
            .iter()
            .map(|(name, classification)| {
                (
                    name.to_string(),
                    serde_json::json!({
                        "type": classification.as_str(),
                        "comment": format!("The {} column", name.replace('_', " ")),
                    }),
                )
            })
            .collect();

        serde_json::json!({ "primary_keys": [], "columns": entries }).to_string()
    }
}

impl Default for MockClassifierBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockClassifierBackend {
    fn clone(&self) -> Self {
        Self {
            outcomes: Arc::clone(&self.outcomes),
            calls: Arc::clone(&self.calls),
            default_outcome: self.default_outcome.clone(),
        }
    }
}

#[async_trait::async_trait]
impl ClassifierBackend for MockClassifierBackend {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn complete(&self, request: &ClassificationRequest) -> Result<String, ClassifierError> {
        *self.calls.write().await.entry(request.model.clone()).or_default() += 1;

        let mut outcomes = self.outcomes.write().await;
        let queued = outcomes.get_mut(&request.model).and_then(|queue| {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        });

        queued
            .or_else(|| self.default_outcome.clone())
            .unwrap_or_else(|| {
                Err(ClassifierError::RequestRejected {
                    status: 404,
                    message: format!("no canned response for model {}", request.model),
                })
            })
    }
}

/// Builder for creating MockClassifierBackend with canned outcomes
pub struct MockClassifierBackendBuilder {
    outcomes: HashMap<String, VecDeque<Outcome>>,
    default_outcome: Option<Outcome>,
}

impl MockClassifierBackendBuilder {
    pub fn new() -> Self {
        Self {
            outcomes: HashMap::new(),
            default_outcome: None,
        }
    }

    /// Queue a response for a model
    pub fn with_response(mut self, model: &str, content: impl Into<String>) -> Self {
        self.outcomes.entry(model.to_string()).or_default().push_back(Ok(content.into()));
        self
    }

    /// Queue an error for a model
    pub fn with_error(mut self, model: &str, error: ClassifierError) -> Self {
        self.outcomes.entry(model.to_string()).or_default().push_back(Err(error));
        self
    }

    /// Response for models without a queue
    pub fn with_default_response(mut self, content: impl Into<String>) -> Self {
        self.default_outcome = Some(Ok(content.into()));
        self
    }

    pub fn build(self) -> MockClassifierBackend {
        MockClassifierBackend {
            outcomes: Arc::new(RwLock::new(self.outcomes)),
            calls: Arc::new(RwLock::new(HashMap::new())),
            default_outcome: self.default_outcome,
        }
    }
}

impl Default for MockClassifierBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}
