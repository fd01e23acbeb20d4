//! Classifier client
//!
//! Ties a backend to the prompt, retry loop, response validation and
//! primary-key policy. One call classifies every column of one model.

use crate::backend::{ClassifierBackend, ClassifierError};
use crate::primary_key::apply_primary_key;
use crate::prompt::build_request;
use crate::response::validate_response;
use crate::retry::with_retry;
use semview_core::{
    ClassificationResult, ClassifierConfig, ColumnDescriptions, Config, ModelColumn, RetryConfig, RunReport,
};
use std::collections::HashSet;

pub struct Classifier<B> {
    backend: B,
    config: ClassifierConfig,
    retry: RetryConfig,
}

impl<B: ClassifierBackend> Classifier<B> {
    pub fn new(backend: B, config: ClassifierConfig, retry: RetryConfig) -> Self {
        Self { backend, config, retry }
    }

    pub fn from_config(backend: B, config: &Config) -> Self {
        Self::new(backend, config.classifier.clone(), config.retry.clone())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Classify every column of a model
    ///
    /// Fails before any request when the model has no columns or two columns
    /// share an upper-cased name.
    pub async fn classify(
        &self,
        model: &str,
        columns: &[ModelColumn],
        descriptions: &ColumnDescriptions,
        sql: &str,
        report: &mut RunReport,
    ) -> Result<ClassificationResult, ClassifierError> {
        Self::preflight(columns)?;

        let request = &build_request(model, columns, descriptions, sql, &self.config);
        tracing::info!(model = %model, columns = columns.len(), backend = self.backend.name(), "classifying columns");

        let backend = &self.backend;
        let content = with_retry(&self.retry, |attempt| {
            tracing::debug!(model = %model, attempt, "classification request");
            backend.complete(request)
        })
        .await?;

        let validated = validate_response(model, &content, columns, descriptions, report)?;
        let mut classified = validated.columns;
        let primary_key = apply_primary_key(model, &mut classified, &validated.suggested_keys, report)?;

        Ok(ClassificationResult::new(model, classified, primary_key)?)
    }

    fn preflight(columns: &[ModelColumn]) -> Result<(), ClassifierError> {
        if columns.is_empty() {
            return Err(ClassifierError::NoColumns);
        }

        let mut seen = HashSet::new();
        for column in columns {
            if !seen.insert(column.normalized_name()) {
                return Err(ClassifierError::AmbiguousColumn(column.normalized_name()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockClassifierBackend, MockClassifierBackendBuilder};
    use semview_core::{Classification, DiagnosticCode};

    fn columns(names: &[&str]) -> Vec<ModelColumn> {
        names.iter().map(|n| ModelColumn::new(*n)).collect()
    }

    fn instant_retry() -> RetryConfig {
        RetryConfig { max_attempts: 3, base_delay_ms: 0 }
    }

    fn classifier(backend: MockClassifierBackend) -> Classifier<MockClassifierBackend> {
        Classifier::new(backend, ClassifierConfig::default(), instant_retry())
    }

    #[tokio::test]
    async fn classifies_customers() {
        let response = MockClassifierBackend::response_for(&[
            ("customer_id", Classification::Dimension),
            ("customer_name", Classification::Dimension),
            ("total_orders", Classification::Fact),
            ("total_revenue", Classification::Fact),
        ]);
        let classifier = classifier(MockClassifierBackendBuilder::new().with_response("customers", response).build());

        let mut report = RunReport::new();
        let result = classifier
            .classify(
                "customers",
                &columns(&["customer_id", "customer_name", "total_orders", "total_revenue"]),
                &ColumnDescriptions::new(),
                "select ...",
                &mut report,
            )
            .await
            .unwrap();

        assert_eq!(result.primary_key(), "customer_id");
        let facts: Vec<&str> = result.facts().map(|c| c.name.as_str()).collect();
        assert_eq!(facts, vec!["total_orders", "total_revenue"]);
        assert_eq!(classifier.backend().call_count("customers").await, 1);
        assert!(report.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn two_transient_failures_then_success_makes_three_calls() {
        let backend = MockClassifierBackendBuilder::new()
            .with_error("orders", ClassifierError::ServerError { status: 502, message: "bad gateway".into() })
            .with_error("orders", ClassifierError::Timeout("60s".into()))
            .with_response("orders", MockClassifierBackend::response_for(&[("order_id", Classification::Dimension)]))
            .build();
        let classifier = classifier(backend);

        let mut report = RunReport::new();
        let result = classifier
            .classify("orders", &columns(&["order_id"]), &ColumnDescriptions::new(), "", &mut report)
            .await;

        assert!(result.is_ok());
        assert_eq!(classifier.backend().call_count("orders").await, 3);
    }

    #[tokio::test]
    async fn non_retryable_error_makes_one_call() {
        let backend = MockClassifierBackend::new();
        backend.push_error("orders", ClassifierError::AuthenticationError("invalid key".into())).await;
        let classifier = classifier(backend);

        let mut report = RunReport::new();
        let result = classifier
            .classify("orders", &columns(&["order_id"]), &ColumnDescriptions::new(), "", &mut report)
            .await;

        assert!(matches!(result, Err(ClassifierError::AuthenticationError(_))));
        assert_eq!(classifier.backend().call_count("orders").await, 1);
    }

    #[tokio::test]
    async fn colliding_names_fail_before_any_call() {
        let classifier = classifier(MockClassifierBackend::new());

        let mut report = RunReport::new();
        let result = classifier
            .classify("m", &columns(&["Email", "EMAIL"]), &ColumnDescriptions::new(), "", &mut report)
            .await;

        assert_eq!(result.unwrap_err(), ClassifierError::AmbiguousColumn("EMAIL".into()));
        assert_eq!(classifier.backend().total_calls().await, 0);
    }

    #[tokio::test]
    async fn partial_response_still_classifies_every_column() {
        let response = r#"{"columns": {"amount": {"type": "FACT"}}}"#;
        let classifier = classifier(MockClassifierBackendBuilder::new().with_response("sales", response).build());

        let mut report = RunReport::new();
        let result = classifier
            .classify("sales", &columns(&["region", "amount"]), &ColumnDescriptions::new(), "", &mut report)
            .await
            .unwrap();

        assert_eq!(result.columns().len(), 2);
        assert_eq!(result.primary_key(), "region");
        assert!(result.columns()[0].needs_review);
        assert_eq!(report.diagnostics[0].code, DiagnosticCode::ClassificationFallback);
    }
}
