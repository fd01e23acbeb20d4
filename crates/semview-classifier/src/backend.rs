//! Classification backend trait

use semview_core::{Diagnostic, DiagnosticCode, InvalidClassification, Severity};

/// One classification call: every column of one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    /// Model being classified
    pub model: String,

    /// Column names in model order
    pub columns: Vec<String>,

    /// System message
    pub system_prompt: String,

    /// User message with the model context and response shape
    pub user_prompt: String,
}

/// Errors that can occur while classifying a model
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifierError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Request rejected ({status}): {message}")]
    RequestRejected { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Columns collide on upper-cased name {0}")]
    AmbiguousColumn(String),

    #[error("Model has no columns to classify")]
    NoColumns,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("Invalid classification: {0}")]
    Invalid(#[from] InvalidClassification),
}

impl ClassifierError {
    /// Transport failures, timeouts, 429 and 5xx are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClassifierError::NetworkError(_)
                | ClassifierError::Timeout(_)
                | ClassifierError::RateLimited(_)
                | ClassifierError::ServerError { .. }
        )
    }

    pub fn code(&self) -> DiagnosticCode {
        match self {
            ClassifierError::MalformedResponse(_) => DiagnosticCode::ClassificationMalformedResponse,
            ClassifierError::AmbiguousColumn(_)
            | ClassifierError::Invalid(InvalidClassification::AmbiguousColumn(_)) => {
                DiagnosticCode::ClassificationAmbiguousColumn
            }
            _ => DiagnosticCode::ClassificationFailed,
        }
    }

    /// Convert to a run diagnostic for the model that failed
    pub fn to_diagnostic(&self, model: &str) -> Diagnostic {
        Diagnostic::new(self.code(), Severity::Error, self.to_string()).with_model(model)
    }
}

/// A chat-completion endpoint that answers classification requests
///
/// Implementations return the raw message content; validation happens in
/// [`crate::response`].
#[async_trait::async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Backend name for logs (e.g., "OpenAI")
    fn name(&self) -> &'static str;

    /// Send one request and return the response content
    async fn complete(&self, request: &ClassificationRequest) -> Result<String, ClassifierError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(ClassifierError::NetworkError("reset".into()).is_retryable());
        assert!(ClassifierError::Timeout("60s".into()).is_retryable());
        assert!(ClassifierError::RateLimited("slow down".into()).is_retryable());
        assert!(ClassifierError::ServerError { status: 503, message: String::new() }.is_retryable());

        assert!(!ClassifierError::AuthenticationError("bad key".into()).is_retryable());
        assert!(!ClassifierError::RequestRejected { status: 400, message: String::new() }.is_retryable());
        assert!(!ClassifierError::MalformedResponse("not json".into()).is_retryable());
    }

    #[test]
    fn diagnostic_codes() {
        let diag = ClassifierError::MalformedResponse("x".into()).to_diagnostic("orders");
        assert_eq!(diag.code, DiagnosticCode::ClassificationMalformedResponse);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.model.as_deref(), Some("orders"));

        let error = ClassifierError::from(InvalidClassification::AmbiguousColumn("ID".into()));
        assert_eq!(error.code(), DiagnosticCode::ClassificationAmbiguousColumn);

        let error = ClassifierError::RetriesExhausted { attempts: 3, last: "Rate limited".into() };
        assert_eq!(error.code(), DiagnosticCode::ClassificationFailed);
        assert_eq!(error.to_string(), "Gave up after 3 attempts: Rate limited");
    }
}
