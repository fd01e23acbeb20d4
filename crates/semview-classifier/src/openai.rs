//! OpenAI-compatible chat-completion backend
//!
//! Posts to `{base_url}/chat/completions` with bearer authentication and asks
//! for a JSON object response. Any endpoint speaking the same protocol works
//! by pointing `base_url` at it.

use crate::backend::{ClassificationRequest, ClassifierBackend, ClassifierError};
use reqwest::{Client, StatusCode};
use semview_core::ClassifierConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Backend for OpenAI and compatible endpoints
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAiBackend {
    /// Create a backend with an explicit API key
    pub fn new(api_key: impl Into<String>, config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ClassifierError::ConfigError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    /// Create a backend reading the API key from `config.api_key_env`
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ClassifierError::ConfigError(format!(
                    "environment variable {} is not set",
                    config.api_key_env
                ))
            })?;

        Self::new(api_key, config)
    }

    /// Full URL of the completions endpoint
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn transport_error(error: reqwest::Error) -> ClassifierError {
        if error.is_timeout() {
            ClassifierError::Timeout(error.to_string())
        } else {
            ClassifierError::NetworkError(error.to_string())
        }
    }

    fn status_error(status: StatusCode, body: String) -> ClassifierError {
        match status.as_u16() {
            401 | 403 => ClassifierError::AuthenticationError(body),
            429 => ClassifierError::RateLimited(body),
            code if status.is_server_error() => ClassifierError::ServerError { status: code, message: body },
            code => ClassifierError::RequestRejected { status: code, message: body },
        }
    }
}

#[async_trait::async_trait]
impl ClassifierBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    async fn complete(&self, request: &ClassificationRequest) -> Result<String, ClassifierError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system_prompt },
                ChatMessage { role: "user", content: &request.user_prompt },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat { kind: "json_object" },
        };

        tracing::debug!(model = %request.model, endpoint = %self.endpoint(), llm = %self.model, "sending classification request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::MalformedResponse(format!("invalid completion body: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ClassifierError::MalformedResponse("completion has no message content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_url() {
        let config = ClassifierConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..ClassifierConfig::default()
        };
        let backend = OpenAiBackend::new("sk-test", &config).unwrap();

        assert_eq!(backend.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(backend.model(), "gpt-4o");
        assert_eq!(backend.name(), "OpenAI");
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let config = ClassifierConfig {
            api_key_env: "SEMVIEW_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..ClassifierConfig::default()
        };

        assert!(matches!(
            OpenAiBackend::from_config(&config),
            Err(ClassifierError::ConfigError(_))
        ));
    }

    #[test]
    fn status_codes_map_to_errors() {
        assert!(matches!(
            OpenAiBackend::status_error(StatusCode::UNAUTHORIZED, String::new()),
            ClassifierError::AuthenticationError(_)
        ));
        assert!(OpenAiBackend::status_error(StatusCode::TOO_MANY_REQUESTS, String::new()).is_retryable());
        assert!(OpenAiBackend::status_error(StatusCode::BAD_GATEWAY, String::new()).is_retryable());
        assert_eq!(
            OpenAiBackend::status_error(StatusCode::BAD_REQUEST, "bad".to_string()),
            ClassifierError::RequestRejected { status: 400, message: "bad".to_string() }
        );
    }

    #[test]
    fn request_body_shape() {
        let body = ChatRequest {
            model: "gpt-4o",
            messages: vec![ChatMessage { role: "user", content: "hi" }],
            temperature: 0.3,
            response_format: ResponseFormat { kind: "json_object" },
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
