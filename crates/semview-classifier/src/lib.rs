//! Column classification for semantic views
//!
//! This crate provides:
//! - The `ClassifierBackend` trait over a chat-completion endpoint
//! - An OpenAI-compatible backend and an in-memory mock
//! - Prompt construction and strict validation of the JSON response
//! - A bounded retry loop with exponential backoff
//! - The primary-key selection policy

pub mod backend;
pub mod openai;
pub mod mock;
pub mod prompt;
pub mod response;
pub mod primary_key;
pub mod retry;
pub mod client;

pub use backend::{ClassifierBackend, ClassificationRequest, ClassifierError};
pub use openai::OpenAiBackend;
pub use mock::{MockClassifierBackend, MockClassifierBackendBuilder};
pub use prompt::{build_request, SYSTEM_PROMPT};
pub use response::{validate_response, ValidatedResponse};
pub use primary_key::{apply_primary_key, select_primary_key};
pub use retry::{backoff_delay, with_retry};
pub use client::Classifier;
