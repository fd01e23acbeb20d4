//! Configuration schema (semview.toml)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// SQL dialect used to parse model SQL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    /// BigQuery SQL dialect
    BigQuery,

    /// Snowflake SQL dialect
    Snowflake,

    /// PostgreSQL SQL dialect
    Postgres,

    /// Generic ANSI SQL
    Ansi,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self::Snowflake
    }
}

/// Classification endpoint settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Chat model name
    pub model: String,

    /// API base URL (`/chat/completions` is appended)
    pub base_url: String,

    /// Environment variable holding the API credential
    pub api_key_env: String,

    /// Sampling temperature
    pub temperature: f32,

    /// HTTP request timeout
    pub timeout_seconds: u64,

    /// Send the model SQL along with the column list
    pub include_sql: bool,

    /// Truncate model SQL in the prompt to this many characters
    pub max_sql_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.3,
            timeout_seconds: 60,
            include_sql: true,
            max_sql_chars: 12_000,
        }
    }
}

/// Bounded retry settings for the classification call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles for each later attempt
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
        }
    }
}

/// `semview.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQL dialect
    #[serde(default)]
    pub dialect: DialectConfig,

    /// Directories scanned for semantic folders
    #[serde(default = "default_model_roots")]
    pub model_roots: Vec<PathBuf>,

    /// Name of the folders holding semantic-view candidate models
    #[serde(default = "default_semantic_dir")]
    pub semantic_dir: String,

    /// Output subfolder created inside each semantic folder
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Engine named in the trailing view comment
    #[serde(default = "default_downstream_engine")]
    pub downstream_engine: String,

    /// Classification endpoint
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Retry policy for the classification call
    #[serde(default)]
    pub retry: RetryConfig,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_model_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("models")]
}

fn default_semantic_dir() -> String {
    "semantic".to_string()
}

fn default_output_dir() -> String {
    "semantic_views".to_string()
}

fn default_downstream_engine() -> String {
    "Cortex Analyst".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: DialectConfig::default(),
            model_roots: default_model_roots(),
            semantic_dir: default_semantic_dir(),
            output_dir: default_output_dir(),
            downstream_engine: default_downstream_engine(),
            classifier: ClassifierConfig::default(),
            retry: RetryConfig::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Relative roots resolve against the config file's directory
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Apply `SEMVIEW_MODEL` and `SEMVIEW_BASE_URL` overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var("SEMVIEW_MODEL") {
            self.classifier.model = model;
        }
        if let Ok(base_url) = std::env::var("SEMVIEW_BASE_URL") {
            self.classifier.base_url = base_url;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".to_string()));
        }
        if self.semantic_dir.is_empty() || self.output_dir.is_empty() {
            return Err(ConfigError::Invalid("semantic_dir and output_dir must not be empty".to_string()));
        }
        if self.semantic_dir == self.output_dir {
            return Err(ConfigError::Invalid("output_dir must differ from semantic_dir".to_string()));
        }
        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.dialect, DialectConfig::Snowflake);
        assert_eq!(config.model_roots, vec![PathBuf::from("models")]);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.classifier.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            dialect = "bigquery"

            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.dialect, DialectConfig::BigQuery);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.classifier.model, "gpt-4o");
        assert_eq!(config.output_dir, "semantic_views");
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = Config::from_toml("[retry]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("semview.toml");

        let mut config = Config::default();
        config.downstream_engine = "Cortex".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.downstream_engine, "Cortex");
        assert_eq!(loaded.project_root, dir.path());
    }
}
