//! Run diagnostics
//!
//! Every skipped model, fallback and review item becomes a [`Diagnostic`] in
//! the run report. Codes appear in the JSON report, so existing names stay
//! fixed; new situations get new codes.

use serde::{Deserialize, Serialize};

/// What a diagnostic is about, grouped by pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Discovery (1xxx)
    /// A model root or directory could not be read
    DiscoveryUnreadablePath,

    // SQL extraction (2xxx)
    /// Failed to parse SQL
    SqlParseError,

    /// No final SELECT projection found in the model
    SqlNoProjection,

    /// A select-list entry has no determinable column name
    SqlUnnamedColumn,

    /// The parser rejected the model and columns came from the token stream
    SqlLexicalFallback,

    // Metadata documents (3xxx)
    /// Companion YAML document is malformed
    MetadataParseError,

    /// Companion YAML documents a column the model does not produce
    MetadataUnknownColumn,

    // Classification (4xxx)
    /// Classification endpoint failed (after retries, if retryable)
    ClassificationFailed,

    /// Classification endpoint returned an unusable response
    ClassificationMalformedResponse,

    /// Two columns normalize to the same upper-cased name
    ClassificationAmbiguousColumn,

    /// Column classified by fallback policy, needs manual review
    ClassificationFallback,

    /// Primary key column was classified FACT and moved to DIMENSIONS
    PrimaryKeyReclassified,

    // Output (5xxx)
    /// Output directory or artifact could not be written
    WriteError,
}

impl DiagnosticCode {
    /// The name used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DiscoveryUnreadablePath => "DISCOVERY_UNREADABLE_PATH",
            Self::SqlParseError => "SQL_PARSE_ERROR",
            Self::SqlNoProjection => "SQL_NO_PROJECTION",
            Self::SqlUnnamedColumn => "SQL_UNNAMED_COLUMN",
            Self::SqlLexicalFallback => "SQL_LEXICAL_FALLBACK",
            Self::MetadataParseError => "METADATA_PARSE_ERROR",
            Self::MetadataUnknownColumn => "METADATA_UNKNOWN_COLUMN",
            Self::ClassificationFailed => "CLASSIFICATION_FAILED",
            Self::ClassificationMalformedResponse => "CLASSIFICATION_MALFORMED_RESPONSE",
            Self::ClassificationAmbiguousColumn => "CLASSIFICATION_AMBIGUOUS_COLUMN",
            Self::ClassificationFallback => "CLASSIFICATION_FALLBACK",
            Self::PrimaryKeyReclassified => "PRIMARY_KEY_RECLASSIFIED",
            Self::WriteError => "WRITE_ERROR",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - the model could not be generated
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source location in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to project root
    pub file: String,

    /// Optional line number (1-indexed)
    pub line: Option<usize>,
}

impl Location {
    /// Create a new location with just a file path
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
        }
    }

    /// Create a location with file and line number
    pub fn with_line(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Model the diagnostic belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Column the diagnostic belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// Source location (best-effort)
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            model: None,
            column: None,
            location: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Attach the column name
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}
