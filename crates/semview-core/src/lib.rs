//! semview Core
//!
//! Core domain model shared by every stage of the generator.
//! Never rename diagnostic codes - they are part of the public API.

pub mod diagnostic;
pub mod schema;
pub mod report;
pub mod config;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, Location};
pub use schema::{
    Classification, ClassificationResult, ClassifiedColumn, ColumnDescriptions, InvalidClassification,
    ModelColumn, ModelDescriptor,
};
pub use report::{ModelOutcome, ModelRecord, RunReport, RunSummary, ReportVersion};
pub use config::{ClassifierConfig, Config, ConfigError, DialectConfig, RetryConfig};
