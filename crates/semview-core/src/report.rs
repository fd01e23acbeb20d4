//! Run report (`--report` JSON)
//!
//! A single [`RunReport`] is created per invocation and passed by `&mut`
//! through every pipeline stage; it is the only state shared across models.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::diagnostic::{Diagnostic, Severity};

/// Version of the JSON layout; bump `major` when a field changes meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Final outcome of one model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ModelOutcome {
    /// A semantic view artifact was produced
    Generated {
        /// Written artifact (or the path it would have had on a dry run)
        path: PathBuf,
        /// Artifact version, 1 for the unsuffixed file
        version: u32,
        /// Number of columns classified by fallback policy
        needs_review: usize,
    },

    /// The model's inputs could not be used (unparseable SQL)
    Skipped { reason: String },

    /// Classification or writing failed
    Failed { reason: String },
}

/// Outcome of one model, by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub model: String,
    pub sql_path: PathBuf,
    pub outcome: ModelOutcome,
}

/// Summary statistics for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Models discovered
    pub models_found: usize,

    /// Models with a generated artifact
    pub generated: usize,

    /// Models skipped because their inputs were unusable
    pub skipped: usize,

    /// Models that failed classification or writing
    pub failed: usize,

    /// Number of error diagnostics
    pub errors: usize,

    /// Number of warning diagnostics
    pub warnings: usize,

    /// Number of info diagnostics
    pub info: usize,
}

/// Run report (run-report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: RunSummary,

    /// Per-model outcomes, in processing order
    pub models: Vec<ModelRecord>,

    /// All diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    /// Empty report stamped with the current time
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: RunSummary::default(),
            models: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Add a diagnostic to the report
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.summary.errors += 1,
            Severity::Warn => self.summary.warnings += 1,
            Severity::Info => self.summary.info += 1,
        }

        self.diagnostics.push(diagnostic);
    }

    /// Record how many models discovery produced
    pub fn set_models_found(&mut self, count: usize) {
        self.summary.models_found = count;
    }

    /// Record the final outcome of a model
    pub fn record_outcome(&mut self, model: impl Into<String>, sql_path: impl Into<PathBuf>, outcome: ModelOutcome) {
        match &outcome {
            ModelOutcome::Generated { .. } => self.summary.generated += 1,
            ModelOutcome::Skipped { .. } => self.summary.skipped += 1,
            ModelOutcome::Failed { .. } => self.summary.failed += 1,
        }

        self.models.push(ModelRecord {
            model: model.into(),
            sql_path: sql_path.into(),
            outcome,
        });
    }

    /// Check if any model failed
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    /// Diagnostics recorded for one model
    pub fn diagnostics_for<'a>(&'a self, model: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics
            .iter()
            .filter(move |d| d.model.as_deref() == Some(model))
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the pretty-printed JSON to `path`
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
