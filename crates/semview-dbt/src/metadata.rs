//! Column descriptions from dbt properties YAML
//!
//! Reads the `models: [{ name, columns: [{ name, description }] }]` shape dbt
//! uses for model documentation. A bare top-level `columns:` list is accepted too.

use semview_core::{
    ColumnDescriptions, Diagnostic, DiagnosticCode, Location, ModelColumn, ModelDescriptor,
    RunReport, Severity,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
struct PropertiesDocument {
    #[serde(default)]
    models: Vec<ModelEntry>,

    #[serde(default)]
    columns: Vec<ColumnEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    description: Option<String>,

    #[serde(default)]
    columns: Vec<ColumnEntry>,
}

#[derive(Debug, Deserialize)]
struct ColumnEntry {
    name: String,

    #[serde(default)]
    description: Option<String>,
}

/// Errors while reading a companion document
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed metadata document {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

impl MetadataError {
    /// Convert to a run diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let path = match self {
            MetadataError::Io { path, .. } => path,
            MetadataError::Malformed { path, .. } => path,
        };

        Diagnostic::new(DiagnosticCode::MetadataParseError, Severity::Warn, self.to_string())
            .with_location(Location::new(path.display().to_string()))
    }
}

/// Loads column descriptions for a model
pub struct MetadataLoader;

impl MetadataLoader {
    /// Load descriptions from an optional document
    ///
    /// An absent document yields an empty mapping.
    pub fn load(path: Option<&Path>, model_name: &str) -> Result<ColumnDescriptions, MetadataError> {
        let Some(path) = path else {
            return Ok(ColumnDescriptions::new());
        };

        let contents = std::fs::read_to_string(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&contents, model_name).map_err(|message| MetadataError::Malformed {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse a properties document
    ///
    /// When a `models` entry carries the model's name only that entry is used;
    /// otherwise columns of every entry are merged.
    pub fn parse(yaml: &str, model_name: &str) -> Result<ColumnDescriptions, String> {
        if yaml.trim().is_empty() {
            return Ok(ColumnDescriptions::new());
        }

        let document: PropertiesDocument = serde_yaml::from_str(yaml).map_err(|e| e.to_string())?;
        let mut descriptions = ColumnDescriptions::new();

        let matching: Vec<&ModelEntry> = document
            .models
            .iter()
            .filter(|m| m.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(model_name)))
            .collect();

        let entries: Vec<&ModelEntry> = if matching.is_empty() {
            document.models.iter().collect()
        } else {
            matching
        };

        for entry in entries {
            if descriptions.model_description.is_none() {
                descriptions.model_description = entry.description.clone().filter(|d| !d.trim().is_empty());
            }
            Self::insert_columns(&mut descriptions, &entry.columns);
        }
        Self::insert_columns(&mut descriptions, &document.columns);

        Ok(descriptions)
    }

    fn insert_columns(descriptions: &mut ColumnDescriptions, columns: &[ColumnEntry]) {
        for column in columns {
            match column.description.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() && !column.name.trim().is_empty() => {
                    descriptions.insert(column.name.trim(), text);
                }
                _ => {}
            }
        }
    }

    /// Load descriptions for a discovered model, recording problems in the report
    ///
    /// Malformed documents degrade to an empty mapping. Entries for columns the
    /// model does not produce are dropped.
    pub fn load_for_model(
        model: &ModelDescriptor,
        columns: &[ModelColumn],
        report: &mut RunReport,
    ) -> ColumnDescriptions {
        let mut descriptions = match Self::load(model.metadata_path.as_deref(), &model.name) {
            Ok(descriptions) => descriptions,
            Err(e) => {
                tracing::warn!(model = %model.name, error = %e, "ignoring companion document");
                report.add_diagnostic(e.to_diagnostic().with_model(&model.name));
                return ColumnDescriptions::new();
            }
        };

        let known: HashSet<String> = columns.iter().map(|c| c.name.to_lowercase()).collect();
        let unknown: Vec<String> = descriptions
            .columns
            .keys()
            .filter(|name| !known.contains(*name))
            .cloned()
            .collect();

        for name in unknown {
            descriptions.columns.remove(&name);
            tracing::info!(model = %model.name, column = %name, "documented column not produced by model");

            let mut diag = Diagnostic::new(
                DiagnosticCode::MetadataUnknownColumn,
                Severity::Info,
                format!("Documented column '{}' is not in the model's select list; ignored", name),
            )
            .with_model(&model.name)
            .with_column(&name);
            if let Some(path) = &model.metadata_path {
                diag = diag.with_location(Location::new(path.display().to_string()));
            }
            report.add_diagnostic(diag);
        }

        descriptions
    }
}
