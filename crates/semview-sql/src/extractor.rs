//! Column extraction for a model's SQL
//!
//! Masks templates, parses with the configured dialect and reads the final
//! projection. When the parser rejects the SQL the token-level reader takes over.

use std::path::Path;
use semview_core::{Diagnostic, DiagnosticCode, DialectConfig, Location, ModelColumn, Severity};
use crate::lexical;
use crate::parser::SqlParser;
use crate::projection;
use crate::template::{DbtReference, TemplateMasker};

/// Reasons a model's columns cannot be determined
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read model SQL: {message}")]
    Io { message: String },

    #[error("SQL could not be read: {message}")]
    Unparseable { message: String },

    #[error("no SELECT list found in model SQL")]
    NoProjection,

    #[error("the final SELECT list is empty")]
    EmptyProjection,

    #[error("select item {position} has no output name: `{expression}` needs an alias")]
    UnnamedColumn { position: usize, expression: String },

    #[error("select item {position} is a wildcard; list the columns explicitly")]
    Wildcard { position: usize },
}

impl ExtractError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            ExtractError::Io { .. } | ExtractError::Unparseable { .. } => DiagnosticCode::SqlParseError,
            ExtractError::NoProjection | ExtractError::EmptyProjection => DiagnosticCode::SqlNoProjection,
            ExtractError::UnnamedColumn { .. } | ExtractError::Wildcard { .. } => DiagnosticCode::SqlUnnamedColumn,
        }
    }

    /// Convert to a run diagnostic; a model that cannot be read is skipped
    pub fn to_diagnostic(&self, sql_path: &Path) -> Diagnostic {
        Diagnostic::new(self.code(), Severity::Warn, self.to_string())
            .with_location(Location::new(sql_path.display().to_string()))
    }
}

/// Columns and references of one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedModel {
    /// Output columns in select-list order
    pub columns: Vec<ModelColumn>,

    /// ref()/source() calls in the model
    pub references: Vec<DbtReference>,

    /// True when the token-level reader produced the columns
    pub used_fallback: bool,
}

/// Extracts output columns from model SQL
pub struct ColumnExtractor {
    parser: SqlParser,
}

impl ColumnExtractor {
    pub fn new(dialect: &DialectConfig) -> Self {
        Self {
            parser: SqlParser::from_dialect(dialect),
        }
    }

    /// Read and extract a model file
    pub fn extract_file(&self, path: &Path) -> Result<(String, ExtractedModel), ExtractError> {
        let sql = std::fs::read_to_string(path).map_err(|e| ExtractError::Io {
            message: format!("{}: {}", path.display(), e),
        })?;
        let model = self.extract(&sql)?;
        Ok((sql, model))
    }

    /// Extract the ordered output columns of model SQL
    pub fn extract(&self, sql: &str) -> Result<ExtractedModel, ExtractError> {
        let masked = TemplateMasker::mask(sql);

        let (columns, used_fallback) = match self.parser.parse(&masked.sql) {
            Ok(parsed) => {
                let query = parsed.final_query().ok_or(ExtractError::NoProjection)?;
                (projection::columns_from_query(query, &masked)?, false)
            }
            Err(e) => {
                tracing::debug!(error = %e, "parser rejected model SQL; reading select list from tokens");
                (lexical::columns_from_tokens(self.parser.dialect(), &masked)?, true)
            }
        };

        Ok(ExtractedModel {
            columns,
            references: masked.references,
            used_fallback,
        })
    }
}

impl Default for ColumnExtractor {
    fn default() -> Self {
        Self::new(&DialectConfig::default())
    }
}
