//! Validation of the classification response
//!
//! The endpoint is asked for
//! `{"primary_keys": [...], "columns": {"<name>": {"type": "FACT|DIMENSION", "comment": "..."}}}`.
//! The document as a whole must have that shape; individual column entries
//! that don't are replaced by the fallback classification.

use crate::backend::ClassifierError;
use semview_core::{
    Classification, ClassifiedColumn, ColumnDescriptions, Diagnostic, DiagnosticCode, ModelColumn,
    RunReport, Severity,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Column classifications in model order, before the primary-key policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedResponse {
    pub columns: Vec<ClassifiedColumn>,

    /// Key columns the endpoint suggested
    pub suggested_keys: Vec<String>,
}

/// Validate raw response content against the model's columns
///
/// Fails only when the content is not an object with a `columns` object.
/// Columns missing from the response, or with an invalid entry, become
/// DIMENSION with `needs_review` and a warning in the report.
pub fn validate_response(
    model: &str,
    content: &str,
    columns: &[ModelColumn],
    descriptions: &ColumnDescriptions,
    report: &mut RunReport,
) -> Result<ValidatedResponse, ClassifierError> {
    let document: Value = serde_json::from_str(content)
        .map_err(|e| ClassifierError::MalformedResponse(format!("response is not JSON: {}", e)))?;

    let Value::Object(document) = document else {
        return Err(ClassifierError::MalformedResponse("response is not a JSON object".to_string()));
    };

    let Some(Value::Object(entries)) = document.get("columns") else {
        return Err(ClassifierError::MalformedResponse(
            "response has no \"columns\" object".to_string(),
        ));
    };

    let entries = index_entries(model, entries, columns);

    let classified = columns
        .iter()
        .map(|column| {
            let description = descriptions.get(&column.name);
            match entries.get(&column.name.to_lowercase()).map(|v| parse_entry(v)) {
                Some(Ok((classification, comment))) => {
                    let mut classified = ClassifiedColumn::new(&column.name, classification);
                    if let Some(comment) = comment.as_deref().or(description) {
                        classified = classified.with_comment(comment);
                    }
                    classified
                }
                outcome => {
                    let reason = match outcome {
                        Some(Err(reason)) => reason,
                        _ => "missing from response".to_string(),
                    };
                    fallback(model, column, description, &reason, report)
                }
            }
        })
        .collect();

    Ok(ValidatedResponse {
        columns: classified,
        suggested_keys: suggested_keys(&document),
    })
}

/// Response entries keyed by lower-cased name, limited to known columns
fn index_entries<'a>(model: &str, entries: &'a Map<String, Value>, columns: &[ModelColumn]) -> HashMap<String, &'a Value> {
    let mut indexed = HashMap::new();

    for (name, value) in entries {
        let key = name.to_lowercase();
        if !columns.iter().any(|c| c.name.to_lowercase() == key) {
            tracing::info!(model = %model, column = %name, "dropping classification for unknown column");
            continue;
        }
        indexed.entry(key).or_insert(value);
    }

    indexed
}

/// `{type, comment?}` with type FACT or DIMENSION in any case
fn parse_entry(value: &Value) -> Result<(Classification, Option<String>), String> {
    let Value::Object(entry) = value else {
        return Err("entry is not an object".to_string());
    };

    let classification = match entry.get("type").and_then(Value::as_str).map(str::trim) {
        Some(kind) if kind.eq_ignore_ascii_case("FACT") => Classification::Fact,
        Some(kind) if kind.eq_ignore_ascii_case("DIMENSION") => Classification::Dimension,
        Some(kind) => return Err(format!("unknown type '{}'", kind)),
        None => return Err("entry has no string \"type\"".to_string()),
    };

    let comment = match entry.get("comment") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.trim().to_string()).filter(|t| !t.is_empty()),
        Some(_) => return Err("\"comment\" is not a string".to_string()),
    };

    Ok((classification, comment))
}

fn fallback(
    model: &str,
    column: &ModelColumn,
    description: Option<&str>,
    reason: &str,
    report: &mut RunReport,
) -> ClassifiedColumn {
    tracing::warn!(model = %model, column = %column.name, reason = %reason, "column classified DIMENSION by fallback");

    report.add_diagnostic(
        Diagnostic::new(
            DiagnosticCode::ClassificationFallback,
            Severity::Warn,
            format!("Column '{}' {}; classified DIMENSION, review manually", column.name, reason),
        )
        .with_model(model)
        .with_column(&column.name),
    );

    let mut classified = ClassifiedColumn::new(&column.name, Classification::Dimension).flagged_for_review();
    if let Some(description) = description {
        classified = classified.with_comment(description);
    }
    classified
}

fn suggested_keys(document: &Map<String, Value>) -> Vec<String> {
    match document.get("primary_keys") {
        Some(Value::Array(keys)) => keys.iter().filter_map(Value::as_str).map(String::from).collect(),
        Some(Value::String(key)) => vec![key.clone()],
        _ => Vec::new(),
    }
}
