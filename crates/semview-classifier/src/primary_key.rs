//! Primary-key selection
//!
//! Exactly one column is the key. Preference, first match wins:
//! 1. `<model>_id` or `<model>id`, also in singular form (`customers` -> `customer_id`)
//! 2. the first column named `id` or ending in `_id`
//! 3. the first column ending in `id` (`CUSTOMERID`)
//! 4. the first DIMENSION column
//! 5. the first column
//!
//! The chosen column is always a DIMENSION; a FACT key is moved over with a warning.

use crate::backend::ClassifierError;
use semview_core::{Classification, ClassifiedColumn, Diagnostic, DiagnosticCode, RunReport, Severity};

/// Index of the key column, `None` only when there are no columns
pub fn select_primary_key(model: &str, columns: &[ClassifiedColumn]) -> Option<usize> {
    let named = model_key_names(model);

    columns
        .iter()
        .position(|c| named.iter().any(|n| c.name.eq_ignore_ascii_case(n)))
        .or_else(|| columns.iter().position(|c| is_id_column(&c.name)))
        .or_else(|| columns.iter().position(|c| c.name.to_lowercase().ends_with("id")))
        .or_else(|| columns.iter().position(|c| c.classification == Classification::Dimension))
        .or(if columns.is_empty() { None } else { Some(0) })
}

/// Pick the key and make sure it is a DIMENSION
///
/// `suggested` are the endpoint's key suggestions; they are logged only.
pub fn apply_primary_key(
    model: &str,
    columns: &mut [ClassifiedColumn],
    suggested: &[String],
    report: &mut RunReport,
) -> Result<String, ClassifierError> {
    let index = select_primary_key(model, columns).ok_or(ClassifierError::NoColumns)?;
    let key = &mut columns[index];

    if !suggested.is_empty() && !suggested.iter().any(|s| s.eq_ignore_ascii_case(&key.name)) {
        tracing::info!(model = %model, chosen = %key.name, suggested = ?suggested, "endpoint suggested a different primary key");
    }

    if key.classification == Classification::Fact {
        tracing::warn!(model = %model, column = %key.name, "primary key was classified FACT; moving to DIMENSIONS");
        key.classification = Classification::Dimension;
        report.add_diagnostic(
            Diagnostic::new(
                DiagnosticCode::PrimaryKeyReclassified,
                Severity::Warn,
                format!("Primary key '{}' was classified FACT; rendered as DIMENSION", key.name),
            )
            .with_model(model)
            .with_column(&key.name),
        );
    }

    Ok(key.name.clone())
}

fn model_key_names(model: &str) -> Vec<String> {
    let model = model.to_lowercase();
    let mut stems = vec![model.clone()];

    if let Some(stem) = model.strip_suffix("ies") {
        stems.push(format!("{}y", stem));
    } else if let Some(stem) = model.strip_suffix('s') {
        stems.push(stem.to_string());
    }

    stems
        .iter()
        .flat_map(|stem| [format!("{}_id", stem), format!("{}id", stem)])
        .collect()
}

fn is_id_column(name: &str) -> bool {
    let name = name.to_lowercase();
    name == "id" || name.ends_with("_id")
}
