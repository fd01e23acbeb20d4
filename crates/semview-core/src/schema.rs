//! Model, column and classification types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// A SQL model found under a semantic folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model name (file stem of the SQL file)
    pub name: String,

    /// Path to the model SQL file
    pub sql_path: PathBuf,

    /// Companion `.yml`/`.yaml` document, if one sits next to the SQL file
    pub metadata_path: Option<PathBuf>,

    /// The semantic folder that contains the model
    pub semantic_dir: PathBuf,
}

impl ModelDescriptor {
    /// Create a descriptor without a metadata document
    pub fn new(name: impl Into<String>, sql_path: impl Into<PathBuf>, semantic_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            sql_path: sql_path.into(),
            metadata_path: None,
            semantic_dir: semantic_dir.into(),
        }
    }

    /// Set the metadata document path
    pub fn with_metadata(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_path = Some(path.into());
        self
    }
}

/// A column of a model's output schema, in projection order
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelColumn {
    /// Output column name
    pub name: String,

    /// Source expression text from the select list
    pub expression: String,

    /// Human-authored description from the companion document
    pub description: Option<String>,
}

impl ModelColumn {
    /// Create a column whose expression is its own name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            expression: name.clone(),
            name,
            description: None,
        }
    }

    /// Set the source expression
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = expression.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Name as it appears in rendered output
    pub fn normalized_name(&self) -> String {
        self.name.to_uppercase()
    }
}

/// Column descriptions loaded from a companion document
///
/// Keys are lower-cased column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptions {
    /// Model-level description, if documented
    pub model_description: Option<String>,

    /// Column name (lower-cased) to description
    pub columns: BTreeMap<String, String>,
}

impl ColumnDescriptions {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a description, keyed case-insensitively
    pub fn insert(&mut self, column: &str, description: impl Into<String>) {
        self.columns.insert(column.to_lowercase(), description.into());
    }

    /// Look up a description case-insensitively
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(&column.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Copy descriptions onto matching columns
    pub fn apply_to(&self, columns: &mut [ModelColumn]) {
        for column in columns {
            if let Some(description) = self.get(&column.name) {
                column.description = Some(description.to_string());
            }
        }
    }
}

/// Semantic role of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// Additive measure, typically numeric
    Fact,

    /// Descriptive, categorical, key or timestamp attribute
    Dimension,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fact => "FACT",
            Self::Dimension => "DIMENSION",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A column with its assigned classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedColumn {
    /// Column name as extracted from the model
    pub name: String,

    /// Assigned classification
    pub classification: Classification,

    /// Short human-readable comment
    pub comment: Option<String>,

    /// Classification was assigned by fallback policy
    pub needs_review: bool,
}

impl ClassifiedColumn {
    pub fn new(name: impl Into<String>, classification: Classification) -> Self {
        Self {
            name: name.into(),
            classification,
            comment: None,
            needs_review: false,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn flagged_for_review(mut self) -> Self {
        self.needs_review = true;
        self
    }

    /// Name as it appears in rendered output
    pub fn normalized_name(&self) -> String {
        self.name.to_uppercase()
    }
}

/// Classification of every column of one model
///
/// Constructed through [`ClassificationResult::new`], which enforces that
/// the primary key is one of the columns and is a DIMENSION, and that no two
/// columns collapse to the same upper-cased name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    model: String,
    columns: Vec<ClassifiedColumn>,
    primary_key: String,
}

impl ClassificationResult {
    pub fn new(
        model: impl Into<String>,
        columns: Vec<ClassifiedColumn>,
        primary_key: impl Into<String>,
    ) -> Result<Self, InvalidClassification> {
        let model = model.into();
        let primary_key = primary_key.into();

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.normalized_name()) {
                return Err(InvalidClassification::AmbiguousColumn(column.normalized_name()));
            }
        }

        match columns.iter().find(|c| c.name == primary_key) {
            None => return Err(InvalidClassification::UnknownPrimaryKey(primary_key)),
            Some(c) if c.classification != Classification::Dimension => {
                return Err(InvalidClassification::PrimaryKeyNotDimension(primary_key));
            }
            Some(_) => {}
        }

        Ok(Self {
            model,
            columns,
            primary_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// All columns in model column order
    pub fn columns(&self) -> &[ClassifiedColumn] {
        &self.columns
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn facts(&self) -> impl Iterator<Item = &ClassifiedColumn> {
        self.columns.iter().filter(|c| c.classification == Classification::Fact)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &ClassifiedColumn> {
        self.columns.iter().filter(|c| c.classification == Classification::Dimension)
    }

    /// Columns whose classification came from the fallback policy
    pub fn needing_review(&self) -> impl Iterator<Item = &ClassifiedColumn> {
        self.columns.iter().filter(|c| c.needs_review)
    }
}

/// Violations of the classification invariants
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidClassification {
    #[error("columns collide on upper-cased name {0}")]
    AmbiguousColumn(String),

    #[error("primary key '{0}' is not a column of the model")]
    UnknownPrimaryKey(String),

    #[error("primary key '{0}' is not classified as DIMENSION")]
    PrimaryKeyNotDimension(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_columns() -> Vec<ClassifiedColumn> {
        vec![
            ClassifiedColumn::new("customer_id", Classification::Dimension),
            ClassifiedColumn::new("total_revenue", Classification::Fact).with_comment("Revenue"),
        ]
    }

    #[test]
    fn classification_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Classification::Fact).unwrap(), "\"FACT\"");
        let parsed: Classification = serde_json::from_str("\"DIMENSION\"").unwrap();
        assert_eq!(parsed, Classification::Dimension);
    }

    #[test]
    fn result_enforces_primary_key_dimension() {
        let ok = ClassificationResult::new("customers", sample_columns(), "customer_id");
        assert!(ok.is_ok());

        let fact_key = ClassificationResult::new("customers", sample_columns(), "total_revenue");
        assert_eq!(
            fact_key.unwrap_err(),
            InvalidClassification::PrimaryKeyNotDimension("total_revenue".to_string())
        );

        let missing = ClassificationResult::new("customers", sample_columns(), "nope");
        assert!(matches!(missing, Err(InvalidClassification::UnknownPrimaryKey(_))));
    }

    #[test]
    fn result_rejects_case_collisions() {
        let columns = vec![
            ClassifiedColumn::new("id", Classification::Dimension),
            ClassifiedColumn::new("ID", Classification::Dimension),
        ];
        let err = ClassificationResult::new("m", columns, "id").unwrap_err();
        assert_eq!(err, InvalidClassification::AmbiguousColumn("ID".to_string()));
    }

    #[test]
    fn descriptions_are_case_insensitive() {
        let mut descriptions = ColumnDescriptions::new();
        descriptions.insert("Email", "Contact email");

        let mut columns = vec![ModelColumn::new("EMAIL"), ModelColumn::new("name")];
        descriptions.apply_to(&mut columns);

        assert_eq!(columns[0].description.as_deref(), Some("Contact email"));
        assert!(columns[1].description.is_none());
    }

    #[test]
    fn facts_and_dimensions_split() {
        let result = ClassificationResult::new("customers", sample_columns(), "customer_id").unwrap();
        assert_eq!(result.facts().count(), 1);
        assert_eq!(result.dimensions().count(), 1);
        assert_eq!(result.needing_review().count(), 0);
    }
}
