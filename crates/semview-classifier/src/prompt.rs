//! Classification prompt

use crate::backend::ClassificationRequest;
use semview_core::{ClassifierConfig, ColumnDescriptions, ModelColumn};

pub const SYSTEM_PROMPT: &str = "You are a data modeling expert specializing in Snowflake Semantic Views.";

const INSTRUCTIONS: &str = "\
Classify each column of the dbt model below as either a FACT or a DIMENSION for a semantic view.

Guidelines:
- FACT: additive measures and metrics, typically numeric and meaningful to sum (amounts, counts, quantities)
- DIMENSION: descriptive attributes used for grouping and filtering (keys and IDs, names, emails, categories, statuses, dates and timestamps)

For each column provide the classification and a brief English comment describing it.
Prefer the documented column descriptions when they are given; otherwise infer from the SQL.
Also suggest which column uniquely identifies a row.";

const RESPONSE_SHAPE: &str = r#"Return your response in this exact JSON format:
{
  "primary_keys": ["column_name"],
  "columns": {
    "column_name": {"type": "FACT or DIMENSION", "comment": "description"}
  }
}"#;

/// Build the request for one model
///
/// The SQL text is included when `config.include_sql` is set, cut to
/// `config.max_sql_chars` characters.
pub fn build_request(
    model: &str,
    columns: &[ModelColumn],
    descriptions: &ColumnDescriptions,
    sql: &str,
    config: &ClassifierConfig,
) -> ClassificationRequest {
    let mut prompt = String::new();
    prompt.push_str(INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(&format!("Model name: {}\n", model));

    if let Some(description) = &descriptions.model_description {
        prompt.push_str(&format!("Model description: {}\n", description));
    }

    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    prompt.push_str(&format!("\nColumns to classify:\n{}\n", names.join(", ")));

    let documented: Vec<(&str, &str)> = columns
        .iter()
        .filter_map(|c| descriptions.get(&c.name).map(|d| (c.name.as_str(), d)))
        .collect();
    if !documented.is_empty() {
        prompt.push_str("\nColumn descriptions from dbt YAML:\n");
        for (name, description) in documented {
            prompt.push_str(&format!("- {}: {}\n", name, description));
        }
    }

    if config.include_sql && !sql.trim().is_empty() {
        prompt.push_str(&format!("\nSQL:\n```sql\n{}\n```\n", truncate(sql.trim(), config.max_sql_chars)));
    }

    prompt.push('\n');
    prompt.push_str(RESPONSE_SHAPE);

    ClassificationRequest {
        model: model.to_string(),
        columns: names.into_iter().map(String::from).collect(),
        system_prompt: SYSTEM_PROMPT.to_string(),
        user_prompt: prompt,
    }
}

fn truncate(sql: &str, max_chars: usize) -> String {
    match sql.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n-- (truncated)", &sql[..cut]),
        None => sql.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<ModelColumn> {
        vec![ModelColumn::new("customer_id"), ModelColumn::new("total_revenue")]
    }

    #[test]
    fn prompt_carries_model_context() {
        let mut descriptions = ColumnDescriptions::new();
        descriptions.model_description = Some("One row per customer".to_string());
        descriptions.insert("TOTAL_REVENUE", "Lifetime revenue");

        let request = build_request(
            "customers",
            &columns(),
            &descriptions,
            "select customer_id, sum(amount) as total_revenue from orders group by 1",
            &ClassifierConfig::default(),
        );

        assert_eq!(request.system_prompt, SYSTEM_PROMPT);
        assert_eq!(request.columns, vec!["customer_id", "total_revenue"]);
        assert!(request.user_prompt.contains("Model name: customers"));
        assert!(request.user_prompt.contains("Model description: One row per customer"));
        assert!(request.user_prompt.contains("customer_id, total_revenue"));
        assert!(request.user_prompt.contains("- total_revenue: Lifetime revenue"));
        assert!(request.user_prompt.contains("sum(amount)"));
        assert!(request.user_prompt.contains("\"primary_keys\""));
    }

    #[test]
    fn sql_can_be_left_out_or_truncated() {
        let sql = "select customer_id, total_revenue from t";

        let config = ClassifierConfig { include_sql: false, ..ClassifierConfig::default() };
        let request = build_request("c", &columns(), &ColumnDescriptions::new(), sql, &config);
        assert!(!request.user_prompt.contains("```sql"));

        let config = ClassifierConfig { max_sql_chars: 6, ..ClassifierConfig::default() };
        let request = build_request("c", &columns(), &ColumnDescriptions::new(), sql, &config);
        assert!(request.user_prompt.contains("```sql\nselect\n-- (truncated)\n```"));
        assert!(!request.user_prompt.contains("customer_id, total_revenue from"));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé\n-- (truncated)");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
