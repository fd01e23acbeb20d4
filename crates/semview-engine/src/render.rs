//! Semantic view rendering
//!
//! Turns a [`ClassificationResult`] into the dbt model text of a semantic
//! view. Rendering is pure: same input, same bytes.

use minijinja::{context, Environment};
use semview_core::{ClassificationResult, ClassifiedColumn, Diagnostic, DiagnosticCode, Severity};
use serde::Serialize;

const TEMPLATE_NAME: &str = "semantic_view.sql";

// `open`/`close` emit literal dbt braces into the output.
const TEMPLATE: &str = r#"{{ open }} config(
  materialized = 'semantic_view',
  copy_grants = true
) {{ close }}

TABLES (
  model AS {{ open }} ref('{{ model }}') {{ close }}
    PRIMARY KEY ({{ primary_key }})
)

{% if facts %}
FACTS (
{% for column in facts %}
  model.{{ column.name }} AS {{ column.name }}
{%- if column.comment %}

    COMMENT = '{{ column.comment }}'
{%- endif %}
{%- if not loop.last %},{% endif %}

{% endfor %}
)

{% endif %}
DIMENSIONS (
{% for column in dimensions %}
  model.{{ column.name }} AS {{ column.name }}
{%- if column.comment %}

    COMMENT = '{{ column.comment }}'
{%- endif %}
{%- if not loop.last %},{% endif %}

{% endfor %}
)
COMMENT = 'Semantic view for {{ model_label }} model. Enables natural language queries via {{ engine }}'"#;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl RenderError {
    pub fn to_diagnostic(&self, model: &str) -> Diagnostic {
        Diagnostic::new(DiagnosticCode::WriteError, Severity::Error, self.to_string()).with_model(model)
    }
}

#[derive(Debug, Serialize)]
struct ColumnView {
    name: String,
    comment: Option<String>,
}

impl From<&ClassifiedColumn> for ColumnView {
    fn from(column: &ClassifiedColumn) -> Self {
        Self {
            name: column.normalized_name(),
            comment: column
                .comment
                .as_deref()
                .map(escape_comment)
                .filter(|c| !c.is_empty()),
        }
    }
}

/// Renders semantic view SQL
pub struct SemanticViewRenderer {
    env: Environment<'static>,
    downstream_engine: String,
}

impl SemanticViewRenderer {
    /// Create a renderer naming `downstream_engine` in the view comment
    pub fn new(downstream_engine: impl Into<String>) -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template(TEMPLATE_NAME, TEMPLATE)?;

        Ok(Self {
            env,
            downstream_engine: downstream_engine.into(),
        })
    }

    /// Render the view for one model
    ///
    /// Columns keep their model order within FACTS and DIMENSIONS. Names are
    /// upper-cased; the `ref()` keeps the model name as written.
    pub fn render(&self, result: &ClassificationResult) -> Result<String, RenderError> {
        let facts: Vec<ColumnView> = result.facts().map(ColumnView::from).collect();
        let dimensions: Vec<ColumnView> = result.dimensions().map(ColumnView::from).collect();

        let template = self.env.get_template(TEMPLATE_NAME)?;
        let mut rendered = template.render(context! {
            open => "{{",
            close => "}}",
            model => result.model(),
            model_label => escape_comment(result.model()),
            primary_key => result.primary_key().to_uppercase(),
            facts => facts,
            dimensions => dimensions,
            engine => escape_comment(&self.downstream_engine),
        })?;

        rendered.push('\n');
        Ok(rendered)
    }
}

/// Make text safe inside a single-quoted SQL literal on one line
pub fn escape_comment(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").replace('\'', "''")
}
