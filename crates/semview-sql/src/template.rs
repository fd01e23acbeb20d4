//! dbt template masking
//!
//! dbt models embed Jinja such as `{{ ref('model') }}`. These blocks are not
//! resolved: each `{{ }}` expression becomes an opaque identifier so the SQL
//! around it still parses, and the original text can be restored afterwards.

/// Prefix of the identifiers that stand in for `{{ }}` blocks
pub const PLACEHOLDER_PREFIX: &str = "__dbt_expr_";

/// A reference to a dbt model or source seen while masking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbtReference {
    /// ref('model_name') or ref('package', 'model_name')
    Ref {
        package: Option<String>,
        model_name: String,
    },

    /// source('source_name', 'table_name')
    Source {
        source_name: String,
        table_name: String,
    },
}

impl std::fmt::Display for DbtReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DbtReference::Ref { package: Some(package), model_name } => write!(f, "{}.{}", package, model_name),
            DbtReference::Ref { package: None, model_name } => write!(f, "{}", model_name),
            DbtReference::Source { source_name, table_name } => write!(f, "{}.{}", source_name, table_name),
        }
    }
}

/// SQL with template blocks masked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedSql {
    /// SQL with `{{ }}` blocks replaced by placeholders and tags removed
    pub sql: String,

    /// Original text of each `{{ }}` block, indexed by placeholder number
    pub blocks: Vec<String>,

    /// ref()/source() calls found in `{{ }}` blocks
    pub references: Vec<DbtReference>,
}

impl MaskedSql {
    /// Check whether an identifier is a masked block
    pub fn is_placeholder(identifier: &str) -> bool {
        identifier.starts_with(PLACEHOLDER_PREFIX) && identifier.ends_with("__")
    }

    /// Put the original block text back in place of placeholders
    pub fn restore(&self, text: &str) -> String {
        let mut restored = text.to_string();
        // Highest index first so `__dbt_expr_1__` never clips `__dbt_expr_12__`
        for (i, block) in self.blocks.iter().enumerate().rev() {
            restored = restored.replace(&placeholder(i), block);
        }
        restored
    }
}

fn placeholder(index: usize) -> String {
    format!("{}{}__", PLACEHOLDER_PREFIX, index)
}

/// Masks dbt Jinja in model SQL
pub struct TemplateMasker;

impl TemplateMasker {
    /// Mask every template block
    ///
    /// - `{{ config(...) }}` is dropped (it emits no SQL)
    /// - other `{{ ... }}` blocks become `__dbt_expr_<n>__`
    /// - `{% ... %}` tags and `{# ... #}` comments are dropped
    ///
    /// Dropped blocks keep their line breaks so line numbers stay stable.
    /// An unclosed block is left as literal text.
    pub fn mask(sql: &str) -> MaskedSql {
        let mut out = String::with_capacity(sql.len());
        let mut blocks = Vec::new();
        let mut references = Vec::new();
        let mut rest = sql;

        while let Some(open) = find_block_start(rest) {
            let kind = rest.as_bytes()[open + 1];
            let closer = match kind {
                b'{' => "}}",
                b'%' => "%}",
                _ => "#}",
            };

            let Some(close) = rest[open + 2..].find(closer) else {
                break;
            };
            let end = open + 2 + close + closer.len();
            let block = &rest[open..end];

            out.push_str(&rest[..open]);

            if kind == b'{' {
                let content = block_content(block);
                if content.starts_with("config(") || content.starts_with("config (") {
                    out.push_str(&line_breaks(block));
                } else {
                    if let Some(reference) = Self::parse_reference(content) {
                        references.push(reference);
                    }
                    out.push_str(&placeholder(blocks.len()));
                    blocks.push(block.to_string());
                }
            } else {
                let breaks = line_breaks(block);
                out.push_str(if breaks.is_empty() { " " } else { &breaks });
            }

            rest = &rest[end..];
        }

        out.push_str(rest);

        MaskedSql {
            sql: out,
            blocks,
            references,
        }
    }

    /// Parse `ref(...)` or `source(...)` from a block's content
    fn parse_reference(content: &str) -> Option<DbtReference> {
        if let Some(inner) = content.strip_prefix("ref(").and_then(|s| s.strip_suffix(')')) {
            let args = Self::string_args(inner)?;
            return match args.as_slice() {
                [model] => Some(DbtReference::Ref {
                    package: None,
                    model_name: model.to_string(),
                }),
                [package, model] => Some(DbtReference::Ref {
                    package: Some(package.to_string()),
                    model_name: model.to_string(),
                }),
                _ => None,
            };
        }

        if let Some(inner) = content.strip_prefix("source(").and_then(|s| s.strip_suffix(')')) {
            let args = Self::string_args(inner)?;
            if let [source_name, table_name] = args.as_slice() {
                return Some(DbtReference::Source {
                    source_name: source_name.to_string(),
                    table_name: table_name.to_string(),
                });
            }
        }

        None
    }

    /// Split comma-separated quoted arguments
    fn string_args(inner: &str) -> Option<Vec<&str>> {
        inner.split(',').map(Self::extract_string_literal).collect()
    }

    /// Extract string literal from quoted string
    ///
    /// Handles both single and double quotes.
    fn extract_string_literal(s: &str) -> Option<&str> {
        let trimmed = s.trim();

        if let Some(content) = trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
            return Some(content);
        }

        if let Some(content) = trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            return Some(content);
        }

        None
    }
}

fn find_block_start(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    (0..bytes.len().saturating_sub(1))
        .find(|&i| bytes[i] == b'{' && matches!(bytes[i + 1], b'{' | b'%' | b'#'))
}

/// Content between the delimiters, without whitespace-control dashes
fn block_content(block: &str) -> &str {
    block[2..block.len() - 2].trim().trim_matches('-').trim()
}

fn line_breaks(block: &str) -> String {
    "\n".repeat(block.matches('\n').count())
}
