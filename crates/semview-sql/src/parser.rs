//! SQL parsing using datafusion-sqlparser-rs
//!
//! Parses masked model SQL into an AST for projection extraction.

use sqlparser::ast::{Query, Statement};
use sqlparser::dialect::{BigQueryDialect, Dialect, GenericDialect, PostgreSqlDialect, SnowflakeDialect};
use sqlparser::parser::{Parser, ParserError};
use semview_core::DialectConfig;

/// SQL parser with configurable dialect
pub struct SqlParser {
    dialect: Box<dyn Dialect>,
}

impl SqlParser {
    /// Create a new SQL parser with the default (generic) dialect
    pub fn new() -> Self {
        Self {
            dialect: Box::new(GenericDialect {}),
        }
    }

    /// Create a SQL parser for BigQuery
    pub fn bigquery() -> Self {
        Self {
            dialect: Box::new(BigQueryDialect {}),
        }
    }

    /// Create a SQL parser for PostgreSQL
    pub fn postgres() -> Self {
        Self {
            dialect: Box::new(PostgreSqlDialect {}),
        }
    }

    /// Create a SQL parser for Snowflake
    pub fn snowflake() -> Self {
        Self {
            dialect: Box::new(SnowflakeDialect {}),
        }
    }

    /// Create a parser from a dialect config
    pub fn from_dialect(dialect: &DialectConfig) -> Self {
        match dialect {
            DialectConfig::BigQuery => Self::bigquery(),
            DialectConfig::Snowflake => Self::snowflake(),
            DialectConfig::Postgres => Self::postgres(),
            DialectConfig::Ansi => Self::new(),
        }
    }

    /// The dialect, for tokenizing
    pub fn dialect(&self) -> &dyn Dialect {
        &*self.dialect
    }

    /// Parse SQL string into AST
    pub fn parse(&self, sql: &str) -> Result<ParsedSql, ParseError> {
        Parser::parse_sql(&*self.dialect, sql)
            .map(|statements| ParsedSql { statements })
            .map_err(|error| ParseError { error })
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Successfully parsed SQL with AST
#[derive(Debug, Clone)]
pub struct ParsedSql {
    /// Parsed statements
    pub statements: Vec<Statement>,
}

impl ParsedSql {
    /// The last query statement; a dbt model compiles to a single query
    pub fn final_query(&self) -> Option<&Query> {
        self.statements.iter().rev().find_map(|statement| match statement {
            Statement::Query(query) => Some(query.as_ref()),
            _ => None,
        })
    }

    /// Count the number of statements
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}

/// SQL parsing error
#[derive(Debug)]
pub struct ParseError {
    /// Parser error from sqlparser
    pub error: ParserError,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SQL parse error: {}", self.error)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_select() {
        let parser = SqlParser::new();
        let parsed = parser.parse("SELECT id, name FROM users WHERE active = true").unwrap();

        assert_eq!(parsed.statement_count(), 1);
        assert!(parsed.final_query().is_some());
    }

    #[test]
    fn parse_with_cte() {
        let parser = SqlParser::snowflake();
        let sql = r#"
            WITH active_users AS (
                SELECT * FROM users WHERE active = true
            )
            SELECT id, name FROM active_users
        "#;

        assert!(parser.parse(sql).unwrap().final_query().is_some());
    }

    #[test]
    fn parse_invalid_sql() {
        let parser = SqlParser::new();
        let error = parser.parse("SELECT FROM WHERE").unwrap_err();
        assert!(error.to_string().starts_with("SQL parse error"));
    }

    #[test]
    fn raw_dbt_templates_do_not_parse() {
        // Template blocks must be masked first
        let parser = SqlParser::snowflake();
        assert!(parser.parse("SELECT id FROM {{ ref('users') }}").is_err());
    }

    #[test]
    fn different_dialects() {
        let sql = "SELECT id FROM users";

        for dialect in [DialectConfig::Ansi, DialectConfig::BigQuery, DialectConfig::Postgres, DialectConfig::Snowflake] {
            assert!(SqlParser::from_dialect(&dialect).parse(sql).is_ok());
        }
    }
}
