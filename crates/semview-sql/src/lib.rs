//! SQL column extraction
//!
//! This crate handles:
//! - Masking dbt Jinja blocks ({{ }}, {% %}, {# #}) as opaque text
//! - Parsing SQL using datafusion-sqlparser-rs
//! - Reading the final projection of a model into an ordered column list
//! - A token-level fallback for SQL the parser does not accept

pub mod template;
pub mod parser;
pub mod projection;
pub mod lexical;
pub mod extractor;

pub use template::{DbtReference, MaskedSql, TemplateMasker};
pub use parser::{SqlParser, ParsedSql, ParseError};
pub use extractor::{ColumnExtractor, ExtractError, ExtractedModel};
