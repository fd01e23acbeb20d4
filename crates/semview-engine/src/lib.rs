//! Semantic view generation
//!
//! Provides:
//! - Rendering of a classification into semantic view SQL
//! - Versioned output files that never overwrite earlier versions
//! - The per-model pipeline from discovery to written artifact

pub mod render;
pub mod versioning;
pub mod pipeline;

pub use render::{escape_comment, RenderError, SemanticViewRenderer};
pub use versioning::{VersionManager, WriteError};
pub use pipeline::{GeneratedView, Pipeline};
