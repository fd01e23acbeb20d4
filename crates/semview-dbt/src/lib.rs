//! dbt project layout and documentation
//!
//! This crate handles:
//! - Discovering semantic-view candidate models under model roots
//! - Loading column descriptions from companion properties YAML

pub mod discovery;
pub mod metadata;

pub use discovery::{DiscoveryError, ModelDiscoverer};
pub use metadata::{MetadataError, MetadataLoader};
