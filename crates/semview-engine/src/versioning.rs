//! Versioned output files
//!
//! The first view of a model is `<model>_semantic_view.sql`; later ones are
//! `<model>_semantic_view_v2.sql`, `_v3`, ... Existing files are never touched.

use regex::Regex;
use semview_core::{Diagnostic, DiagnosticCode, Location, ModelDescriptor, Severity};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} already exists")]
    AlreadyExists { path: PathBuf },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl WriteError {
    pub fn to_diagnostic(&self, model: &str) -> Diagnostic {
        let diag = Diagnostic::new(DiagnosticCode::WriteError, Severity::Error, self.to_string()).with_model(model);

        match self {
            WriteError::CreateDir { path, .. }
            | WriteError::ReadDir { path, .. }
            | WriteError::AlreadyExists { path }
            | WriteError::Write { path, .. } => diag.with_location(Location::new(path.display().to_string())),
            WriteError::Pattern(_) => diag,
        }
    }
}

/// Version bookkeeping for one model's output directory
#[derive(Debug, Clone)]
pub struct VersionManager {
    directory: PathBuf,
    model: String,
}

impl VersionManager {
    pub fn new(directory: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            model: model.into(),
        }
    }

    /// Manager for `<semantic dir>/<output_dir>`
    pub fn for_model(model: &ModelDescriptor, output_dir: &str) -> Self {
        Self::new(model.semantic_dir.join(output_dir), &model.name)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File name for a version; version 1 has no suffix
    pub fn file_name(&self, version: u32) -> String {
        if version <= 1 {
            format!("{}_semantic_view.sql", self.model)
        } else {
            format!("{}_semantic_view_v{}.sql", self.model, version)
        }
    }

    pub fn path_for(&self, version: u32) -> PathBuf {
        self.directory.join(self.file_name(version))
    }

    /// Versions present on disk, ascending
    ///
    /// A missing directory has no versions.
    pub fn existing_versions(&self) -> Result<Vec<u32>, WriteError> {
        if !self.directory.is_dir() {
            return Ok(Vec::new());
        }

        let pattern = Regex::new(&format!(r"^{}_semantic_view(?:_v(\d+))?\.sql$", regex::escape(&self.model)))?;
        let read_dir_error = |source| WriteError::ReadDir {
            path: self.directory.clone(),
            source,
        };

        let mut versions = Vec::new();
        for entry in std::fs::read_dir(&self.directory).map_err(read_dir_error)? {
            let entry = entry.map_err(read_dir_error)?;
            let name = entry.file_name();
            let Some(captures) = name.to_str().and_then(|n| pattern.captures(n)) else {
                continue;
            };

            let version = match captures.get(1) {
                Some(digits) => match digits.as_str().parse::<u32>() {
                    Ok(version) => version,
                    Err(_) => continue,
                },
                None => 1,
            };
            versions.push(version);
        }

        versions.sort_unstable();
        Ok(versions)
    }

    /// The version the next write would produce
    ///
    /// Read-only: calling it repeatedly without writing gives the same answer.
    pub fn next_version(&self) -> Result<u32, WriteError> {
        Ok(self.existing_versions()?.last().map_or(1, |max| max.saturating_add(1)))
    }

    /// Write `contents` as the next version
    ///
    /// Creates the directory if needed. The file is created exclusively, so
    /// a concurrent writer can make this fail but never lose a file.
    pub fn write_next(&self, contents: &str) -> Result<(u32, PathBuf), WriteError> {
        std::fs::create_dir_all(&self.directory).map_err(|source| WriteError::CreateDir {
            path: self.directory.clone(),
            source,
        })?;

        let version = self.next_version()?;
        let path = self.path_for(version);

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::AlreadyExists => WriteError::AlreadyExists { path: path.clone() },
                _ => WriteError::Write { path: path.clone(), source },
            })?;

        file.write_all(contents.as_bytes())
            .map_err(|source| WriteError::Write { path: path.clone(), source })?;

        tracing::info!(model = %self.model, version, path = %path.display(), "wrote semantic view");
        Ok((version, path))
    }
}
