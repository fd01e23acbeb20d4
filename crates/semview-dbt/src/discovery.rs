//! Discovery of semantic-view candidate models
//!
//! Walks model roots looking for folders named after the semantic convention
//! (`models/<project>/semantic/`) and lists the SQL files directly inside them.

use semview_core::{Config, Diagnostic, DiagnosticCode, Location, ModelDescriptor, RunReport, Severity};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Errors raised while walking model roots; never fatal to the run
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("model root does not exist: {0}")]
    MissingRoot(PathBuf),

    #[error("cannot read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

impl DiscoveryError {
    /// Convert to a run diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let path = match self {
            DiscoveryError::MissingRoot(path) => path,
            DiscoveryError::Unreadable { path, .. } => path,
        };

        Diagnostic::new(DiagnosticCode::DiscoveryUnreadablePath, Severity::Warn, self.to_string())
            .with_location(Location::new(path.display().to_string()))
    }
}

/// Finds SQL models under semantic folders
#[derive(Debug, Clone)]
pub struct ModelDiscoverer {
    semantic_dir: String,
    output_dir: String,
}

impl ModelDiscoverer {
    pub fn new(semantic_dir: impl Into<String>, output_dir: impl Into<String>) -> Self {
        Self {
            semantic_dir: semantic_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.semantic_dir.clone(), config.output_dir.clone())
    }

    /// Discover models under all roots, sorted by SQL path
    ///
    /// Unreadable paths are reported as warnings and skipped.
    pub fn discover(&self, roots: &[PathBuf], report: &mut RunReport) -> Vec<ModelDescriptor> {
        let mut models = BTreeMap::new();

        for root in roots {
            for error in self.discover_root(root, &mut models) {
                tracing::warn!(error = %error, "skipping unreadable path");
                report.add_diagnostic(error.to_diagnostic());
            }
        }

        let models: Vec<ModelDescriptor> = models.into_values().collect();
        report.set_models_found(models.len());
        models
    }

    fn discover_root(
        &self,
        root: &Path,
        models: &mut BTreeMap<PathBuf, ModelDescriptor>,
    ) -> Vec<DiscoveryError> {
        if !root.exists() {
            return vec![DiscoveryError::MissingRoot(root.to_path_buf())];
        }

        let mut errors = Vec::new();
        let output_dir = self.output_dir.as_str();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == output_dir));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    errors.push(DiscoveryError::Unreadable { path, message: e.to_string() });
                    continue;
                }
            };

            if entry.file_type().is_dir() && entry.file_name() == self.semantic_dir.as_str() {
                tracing::debug!(dir = %entry.path().display(), "found semantic folder");
                if let Err(e) = Self::collect_models(entry.path(), models) {
                    errors.push(e);
                }
            }
        }

        errors
    }

    /// List `*.sql` files directly inside a semantic folder
    fn collect_models(
        semantic_dir: &Path,
        models: &mut BTreeMap<PathBuf, ModelDescriptor>,
    ) -> Result<(), DiscoveryError> {
        let unreadable = |e: std::io::Error| DiscoveryError::Unreadable {
            path: semantic_dir.to_path_buf(),
            message: e.to_string(),
        };

        for entry in std::fs::read_dir(semantic_dir).map_err(unreadable)? {
            let path = entry.map_err(unreadable)?.path();

            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("sql") {
                continue;
            }

            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let mut descriptor = ModelDescriptor::new(name, path.clone(), semantic_dir);
            if let Some(metadata) = Self::companion_document(&path) {
                descriptor = descriptor.with_metadata(metadata);
            }

            models.insert(path, descriptor);
        }

        Ok(())
    }

    /// Same-named `.yml` (preferred) or `.yaml` next to the SQL file
    fn companion_document(sql_path: &Path) -> Option<PathBuf> {
        ["yml", "yaml"]
            .iter()
            .map(|ext| sql_path.with_extension(ext))
            .find(|candidate| candidate.is_file())
    }
}

impl Default for ModelDiscoverer {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "select 1 as id").unwrap();
    }

    #[test]
    fn finds_models_in_semantic_folders() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("models");

        touch(&root.join("shop/semantic/customers.sql"));
        touch(&root.join("shop/semantic/customers.yml"));
        touch(&root.join("shop/semantic/orders.sql"));
        touch(&root.join("shop/semantic/orders.yaml"));
        touch(&root.join("shop/staging/stg_orders.sql"));
        touch(&root.join("finance/marts/semantic/revenue.sql"));
        touch(&root.join("shop/semantic/semantic_views/customers_semantic_view.sql"));

        let mut report = RunReport::new();
        let models = ModelDiscoverer::default().discover(&[root.clone()], &mut report);

        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["revenue", "customers", "orders"]);
        assert_eq!(report.summary.models_found, 3);

        let customers = &models[1];
        assert_eq!(customers.metadata_path, Some(root.join("shop/semantic/customers.yml")));
        assert_eq!(customers.semantic_dir, root.join("shop/semantic"));
        assert_eq!(models[2].metadata_path, Some(root.join("shop/semantic/orders.yaml")));
        assert_eq!(models[0].metadata_path, None);
    }

    #[test]
    fn nested_sql_is_not_a_model() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("semantic/nested/deep.sql"));

        let mut report = RunReport::new();
        let models = ModelDiscoverer::default().discover(&[dir.path().to_path_buf()], &mut report);
        assert!(models.is_empty());
    }

    #[test]
    fn missing_root_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("semantic/a.sql"));

        let mut report = RunReport::new();
        let roots = vec![dir.path().join("does-not-exist"), dir.path().to_path_buf()];
        let models = ModelDiscoverer::default().discover(&roots, &mut report);

        assert_eq!(models.len(), 1);
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.diagnostics[0].code, DiagnosticCode::DiscoveryUnreadablePath);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_a_warning() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("models");
        touch(&root.join("shop/semantic/a.sql"));
        touch(&root.join("locked/semantic/b.sql"));

        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // permissions are not enforced for this user (root)
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut report = RunReport::new();
        let models = ModelDiscoverer::default().discover(&[root.clone()], &mut report);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.diagnostics[0].code, DiagnosticCode::DiscoveryUnreadablePath);
        assert_eq!(
            report.diagnostics[0].location.as_ref().map(|l| l.file.as_str()),
            Some(locked.display().to_string().as_str())
        );
    }

    #[test]
    fn overlapping_roots_do_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("models");
        touch(&root.join("p/semantic/a.sql"));

        let mut report = RunReport::new();
        let models = ModelDiscoverer::default()
            .discover(&[root.clone(), root.join("p")], &mut report);
        assert_eq!(models.len(), 1);
    }
}
