//! Semantic view pipeline
//!
//! For each discovered model: extract columns, load descriptions, classify,
//! render and write the next version. Models are processed one at a time and
//! a failure only ends the model it belongs to.

use crate::render::SemanticViewRenderer;
use crate::versioning::VersionManager;
use semview_classifier::{Classifier, ClassifierBackend};
use semview_core::{Config, Diagnostic, DiagnosticCode, Location, ModelDescriptor, ModelOutcome, RunReport, Severity};
use semview_dbt::{MetadataLoader, ModelDiscoverer};
use semview_sql::ColumnExtractor;
use std::path::PathBuf;
use tracing::Instrument;

/// A rendered view, written or (on a dry run) not
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedView {
    pub model: String,
    pub path: PathBuf,
    pub version: u32,
    pub contents: String,
    pub written: bool,
}

pub struct Pipeline<B> {
    config: Config,
    discoverer: ModelDiscoverer,
    extractor: ColumnExtractor,
    classifier: Classifier<B>,
    renderer: SemanticViewRenderer,
    dry_run: bool,
}

impl<B: ClassifierBackend> Pipeline<B> {
    pub fn new(config: Config, backend: B) -> Result<Self, crate::render::RenderError> {
        Ok(Self {
            discoverer: ModelDiscoverer::from_config(&config),
            extractor: ColumnExtractor::new(&config.dialect),
            classifier: Classifier::from_config(backend, &config),
            renderer: SemanticViewRenderer::new(config.downstream_engine.clone())?,
            config,
            dry_run: false,
        })
    }

    /// Classify and render without writing files
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn classifier(&self) -> &Classifier<B> {
        &self.classifier
    }

    /// Process every model under `roots`, recording outcomes in `report`
    pub async fn run(&self, roots: &[PathBuf], report: &mut RunReport) -> Vec<GeneratedView> {
        let models = self.discoverer.discover(roots, report);
        tracing::info!(count = models.len(), "discovered semantic models");

        let mut generated = Vec::new();
        for model in &models {
            let (outcome, view) = self
                .process_model(model, report)
                .instrument(tracing::info_span!("model", name = %model.name))
                .await;
            report.record_outcome(&model.name, &model.sql_path, outcome);
            generated.extend(view);
        }

        generated
    }

    /// Process one model
    pub async fn process_model(
        &self,
        model: &ModelDescriptor,
        report: &mut RunReport,
    ) -> (ModelOutcome, Option<GeneratedView>) {
        let (sql, extracted) = match self.extractor.extract_file(&model.sql_path) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "skipping model");
                report.add_diagnostic(e.to_diagnostic(&model.sql_path).with_model(&model.name));
                return (ModelOutcome::Skipped { reason: e.to_string() }, None);
            }
        };

        if extracted.used_fallback {
            report.add_diagnostic(
                Diagnostic::new(
                    DiagnosticCode::SqlLexicalFallback,
                    Severity::Info,
                    "SQL parser rejected the model; columns were read from the select list tokens",
                )
                .with_model(&model.name)
                .with_location(Location::new(model.sql_path.display().to_string())),
            );
        }

        let mut columns = extracted.columns;
        let descriptions = MetadataLoader::load_for_model(model, &columns, report);
        descriptions.apply_to(&mut columns);
        tracing::debug!(columns = columns.len(), documented = descriptions.len(), "model inputs ready");

        let result = match self.classifier.classify(&model.name, &columns, &descriptions, &sql, report).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "classification failed");
                report.add_diagnostic(e.to_diagnostic(&model.name));
                return (ModelOutcome::Failed { reason: e.to_string() }, None);
            }
        };

        let contents = match self.renderer.render(&result) {
            Ok(contents) => contents,
            Err(e) => {
                report.add_diagnostic(e.to_diagnostic(&model.name));
                return (ModelOutcome::Failed { reason: e.to_string() }, None);
            }
        };

        let versions = VersionManager::for_model(model, &self.config.output_dir);
        let written = if self.dry_run {
            versions.next_version().map(|version| (version, versions.path_for(version)))
        } else {
            versions.write_next(&contents)
        };

        match written {
            Ok((version, path)) => {
                let needs_review = result.needing_review().count();
                let outcome = ModelOutcome::Generated {
                    path: path.clone(),
                    version,
                    needs_review,
                };
                let view = GeneratedView {
                    model: model.name.clone(),
                    path,
                    version,
                    contents,
                    written: !self.dry_run,
                };
                (outcome, Some(view))
            }
            Err(e) => {
                tracing::error!(error = %e, "could not write semantic view");
                report.add_diagnostic(e.to_diagnostic(&model.name));
                (ModelOutcome::Failed { reason: e.to_string() }, None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semview_classifier::{ClassifierError, MockClassifierBackend, MockClassifierBackendBuilder};
    use semview_core::{Classification, RetryConfig};
    use std::fs;
    use std::path::Path;

    fn config() -> Config {
        Config {
            retry: RetryConfig { max_attempts: 3, base_delay_ms: 0 },
            ..Config::default()
        }
    }

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn simple_response(id: &str) -> String {
        MockClassifierBackend::response_for(&[(id, Classification::Dimension), ("amount", Classification::Fact)])
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let semantic = dir.path().join("models/shop/semantic");
        write(&semantic.join("a_orders.sql"), "select order_id, amount from t");
        write(&semantic.join("b_refunds.sql"), "select refund_id, amount from t");
        write(&semantic.join("c_payments.sql"), "select payment_id, amount from t");

        let backend = MockClassifierBackendBuilder::new()
            .with_response("a_orders", simple_response("order_id"))
            .with_error("b_refunds", ClassifierError::ServerError { status: 500, message: "boom".into() })
            .with_response("c_payments", simple_response("payment_id"))
            .build();

        let pipeline = Pipeline::new(config(), backend).unwrap();
        let mut report = RunReport::new();
        let views = pipeline.run(&[dir.path().join("models")], &mut report).await;

        assert_eq!(views.len(), 2);
        assert_eq!(report.summary.generated, 2);
        assert_eq!(report.summary.failed, 1);
        assert!(report.has_failures());
        assert!(matches!(report.models[1].outcome, ModelOutcome::Failed { .. }));
        assert_eq!(pipeline.classifier().backend().call_count("b_refunds").await, 3);

        assert!(semantic.join("semantic_views/a_orders_semantic_view.sql").is_file());
        assert!(!semantic.join("semantic_views/b_refunds_semantic_view.sql").exists());
        assert!(semantic.join("semantic_views/c_payments_semantic_view.sql").is_file());
    }

    #[tokio::test]
    async fn unparseable_model_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("semantic/star.sql"), "select * from t");

        let pipeline = Pipeline::new(config(), MockClassifierBackend::new()).unwrap();
        let mut report = RunReport::new();
        let views = pipeline.run(&[dir.path().to_path_buf()], &mut report).await;

        assert!(views.is_empty());
        assert_eq!(report.summary.skipped, 1);
        assert!(!report.has_failures());
        assert_eq!(report.diagnostics[0].code, DiagnosticCode::SqlUnnamedColumn);
        assert_eq!(pipeline.classifier().backend().total_calls().await, 0);
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("semantic/orders.sql"), "select order_id, amount from t");

        let backend = MockClassifierBackendBuilder::new()
            .with_response("orders", simple_response("order_id"))
            .build();
        let pipeline = Pipeline::new(config(), backend).unwrap().with_dry_run(true);

        let mut report = RunReport::new();
        let views = pipeline.run(&[dir.path().to_path_buf()], &mut report).await;

        assert_eq!(views.len(), 1);
        assert!(!views[0].written);
        assert!(views[0].contents.contains("PRIMARY KEY (ORDER_ID)"));
        assert!(!dir.path().join("semantic/semantic_views").exists());
    }

    #[tokio::test]
    async fn reruns_add_versions() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("semantic/orders.sql"), "select order_id, amount from t");

        let backend = MockClassifierBackendBuilder::new()
            .with_response("orders", simple_response("order_id"))
            .build();
        let pipeline = Pipeline::new(config(), backend).unwrap();

        for expected in 1..=3 {
            let mut report = RunReport::new();
            let views = pipeline.run(&[dir.path().to_path_buf()], &mut report).await;
            assert_eq!(views[0].version, expected);
        }

        assert!(dir.path().join("semantic/semantic_views/orders_semantic_view_v3.sql").is_file());
    }
}
