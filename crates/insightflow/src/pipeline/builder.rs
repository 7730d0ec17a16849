//! The report pipeline and its builder.

use crate::artifacts::{ArtifactManager, SessionWorkspace};
use crate::charts::ChartRenderer;
use crate::config::{ConfigValidationError, PipelineConfig, ReportSpec};
use crate::error::{Result, ResultExt};
use crate::loader::{DatasetLoader, InputFormat};
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::reporting::ReportAssembler;
use crate::stats::StatisticsEngine;
use crate::types::{ChartArtifact, PipelineResult, ReportOutcome, SummaryStats};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// An uploaded file: its original name and raw content.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file as an upload named after its file name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).context(format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { file_name, bytes })
    }
}

#[derive(Clone, Default)]
struct Progress(Option<Arc<dyn ProgressReporter>>);

impl Progress {
    fn report(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.0 {
            reporter.report(update);
        }
    }

    fn stage(&self, stage: PipelineStage, stage_progress: f32, message: impl Into<String>) {
        self.report(ProgressUpdate::new(stage, stage_progress, message));
    }
}

/// The report pipeline: load, summarize, chart, assemble.
///
/// A pipeline holds only configuration and can serve any number of
/// requests, including concurrently; every request gets its own session
/// workspace.
///
/// # Example
///
/// ```rust,ignore
/// use insightflow::{Pipeline, Upload};
/// use insightflow::config::ReportSpec;
///
/// let pipeline = Pipeline::builder().build()?;
/// let upload = Upload::from_path("data/sales.csv")?;
///
/// // One shot: everything temporary is removed before returning
/// let result = pipeline.run(&upload, &ReportSpec::new("Sales", "out/sales.pdf"))?;
///
/// // Or interactively: inspect first, build the report on request
/// let session = pipeline.analyze(&upload)?;
/// println!("{} rows", session.stats().total_records);
/// session.build_report(&ReportSpec::new("Sales", "out/sales.pdf"))?;
/// session.close()?;
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress: Progress,
    renderer: ChartRenderer,
    assembler: ReportAssembler,
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load, summarize and chart an upload, keeping the results in a session.
    ///
    /// The returned session owns the stored upload and the chart images;
    /// they are removed when it is closed or dropped. On error nothing is
    /// left behind.
    pub fn analyze(&self, upload: &Upload) -> Result<AnalysisSession> {
        self.analyze_internal(upload, true).inspect_err(|e| self.fail(e))
    }

    /// Produce a report for an upload in one call.
    ///
    /// Charts are only rendered when `spec.include_visuals` is set. Temporary
    /// files are removed whether or not the run succeeds.
    pub fn run(&self, upload: &Upload, spec: &ReportSpec) -> Result<PipelineResult> {
        let started = Instant::now();
        match self.run_internal(upload, spec, started) {
            Ok(result) => {
                self.progress.report(ProgressUpdate::complete(format!(
                    "Report written to {}",
                    result.report.path.display()
                )));
                info!("Pipeline completed in {}ms", result.duration_ms);
                Ok(result)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn fail(&self, e: &crate::error::ReportError) {
        error!("Pipeline error: {}", e);
        self.progress.report(ProgressUpdate::failed(e.to_string()));
    }

    fn run_internal(
        &self,
        upload: &Upload,
        spec: &ReportSpec,
        started: Instant,
    ) -> Result<PipelineResult> {
        let session = self.analyze_internal(upload, spec.include_visuals)?;
        let report = session.build_report(spec);
        let stats = session.stats().clone();
        let charts = session.artifacts().iter().map(|a| a.kind).collect();

        self.progress
            .stage(PipelineStage::Cleanup, 0.0, "Removing temporary files...");
        let closed = session.close();
        let report = report?;
        closed?;

        Ok(PipelineResult {
            stats,
            charts,
            report,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn analyze_internal(&self, upload: &Upload, render_charts: bool) -> Result<AnalysisSession> {
        self.progress
            .stage(PipelineStage::Initializing, 0.0, "Preparing session...");
        InputFormat::from_path(&upload.file_name)?;
        let workspace = SessionWorkspace::create(&self.config.workspace_root)
            .context("Failed to create session workspace")?;

        self.progress.stage(
            PipelineStage::Loading,
            0.0,
            format!("Loading {}...", upload.file_name),
        );
        let (upload_path, dataset) =
            DatasetLoader::load_bytes(&upload.file_name, &upload.bytes, &workspace.upload_dir())?;
        info!("Loaded {} rows x {} columns", dataset.height(), dataset.width());

        self.progress
            .stage(PipelineStage::Summarizing, 0.0, "Computing statistics...");
        let stats = StatisticsEngine::summarize(&dataset)?;

        let mut artifacts = ArtifactManager::new();
        if render_charts {
            self.progress
                .stage(PipelineStage::Rendering, 0.0, "Rendering charts...");
            artifacts.track(self.renderer.render(&dataset, &workspace.charts_dir())?);
            self.progress.stage(
                PipelineStage::Rendering,
                1.0,
                format!("Rendered {} chart(s)", artifacts.artifacts().len()),
            );
        }

        Ok(AnalysisSession {
            dataset,
            stats,
            artifacts,
            upload_path,
            workspace: Some(workspace),
            assembler: self.assembler.clone(),
            progress: self.progress.clone(),
        })
    }
}

/// The analyzed state of one request.
///
/// Dropping the session removes its chart images, the stored upload and the
/// session directory.
pub struct AnalysisSession {
    dataset: DataFrame,
    stats: SummaryStats,
    artifacts: ArtifactManager,
    upload_path: PathBuf,
    workspace: Option<SessionWorkspace>,
    assembler: ReportAssembler,
    progress: Progress,
}

impl AnalysisSession {
    pub fn dataset(&self) -> &DataFrame {
        &self.dataset
    }

    pub fn stats(&self) -> &SummaryStats {
        &self.stats
    }

    pub fn artifacts(&self) -> &[ChartArtifact] {
        self.artifacts.artifacts()
    }

    /// Where the upload was stored inside the session workspace.
    pub fn upload_path(&self) -> &Path {
        &self.upload_path
    }

    pub fn workspace_path(&self) -> Option<&Path> {
        self.workspace.as_ref().map(SessionWorkspace::path)
    }

    /// Assemble the PDF report for this session.
    ///
    /// May be called more than once, e.g. with different titles.
    pub fn build_report(&self, spec: &ReportSpec) -> Result<ReportOutcome> {
        self.progress
            .stage(PipelineStage::Assembling, 0.0, "Assembling report...");
        let outcome = self
            .assembler
            .build(spec, &self.stats, &self.dataset, self.artifacts.artifacts())?;
        self.progress.stage(
            PipelineStage::Assembling,
            1.0,
            format!("Report has {} page(s)", outcome.page_count),
        );
        Ok(outcome)
    }

    /// Remove every temporary file of the session now.
    pub fn close(mut self) -> Result<()> {
        self.artifacts.cleanup();
        match self.workspace.take() {
            Some(workspace) => workspace.close(),
            None => Ok(()),
        }
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving stage updates.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let pipeline = Pipeline::builder()
    ///     .on_progress(|update| {
    ///         println!("[{:.0}%] {:?}: {}",
    ///             update.progress * 100.0,
    ///             update.stage,
    ///             update.message
    ///         );
    ///     })
    ///     .build()?;
    /// ```
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            renderer: ChartRenderer::from_config(&config),
            assembler: ReportAssembler::from_config(&config),
            progress: Progress(self.progress_reporter),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const CSV: &[u8] = b"age,city\n34,Paris\n28,Lyon\n45,Paris\n52,Nice\n39,Lyon\n";

    fn pipeline_in(root: &Path) -> Pipeline {
        Pipeline::builder()
            .config(PipelineConfig::builder().workspace_root(root).build().unwrap())
            .build()
            .unwrap()
    }

    fn session_dirs(root: &Path) -> usize {
        std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert_eq!(pipeline.config().preview_rows, 12);
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let config = PipelineConfig {
            preview_rows: 0,
            ..PipelineConfig::default()
        };
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_run_reports_stages_in_order() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();

        let pipeline = Pipeline::builder()
            .config(PipelineConfig::builder().workspace_root(root.path()).build().unwrap())
            .on_progress(move |update| stages_clone.lock().unwrap().push(update.stage))
            .build()
            .unwrap();

        let spec = ReportSpec::new("People", out.path().join("people.pdf"));
        let result = pipeline.run(&Upload::new("people.csv", CSV), &spec).unwrap();
        assert_eq!(result.stats.total_records, 5);

        let mut seen = stages.lock().unwrap().clone();
        seen.dedup();
        assert_eq!(
            seen,
            vec![
                PipelineStage::Initializing,
                PipelineStage::Loading,
                PipelineStage::Summarizing,
                PipelineStage::Rendering,
                PipelineStage::Assembling,
                PipelineStage::Cleanup,
                PipelineStage::Complete,
            ]
        );
        assert_eq!(session_dirs(root.path()), 0);
    }

    #[test]
    fn test_run_without_visuals_skips_charts() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let spec = ReportSpec::new("", out.path().join("r.pdf")).include_visuals(false);

        let result = pipeline_in(root.path())
            .run(&Upload::new("people.csv", CSV), &spec)
            .unwrap();
        assert!(result.charts.is_empty());
        assert_eq!(result.report.page_count, 1);
    }

    #[test]
    fn test_failed_run_reports_failure_and_cleans_up() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let last = Arc::new(Mutex::new(None));
        let last_clone = last.clone();

        let pipeline = Pipeline::builder()
            .config(PipelineConfig::builder().workspace_root(root.path()).build().unwrap())
            .on_progress(move |update| *last_clone.lock().unwrap() = Some(update.stage))
            .build()
            .unwrap();

        let spec = ReportSpec::new("x", out.path().join("broken.pdf"));
        let err = pipeline
            .run(&Upload::new("broken.xlsx", b"not a workbook".to_vec()), &spec)
            .unwrap_err();

        assert_eq!(err.error_code(), "PARSE_ERROR");
        assert_eq!(*last.lock().unwrap(), Some(PipelineStage::Failed));
        assert_eq!(session_dirs(root.path()), 0);
        assert!(!out.path().join("broken.pdf").exists());
    }

    #[test]
    fn test_unsupported_upload_creates_nothing() {
        let root = TempDir::new().unwrap();
        let err = pipeline_in(root.path())
            .analyze(&Upload::new("notes.txt", b"hello".to_vec()))
            .err()
            .unwrap();
        assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
        assert_eq!(session_dirs(root.path()), 0);
    }

    #[test]
    fn test_session_drop_removes_workspace() {
        let root = TempDir::new().unwrap();
        let session = pipeline_in(root.path())
            .analyze(&Upload::new("people.csv", CSV))
            .unwrap();

        let workspace = session.workspace_path().unwrap().to_path_buf();
        assert!(session.upload_path().starts_with(&workspace));
        assert_eq!(session.artifacts().len(), 2);
        assert!(session.artifacts().iter().all(|a| a.path().exists()));

        drop(session);
        assert!(!workspace.exists());
    }

    #[test]
    fn test_session_builds_report_twice() {
        let root = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let session = pipeline_in(root.path())
            .analyze(&Upload::new("people.csv", CSV))
            .unwrap();

        let first = session
            .build_report(&ReportSpec::new("One", out.path().join("one.pdf")))
            .unwrap();
        let second = session
            .build_report(&ReportSpec::new("Two", out.path().join("two.pdf")))
            .unwrap();
        assert_eq!(first.page_count, second.page_count);
        session.close().unwrap();
        assert!(out.path().join("one.pdf").exists());
    }
}
