//! Automated Dataset Report Library
//!
//! Turns an uploaded tabular dataset into a paginated PDF report, built on
//! Polars for data handling, plotters for charts and printpdf for output.
//!
//! # Overview
//!
//! One request flows through these stages:
//!
//! - **Loading**: CSV, Excel (`.xlsx`/`.xls`) or JSON, dispatched on the file extension
//! - **Summarizing**: row count, per-column missing counts, descriptive statistics
//!   of numeric columns
//! - **Rendering**: distribution, top-category and correlation charts as PNG images
//! - **Assembling**: header, summary table, data sample and charts laid out on
//!   US Letter pages with a footer
//! - **Cleanup**: the stored upload and chart images are removed on success
//!   and on failure
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use insightflow::{Pipeline, ReportSpec, Upload};
//!
//! let pipeline = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?;
//!
//! let upload = Upload::from_path("data/sales.csv")?;
//! let result = pipeline.run(&upload, &ReportSpec::new("Sales Overview", "out/sales.pdf"))?;
//!
//! println!("{} pages written to {}", result.report.page_count, result.report.path.display());
//! ```
//!
//! # Configuration
//!
//! Use [`PipelineConfig`] to adjust the workspace location, the data sample
//! and chart styling:
//!
//! ```rust,ignore
//! use insightflow::config::*;
//!
//! let config = PipelineConfig::builder()
//!     .workspace_root("/var/tmp/insightflow")
//!     .preview_rows(20)
//!     .top_categories(5)
//!     .font_path("/usr/share/fonts/TTF/DejaVuSans.ttf")
//!     .build()?;
//! ```
//!
//! # Components
//!
//! Every stage is usable on its own:
//!
//! ```rust,ignore
//! use insightflow::{ChartRenderer, DatasetLoader, ReportAssembler, StatisticsEngine};
//!
//! let df = DatasetLoader::load("data.xlsx")?;
//! let stats = StatisticsEngine::summarize(&df)?;
//! let charts = ChartRenderer::default().render(&df, Path::new("charts"))?;
//! let outcome = ReportAssembler::default().build(&spec, &stats, &df, &charts)?;
//! insightflow::artifacts::cleanup(&charts);
//! ```

pub mod artifacts;
pub mod charts;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod reporting;
pub mod stats;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use artifacts::{ArtifactManager, SessionWorkspace, cleanup};
pub use charts::ChartRenderer;
pub use config::{
    ChartTheme, ConfigValidationError, DEFAULT_REPORT_TITLE, PipelineConfig,
    PipelineConfigBuilder, ReportSpec,
};
pub use error::{ReportError, Result, ResultExt};
pub use loader::{DatasetLoader, InputFormat};
pub use pipeline::{
    AnalysisSession, ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineStage,
    ProgressReporter, ProgressUpdate, Upload,
};
pub use reporting::ReportAssembler;
pub use stats::StatisticsEngine;
pub use types::{
    ChartArtifact, ChartKind, ColumnKind, NumericSummary, PipelineResult, ReportOutcome,
    SummaryStats,
};
pub use utils::{
    DtypeCategory, get_dtype_category, is_numeric_dtype, sanitize_file_name,
    validate_file_extension,
};
