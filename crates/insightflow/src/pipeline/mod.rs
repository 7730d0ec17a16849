//! Pipeline module.
//!
//! Orchestrates one request end to end: session workspace, loading,
//! statistics, charts and report assembly, with progress reporting and
//! guaranteed cleanup of temporary files.

mod builder;
pub mod progress;

pub use builder::{AnalysisSession, Pipeline, PipelineBuilder, Upload};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
