//! Progress reporting for the report pipeline.
//!
//! Each request moves through a fixed sequence of [`PipelineStage`]s. A
//! [`ProgressReporter`] attached to the pipeline receives a
//! [`ProgressUpdate`] at the start and end of every stage, plus a terminal
//! `Complete` or `Failed` update.
//!
//! # Example
//!
//! ```rust,ignore
//! use insightflow::Pipeline;
//!
//! let pipeline = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Creating the session workspace
    Initializing,
    /// Storing and parsing the uploaded file
    Loading,
    /// Computing summary statistics
    Summarizing,
    /// Rendering chart images
    Rendering,
    /// Laying out and writing the PDF
    Assembling,
    /// Removing temporary files
    Cleanup,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Stages a successful run passes through, in order.
    pub const SEQUENCE: [PipelineStage; 6] = [
        Self::Initializing,
        Self::Loading,
        Self::Summarizing,
        Self::Rendering,
        Self::Assembling,
        Self::Cleanup,
    ];

    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Loading => "Loading Dataset",
            Self::Summarizing => "Summarizing",
            Self::Rendering => "Rendering Charts",
            Self::Assembling => "Assembling Report",
            Self::Cleanup => "Cleaning Up",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run spent in this stage (0.0 - 1.0).
    ///
    /// Weights of [`Self::SEQUENCE`] sum to 1.0; terminal stages weigh nothing.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.02,
            Self::Loading => 0.18,
            Self::Summarizing => 0.10,
            Self::Rendering => 0.35,
            Self::Assembling => 0.30,
            Self::Cleanup => 0.05,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::Loading => 0.02,
            Self::Summarizing => 0.20,
            Self::Rendering => 0.30,
            Self::Assembling => 0.65,
            Self::Cleanup => 0.95,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// A progress update sent to the [`ProgressReporter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receives progress updates from the pipeline.
///
/// Implementations must be `Send + Sync`: one pipeline may serve requests
/// from several threads at once.
///
/// # Example
///
/// ```rust,ignore
/// use insightflow::{ProgressReporter, ProgressUpdate};
///
/// struct LogReporter;
///
/// impl ProgressReporter for LogReporter {
///     fn report(&self, update: ProgressUpdate) {
///         tracing::info!("{}: {}", update.stage.display_name(), update.message);
///     }
/// }
/// ```
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(PipelineStage::Rendering, 0.5, "Rendering...");
        assert_eq!(update.stage, PipelineStage::Rendering);
        assert_eq!(update.stage_progress, 0.5);
        assert!((update.progress - 0.475).abs() < 1e-6);
        assert_eq!(update.message, "Rendering...");
    }

    #[test]
    fn test_progress_update_terminal() {
        let done = ProgressUpdate::complete("Done");
        assert_eq!(done.stage, PipelineStage::Complete);
        assert_eq!(done.progress, 1.0);

        let failed = ProgressUpdate::failed("boom");
        assert_eq!(failed.stage, PipelineStage::Failed);
        assert_eq!(failed.message, "boom");
    }

    #[test]
    fn test_stage_weights_sum() {
        let total: f32 = PipelineStage::SEQUENCE.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 0.001, "Weights should sum to 1.0");
    }

    #[test]
    fn test_base_progress_is_cumulative() {
        let mut expected = 0.0;
        for stage in PipelineStage::SEQUENCE {
            assert!((stage.base_progress() - expected).abs() < 0.001, "{stage:?}");
            expected += stage.weight();
        }
        assert!((PipelineStage::Complete.base_progress() - expected).abs() < 0.001);
    }

    #[test]
    fn test_closure_progress_reporter() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        reporter.report(ProgressUpdate::new(PipelineStage::Loading, 0.0, "Test"));
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stage_json_values() {
        let expectations = [
            (PipelineStage::Initializing, "\"initializing\""),
            (PipelineStage::Loading, "\"loading\""),
            (PipelineStage::Summarizing, "\"summarizing\""),
            (PipelineStage::Rendering, "\"rendering\""),
            (PipelineStage::Assembling, "\"assembling\""),
            (PipelineStage::Cleanup, "\"cleanup\""),
            (PipelineStage::Complete, "\"complete\""),
            (PipelineStage::Failed, "\"failed\""),
        ];

        for (stage, expected_json) in expectations {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, expected_json);
        }
    }
}
