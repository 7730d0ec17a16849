//! Configuration types for the report pipeline.
//!
//! [`PipelineConfig`] holds the knobs that stay fixed for a long-lived
//! process (temp namespace, preview size, chart theme). [`ReportSpec`] is the
//! per-invocation request: title, visuals flag and output path.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default report title when the caller leaves it blank.
pub const DEFAULT_REPORT_TITLE: &str = "Data Analysis Report";

/// Colors are plain RGB triples so the theme stays serializable.
pub type Rgb = (u8, u8, u8);

/// Explicit styling for chart rendering.
///
/// Every render call receives its theme. Fonts are registered once per
/// distinct `font_path`, so renderers with different themes in one process
/// each draw with their own font.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartTheme {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels (the heatmap adds a little extra).
    pub height: u32,
    pub background: Rgb,
    pub panel: Rgb,
    pub foreground: Rgb,
    pub grid: Rgb,
    pub distribution_color: Rgb,
    pub categories_color: Rgb,
    pub correlation_color: Rgb,
    /// TrueType font used for captions and labels.
    /// If None, or if the file cannot be loaded, the bundled DejaVu Sans is used.
    pub font_path: Option<PathBuf>,
}

impl Default for ChartTheme {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            background: (0x0e, 0x11, 0x17),
            panel: (0x1e, 0x21, 0x30),
            foreground: (0xff, 0xff, 0xff),
            grid: (0x3a, 0x3f, 0x55),
            distribution_color: (0x00, 0xd1, 0xff),
            categories_color: (0xff, 0x00, 0xc8),
            correlation_color: (0x00, 0xff, 0x88),
            font_path: None,
        }
    }
}

/// Configuration for the report pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use insightflow::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .workspace_root("/var/tmp/insightflow")
///     .preview_rows(20)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory under which per-request session directories are created.
    /// Default: `{system temp}/insightflow`
    pub workspace_root: PathBuf,

    /// Rows shown in the report's data sample.
    /// Default: 12
    pub preview_rows: usize,

    /// Columns shown in the report's data sample.
    /// Default: 6
    pub preview_columns: usize,

    /// Number of categories in the top-categories chart.
    /// Default: 10
    pub top_categories: usize,

    /// Chart styling.
    pub theme: ChartTheme,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workspace_root: default_workspace_root(),
            preview_rows: 12,
            preview_columns: 6,
            top_categories: 10,
            theme: ChartTheme::default(),
        }
    }
}

fn default_workspace_root() -> PathBuf {
    std::env::temp_dir().join("insightflow")
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.preview_rows == 0 {
            return Err(ConfigValidationError::ZeroLimit("preview_rows".to_string()));
        }
        if self.preview_columns == 0 {
            return Err(ConfigValidationError::ZeroLimit(
                "preview_columns".to_string(),
            ));
        }
        if self.top_categories == 0 {
            return Err(ConfigValidationError::ZeroLimit(
                "top_categories".to_string(),
            ));
        }
        if self.theme.width < 100 || self.theme.height < 100 {
            return Err(ConfigValidationError::CanvasTooSmall {
                width: self.theme.width,
                height: self.theme.height,
            });
        }
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{0}': must be at least 1")]
    ZeroLimit(String),

    #[error("Chart canvas {width}x{height} is too small (minimum 100x100)")]
    CanvasTooSmall { width: u32, height: u32 },
}

impl From<ConfigValidationError> for crate::error::ReportError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::ReportError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    workspace_root: Option<PathBuf>,
    preview_rows: Option<usize>,
    preview_columns: Option<usize>,
    top_categories: Option<usize>,
    theme: Option<ChartTheme>,
    font_path: Option<PathBuf>,
}

impl PipelineConfigBuilder {
    /// Set the directory that holds per-request session directories.
    pub fn workspace_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(path.into());
        self
    }

    /// Set the number of rows in the report's data sample.
    pub fn preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = Some(rows);
        self
    }

    /// Set the number of columns in the report's data sample.
    pub fn preview_columns(mut self, columns: usize) -> Self {
        self.preview_columns = Some(columns);
        self
    }

    /// Set how many categories the bar chart shows.
    pub fn top_categories(mut self, n: usize) -> Self {
        self.top_categories = Some(n);
        self
    }

    /// Replace the whole chart theme.
    pub fn theme(mut self, theme: ChartTheme) -> Self {
        self.theme = Some(theme);
        self
    }

    /// Use a specific TrueType font for chart text.
    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_path = Some(path.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let mut theme = self.theme.unwrap_or_default();
        if let Some(font) = self.font_path {
            theme.font_path = Some(font);
        }

        let config = PipelineConfig {
            workspace_root: self.workspace_root.unwrap_or_else(default_workspace_root),
            preview_rows: self.preview_rows.unwrap_or(12),
            preview_columns: self.preview_columns.unwrap_or(6),
            top_categories: self.top_categories.unwrap_or(10),
            theme,
        };

        config.validate()?;
        Ok(config)
    }
}

/// Caller-supplied parameters for one report build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSpec {
    pub title: String,
    pub include_visuals: bool,
    pub target_path: PathBuf,
}

impl ReportSpec {
    /// A spec with visuals enabled. A blank title falls back to
    /// [`DEFAULT_REPORT_TITLE`].
    pub fn new(title: impl Into<String>, target_path: impl Into<PathBuf>) -> Self {
        let title = title.into();
        let title = if title.trim().is_empty() {
            DEFAULT_REPORT_TITLE.to_string()
        } else {
            title
        };
        Self {
            title,
            include_visuals: true,
            target_path: target_path.into(),
        }
    }

    pub fn include_visuals(mut self, include: bool) -> Self {
        self.include_visuals = include;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.preview_rows, 12);
        assert_eq!(config.preview_columns, 6);
        assert_eq!(config.top_categories, 10);
        assert!(config.workspace_root.ends_with("insightflow"));
        assert!(config.theme.font_path.is_none());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .workspace_root("/tmp/reports")
            .preview_rows(5)
            .preview_columns(3)
            .top_categories(4)
            .font_path("/fonts/Inter.ttf")
            .build()
            .unwrap();

        assert_eq!(config.workspace_root, PathBuf::from("/tmp/reports"));
        assert_eq!(config.preview_rows, 5);
        assert_eq!(config.preview_columns, 3);
        assert_eq!(config.top_categories, 4);
        assert_eq!(
            config.theme.font_path,
            Some(PathBuf::from("/fonts/Inter.ttf"))
        );
    }

    #[test]
    fn test_validation_zero_preview_rows() {
        let result = PipelineConfig::builder().preview_rows(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::ZeroLimit(field) if field == "preview_rows"
        ));
    }

    #[test]
    fn test_validation_small_canvas() {
        let theme = ChartTheme {
            width: 50,
            ..ChartTheme::default()
        };
        let result = PipelineConfig::builder().theme(theme).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::CanvasTooSmall { width: 50, .. }
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.preview_rows, deserialized.preview_rows);
        assert_eq!(config.theme, deserialized.theme);
    }

    #[test]
    fn test_report_spec_defaults() {
        let spec = ReportSpec::new("  ", "out/report.pdf");
        assert_eq!(spec.title, DEFAULT_REPORT_TITLE);
        assert!(spec.include_visuals);

        let spec = ReportSpec::new("Quarterly", "out/q.pdf").include_visuals(false);
        assert_eq!(spec.title, "Quarterly");
        assert!(!spec.include_visuals);
    }
}
