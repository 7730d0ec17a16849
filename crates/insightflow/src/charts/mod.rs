//! Chart rendering.
//!
//! [`ChartRenderer::render`] produces up to three PNG images for a dataset,
//! always in this order:
//!
//! 1. distribution of the first numeric column (histogram + density curve)
//! 2. top categories of the first categorical column
//! 3. correlation heatmap, when there are at least two numeric columns
//!
//! The numbers behind each chart live in [`model`]; painting is private.

mod draw;
pub mod model;

use crate::config::{ChartTheme, PipelineConfig};
use crate::error::{ReportError, Result, ResultExt};
use crate::types::{ChartArtifact, ChartKind, ColumnKind};
use crate::utils::{numeric_values, optional_numeric_values};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Samples along the density curve.
const KDE_POINTS: usize = 200;

/// Renders chart images for a dataset into a directory.
#[derive(Debug, Clone)]
pub struct ChartRenderer {
    theme: ChartTheme,
    top_n: usize,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl ChartRenderer {
    pub fn new(theme: ChartTheme, top_n: usize) -> Self {
        Self { theme, top_n }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.theme.clone(), config.top_categories)
    }

    pub fn theme(&self) -> &ChartTheme {
        &self.theme
    }

    /// Render every applicable chart into `output_dir`.
    ///
    /// The directory is created if needed. Existing images with the same
    /// names are overwritten, so calling this twice re-renders everything.
    /// A dataset without numeric or categorical columns yields no charts.
    pub fn render(&self, df: &DataFrame, output_dir: &Path) -> Result<Vec<ChartArtifact>> {
        std::fs::create_dir_all(output_dir)
            .context(format!("Failed to create chart directory {}", output_dir.display()))?;

        let numeric: Vec<&Series> = columns_of_kind(df, ColumnKind::Numeric);
        let categorical: Vec<&Series> = columns_of_kind(df, ColumnKind::Categorical);
        debug!(
            "Chart candidates: {} numeric, {} categorical",
            numeric.len(),
            categorical.len()
        );
        if numeric.is_empty() && categorical.is_empty() {
            info!("No chartable columns, skipping visuals");
            return Ok(Vec::new());
        }

        let font = draw::font_family(self.theme.font_path.as_deref());
        let mut artifacts = Vec::with_capacity(ChartKind::ALL.len());

        if let Some(series) = numeric.first() {
            let column = series.name().to_string();
            let values = numeric_values(series)?;
            let hist = model::histogram(&values);
            let curve = model::kde_curve(&values, KDE_POINTS, hist.total() as f64 * hist.bin_width);
            artifacts.push(self.paint(ChartKind::Distribution, output_dir, font.as_deref(), |buf, font| {
                draw::distribution(buf, &self.theme, &column, &hist, &curve, font)
            })?);
        }

        if let Some(series) = categorical.first() {
            let column = series.name().to_string();
            let ranking = model::top_categories(series, self.top_n)?;
            artifacts.push(self.paint(ChartKind::TopCategories, output_dir, font.as_deref(), |buf, font| {
                draw::top_categories(buf, &self.theme, &column, &ranking, font)
            })?);
        }

        if numeric.len() >= 2 {
            let names: Vec<String> = numeric.iter().map(|s| s.name().to_string()).collect();
            let columns = numeric
                .iter()
                .map(|s| optional_numeric_values(s))
                .collect::<PolarsResult<Vec<_>>>()?;
            let matrix = model::correlation_matrix(&columns);
            artifacts.push(self.paint(ChartKind::Correlation, output_dir, font.as_deref(), |buf, font| {
                draw::correlation(buf, &self.theme, &names, &matrix, font)
            })?);
        }

        info!("Rendered {} chart(s) into {}", artifacts.len(), output_dir.display());
        Ok(artifacts)
    }

    /// Paint one chart, retrying without text if the text pass fails, and
    /// write it as PNG. Drawing failures are `Render` errors; failing to
    /// write the file is an `Io` error.
    fn paint<F>(
        &self,
        kind: ChartKind,
        dir: &Path,
        font: Option<&str>,
        painter: F,
    ) -> Result<ChartArtifact>
    where
        F: Fn(&mut [u8], Option<&str>) -> draw::DrawResult,
    {
        let size = draw::canvas_size(kind, &self.theme);
        let mut buffer = draw::canvas_buffer(size);
        let outcome = match painter(&mut buffer, font) {
            Err(e) if font.is_some() => {
                warn!(
                    "Drawing {} with text failed ({}), retrying without text",
                    kind.display_name(),
                    e
                );
                painter(&mut buffer, None)
            }
            other => other,
        };
        let render_error = |e: Box<dyn std::error::Error + Send + Sync>| ReportError::Render {
            chart: kind.file_stem().to_string(),
            reason: e.to_string(),
        };
        outcome.map_err(render_error)?;
        let png = draw::encode_png(&buffer, size).map_err(render_error)?;

        let path = dir.join(kind.file_name());
        std::fs::write(&path, png).context(format!("Failed to write chart {}", path.display()))?;
        debug!("Wrote {}", path.display());
        Ok(ChartArtifact::new(kind, path))
    }
}

fn columns_of_kind(df: &DataFrame, kind: ColumnKind) -> Vec<&Series> {
    df.get_columns()
        .iter()
        .map(|c| c.as_materialized_series())
        .filter(|s| ColumnKind::of(s.dtype()) == kind)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn renderer() -> ChartRenderer {
        ChartRenderer::new(ChartTheme::default(), 10)
    }

    fn kinds(artifacts: &[ChartArtifact]) -> Vec<ChartKind> {
        artifacts.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_all_three_charts_in_order() {
        let dir = TempDir::new().unwrap();
        let df = df!(
            "label" => &["a", "b", "a", "c", "a"],
            "x" => &[1.0, 2.0, 3.0, 4.0, 5.0],
            "y" => &[2i64, 4, 5, 4, 5]
        )
        .unwrap();

        let artifacts = renderer().render(&df, dir.path()).unwrap();
        assert_eq!(kinds(&artifacts), ChartKind::ALL.to_vec());
        for artifact in &artifacts {
            assert!(artifact.path().exists());
            assert_eq!(artifact.path().parent().unwrap(), dir.path());
        }
    }

    #[test]
    fn test_no_chartable_columns() {
        let dir = TempDir::new().unwrap();
        let df = df!("flag" => &[true, false, true]).unwrap();
        let artifacts = renderer().render(&df, dir.path()).unwrap();
        assert!(artifacts.is_empty());
    }

    #[test]
    fn test_single_numeric_column_skips_correlation() {
        let dir = TempDir::new().unwrap();
        let df = df!("x" => &[3.0, 3.0, 3.0]).unwrap();
        let artifacts = renderer().render(&df, dir.path()).unwrap();
        assert_eq!(kinds(&artifacts), vec![ChartKind::Distribution]);
    }

    #[test]
    fn test_categorical_only() {
        let dir = TempDir::new().unwrap();
        let df = df!("city" => &[Some("Paris"), None, Some("Lyon")]).unwrap();
        let artifacts = renderer().render(&df, dir.path()).unwrap();
        assert_eq!(kinds(&artifacts), vec![ChartKind::TopCategories]);
    }

    #[test]
    fn test_creates_missing_directory_and_rerenders() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let df = df!("x" => &[1.0, 2.0], "y" => &[2.0, 1.0]).unwrap();

        let first = renderer().render(&df, &nested).unwrap();
        let second = renderer().render(&df, &nested).unwrap();
        assert_eq!(first, second);
        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 2);
    }

    #[test]
    fn test_unwritable_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let df = df!("x" => &[1.0, 2.0]).unwrap();
        let err = renderer().render(&df, &blocker.join("charts")).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_chart_path_taken_by_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(ChartKind::Distribution.file_name())).unwrap();

        let df = df!("x" => &[1.0, 2.0, 3.0]).unwrap();
        let err = renderer().render(&df, dir.path()).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_infinite_values_still_render() {
        let dir = TempDir::new().unwrap();
        let df = CsvReadOptions::default()
            .into_reader_with_file_handle(std::io::Cursor::new(b"x,y\n1.0,2\ninf,3\n2.0,4\n".to_vec()))
            .finish()
            .unwrap();
        assert_eq!(df.column("x").unwrap().dtype(), &DataType::Float64);

        let artifacts = renderer().render(&df, dir.path()).unwrap();
        assert_eq!(
            kinds(&artifacts),
            vec![ChartKind::Distribution, ChartKind::Correlation]
        );
        assert!(artifacts.iter().all(|a| a.path().exists()));
    }

    #[test]
    fn test_themes_with_different_fonts_both_render() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.ttf");
        let bundled =
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts/DejaVuSans.ttf");
        let df = df!("label" => &["a", "b", "a"]).unwrap();

        for (i, font) in [Some(bundled), Some(missing), None].into_iter().enumerate() {
            let theme = ChartTheme {
                font_path: font,
                ..ChartTheme::default()
            };
            let out = dir.path().join(format!("run{i}"));
            let artifacts = ChartRenderer::new(theme, 5).render(&df, &out).unwrap();
            assert_eq!(kinds(&artifacts), vec![ChartKind::TopCategories]);
        }
    }
}
