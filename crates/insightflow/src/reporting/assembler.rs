use super::layout::{
    Align, Flowable, Footer, PageGeometry, Table, TableStyle, TextStyle, paginate, scale_to_fit,
};
use super::pdf;
use crate::config::{PipelineConfig, ReportSpec, Rgb};
use crate::error::{Result, ResultExt};
use crate::types::{ChartArtifact, ReportOutcome, SummaryStats};
use crate::utils::{display_value, format_thousands};
use chrono::Local;
use polars::prelude::*;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

// ============================================================================
// Palette and metrics
// ============================================================================

const PRIMARY: Rgb = (0x00, 0xd1, 0xff);
const SECONDARY: Rgb = (0x1e, 0x1e, 0x2f);
const WHITESMOKE: Rgb = (0xf5, 0xf5, 0xf5);
const LIGHT_GREY: Rgb = (0xd3, 0xd3, 0xd3);
const GREY: Rgb = (0x80, 0x80, 0x80);
const SAMPLE_HEADER: Rgb = (0xf0, 0xf4, 0xf7);
const BLACK: Rgb = (0, 0, 0);

const INCH: f32 = 72.0;

/// Width of the header rule and the data sample table.
const CONTENT_WIDTH: f32 = 612.0 - 1.5 * INCH;

const BANNER: &str = "INSIGHTFLOW | AUTOMATED INTELLIGENCE";
const FOOTER_LABEL: &str = "InsightFlow Automated Report";
const NOT_AVAILABLE: &str = "N/A";

/// Builds the PDF report from summary statistics, a dataset preview and
/// rendered charts.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    preview_rows: usize,
    preview_columns: usize,
    geometry: PageGeometry,
}

impl Default for ReportAssembler {
    fn default() -> Self {
        Self::new(12, 6)
    }
}

impl ReportAssembler {
    pub fn new(preview_rows: usize, preview_columns: usize) -> Self {
        Self {
            preview_rows,
            preview_columns,
            geometry: PageGeometry::LETTER,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.preview_rows, config.preview_columns)
    }

    /// Write the report to `spec.target_path`.
    ///
    /// The document is produced in memory and then moved into place, so a
    /// failed build never leaves a partial file at the target.
    ///
    /// # Errors
    ///
    /// - [`ReportError::Io`](crate::error::ReportError::Io) when the target
    ///   directory cannot be created or written
    /// - [`ReportError::Layout`](crate::error::ReportError::Layout) when the
    ///   content cannot be placed or the PDF backend fails
    pub fn build(
        &self,
        spec: &ReportSpec,
        stats: &SummaryStats,
        dataset: &DataFrame,
        artifacts: &[ChartArtifact],
    ) -> Result<ReportOutcome> {
        info!("Assembling report '{}'", spec.title);
        let flowables = self.flowables(spec, stats, dataset, artifacts)?;
        let pages = paginate(&flowables, &self.geometry, &footer())?;
        let bytes = pdf::render(&spec.title, &self.geometry, &pages)?;

        write_atomically(&spec.target_path, &bytes)?;
        info!(
            "Report written to {} ({} pages, {} bytes)",
            spec.target_path.display(),
            pages.len(),
            bytes.len()
        );

        Ok(ReportOutcome {
            path: spec.target_path.clone(),
            page_count: pages.len(),
            bytes_written: bytes.len(),
        })
    }

    /// The report content, top to bottom.
    pub(crate) fn flowables(
        &self,
        spec: &ReportSpec,
        stats: &SummaryStats,
        dataset: &DataFrame,
        artifacts: &[ChartArtifact],
    ) -> Result<Vec<Flowable>> {
        let mut flowables = header(&spec.title);

        flowables.push(section_title("Intelligence Summary"));
        flowables.push(Flowable::Table(summary_table(stats)));
        flowables.push(Flowable::Spacer(0.3 * INCH));

        flowables.push(section_title("Raw Data Sample"));
        let (columns, rows) = preview(dataset, self.preview_rows, self.preview_columns)?;
        if columns.is_empty() {
            flowables.push(Flowable::Paragraph {
                text: "The dataset has no columns to preview.".to_string(),
                style: TextStyle::new(10.0).color(GREY),
            });
        } else {
            flowables.push(Flowable::Table(sample_table(columns, rows)));
        }

        if spec.include_visuals {
            flowables.extend(visuals(artifacts));
        }
        Ok(flowables)
    }
}

fn footer() -> Footer {
    Footer {
        label: FOOTER_LABEL.to_string(),
        size: 9.0,
        color: BLACK,
        baseline: 0.75 * INCH,
        inset: INCH,
    }
}

fn header(title: &str) -> Vec<Flowable> {
    let generated = Local::now().format("%B %d, %Y | %H:%M:%S");
    vec![
        Flowable::Paragraph {
            text: title.to_string(),
            style: TextStyle::new(28.0)
                .bold()
                .color(SECONDARY)
                .spacing(0.0, 10.0),
        },
        Flowable::Paragraph {
            text: BANNER.to_string(),
            style: TextStyle::new(10.0).bold().color(PRIMARY),
        },
        Flowable::Paragraph {
            text: format!("REPORT GENERATED: {generated}"),
            style: TextStyle::new(9.0).color(GREY).align(Align::Right),
        },
        Flowable::Spacer(10.0),
        Flowable::Rule {
            width: CONTENT_WIDTH,
            thickness: 2.0,
            color: PRIMARY,
        },
        Flowable::Spacer(0.4 * INCH),
    ]
}

fn section_title(text: &str) -> Flowable {
    Flowable::Paragraph {
        text: text.to_string(),
        style: TextStyle::new(16.0)
            .bold()
            .color(SECONDARY)
            .spacing(20.0, 12.0),
    }
}

fn summary_table(stats: &SummaryStats) -> Table {
    Table {
        column_widths: vec![3.5 * INCH, 2.0 * INCH],
        header: vec!["METRIC".to_string(), "VALUE".to_string()],
        rows: vec![
            vec![
                "Total Observations".to_string(),
                format_thousands(stats.total_records),
            ],
            vec![
                "Missing Data Points".to_string(),
                format_thousands(stats.total_missing()),
            ],
            vec![
                "Data Integrity Score".to_string(),
                NOT_AVAILABLE.to_string(),
            ],
        ],
        style: TableStyle {
            font_size: 10.0,
            header_padding: 12.0,
            cell_padding: 5.0,
            header_fill: SECONDARY,
            header_text: WHITESMOKE,
            body_fill: Some(WHITESMOKE),
            body_text: BLACK,
            grid: LIGHT_GREY,
            grid_width: 0.5,
            header_rule: Some((PRIMARY, 2.0)),
        },
    }
}

fn sample_table(columns: Vec<String>, rows: Vec<Vec<String>>) -> Table {
    let width = CONTENT_WIDTH / columns.len() as f32;
    Table {
        column_widths: vec![width; columns.len()],
        header: columns.iter().map(|c| c.to_uppercase()).collect(),
        rows,
        style: TableStyle {
            font_size: 8.0,
            header_padding: 4.0,
            cell_padding: 4.0,
            header_fill: SAMPLE_HEADER,
            header_text: SECONDARY,
            body_fill: None,
            body_text: BLACK,
            grid: GREY,
            grid_width: 0.1,
            header_rule: None,
        },
    }
}

/// The first `max_rows` x `max_columns` cells of the dataset, rendered as text.
pub(crate) fn preview(
    dataset: &DataFrame,
    max_rows: usize,
    max_columns: usize,
) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let selected: Vec<&Column> = dataset.get_columns().iter().take(max_columns).collect();
    let names = selected.iter().map(|c| c.name().to_string()).collect();
    let height = dataset.height().min(max_rows);

    let rows = (0..height)
        .map(|row| {
            selected
                .iter()
                .map(|column| {
                    column
                        .get(row)
                        .map(|value| display_value(&value))
                        .context(format!("Failed to read preview cell {row}"))
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((names, rows))
}

fn visuals(artifacts: &[ChartArtifact]) -> Vec<Flowable> {
    let mut ordered: Vec<&ChartArtifact> = artifacts.iter().collect();
    ordered.sort_by_key(|a| a.kind);

    let images: Vec<Flowable> = ordered
        .into_iter()
        .filter_map(|artifact| chart_image(artifact.path()))
        .flat_map(|image| [image, Flowable::Spacer(0.2 * INCH)])
        .collect();
    if images.is_empty() {
        return Vec::new();
    }

    let mut flowables = vec![Flowable::PageBreak, section_title("Visual Intelligence")];
    flowables.extend(images);
    flowables
}

/// A chart sized to the 5.5in x 3.5in box, or None when it cannot be read.
fn chart_image(path: &Path) -> Option<Flowable> {
    if !path.exists() {
        warn!("Chart image {} is missing, skipping it", path.display());
        return None;
    }
    match image::image_dimensions(path) {
        Ok((px_w, px_h)) => {
            let (width, height) = scale_to_fit(px_w as f32, px_h as f32, 5.5 * INCH, 3.5 * INCH);
            debug!(
                "Placing {} at {:.0}x{:.0}pt",
                path.display(),
                width,
                height
            );
            Some(Flowable::Image {
                path: path.to_path_buf(),
                width,
                height,
            })
        }
        Err(e) => {
            warn!("Chart image {} is unreadable ({}), skipping it", path.display(), e);
            None
        }
    }
}

/// Persist bytes through a temp file in the target directory and a rename.
fn write_atomically(target: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .context(format!("Failed to create report directory {}", dir.display()))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .context(format!("Failed to create temp file in {}", dir.display()))?;
    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .context("Failed to write report")?;
    temp.persist(target)
        .map_err(|e| e.error)
        .context(format!("Failed to move report into {}", target.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChartKind;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn stats(total_records: usize) -> SummaryStats {
        SummaryStats {
            total_records,
            columns: vec!["a".to_string()],
            missing_values: BTreeMap::from([("a".to_string(), 3)]),
            numeric_stats: BTreeMap::new(),
        }
    }

    fn wide_df(rows: usize, cols: usize) -> DataFrame {
        let columns: Vec<Column> = (0..cols)
            .map(|c| {
                let values: Vec<i64> = (0..rows as i64).collect();
                Column::new(format!("col_{c}").into(), values)
            })
            .collect();
        DataFrame::new(columns).unwrap()
    }

    #[test]
    fn test_preview_caps_rows_and_columns() {
        let (columns, rows) = preview(&wide_df(1000, 20), 12, 6).unwrap();
        assert_eq!(columns.len(), 6);
        assert_eq!(rows.len(), 12);
        assert!(rows.iter().all(|r| r.len() == 6));
        assert_eq!(columns[0], "col_0");
    }

    #[test]
    fn test_preview_small_dataset_renders_what_exists() {
        let (columns, rows) = preview(&wide_df(3, 2), 12, 6).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_preview_nulls_render_as_na() {
        let df = df!("x" => &[Some(1.5f64), None, Some(f64::NAN)], "s" => &[Some("a"), None, Some("c")]).unwrap();
        let (_, rows) = preview(&df, 12, 6).unwrap();
        assert_eq!(rows[1], vec!["N/A", "N/A"]);
        assert_eq!(rows[2][0], "N/A");
        assert_eq!(rows[2][1], "c");
    }

    #[test]
    fn test_summary_values() {
        let table = summary_table(&stats(1234567));
        assert_eq!(table.rows[0][1], "1,234,567");
        assert_eq!(table.rows[1][1], "3");
        assert_eq!(table.rows[2], vec!["Data Integrity Score", "N/A"]);
    }

    #[test]
    fn test_sample_headers_are_uppercased() {
        let table = sample_table(
            vec!["age".to_string(), "City".to_string()],
            vec![vec!["1".to_string(), "x".to_string()]],
        );
        assert_eq!(table.header, vec!["AGE", "CITY"]);
        assert!((table.column_widths.iter().sum::<f32>() - CONTENT_WIDTH).abs() < 0.01);
    }

    #[test]
    fn test_missing_charts_skip_visuals_section() {
        let artifacts = vec![ChartArtifact::new(ChartKind::Distribution, "/nonexistent/dist_plot.png")];
        assert!(visuals(&artifacts).is_empty());
        assert!(visuals(&[]).is_empty());
    }

    #[test]
    fn test_build_writes_pdf() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("report.pdf");
        let spec = ReportSpec::new("Quarterly Review", &target);

        let outcome = ReportAssembler::default()
            .build(&spec, &stats(3), &wide_df(3, 2), &[])
            .unwrap();

        assert_eq!(outcome.path, target);
        assert_eq!(outcome.page_count, 1);
        let bytes = std::fs::read(&target).unwrap();
        assert_eq!(bytes.len(), outcome.bytes_written);
        assert!(bytes.starts_with(b"%PDF"));
        // only the report is left behind, no temp files
        assert_eq!(std::fs::read_dir(target.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn test_zero_column_dataset_still_builds() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("empty.pdf");
        let spec = ReportSpec::new("", &target);

        let outcome = ReportAssembler::default()
            .build(&spec, &stats(0), &DataFrame::empty(), &[])
            .unwrap();
        assert_eq!(outcome.page_count, 1);
    }

    #[test]
    fn test_unwritable_target_is_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let spec = ReportSpec::new("t", blocker.join("report.pdf"));

        let err = ReportAssembler::default()
            .build(&spec, &stats(0), &wide_df(1, 1), &[])
            .unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
