use crate::utils::{DtypeCategory, get_dtype_category};
use polars::prelude::DataType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How a column participates in statistics and chart selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Integer or floating point columns.
    Numeric,
    /// String and categorical columns.
    Categorical,
    /// Booleans, dates, nulls and anything else.
    Other,
}

impl ColumnKind {
    /// Classify a polars dtype.
    pub fn of(dtype: &DataType) -> Self {
        match get_dtype_category(dtype) {
            DtypeCategory::Numeric => Self::Numeric,
            DtypeCategory::String => Self::Categorical,
            DtypeCategory::Datetime | DtypeCategory::Boolean | DtypeCategory::Other => Self::Other,
        }
    }
}

/// Descriptive statistics of one numeric column.
///
/// `count` is the number of non-missing values. The remaining fields are
/// `None` when undefined for the column (no values, or `std` over fewer
/// than two values).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub q50: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_records: usize,
    /// Column names in dataset order.
    pub columns: Vec<String>,
    pub missing_values: BTreeMap<String, usize>,
    pub numeric_stats: BTreeMap<String, NumericSummary>,
}

impl SummaryStats {
    /// Sum of the missing counts over every column.
    pub fn total_missing(&self) -> usize {
        self.missing_values.values().sum()
    }

    /// Number of columns that received descriptive statistics.
    pub fn numeric_column_count(&self) -> usize {
        self.numeric_stats.len()
    }
}

/// The charts the renderer knows how to produce, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Distribution,
    TopCategories,
    Correlation,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [Self::Distribution, Self::TopCategories, Self::Correlation];

    /// Stable file stem of the image written for this kind.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Distribution => "dist_plot",
            Self::TopCategories => "bar_chart",
            Self::Correlation => "correlation",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.png", self.file_stem())
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Distribution => "Distribution Analysis",
            Self::TopCategories => "Class Frequency",
            Self::Correlation => "Feature Relationships",
        }
    }
}

/// A chart image written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartArtifact {
    pub kind: ChartKind,
    pub path: PathBuf,
}

impl ChartArtifact {
    pub fn new(kind: ChartKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// What the assembler wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOutcome {
    pub path: PathBuf,
    pub page_count: usize,
    pub bytes_written: usize,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub stats: SummaryStats,
    /// Charts that were rendered and embedded (their files are gone by now).
    pub charts: Vec<ChartKind>,
    pub report: ReportOutcome,
    pub duration_ms: u64,
}
