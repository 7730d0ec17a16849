//! Dataset loading.
//!
//! Files are dispatched on their (case-insensitive) extension:
//!
//! - `csv` via the polars CSV reader
//! - `json` via the polars JSON reader (records or columns layout)
//! - `xlsx` / `xls` via calamine, first worksheet only
//!
//! Column order is whatever the file declares and is never reshuffled; chart
//! selection downstream relies on it.

mod excel;
mod json;

use crate::error::{ReportError, Result};
use crate::utils::{file_extension, sanitize_file_name};
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Input formats the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Excel,
    Json,
}

impl InputFormat {
    /// Resolve the format from a path or file name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let ext = file_extension(path.as_ref()).unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "xls" => Ok(Self::Excel),
            "json" => Ok(Self::Json),
            _ => Err(ReportError::UnsupportedFormat(ext)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Excel => "Excel",
            Self::Json => "JSON",
        }
    }
}

/// Loads uploaded files into polars DataFrames.
pub struct DatasetLoader;

impl DatasetLoader {
    /// Load a dataset from disk.
    ///
    /// # Errors
    ///
    /// - [`ReportError::UnsupportedFormat`] for unknown extensions
    /// - [`ReportError::Io`] when the file cannot be read
    /// - [`ReportError::Parse`] when the content is not valid for its format
    pub fn load(path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let format = InputFormat::from_path(path)?;
        info!("Loading {} dataset from: {}", format.name(), path.display());

        let df = match format {
            InputFormat::Csv => Self::read_csv(std::fs::read(path)?)?,
            InputFormat::Json => json::read_json(&std::fs::read(path)?)?,
            InputFormat::Excel => {
                // calamine opens the path itself; surface a missing file as IO
                std::fs::metadata(path)?;
                excel::read_workbook(path)?
            }
        };

        debug!(
            "Loaded dataset shape: {:?}, columns: {:?}",
            df.shape(),
            df.get_column_names()
        );
        Ok(df)
    }

    /// Persist uploaded bytes under `dir` and load them.
    ///
    /// The original file name only contributes a sanitized base name, so an
    /// upload can never escape `dir`. The format is checked before anything
    /// is written. Returns the path of the stored copy with the dataset.
    pub fn load_bytes(file_name: &str, bytes: &[u8], dir: &Path) -> Result<(PathBuf, DataFrame)> {
        InputFormat::from_path(file_name)?;

        std::fs::create_dir_all(dir)?;
        let stored = dir.join(sanitize_file_name(file_name));
        std::fs::write(&stored, bytes)?;
        debug!("Stored upload '{}' at {}", file_name, stored.display());

        let df = Self::load(&stored)?;
        Ok((stored, df))
    }

    fn read_csv(bytes: Vec<u8>) -> Result<DataFrame> {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10_000))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| ReportError::parse("CSV", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_format_dispatch_is_case_insensitive() {
        assert_eq!(InputFormat::from_path("a.CSV").unwrap(), InputFormat::Csv);
        assert_eq!(InputFormat::from_path("a.Xls").unwrap(), InputFormat::Excel);
        assert_eq!(InputFormat::from_path("a.xlsx").unwrap(), InputFormat::Excel);
        assert_eq!(InputFormat::from_path("a.JSON").unwrap(), InputFormat::Json);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = InputFormat::from_path("data.parquet").unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat(ext) if ext == "parquet"));

        let err = InputFormat::from_path("no_extension").unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_csv_preserves_shape_and_order() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "people.csv", "zeta,age,city\n1,30,Paris\n2,41,Lyon\n3,,Nice\n");

        let df = DatasetLoader::load(&path).unwrap();
        assert_eq!(df.shape(), (3, 3));
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["zeta", "age", "city"]);
        assert!(df.column("age").unwrap().dtype().is_numeric());
        assert_eq!(df.column("age").unwrap().null_count(), 1);
    }

    #[test]
    fn test_load_header_only_csv_is_empty_dataset() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.csv", "a,b\n");

        let df = DatasetLoader::load(&path).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = DatasetLoader::load(dir.path().join("missing.csv")).unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_load_garbage_excel_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.xlsx", "this is not a workbook");
        let err = DatasetLoader::load(&path).unwrap_err();
        assert_eq!(err.error_code(), "PARSE_ERROR");
    }

    #[test]
    fn test_load_bytes_rejects_before_writing() {
        let dir = TempDir::new().unwrap();
        let err = DatasetLoader::load_bytes("notes.txt", b"hello", dir.path()).unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_load_bytes_sanitizes_name() {
        let dir = TempDir::new().unwrap();
        let (stored, df) =
            DatasetLoader::load_bytes("../evil/My Data.CSV", b"x,y\n1,2\n", dir.path()).unwrap();
        assert_eq!(stored.parent().unwrap(), dir.path());
        assert_eq!(stored.file_name().unwrap(), "My_Data.CSV");
        assert_eq!(df.shape(), (1, 2));
    }
}
