//! Shared utilities for the report pipeline.
//!
//! Dtype classification, file-name handling and the small formatting helpers
//! used by both the statistics engine and the report assembler.

use chrono::Local;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::path::Path;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// String/text type
    String,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else {
        DtypeCategory::Other
    }
}

// =============================================================================
// Series Utilities
// =============================================================================

/// Count null entries, plus NaN entries for float columns.
pub fn missing_count(series: &Series) -> usize {
    let nans = match series.dtype() {
        DataType::Float32 | DataType::Float64 => series
            .cast(&DataType::Float64)
            .ok()
            .and_then(|s| {
                s.f64()
                    .ok()
                    .map(|ca| ca.into_iter().flatten().filter(|v| v.is_nan()).count())
            })
            .unwrap_or(0),
        _ => 0,
    };
    series.null_count() + nans
}

/// Non-missing values of a numeric series as f64, in row order.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<f64>> {
    let float_series = series.cast(&DataType::Float64)?;
    Ok(float_series
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect())
}

/// Values of a numeric series as f64 with missing entries kept as `None`.
pub fn optional_numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let float_series = series.cast(&DataType::Float64)?;
    Ok(float_series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Render a single cell for the report preview table.
pub fn display_value(value: &AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => "N/A".to_string(),
        AnyValue::String(s) => (*s).to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Float64(v) if v.is_nan() => "N/A".to_string(),
        AnyValue::Float32(v) if v.is_nan() => "N/A".to_string(),
        other => format!("{other}"),
    }
}

// =============================================================================
// File Utilities
// =============================================================================

/// Extensions the loader accepts.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["csv", "xlsx", "xls", "json"];

static UNSAFE_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex is valid"));

/// Lower-cased extension of a path or file name, if any.
pub fn file_extension(path: impl AsRef<Path>) -> Option<String> {
    path.as_ref()
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

/// Whether a file name carries one of the supported extensions.
pub fn validate_file_extension(file_name: &str) -> bool {
    file_extension(file_name)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Reduce an uploaded file name to a safe single path component.
///
/// Directory parts are dropped and anything outside `[A-Za-z0-9._-]`
/// becomes `_`. The extension survives so format dispatch still works.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned = UNSAFE_FILE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Timestamped file name, e.g. `report_20240101_120000.pdf`.
pub fn timestamp_filename(prefix: &str, extension: &str) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    format!("{prefix}_{timestamp}.{extension}")
}

// =============================================================================
// Formatting Utilities
// =============================================================================

/// Format an integer with `,` thousands separators.
pub fn format_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Map text onto the Latin-1 range understood by the built-in PDF fonts.
pub fn to_pdf_text(text: &str) -> String {
    text.chars()
        .map(|c| match c as u32 {
            0..=0x1F | 0x7F => ' ',
            0x20..=0xFF => c,
            _ => '?',
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_dtype_category() {
        assert_eq!(get_dtype_category(&DataType::Int64), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::Date), DtypeCategory::Datetime);
        assert_eq!(
            get_dtype_category(&DataType::Boolean),
            DtypeCategory::Boolean
        );
        assert_eq!(get_dtype_category(&DataType::String), DtypeCategory::String);
        assert_eq!(get_dtype_category(&DataType::Null), DtypeCategory::Other);
    }

    #[test]
    fn test_missing_count_includes_nan() {
        let series = Series::new("x".into(), &[Some(1.0), None, Some(f64::NAN), Some(4.0)]);
        assert_eq!(missing_count(&series), 2);

        let strings = Series::new("s".into(), &[Some("a"), None, Some("NaN")]);
        assert_eq!(missing_count(&strings), 1);
    }

    #[test]
    fn test_numeric_values_skip_missing() {
        let series = Series::new("x".into(), &[Some(1i64), None, Some(3)]);
        assert_eq!(numeric_values(&series).unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&AnyValue::Null), "N/A");
        assert_eq!(display_value(&AnyValue::String("Paris")), "Paris");
        assert_eq!(display_value(&AnyValue::Int64(42)), "42");
    }

    #[test]
    fn test_validate_file_extension() {
        assert!(validate_file_extension("data.csv"));
        assert!(validate_file_extension("DATA.XLSX"));
        assert!(validate_file_extension("a.b.json"));
        assert!(!validate_file_extension("notes.txt"));
        assert!(!validate_file_extension("csv"));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd.csv"), "passwd.csv");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\my data.xlsx"), "my_data.xlsx");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name(".hidden.json"), "hidden.json");
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_timestamp_filename_shape() {
        let name = timestamp_filename("InsightFlow_Report", "pdf");
        assert!(name.starts_with("InsightFlow_Report_"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), "InsightFlow_Report_".len() + 15 + 4);
    }

    #[test]
    fn test_to_pdf_text() {
        assert_eq!(to_pdf_text("Café"), "Café");
        assert_eq!(to_pdf_text("📊 Chart"), "? Chart");
        assert_eq!(to_pdf_text("a\tb"), "a b");
    }
}
