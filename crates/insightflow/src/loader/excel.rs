//! Spreadsheet input (xlsx/xls) through calamine.
//!
//! Only the first worksheet is read and its first row is the header. Each
//! column's dtype comes from the native cell types found in it; nothing is
//! parsed out of strings.

use crate::error::{ReportError, Result};
use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveDateTime;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const FORMAT: &str = "Excel";

static EMPTY_CELL: Data = Data::Empty;

pub(crate) fn read_workbook(path: &Path) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ReportError::parse(FORMAT, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReportError::parse(FORMAT, "workbook contains no worksheets"))?
        .map_err(|e| ReportError::parse(FORMAT, e))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let headers = header_names(header_row);
    let body: Vec<&[Data]> = rows.collect();
    debug!(
        "Worksheet has {} columns and {} data rows",
        headers.len(),
        body.len()
    );

    let columns = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = body
                .iter()
                .map(|row| row.get(idx).unwrap_or(&EMPTY_CELL))
                .collect();
            build_series(name, &cells).map(Column::from)
        })
        .collect::<Result<Vec<_>>>()?;

    DataFrame::new(columns).map_err(|e| ReportError::parse(FORMAT, e))
}

/// Header names with blanks filled in and duplicates suffixed `.1`, `.2`, ...
fn header_names(row: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    row.iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = match cell_text(cell) {
                Some(text) if !text.trim().is_empty() => text,
                _ => format!("Unnamed: {idx}"),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base.clone()
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

fn is_missing(cell: &Data) -> bool {
    matches!(cell, Data::Empty | Data::Error(_))
}

fn cell_datetime(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime(),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| {
                chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            }),
        _ => None,
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Int(v) => Some(v.to_string()),
        Data::Float(v) => Some(v.to_string()),
        Data::Bool(v) => Some(v.to_string()),
        Data::DateTime(_) => cell_datetime(cell).map(|dt| dt.to_string()),
    }
}

/// xlsx stores every number as a float, so whole floats count as integers.
fn whole_number(cell: &Data) -> Option<i64> {
    const EXACT: f64 = 9_007_199_254_740_992.0;
    match cell {
        Data::Int(v) => Some(*v),
        Data::Float(v) if v.fract() == 0.0 && v.abs() < EXACT => Some(*v as i64),
        _ => None,
    }
}

/// Pick the narrowest dtype that holds every present cell.
fn build_series(name: &str, cells: &[&Data]) -> Result<Series> {
    let present: Vec<&Data> = cells.iter().copied().filter(|c| !is_missing(c)).collect();

    if present.iter().all(|c| whole_number(c).is_some()) && !present.is_empty() {
        let values: Vec<Option<i64>> = cells.iter().map(|c| whole_number(c)).collect();
        return Ok(Series::new(name.into(), values));
    }

    // all-empty columns become float, like a column of NaN
    if present.iter().all(|c| matches!(c, Data::Int(_) | Data::Float(_))) {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                Data::Int(v) => Some(*v as f64),
                Data::Float(v) => Some(*v),
                _ => None,
            })
            .collect();
        return Ok(Series::new(name.into(), values));
    }

    if present.iter().all(|c| matches!(c, Data::Bool(_))) {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|c| match c {
                Data::Bool(v) => Some(*v),
                _ => None,
            })
            .collect();
        return Ok(Series::new(name.into(), values));
    }

    if present.iter().all(|c| cell_datetime(c).is_some()) {
        let millis: Vec<Option<i64>> = cells
            .iter()
            .map(|c| cell_datetime(c).map(|dt| dt.and_utc().timestamp_millis()))
            .collect();
        return Series::new(name.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| ReportError::parse(FORMAT, e));
    }

    let values: Vec<Option<String>> = cells.iter().map(|c| cell_text(c)).collect();
    Ok(Series::new(name.into(), values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_names_fill_and_dedupe() {
        let row = vec![
            Data::String("id".to_string()),
            Data::Empty,
            Data::String("id".to_string()),
            Data::Int(2024),
        ];
        assert_eq!(header_names(&row), vec!["id", "Unnamed: 1", "id.1", "2024"]);
    }

    #[test]
    fn test_int_column() {
        let cells = [Data::Int(1), Data::Empty, Data::Int(3)];
        let refs: Vec<&Data> = cells.iter().collect();
        let series = build_series("n", &refs).unwrap();
        assert_eq!(series.dtype(), &DataType::Int64);
        assert_eq!(series.null_count(), 1);
    }

    #[test]
    fn test_whole_floats_are_int() {
        let cells = [Data::Float(1.0), Data::Empty, Data::Int(3), Data::Float(-4.0)];
        let refs: Vec<&Data> = cells.iter().collect();
        let series = build_series("n", &refs).unwrap();
        assert_eq!(series.dtype(), &DataType::Int64);
        assert_eq!(series.i64().unwrap().get(3), Some(-4));
    }

    #[test]
    fn test_mixed_numeric_column_is_float() {
        let cells = [Data::Int(1), Data::Float(2.5)];
        let refs: Vec<&Data> = cells.iter().collect();
        let series = build_series("n", &refs).unwrap();
        assert_eq!(series.dtype(), &DataType::Float64);
    }

    #[test]
    fn test_text_wins_over_mixed_cells() {
        let cells = [Data::Int(1), Data::String("two".to_string()), Data::Bool(true)];
        let refs: Vec<&Data> = cells.iter().collect();
        let series = build_series("mixed", &refs).unwrap();
        assert_eq!(series.dtype(), &DataType::String);
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_bool_and_empty_columns() {
        let cells = [Data::Bool(true), Data::Empty];
        let refs: Vec<&Data> = cells.iter().collect();
        assert_eq!(build_series("b", &refs).unwrap().dtype(), &DataType::Boolean);

        let cells = [Data::Empty, Data::Empty];
        let refs: Vec<&Data> = cells.iter().collect();
        let series = build_series("e", &refs).unwrap();
        assert_eq!(series.dtype(), &DataType::Float64);
        assert_eq!(series.null_count(), 2);
    }

    #[test]
    fn test_iso_dates_become_datetime() {
        let cells = [
            Data::DateTimeIso("2024-03-01T10:00:00".to_string()),
            Data::DateTimeIso("2024-03-02".to_string()),
        ];
        let refs: Vec<&Data> = cells.iter().collect();
        let series = build_series("when", &refs).unwrap();
        assert!(matches!(series.dtype(), DataType::Datetime(_, _)));
        assert_eq!(series.null_count(), 0);
    }
}
