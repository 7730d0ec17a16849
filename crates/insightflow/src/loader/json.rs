//! JSON input.
//!
//! Two layouts are accepted:
//!
//! - records: `[{"a": 1, "b": "x"}, ...]`
//! - columns: `{"a": [1, 2], "b": ["x", "y"]}` or the index-keyed variant
//!   `{"a": {"0": 1, "1": 2}}`
//!
//! The columns layout is reshaped into records (keeping key order) and both
//! go through the polars JSON reader so type inference is identical. Rows of
//! index-keyed columns are aligned by key, in order of first appearance;
//! array positions count as the keys `"0"`, `"1"`, ...

use crate::error::{ReportError, Result};
use polars::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Cursor;

const FORMAT: &str = "JSON";

pub(crate) fn read_json(bytes: &[u8]) -> Result<DataFrame> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| ReportError::parse(FORMAT, e))?;

    let (names, records) = match document {
        Value::Array(_) => return read_records(bytes.to_vec()),
        Value::Object(columns) => columns_to_records(columns)?,
        _ => {
            return Err(ReportError::parse(
                FORMAT,
                "expected an array of records or an object of columns",
            ));
        }
    };

    if records.is_empty() {
        let columns = names
            .into_iter()
            .map(|name| Column::new_empty(name.into(), &DataType::Null))
            .collect();
        return DataFrame::new(columns).map_err(|e| ReportError::parse(FORMAT, e));
    }
    let normalized = serde_json::to_vec(&Value::Array(records))?;
    read_records(normalized)
}

fn read_records(bytes: Vec<u8>) -> Result<DataFrame> {
    JsonReader::new(Cursor::new(bytes))
        .finish()
        .map_err(|e| ReportError::parse(FORMAT, e))
}

fn columns_to_records(columns: Map<String, Value>) -> Result<(Vec<String>, Vec<Value>)> {
    let mut row_of: HashMap<String, usize> = HashMap::new();
    let mut placed: Vec<(String, Vec<(usize, Value)>)> = Vec::with_capacity(columns.len());

    for (name, values) in columns {
        let cells: Vec<(String, Value)> = match values {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, v)| (idx.to_string(), v))
                .collect(),
            Value::Object(indexed) => indexed.into_iter().collect(),
            _ => {
                return Err(ReportError::parse(
                    FORMAT,
                    format!("column '{name}' must be an array or an index-keyed object"),
                ));
            }
        };
        let cells = cells
            .into_iter()
            .map(|(key, value)| {
                let next = row_of.len();
                (*row_of.entry(key).or_insert(next), value)
            })
            .collect();
        placed.push((name, cells));
    }

    let row_count = row_of.len();
    let mut grid: Vec<Map<String, Value>> = vec![Map::new(); row_count];
    for (name, cells) in &placed {
        for record in grid.iter_mut() {
            record.insert(name.clone(), Value::Null);
        }
        for (row, value) in cells {
            grid[*row].insert(name.clone(), value.clone());
        }
    }

    let names = placed.into_iter().map(|(name, _)| name).collect();
    Ok((names, grid.into_iter().map(Value::Object).collect()))
}
