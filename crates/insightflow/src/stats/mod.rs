//! Statistics engine.
//!
//! Computes the [`SummaryStats`] shown in the UI and in the report's summary
//! table: record count, missing values for every column and describe-style
//! statistics for numeric columns.

mod describe;

pub(crate) use describe::{mean, quantile_sorted, sample_std};

use crate::error::Result;
use crate::types::{ColumnKind, SummaryStats};
use crate::utils::{missing_count, numeric_values};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Computes summary statistics for a dataset.
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Summarize a dataset.
    ///
    /// Pure: the same DataFrame always yields an identical result. An empty
    /// dataset produces zero counts and empty maps, never an error.
    pub fn summarize(df: &DataFrame) -> Result<SummaryStats> {
        let mut columns = Vec::with_capacity(df.width());
        let mut missing_values = BTreeMap::new();
        let mut numeric_stats = BTreeMap::new();

        for column in df.get_columns() {
            let name = column.name().to_string();
            let series = column.as_materialized_series();

            missing_values.insert(name.clone(), missing_count(series));

            if ColumnKind::of(series.dtype()) == ColumnKind::Numeric {
                let values = numeric_values(series)?;
                numeric_stats.insert(name.clone(), describe::describe(&values));
            }
            columns.push(name);
        }

        debug!(
            "Summarized {} rows, {} columns ({} numeric)",
            df.height(),
            columns.len(),
            numeric_stats.len()
        );

        Ok(SummaryStats {
            total_records: df.height(),
            columns,
            missing_values,
            numeric_stats,
        })
    }
}
