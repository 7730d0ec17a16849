//! Chart models: the numbers behind each chart, kept apart from drawing.

use crate::stats::{mean, quantile_sorted, sample_std};
use polars::prelude::*;
use std::collections::HashMap;

/// Equal-width histogram bins, each as `(bin_start, count)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub bin_width: f64,
    pub bins: Vec<(f64, usize)>,
}

impl Histogram {
    /// Horizontal extent covered by the bins.
    pub fn x_range(&self) -> (f64, f64) {
        match (self.bins.first(), self.bins.last()) {
            (Some((start, _)), Some((last, _))) => (*start, *last + self.bin_width),
            _ => (0.0, 1.0),
        }
    }

    pub fn max_count(&self) -> usize {
        self.bins.iter().map(|(_, count)| *count).max().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|(_, count)| *count).sum()
    }
}

/// Bin values with the Freedman-Diaconis width, clamped to 5..=50 bins.
///
/// Non-finite values are left out. A column holding a single distinct
/// value gets 20 unit-wide bins with every observation in the middle one.
pub fn histogram(values: &[f64]) -> Histogram {
    let mut sorted = finite(values);
    sorted.sort_by(f64::total_cmp);
    let (Some(&min_v), Some(&max_v)) = (sorted.first(), sorted.last()) else {
        return Histogram {
            bin_width: 0.0,
            bins: Vec::new(),
        };
    };
    let n = sorted.len();

    if (max_v - min_v).abs() < f64::EPSILON {
        let bin_width = 1.0;
        let start = min_v - 10.0 * bin_width;
        let bins = (0..20)
            .map(|i| (start + i as f64 * bin_width, if i == 10 { n } else { 0 }))
            .collect();
        return Histogram { bin_width, bins };
    }

    let q1 = quantile_sorted(&sorted, 0.25).unwrap_or(min_v);
    let q3 = quantile_sorted(&sorted, 0.75).unwrap_or(max_v);
    let iqr = q3 - q1;
    let h = if iqr > 0.0 {
        2.0 * iqr / (n as f64).cbrt()
    } else {
        (max_v - min_v) / (n as f64).sqrt()
    };

    let num_bins = (((max_v - min_v) / h).ceil() as usize).clamp(5, 50);
    let bin_width = (max_v - min_v) / num_bins as f64;

    let mut counts = vec![0usize; num_bins];
    for val in &sorted {
        let idx = ((val - min_v) / bin_width).floor() as usize;
        // the maximum lands exactly on the right edge
        counts[idx.min(num_bins - 1)] += 1;
    }

    Histogram {
        bin_width,
        bins: counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| (min_v + i as f64 * bin_width, count))
            .collect(),
    }
}

/// Gaussian kernel density estimate evaluated on `points` evenly spaced
/// positions across the data range, using Scott's bandwidth.
///
/// Densities are multiplied by `scale` so the curve can sit on top of a
/// count histogram (`n * bin_width`). Non-finite values are left out.
/// Returns an empty curve when the bandwidth is undefined (fewer than two
/// values or zero spread).
pub fn kde_curve(values: &[f64], points: usize, scale: f64) -> Vec<(f64, f64)> {
    let values = finite(values);
    let n = values.len();
    let Some(std) = sample_std(&values) else {
        return Vec::new();
    };
    if std <= 0.0 || points < 2 {
        return Vec::new();
    }

    let bandwidth = std * (n as f64).powf(-0.2);
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let step = (hi - lo) / (points - 1) as f64;
    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    (0..points)
        .map(|i| {
            let x = lo + i as f64 * step;
            let density: f64 = values
                .iter()
                .map(|v| {
                    let z = (x - v) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                * norm;
            (x, density * scale)
        })
        .collect()
}

fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Most frequent non-null values of a column, most frequent first.
///
/// Ties keep the order in which values first appear in the column.
pub fn top_categories(series: &Series, n: usize) -> PolarsResult<Vec<(String, usize)>> {
    let strings = series.cast(&DataType::String)?;
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for value in strings.str()?.into_iter().flatten() {
        match position.get(value) {
            Some(&idx) => counts[idx].1 += 1,
            None => {
                position.insert(value, counts.len());
                counts.push((value.to_string(), 1));
            }
        }
    }

    // stable sort keeps first-encounter order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    Ok(counts)
}

/// Pearson correlation of every pair of columns over the rows where both
/// values are present and finite.
///
/// The diagonal is always 1.0. Off-diagonal entries are `None` when fewer
/// than two complete pairs exist or either side has zero variance.
pub fn correlation_matrix(columns: &[Vec<Option<f64>>]) -> Vec<Vec<Option<f64>>> {
    let k = columns.len();
    let mut matrix = vec![vec![None; k]; k];
    for i in 0..k {
        matrix[i][i] = Some(1.0);
        for j in (i + 1)..k {
            let r = pearson(&columns[i], &columns[j]);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    matrix
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip();
    if xs.len() < 2 {
        return None;
    }

    let mx = mean(&xs);
    let my = mean(&ys);
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(&ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }
    if vx <= 0.0 || vy <= 0.0 {
        return None;
    }
    Some((cov / (vx.sqrt() * vy.sqrt())).clamp(-1.0, 1.0))
}
