//! Chart painting with plotters.
//!
//! Painters draw into an RGB buffer sized by [`canvas_size`]; encoding and
//! writing the PNG is left to the caller. Every painter takes an optional
//! font family and paints without captions, axis labels or annotations
//! when it is `None`.

use super::model::Histogram;
use crate::config::{ChartTheme, Rgb};
use crate::types::ChartKind;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use once_cell::sync::Lazy;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontStyle, register_font};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

pub(crate) type DrawResult<T = ()> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

const BUNDLED_FAMILY: &str = "insightflow-sans";
static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Font families registered with plotters, keyed by the file they were
/// loaded from. `None` is the bundled font.
static FAMILIES: Lazy<Mutex<HashMap<Option<PathBuf>, Option<String>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Family name to draw chart text with.
///
/// Each distinct `preferred` path is registered once under its own family,
/// so themes with different fonts never share one. A path that cannot be
/// read or parsed falls back to the bundled font.
pub(crate) fn font_family(preferred: Option<&Path>) -> Option<String> {
    let mut families = FAMILIES.lock().unwrap_or_else(PoisonError::into_inner);
    resolve_family(&mut families, preferred)
}

fn resolve_family(
    families: &mut HashMap<Option<PathBuf>, Option<String>>,
    preferred: Option<&Path>,
) -> Option<String> {
    let key = preferred.map(Path::to_path_buf);
    if let Some(family) = families.get(&key) {
        return family.clone();
    }

    let family = match preferred {
        Some(path) => {
            let name = format!("insightflow-font-{}", families.len());
            if load_font_file(path, &name) {
                Some(name)
            } else {
                resolve_family(families, None)
            }
        }
        None => match register_font(BUNDLED_FAMILY, FontStyle::Normal, BUNDLED_FONT) {
            Ok(()) => Some(BUNDLED_FAMILY.to_string()),
            Err(_) => {
                warn!("Bundled chart font is unusable, charts will be drawn without text");
                None
            }
        },
    };
    families.insert(key, family.clone());
    family
}

fn load_font_file(path: &Path, family: &str) -> bool {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Cannot read chart font {}: {}", path.display(), e);
            return false;
        }
    };
    // registered fonts live for the rest of the process
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    match register_font(family, FontStyle::Normal, bytes) {
        Ok(()) => {
            debug!("Registered chart font {} as {}", path.display(), family);
            true
        }
        Err(_) => {
            warn!("Ignoring unusable font {}", path.display());
            false
        }
    }
}

/// Pixel size of the canvas for a chart kind.
pub(crate) fn canvas_size(kind: ChartKind, theme: &ChartTheme) -> (u32, u32) {
    match kind {
        ChartKind::Correlation => (theme.width, theme.height + theme.height / 6),
        ChartKind::Distribution | ChartKind::TopCategories => (theme.width, theme.height),
    }
}

/// Zeroed RGB buffer for a canvas.
pub(crate) fn canvas_buffer((width, height): (u32, u32)) -> Vec<u8> {
    vec![0; width as usize * height as usize * 3]
}

pub(crate) fn encode_png(buffer: &[u8], (width, height): (u32, u32)) -> DrawResult<Vec<u8>> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(buffer, width, height, image::ColorType::Rgb8)?;
    Ok(png)
}

fn color(rgb: Rgb) -> RGBColor {
    RGBColor(rgb.0, rgb.1, rgb.2)
}

fn blend(from: Rgb, to: Rgb, t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

fn shorten(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        label.to_string()
    } else {
        let head: String = label.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

/// Histogram bars with the density curve on top.
pub(crate) fn distribution(
    buffer: &mut [u8],
    theme: &ChartTheme,
    column: &str,
    hist: &Histogram,
    curve: &[(f64, f64)],
    font: Option<&str>,
) -> DrawResult {
    let size = canvas_size(ChartKind::Distribution, theme);
    let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
    root.fill(&color(theme.background))?;

    let fg = color(theme.foreground);
    let accent = color(theme.distribution_color);
    let (x0, x1) = hist.x_range();
    let curve_peak = curve.iter().map(|(_, y)| *y).fold(0.0, f64::max);
    let y_max = (hist.max_count() as f64).max(curve_peak).max(1.0) * 1.1;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(24);
    if let Some(family) = font {
        builder
            .caption(
                format!("Distribution Analysis: {column}"),
                (family, 28).into_font().color(&fg),
            )
            .x_label_area_size(48)
            .y_label_area_size(64);
    }
    let mut chart = builder.build_cartesian_2d(x0..x1, 0f64..y_max)?;
    chart.plotting_area().fill(&color(theme.panel))?;

    if let Some(family) = font {
        chart
            .configure_mesh()
            .bold_line_style(color(theme.grid))
            .light_line_style(color(theme.grid).mix(0.3))
            .axis_style(fg)
            .label_style((family, 14).into_font().color(&fg))
            .axis_desc_style((family, 16).into_font().color(&fg))
            .x_desc(column)
            .y_desc("Count")
            .draw()?;
    }

    chart.draw_series(hist.bins.iter().map(|(start, count)| {
        Rectangle::new(
            [(*start, 0.0), (*start + hist.bin_width, *count as f64)],
            accent.mix(0.6).filled(),
        )
    }))?;
    chart.draw_series(hist.bins.iter().map(|(start, count)| {
        Rectangle::new(
            [(*start, 0.0), (*start + hist.bin_width, *count as f64)],
            color(theme.background).stroke_width(1),
        )
    }))?;
    if !curve.is_empty() {
        chart.draw_series(LineSeries::new(curve.iter().copied(), accent.stroke_width(3)))?;
    }

    root.present()?;
    Ok(())
}

/// Vertical bars, one per category, most frequent first.
pub(crate) fn top_categories(
    buffer: &mut [u8],
    theme: &ChartTheme,
    column: &str,
    ranking: &[(String, usize)],
    font: Option<&str>,
) -> DrawResult {
    let size = canvas_size(ChartKind::TopCategories, theme);
    let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
    root.fill(&color(theme.background))?;

    let fg = color(theme.foreground);
    let accent = color(theme.categories_color);
    let bars = ranking.len().max(1) as i32;
    let y_max = ranking.iter().map(|(_, c)| *c).max().unwrap_or(1).max(1) as f64 * 1.1;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(24);
    if let Some(family) = font {
        builder
            .caption(
                format!("Top Categories: {column}"),
                (family, 28).into_font().color(&fg),
            )
            .x_label_area_size(64)
            .y_label_area_size(64);
    }
    let mut chart = builder.build_cartesian_2d((0..bars).into_segmented(), 0f64..y_max)?;
    chart.plotting_area().fill(&color(theme.panel))?;

    let label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => ranking
            .get(*i as usize)
            .map(|(name, _)| shorten(name, 14))
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    };
    if let Some(family) = font {
        chart
            .configure_mesh()
            .disable_x_mesh()
            .bold_line_style(color(theme.grid))
            .light_line_style(color(theme.grid).mix(0.3))
            .axis_style(fg)
            .x_labels(ranking.len().max(1))
            .x_label_formatter(&label)
            .label_style((family, 13).into_font().color(&fg))
            .axis_desc_style((family, 16).into_font().color(&fg))
            .y_desc("Count")
            .draw()?;
    }

    chart.draw_series(ranking.iter().enumerate().map(|(i, (_, count))| {
        let i = i as i32;
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(i), 0.0),
                (SegmentValue::Exact(i + 1), *count as f64),
            ],
            accent.mix(0.85).filled(),
        );
        bar.set_margin(0, 0, 6, 6);
        bar
    }))?;

    root.present()?;
    Ok(())
}

/// Annotated correlation heatmap. Row 0 is drawn at the top.
pub(crate) fn correlation(
    buffer: &mut [u8],
    theme: &ChartTheme,
    names: &[String],
    matrix: &[Vec<Option<f64>>],
    font: Option<&str>,
) -> DrawResult {
    let size = canvas_size(ChartKind::Correlation, theme);
    let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
    root.fill(&color(theme.background))?;

    let fg = color(theme.foreground);
    let k = names.len() as i32;
    let flip = |row: usize| k - 1 - row as i32;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(24);
    if let Some(family) = font {
        builder
            .caption(
                "Feature Correlation Heatmap",
                (family, 28).into_font().color(&fg),
            )
            .x_label_area_size(64)
            .y_label_area_size(120);
    }
    let mut chart =
        builder.build_cartesian_2d((0..k).into_segmented(), (0..k).into_segmented())?;

    let x_label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) => names
            .get(*i as usize)
            .map(|n| shorten(n, 12))
            .unwrap_or_default(),
        _ => String::new(),
    };
    let y_label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(i) => names
            .get((k - 1 - *i) as usize)
            .map(|n| shorten(n, 16))
            .unwrap_or_default(),
        _ => String::new(),
    };
    if let Some(family) = font {
        chart
            .configure_mesh()
            .disable_mesh()
            .axis_style(fg)
            .x_labels(names.len())
            .y_labels(names.len())
            .x_label_formatter(&x_label)
            .y_label_formatter(&y_label)
            .label_style((family, 13).into_font().color(&fg))
            .draw()?;
    }

    let cell_color = |value: Option<f64>| match value {
        Some(v) if v >= 0.0 => blend(theme.panel, theme.correlation_color, v),
        Some(v) => blend(theme.panel, theme.categories_color, -v),
        None => color(theme.grid),
    };

    chart.draw_series(matrix.iter().enumerate().flat_map(|(row, values)| {
        let y = flip(row);
        values.iter().enumerate().map(move |(col, value)| {
            let x = col as i32;
            Rectangle::new(
                [
                    (SegmentValue::Exact(x), SegmentValue::Exact(y)),
                    (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1)),
                ],
                cell_color(*value).filled(),
            )
        })
    }))?;

    if let Some(family) = font {
        let annotation = (family, 15)
            .into_font()
            .color(&fg)
            .pos(Pos::new(HPos::Center, VPos::Center));
        chart.draw_series(matrix.iter().enumerate().flat_map(|(row, values)| {
            let y = flip(row);
            let style = annotation.clone();
            values.iter().enumerate().map(move |(col, value)| {
                let label = value.map_or_else(|| "nan".to_string(), |v| format!("{v:.2}"));
                Text::new(
                    label,
                    (SegmentValue::CenterOf(col as i32), SegmentValue::CenterOf(y)),
                    style.clone(),
                )
            })
        }))?;
    }

    root.present()?;
    Ok(())
}
