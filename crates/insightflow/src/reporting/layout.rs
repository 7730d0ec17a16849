//! Flowable layout.
//!
//! A report is a list of [`Flowable`]s poured top to bottom into the frame
//! of each page. [`paginate`] turns them into positioned [`DrawOp`]s, one
//! list per page, splitting tables between rows and stamping the footer
//! with the page number as pages are produced.
//!
//! Coordinates are PDF points with the origin at the bottom-left corner.

use crate::config::Rgb;
use crate::error::{ReportError, Result};
use crate::utils::to_pdf_text;
use std::path::PathBuf;

const EPSILON: f32 = 0.01;

/// Fraction of an image's height that must still fit before it is shrunk
/// into the remaining frame instead of moving to the next page.
const MIN_IMAGE_SHRINK: f32 = 0.5;

/// Page size and margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

impl PageGeometry {
    /// US Letter with 50pt side/top margins and a 70pt bottom margin.
    pub const LETTER: Self = Self {
        width: 612.0,
        height: 792.0,
        margin_left: 50.0,
        margin_right: 50.0,
        margin_top: 50.0,
        margin_bottom: 70.0,
    };

    pub fn frame_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn frame_height(&self) -> f32 {
        self.height - self.margin_top - self.margin_bottom
    }

    fn frame_top(&self) -> f32 {
        self.height - self.margin_top
    }

    fn frame_right(&self) -> f32 {
        self.width - self.margin_right
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::LETTER
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Paragraph styling.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub bold: bool,
    pub color: Rgb,
    pub align: Align,
    pub space_before: f32,
    pub space_after: f32,
}

impl TextStyle {
    pub fn new(size: f32) -> Self {
        Self {
            size,
            bold: false,
            color: (0, 0, 0),
            align: Align::Left,
            space_before: 0.0,
            space_after: 0.0,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn spacing(mut self, before: f32, after: f32) -> Self {
        self.space_before = before;
        self.space_after = after;
        self
    }

    fn leading(&self) -> f32 {
        self.size * 1.2
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableStyle {
    pub font_size: f32,
    pub header_padding: f32,
    pub cell_padding: f32,
    pub header_fill: Rgb,
    pub header_text: Rgb,
    pub body_fill: Option<Rgb>,
    pub body_text: Rgb,
    pub grid: Rgb,
    pub grid_width: f32,
    /// Colored line under the header row: (color, thickness).
    pub header_rule: Option<(Rgb, f32)>,
}

/// A table with a header row. Cells wider than their column are truncated.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub column_widths: Vec<f32>,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub style: TableStyle,
}

impl Table {
    fn width(&self) -> f32 {
        self.column_widths.iter().sum()
    }

    fn header_height(&self) -> f32 {
        self.style.font_size + 2.0 * self.style.header_padding
    }

    fn row_height(&self) -> f32 {
        self.style.font_size + 2.0 * self.style.cell_padding
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Flowable {
    Paragraph { text: String, style: TextStyle },
    /// A filled bar, centered in the frame.
    Rule { width: f32, thickness: f32, color: Rgb },
    Spacer(f32),
    Table(Table),
    /// An image file at its intended size in points, centered in the frame.
    Image { path: PathBuf, width: f32, height: f32 },
    PageBreak,
}

/// A positioned drawing primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Single line of text; `y` is the baseline.
    Text {
        x: f32,
        y: f32,
        text: String,
        size: f32,
        bold: bool,
        color: Rgb,
    },
    /// Filled rectangle anchored at its lower-left corner.
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    },
    Image {
        path: PathBuf,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// All text on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Footer stamped on every page: `label` on the left, `Page N` on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct Footer {
    pub label: String,
    pub size: f32,
    pub color: Rgb,
    /// Baseline height above the bottom edge.
    pub baseline: f32,
    /// Horizontal distance of both strings from the page edges.
    pub inset: f32,
}

/// Lay out flowables onto pages.
///
/// # Errors
///
/// [`ReportError::Layout`] when a single unsplittable piece (a text line or
/// a table row) is taller than the page frame.
pub fn paginate(
    flowables: &[Flowable],
    geometry: &PageGeometry,
    footer: &Footer,
) -> Result<Vec<Page>> {
    let mut paginator = Paginator::new(geometry);
    for flowable in flowables {
        match flowable {
            Flowable::Paragraph { text, style } => paginator.paragraph(text, style)?,
            Flowable::Rule {
                width,
                thickness,
                color,
            } => paginator.rule(*width, *thickness, *color)?,
            Flowable::Spacer(height) => paginator.spacer(*height),
            Flowable::Table(table) => paginator.table(table)?,
            Flowable::Image {
                path,
                width,
                height,
            } => paginator.image(path, *width, *height),
            Flowable::PageBreak => paginator.page_break(),
        }
    }

    let pages = paginator
        .finish()
        .into_iter()
        .enumerate()
        .map(|(idx, mut ops)| {
            let number = idx + 1;
            stamp_footer(&mut ops, footer, geometry, number);
            Page { number, ops }
        })
        .collect();
    Ok(pages)
}

fn stamp_footer(ops: &mut Vec<DrawOp>, footer: &Footer, geometry: &PageGeometry, number: usize) {
    let label = to_pdf_text(&footer.label);
    ops.push(DrawOp::Text {
        x: footer.inset,
        y: footer.baseline,
        text: label,
        size: footer.size,
        bold: false,
        color: footer.color,
    });
    let page_label = format!("Page {number}");
    ops.push(DrawOp::Text {
        x: geometry.width - footer.inset - text_width(&page_label, footer.size, false),
        y: footer.baseline,
        text: page_label,
        size: footer.size,
        bold: false,
        color: footer.color,
    });
}

struct Paginator<'a> {
    geometry: &'a PageGeometry,
    pages: Vec<Vec<DrawOp>>,
    ops: Vec<DrawOp>,
    /// Top of the free space on the current page.
    cursor: f32,
}

impl<'a> Paginator<'a> {
    fn new(geometry: &'a PageGeometry) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            ops: Vec::new(),
            cursor: geometry.frame_top(),
        }
    }

    fn at_top(&self) -> bool {
        (self.cursor - self.geometry.frame_top()).abs() < EPSILON
    }

    fn remaining(&self) -> f32 {
        self.cursor - self.geometry.margin_bottom
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
        self.cursor = self.geometry.frame_top();
    }

    /// Make room for an unsplittable block, breaking the page if needed.
    fn reserve(&mut self, height: f32, what: &str) -> Result<()> {
        if height > self.geometry.frame_height() + EPSILON {
            return Err(ReportError::Layout(format!(
                "{what} is {height:.1}pt tall but a page frame only holds {:.1}pt",
                self.geometry.frame_height()
            )));
        }
        if height > self.remaining() + EPSILON {
            self.new_page();
        }
        Ok(())
    }

    fn advance(&mut self, height: f32) {
        self.cursor = (self.cursor - height).max(self.geometry.margin_bottom);
    }

    fn paragraph(&mut self, text: &str, style: &TextStyle) -> Result<()> {
        if !self.at_top() {
            self.spacer(style.space_before);
        }
        let text = to_pdf_text(text);
        let width = self.geometry.frame_width();
        for line in wrap_text(&text, width, style.size, style.bold) {
            self.reserve(style.leading(), "a line of text")?;
            let line_width = text_width(&line, style.size, style.bold);
            let x = match style.align {
                Align::Left => self.geometry.margin_left,
                Align::Center => self.geometry.margin_left + (width - line_width) / 2.0,
                Align::Right => self.geometry.frame_right() - line_width,
            };
            self.ops.push(DrawOp::Text {
                x,
                y: self.cursor - style.size,
                text: line,
                size: style.size,
                bold: style.bold,
                color: style.color,
            });
            self.advance(style.leading());
        }
        self.spacer(style.space_after);
        Ok(())
    }

    fn spacer(&mut self, height: f32) {
        if height <= 0.0 {
            return;
        }
        if height > self.remaining() + EPSILON {
            // spacing never carries over to the next page
            self.new_page();
        } else {
            self.advance(height);
        }
    }

    fn rule(&mut self, width: f32, thickness: f32, color: Rgb) -> Result<()> {
        self.reserve(thickness, "a rule")?;
        let width = width.min(self.geometry.frame_width());
        let x = self.centered_x(width);
        self.ops.push(DrawOp::Rect {
            x,
            y: self.cursor - thickness,
            width,
            height: thickness,
            color,
        });
        self.advance(thickness);
        Ok(())
    }

    fn table(&mut self, table: &Table) -> Result<()> {
        let header_height = table.header_height();
        self.reserve(header_height, "a table header")?;
        self.table_row(table, &table.header, header_height, true);
        if let Some((color, thickness)) = table.style.header_rule {
            let x = self.centered_x(table.width());
            self.ops.push(DrawOp::Rect {
                x,
                y: self.cursor - thickness / 2.0,
                width: table.width(),
                height: thickness,
                color,
            });
        }

        let row_height = table.row_height();
        for row in &table.rows {
            self.reserve(row_height, "a table row")?;
            self.table_row(table, row, row_height, false);
        }
        Ok(())
    }

    fn table_row(&mut self, table: &Table, cells: &[String], height: f32, header: bool) {
        let style = &table.style;
        let left = self.centered_x(table.width());
        let bottom = self.cursor - height;
        let fill = if header {
            Some(style.header_fill)
        } else {
            style.body_fill
        };
        if let Some(color) = fill {
            self.ops.push(DrawOp::Rect {
                x: left,
                y: bottom,
                width: table.width(),
                height,
                color,
            });
        }

        let text_color = if header {
            style.header_text
        } else {
            style.body_text
        };
        // baseline roughly centers cap height in the row
        let baseline = bottom + (height - style.font_size * 0.7) / 2.0;
        let mut x = left;
        for (idx, col_width) in table.column_widths.iter().enumerate() {
            let cell = cells.get(idx).map(String::as_str).unwrap_or("");
            let text = fit_text(
                &to_pdf_text(cell),
                col_width - 2.0 * style.cell_padding,
                style.font_size,
                header,
            );
            if !text.is_empty() {
                self.ops.push(DrawOp::Text {
                    x: x + style.cell_padding,
                    y: baseline,
                    text,
                    size: style.font_size,
                    bold: header,
                    color: text_color,
                });
            }
            self.grid_line(x, bottom, style.grid_width, height, style.grid);
            x += col_width;
        }
        self.grid_line(x, bottom, style.grid_width, height, style.grid);
        self.grid_line(left, bottom, table.width(), style.grid_width, style.grid);
        self.grid_line(left, self.cursor, table.width(), style.grid_width, style.grid);

        self.advance(height);
    }

    fn grid_line(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        // lines are centered on the cell edge
        let (x, y) = if width < height {
            (x - width / 2.0, y)
        } else {
            (x, y - height / 2.0)
        };
        self.ops.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn image(&mut self, path: &std::path::Path, width: f32, height: f32) {
        let frame = self.geometry.frame_height();
        let (mut width, mut height) = scale_to_fit(width, height, self.geometry.frame_width(), frame);

        let remaining = self.remaining();
        if height > remaining + EPSILON {
            if remaining >= height * MIN_IMAGE_SHRINK {
                let factor = remaining / height;
                width *= factor;
                height = remaining;
            } else {
                self.new_page();
            }
        }

        let x = self.centered_x(width);
        self.ops.push(DrawOp::Image {
            path: path.to_path_buf(),
            x,
            y: self.cursor - height,
            width,
            height,
        });
        self.advance(height);
    }

    fn page_break(&mut self) {
        if !self.ops.is_empty() {
            self.new_page();
        }
    }

    fn centered_x(&self, width: f32) -> f32 {
        self.geometry.margin_left + (self.geometry.frame_width() - width) / 2.0
    }

    fn finish(mut self) -> Vec<Vec<DrawOp>> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(self.ops);
        }
        self.pages
    }
}

/// Largest size with the same aspect ratio that fits in `max_w` x `max_h`.
/// Never scales up.
pub fn scale_to_fit(width: f32, height: f32, max_w: f32, max_h: f32) -> (f32, f32) {
    if width <= 0.0 || height <= 0.0 {
        return (0.0, 0.0);
    }
    let factor = (max_w / width).min(max_h / height).min(1.0);
    (width * factor, height * factor)
}

// ============================================================================
// Text metrics
// ============================================================================

/// Helvetica advance widths for ' ' ..= '~', in 1/1000 em.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' - '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0' - '?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@' - 'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P' - '_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`' - 'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p' - '~'
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' - '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // '0' - '?'
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // '@' - 'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 'P' - '_'
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // '`' - 'o'
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 'p' - '~'
];

fn glyph_width(c: char, bold: bool) -> u16 {
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    match c as u32 {
        code @ 0x20..=0x7E => table[(code - 0x20) as usize],
        _ => 556,
    }
}

/// Rendered width of `text` in points.
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = text.chars().map(|c| glyph_width(c, bold) as u32).sum();
    units as f32 * size / 1000.0
}

/// Truncate `text` with `...` so it fits in `max_width` points.
pub fn fit_text(text: &str, max_width: f32, size: f32, bold: bool) -> String {
    if text_width(text, size, bold) <= max_width {
        return text.to_string();
    }
    let ellipsis = "...";
    let budget = max_width - text_width(ellipsis, size, bold);
    if budget <= 0.0 {
        return String::new();
    }

    let mut used = 0.0;
    let mut out = String::new();
    for c in text.chars() {
        let w = glyph_width(c, bold) as f32 * size / 1000.0;
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ellipsis);
    out
}

/// Greedy word wrap. Words longer than a whole line are truncated.
pub fn wrap_text(text: &str, max_width: f32, size: f32, bold: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, size, bold) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        current = fit_text(word, max_width, size, bold);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
