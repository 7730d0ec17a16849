//! PDF output of laid-out pages through printpdf.

use super::layout::{DrawOp, Page, PageGeometry};
use crate::config::Rgb;
use crate::error::{ReportError, Result};
use image::DynamicImage;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfLayerReference, Rect,
};
use std::path::Path;
use tracing::debug;

/// Images are placed at 72 dpi so one pixel is one point before scaling.
const IMAGE_DPI: f32 = 72.0;

fn mm(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

fn fill(rgb: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(
        rgb.0 as f32 / 255.0,
        rgb.1 as f32 / 255.0,
        rgb.2 as f32 / 255.0,
        None,
    ))
}

fn backend_error(e: impl std::fmt::Display) -> ReportError {
    ReportError::Layout(format!("PDF backend failed: {e}"))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Render pages into an in-memory PDF document.
pub(crate) fn render(title: &str, geometry: &PageGeometry, pages: &[Page]) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        title,
        mm(geometry.width),
        mm(geometry.height),
        "Layer 1",
    );
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(backend_error)?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(backend_error)?,
    };

    for (idx, page) in pages.iter().enumerate() {
        let layer = if idx == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_idx, layer_idx) = doc.add_page(
                mm(geometry.width),
                mm(geometry.height),
                format!("Layer {}", page.number),
            );
            doc.get_page(page_idx).get_layer(layer_idx)
        };
        for op in &page.ops {
            draw(&layer, op, &fonts)?;
        }
    }

    let bytes = doc.save_to_bytes().map_err(backend_error)?;
    debug!("Rendered {} page(s), {} bytes", pages.len(), bytes.len());
    Ok(bytes)
}

fn draw(layer: &PdfLayerReference, op: &DrawOp, fonts: &Fonts) -> Result<()> {
    match op {
        DrawOp::Text {
            x,
            y,
            text,
            size,
            bold,
            color,
        } => {
            let font = if *bold { &fonts.bold } else { &fonts.regular };
            layer.set_fill_color(fill(*color));
            layer.use_text(text.as_str(), *size, mm(*x), mm(*y), font);
        }
        DrawOp::Rect {
            x,
            y,
            width,
            height,
            color,
        } => {
            layer.set_fill_color(fill(*color));
            layer.add_rect(Rect::new(mm(*x), mm(*y), mm(x + width), mm(y + height)));
        }
        DrawOp::Image {
            path,
            x,
            y,
            width,
            height,
        } => {
            let decoded = load_image(path)?;
            let (px_w, px_h) = (decoded.width() as f32, decoded.height() as f32);
            if px_w == 0.0 || px_h == 0.0 {
                return Ok(());
            }
            Image::from_dynamic_image(&decoded).add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(mm(*x)),
                    translate_y: Some(mm(*y)),
                    scale_x: Some(width / px_w),
                    scale_y: Some(height / px_h),
                    dpi: Some(IMAGE_DPI),
                    ..Default::default()
                },
            );
        }
    }
    Ok(())
}

/// Decode an image and drop any alpha channel.
fn load_image(path: &Path) -> Result<DynamicImage> {
    let decoded = image::open(path).map_err(|e| {
        ReportError::Layout(format!("Cannot embed image {}: {e}", path.display()))
    })?;
    Ok(DynamicImage::ImageRgb8(decoded.to_rgb8()))
}
