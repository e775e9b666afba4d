// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Raster export of the composed stage.
//!
//! The stage is rendered in software from the same layout and composition
//! the UI paints, then encoded as PNG (transparent background) or JPEG
//! (white background).

use crate::layout::compositor::Composition;
use crate::layout::stage::{StageLayout, StageRect};
use anyhow::{bail, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use std::path::Path;

/// Output encodings offered for export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Png => "PNG",
            ExportFormat::Jpeg => "JPEG",
        }
    }

    /// Stage background: transparent for PNG, opaque white for JPEG.
    pub fn background(self) -> Rgba<u8> {
        match self {
            ExportFormat::Png => Rgba([0, 0, 0, 0]),
            ExportFormat::Jpeg => Rgba([255, 255, 255, 255]),
        }
    }
}

/// Export parameters.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub pixel_density: f64,
    pub jpeg_quality: u8,
}

/// Default file name: `plates-<unix millis>.<ext>`.
pub fn export_file_name(format: ExportFormat, now: chrono::DateTime<chrono::Utc>) -> String {
    format!("plates-{}.{}", now.timestamp_millis(), format.extension())
}

/// Background bitmap painted into the plates.
pub enum BackgroundSource<'a> {
    /// The motif stretched to each placement's background size.
    Motif(&'a RgbaImage),
    /// The mirrored strip, repeated horizontally.
    Strip(&'a RgbaImage),
    None,
}

/// Render the stage at the given pixel density.
pub fn render_stage(
    layout: &StageLayout,
    composition: &Composition,
    source: BackgroundSource<'_>,
    density: f64,
    background: Rgba<u8>,
) -> Result<RgbaImage> {
    if !(density.is_finite() && density > 0.0) {
        bail!("invalid pixel density {}", density);
    }
    let width = (layout.natural_width * density).round().max(1.0) as u32;
    let height = (layout.natural_height * density).round().max(1.0) as u32;
    let mut canvas = RgbaImage::from_pixel(width, height, background);

    let Some(first) = composition.placements.first() else {
        return Ok(canvas);
    };

    // Every placement shares one background size, so scale the source once.
    let tile_w = (first.background_width * density).round().max(1.0) as u32;
    let tile_h = (first.background_height * density).round().max(1.0) as u32;
    let (tile, repeat) = match source {
        BackgroundSource::Motif(img) => (imageops::resize(img, tile_w, tile_h, FilterType::Triangle), false),
        BackgroundSource::Strip(img) => (imageops::resize(img, tile_w, tile_h, FilterType::Triangle), true),
        BackgroundSource::None => return Ok(canvas),
    };

    for (rect, placement) in layout.plate_rects.iter().zip(&composition.placements) {
        paint_plate(
            &mut canvas,
            &tile,
            repeat,
            rect,
            placement.background_x,
            placement.background_y,
            density,
        );
    }
    Ok(canvas)
}

fn paint_plate(
    canvas: &mut RgbaImage,
    tile: &RgbaImage,
    repeat: bool,
    rect: &StageRect,
    background_x: f64,
    background_y: f64,
    density: f64,
) {
    let x0 = (rect.x * density).round() as i64;
    let y0 = (rect.y * density).round() as i64;
    let x1 = ((rect.x + rect.width) * density).round() as i64;
    let y1 = ((rect.y + rect.height) * density).round() as i64;
    let origin_x = (background_x * density).round() as i64;
    let origin_y = (background_y * density).round() as i64;
    let (tile_w, tile_h) = (tile.width() as i64, tile.height() as i64);

    for y in y0.max(0)..y1.min(canvas.height() as i64) {
        let sy = y - y0 - origin_y;
        if sy < 0 || sy >= tile_h {
            continue;
        }
        for x in x0.max(0)..x1.min(canvas.width() as i64) {
            let mut sx = x - x0 - origin_x;
            if repeat {
                sx = sx.rem_euclid(tile_w);
            } else if sx < 0 || sx >= tile_w {
                continue;
            }
            let src = *tile.get_pixel(sx as u32, sy as u32);
            blend(canvas.get_pixel_mut(x as u32, y as u32), src);
        }
    }
}

/// Source-over blend of a straight-alpha pixel.
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = src[3] as f32 / 255.0;
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let s = src[c] as f32 / 255.0;
        let d = dst[c] as f32 / 255.0;
        let out = (s * sa + d * da * (1.0 - sa)) / out_a;
        dst[c] = (out * 255.0).round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

/// Encode a rendered stage.
pub fn encode(image: &RgbaImage, options: &ExportOptions) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    match options.format {
        ExportFormat::Png => {
            PngEncoder::new(&mut bytes)
                .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)
                .context("encoding PNG")?;
        }
        ExportFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, options.jpeg_quality)
                .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                .context("encoding JPEG")?;
        }
    }
    Ok(bytes)
}

/// Render, encode and write the stage to `path`.
pub fn export_stage(
    layout: &StageLayout,
    composition: &Composition,
    source: BackgroundSource<'_>,
    options: &ExportOptions,
    path: &Path,
) -> Result<()> {
    let image = render_stage(
        layout,
        composition,
        source,
        options.pixel_density,
        options.format.background(),
    )?;
    let bytes = encode(&image, options)?;
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
    log::info!(
        "Exported {}x{} {} to {}",
        image.width(),
        image.height(),
        options.format.label(),
        path.display()
    );
    Ok(())
}
