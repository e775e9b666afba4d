// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Mirrored strip generation for wide plate rows.
//!
//! A strip is two panes side by side: the motif fitted into a
//! `period x height` pane, followed by the same pane flipped horizontally.
//! Repeating the strip horizontally gives image, mirror, image, mirror...
//! with matching pixel columns at every seam.

use super::compositor::MIRROR_PERIOD;
use crate::models::config::FitMode;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Pixel densities above this are clamped when rendering strips.
pub const MAX_STRIP_DENSITY: f64 = 2.0;

/// Render the mirrored strip for a motif.
///
/// `pane_width`/`pane_height` are in stage units; the returned bitmap is
/// `2 * pane_width * density` by `pane_height * density` pixels, with
/// density clamped to `[1, 2]`. Each pane clips its own copy of the motif.
pub fn render_mirror_strip(
    motif: &RgbaImage,
    pane_width: f64,
    pane_height: f64,
    mode: FitMode,
    density: f64,
) -> RgbaImage {
    let density = density.clamp(1.0, MAX_STRIP_DENSITY);
    let frame_w = (pane_width * density).round().max(1.0) as u32;
    let frame_h = (pane_height * density).round().max(1.0) as u32;

    let mut pane = RgbaImage::from_pixel(frame_w, frame_h, Rgba([0, 0, 0, 0]));
    if motif.width() > 0 && motif.height() > 0 {
        let scale_w = frame_w as f64 / motif.width() as f64;
        let scale_h = frame_h as f64 / motif.height() as f64;
        let scale = match mode {
            FitMode::Cover => scale_w.max(scale_h),
            FitMode::Contain => scale_w.min(scale_h),
        };
        let draw_w = (motif.width() as f64 * scale).round().max(1.0) as u32;
        let draw_h = (motif.height() as f64 * scale).round().max(1.0) as u32;
        let dx = ((frame_w as f64 - draw_w as f64) / 2.0).round() as i64;
        let dy = ((frame_h as f64 - draw_h as f64) / 2.0).round() as i64;

        let fitted = imageops::resize(motif, draw_w, draw_h, FilterType::Triangle);
        imageops::overlay(&mut pane, &fitted, dx, dy);
    }

    let mut strip = RgbaImage::from_pixel(frame_w * 2, frame_h, Rgba([0, 0, 0, 0]));
    imageops::replace(&mut strip, &pane, 0, 0);
    imageops::replace(&mut strip, &imageops::flip_horizontal(&pane), frame_w as i64, 0);
    strip
}

/// Inputs that determine a strip bitmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripKey {
    /// Bumped every time a new motif finishes loading.
    pub motif_generation: u64,
    pub mode: FitMode,
    pub pane_height: f64,
    pub density: f64,
}

/// Keeps the last rendered strip and re-renders only when its inputs change.
#[derive(Default)]
pub struct StripCache {
    entry: Option<(StripKey, RgbaImage)>,
}

impl StripCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the strip for `key`, rendering it if the cached one is stale.
    /// The boolean is true when a new bitmap was rendered.
    pub fn get_or_render(&mut self, key: StripKey, motif: &RgbaImage) -> (&RgbaImage, bool) {
        let stale = self.entry.as_ref().map_or(true, |(cached, _)| *cached != key);
        if stale {
            self.entry = None;
        }
        let (_, strip) = self.entry.get_or_insert_with(|| {
            log::debug!(
                "Rendering mirror strip: height {}, {:?}, density {}",
                key.pane_height,
                key.mode,
                key.density
            );
            let strip = render_mirror_strip(motif, MIRROR_PERIOD, key.pane_height, key.mode, key.density);
            (key, strip)
        });
        (&*strip, stale)
    }

    pub fn clear(&mut self) {
        self.entry = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Horizontal gradient so mirrored columns are easy to check.
    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, _| {
            let v = (x * 255 / width.max(1)) as u8;
            Rgba([v, 255 - v, 0, 255])
        })
    }

    #[test]
    fn test_strip_size_at_base_density() {
        let strip = render_mirror_strip(&gradient(800, 600), MIRROR_PERIOD, 100.0, FitMode::Cover, 1.0);
        assert_eq!(strip.dimensions(), (600, 100));
    }

    #[test]
    fn test_density_is_capped() {
        let strip = render_mirror_strip(&gradient(80, 60), MIRROR_PERIOD, 50.0, FitMode::Cover, 3.0);
        assert_eq!(strip.dimensions(), (1200, 100));
        let strip = render_mirror_strip(&gradient(80, 60), MIRROR_PERIOD, 50.0, FitMode::Cover, 0.5);
        assert_eq!(strip.dimensions(), (600, 50));
    }

    #[test]
    fn test_second_pane_mirrors_first() {
        let strip = render_mirror_strip(&gradient(300, 100), 30.0, 10.0, FitMode::Cover, 1.0);
        let (w, h) = strip.dimensions();
        let pane_w = w / 2;
        for y in 0..h {
            for x in 0..pane_w {
                assert_eq!(strip.get_pixel(x, y), strip.get_pixel(w - 1 - x, y));
            }
        }
    }

    #[test]
    fn test_cover_fills_every_pixel() {
        let strip = render_mirror_strip(&gradient(100, 400), 60.0, 40.0, FitMode::Cover, 1.0);
        assert!(strip.pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn test_contain_leaves_transparent_bands() {
        // Square motif in a 60x20 pane: 20x20 drawn, centred.
        let strip = render_mirror_strip(&gradient(50, 50), 60.0, 20.0, FitMode::Contain, 1.0);
        assert_eq!(strip.get_pixel(0, 10)[3], 0);
        assert_eq!(strip.get_pixel(30, 10)[3], 255);
        assert_eq!(strip.get_pixel(90, 10)[3], 255);
    }

    #[test]
    fn test_cache_reuses_matching_key() {
        let motif = gradient(40, 20);
        let mut cache = StripCache::new();
        let key = StripKey {
            motif_generation: 1,
            mode: FitMode::Cover,
            pane_height: 120.0,
            density: 1.0,
        };

        let (_, rendered) = cache.get_or_render(key, &motif);
        assert!(rendered);
        let (strip, rendered) = cache.get_or_render(key, &motif);
        assert!(!rendered);
        assert_eq!(strip.dimensions(), (600, 120));

        let taller = StripKey { pane_height: 128.0, ..key };
        let (_, rendered) = cache.get_or_render(taller, &motif);
        assert!(rendered);

        let contain = StripKey { mode: FitMode::Contain, ..taller };
        assert!(cache.get_or_render(contain, &motif).1);
        let reloaded = StripKey { motif_generation: 2, ..contain };
        assert!(cache.get_or_render(reloaded, &motif).1);

        cache.clear();
        assert!(cache.get_or_render(reloaded, &motif).1);
    }
}
