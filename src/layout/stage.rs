// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Stage geometry and viewport fitting.
//!
//! The stage uses one unit per centimetre. Plates sit side by side with a
//! fixed gap, bottom aligned, inside a padded frame. The whole stage is then
//! scaled uniformly to the space the window offers.

use crate::models::plate::Plate;

/// Horizontal gap between neighbouring plates, in stage units.
pub const PLATE_GAP: f64 = 8.0;

/// Stage padding used on narrow viewports.
pub const COMPACT_PADDING: f64 = 8.0;

/// Narrowest window width that still gets the desktop layout.
pub const DESKTOP_MIN_WIDTH: f32 = 884.0;

/// Width classes of the window. Narrow buckets cap the rendered stage height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportBucket {
    Small,
    Medium,
    Large,
    Tablet,
    Desktop,
}

impl ViewportBucket {
    /// Classify a window width in logical points.
    pub fn from_width(width: f32) -> Self {
        if width >= DESKTOP_MIN_WIDTH {
            ViewportBucket::Desktop
        } else if width <= 320.0 {
            ViewportBucket::Small
        } else if width <= 375.0 {
            ViewportBucket::Medium
        } else if width <= 425.0 {
            ViewportBucket::Large
        } else {
            ViewportBucket::Tablet
        }
    }

    pub fn is_narrow(self) -> bool {
        self != ViewportBucket::Desktop
    }

    /// Maximum rendered stage height, if this bucket has one.
    pub fn height_cap(self) -> Option<f64> {
        match self {
            ViewportBucket::Small => Some(150.0),
            ViewportBucket::Medium => Some(165.0),
            ViewportBucket::Large => Some(180.0),
            ViewportBucket::Tablet => Some(200.0),
            ViewportBucket::Desktop => None,
        }
    }

    /// Stage padding for this bucket.
    pub fn padding(self, desktop_padding: f64) -> f64 {
        if self.is_narrow() {
            COMPACT_PADDING
        } else {
            desktop_padding
        }
    }
}

/// Axis-aligned rectangle in stage units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Unscaled geometry of the full plate row.
#[derive(Debug, Clone, PartialEq)]
pub struct StageLayout {
    pub padding: f64,
    /// Sum of plate widths, gaps excluded.
    pub row_width: f64,
    /// Tallest plate.
    pub row_height: f64,
    pub natural_width: f64,
    pub natural_height: f64,
    /// Plate rectangles in stage coordinates, in row order.
    pub plate_rects: Vec<StageRect>,
}

impl StageLayout {
    pub fn compute(plates: &[Plate], padding: f64) -> Self {
        let row_width: f64 = plates.iter().map(|p| p.width_cm).sum();
        let row_height = plates.iter().map(|p| p.height_cm).fold(0.0, f64::max);
        let gaps = plates.len().saturating_sub(1) as f64 * PLATE_GAP;

        let natural_width = (row_width + gaps + 2.0 * padding).max(1.0);
        let natural_height = (row_height + 2.0 * padding).max(1.0);

        let mut x = padding;
        let plate_rects = plates
            .iter()
            .map(|p| {
                let rect = StageRect {
                    x,
                    y: padding + (row_height - p.height_cm),
                    width: p.width_cm,
                    height: p.height_cm,
                };
                x += p.width_cm + PLATE_GAP;
                rect
            })
            .collect();

        Self {
            padding,
            row_width,
            row_height,
            natural_width,
            natural_height,
            plate_rects,
        }
    }
}

/// Result of fitting the stage into the available area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageFit {
    pub scale: f64,
    pub rendered_width: f64,
    pub rendered_height: f64,
}

/// Compute the uniform scale for the stage.
///
/// Desktop viewports fit the stage inside the available box. Narrow
/// viewports fill the width, but the projected height is clamped to the
/// bucket cap so a long row never produces a tall block.
pub fn fit_stage(
    layout: &StageLayout,
    bucket: ViewportBucket,
    available_width: f64,
    available_height: f64,
) -> StageFit {
    let avail_w = available_width.max(1.0);
    let avail_h = available_height.max(1.0);
    let scale_w = avail_w / layout.natural_width;

    let (scale, rendered_height) = match bucket.height_cap() {
        Some(cap) => {
            let projected = layout.natural_height * scale_w;
            let target = cap.min(projected.round());
            let scale_h = target / layout.natural_height;
            let scale = scale_w.min(scale_h);
            (scale, (layout.natural_height * scale).round())
        }
        None => {
            let scale = scale_w.min(avail_h / layout.natural_height);
            (scale, layout.natural_height * scale)
        }
    };

    StageFit {
        scale,
        rendered_width: layout.natural_width * scale,
        rendered_height,
    }
}

/// Convert a pointer delta in screen points to stage units.
pub fn screen_to_stage_delta(dx: f64, dy: f64, scale: f64) -> (f64, f64) {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    (dx / scale, dy / scale)
}
