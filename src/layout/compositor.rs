// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Background placement for the plate row.
//!
//! The motif is fitted once onto the whole row, treated as a single virtual
//! canvas, so the texture continues across plate boundaries. Each plate then
//! shows its own window into that shared background, shifted by its pan.
//! Rows wider than [`MIRROR_PERIOD`] switch to a horizontally repeating
//! mirrored strip (see [`super::strip`]).

use super::stage::PLATE_GAP;
use crate::models::config::FitMode;
use crate::models::plate::{Plate, PlateId};

/// Width of one motif pane in the mirrored strip, in stage units.
pub const MIRROR_PERIOD: f64 = 300.0;

/// Natural pixel size of a decoded motif.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotifSize {
    pub width: u32,
    pub height: u32,
}

impl MotifSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn is_usable(self) -> bool {
        self.width > 0 && self.height > 0
    }

    fn aspect(self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// The motif fitted onto the whole row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharedFit {
    pub width: f64,
    pub height: f64,
    /// How far the fitted motif overhangs (positive) or underhangs
    /// (negative) the row, per side.
    pub offset_x: f64,
    pub offset_y: f64,
    pub max_pan_x: f64,
    pub max_pan_y: f64,
}

impl SharedFit {
    /// Background equal to the row, nothing to crop or pan.
    pub fn identity(stage_width: f64, stage_height: f64) -> Self {
        Self {
            width: stage_width,
            height: stage_height,
            offset_x: 0.0,
            offset_y: 0.0,
            max_pan_x: 0.0,
            max_pan_y: 0.0,
        }
    }
}

/// Fit the motif onto a row of the given size.
pub fn shared_fit(motif: Option<MotifSize>, stage_width: f64, stage_height: f64, mode: FitMode) -> SharedFit {
    let stage_width = stage_width.max(1.0);
    let stage_height = stage_height.max(1.0);
    let Some(motif) = motif.filter(|m| m.is_usable()) else {
        return SharedFit::identity(stage_width, stage_height);
    };

    let image_aspect = motif.aspect();
    let stage_aspect = stage_width / stage_height;
    let width_bound = match mode {
        FitMode::Contain => stage_aspect < image_aspect,
        FitMode::Cover => stage_aspect > image_aspect,
    };
    let (width, height) = if width_bound {
        (stage_width, stage_width / image_aspect)
    } else {
        (stage_height * image_aspect, stage_height)
    };

    SharedFit {
        width,
        height,
        offset_x: (width - stage_width) / 2.0,
        offset_y: (height - stage_height) / 2.0,
        max_pan_x: ((width - stage_width) / 2.0).round().abs(),
        max_pan_y: ((height - stage_height) / 2.0).round().abs(),
    }
}

/// Clamp a requested pan into the allowed range.
///
/// Horizontal pan is free while the mirrored strip is active, since the
/// strip repeats. Vertical pan is always limited by the shared fit.
pub fn clamp_pan(pan_x: f64, pan_y: f64, fit: &SharedFit, mirrored: bool) -> (f64, f64) {
    let pan_x = if mirrored {
        pan_x
    } else {
        pan_x.clamp(-fit.max_pan_x, fit.max_pan_x)
    };
    (pan_x, pan_y.clamp(-fit.max_pan_y, fit.max_pan_y))
}

/// Background window of a single plate.
///
/// `background_x`/`background_y` position the background's top-left corner
/// relative to the plate's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatePlacement {
    pub id: PlateId,
    /// Offset of the plate inside the row, gaps included.
    pub x_left: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    pub background_x: f64,
    pub background_y: f64,
    pub background_width: f64,
    pub background_height: f64,
    /// Whether the background tiles horizontally.
    pub repeat_x: bool,
}

/// Background placement for the whole row.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub fit: SharedFit,
    pub mirrored: bool,
    /// Panning needs a decoded motif.
    pub pan_enabled: bool,
    pub placements: Vec<PlatePlacement>,
}

impl Composition {
    pub fn placement(&self, id: &PlateId) -> Option<&PlatePlacement> {
        self.placements.iter().find(|p| &p.id == id)
    }
}

/// Whether a row of this total width uses the mirrored strip.
pub fn needs_mirror(row_width: f64) -> bool {
    row_width > MIRROR_PERIOD
}

/// Compute the background placement of every plate.
pub fn compose(plates: &[Plate], motif: Option<MotifSize>, mode: FitMode) -> Composition {
    let row_width: f64 = plates.iter().map(|p| p.width_cm).sum();
    let row_height = plates.iter().map(|p| p.height_cm).fold(0.0, f64::max);
    let fit = shared_fit(motif, row_width, row_height, mode);
    let mirrored = needs_mirror(row_width);
    let pan_enabled = motif.is_some_and(|m| m.is_usable());

    let mut x_left = 0.0;
    let placements = plates
        .iter()
        .map(|plate| {
            let (pan_x, pan_y) = if pan_enabled {
                clamp_pan(plate.pan_x, plate.pan_y, &fit, mirrored)
            } else {
                (0.0, 0.0)
            };
            let placement = if mirrored {
                PlatePlacement {
                    id: plate.id.clone(),
                    x_left,
                    pan_x,
                    pan_y,
                    background_x: -(x_left - pan_x),
                    background_y: pan_y,
                    background_width: 2.0 * MIRROR_PERIOD,
                    background_height: fit.height.round().max(1.0),
                    repeat_x: true,
                }
            } else {
                PlatePlacement {
                    id: plate.id.clone(),
                    x_left,
                    pan_x,
                    pan_y,
                    background_x: -(x_left + fit.offset_x - pan_x),
                    background_y: -(fit.offset_y - pan_y),
                    background_width: fit.width.round(),
                    background_height: fit.height.round(),
                    repeat_x: false,
                }
            };
            x_left += plate.width_cm + PLATE_GAP;
            placement
        })
        .collect();

    Composition {
        fit,
        mirrored,
        pan_enabled,
        placements,
    }
}
