// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Stage area: the scaled plate row with its background.
//!
//! Geometry comes from [`StageLayout`] and [`Composition`]; this module only
//! maps stage units to screen points, paints, and turns pointer drags on a
//! plate into pan actions.

use crate::layout::compositor::{Composition, PlatePlacement};
use crate::layout::stage::{fit_stage, screen_to_stage_delta, StageLayout, ViewportBucket};
use crate::models::plate::{Plate, PlateId};
use image::RgbaImage;

/// Result of stage interaction.
pub enum StageAction {
    None,
    StartPan(PlateId),
    /// Pointer moved while panning, in stage units.
    Pan { dx: f64, dy: f64 },
    EndPan,
}

/// Everything the stage needs to draw one frame.
pub struct StageView<'a> {
    pub plates: &'a [Plate],
    pub layout: &'a StageLayout,
    pub composition: &'a Composition,
    /// Motif or mirror strip texture, matching the composition.
    pub texture: Option<&'a egui::TextureHandle>,
    pub bucket: ViewportBucket,
    /// Plate currently being panned, if any.
    pub panning: Option<&'a PlateId>,
    /// Opacity per plate; pending removals fade towards zero.
    pub opacity: &'a dyn Fn(&PlateId) -> f32,
}

/// Upload an RGBA image as an egui texture.
pub fn load_texture(ctx: &egui::Context, name: &str, image: &RgbaImage) -> egui::TextureHandle {
    let size = [image.width() as usize, image.height() as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
    ctx.load_texture(name, color_image, egui::TextureOptions::LINEAR)
}

/// Display the stage and handle pan drags.
pub fn show(ui: &mut egui::Ui, view: &StageView) -> StageAction {
    let mut action = StageAction::None;
    let available = ui.available_size();
    let fit = fit_stage(
        view.layout,
        view.bucket,
        available.x as f64,
        available.y as f64,
    );
    let scale = fit.scale as f32;
    let stage_size = egui::vec2(fit.rendered_width as f32, fit.rendered_height as f32);

    // Narrow layouts stack the stage above the controls, so only the block
    // height is claimed there.
    let block_height = if view.bucket.is_narrow() {
        stage_size.y
    } else {
        available.y
    };
    let (block, _) = ui.allocate_exact_size(
        egui::vec2(available.x, block_height),
        egui::Sense::hover(),
    );
    let stage_rect = egui::Align2::CENTER_TOP.align_size_within_rect(
        stage_size,
        if view.bucket.is_narrow() {
            block
        } else {
            egui::Rect::from_center_size(block.center(), stage_size)
        },
    );

    let painter = ui.painter_at(block);
    painter.rect_filled(stage_rect, 0.0, egui::Color32::from_gray(245));

    for ((plate, rect), placement) in view
        .plates
        .iter()
        .zip(&view.layout.plate_rects)
        .zip(&view.composition.placements)
    {
        let plate_rect = egui::Rect::from_min_size(
            stage_rect.min + egui::vec2(rect.x as f32, rect.y as f32) * scale,
            egui::vec2(rect.width as f32, rect.height as f32) * scale,
        );
        let opacity = (view.opacity)(&plate.id);
        paint_plate(&painter, plate_rect, placement, view.texture, scale, opacity);

        if !view.composition.pan_enabled {
            continue;
        }

        let response = ui.interact(
            plate_rect,
            ui.id().with(("plate", plate.id.as_str())),
            egui::Sense::drag(),
        );
        let grabbing = view.panning == Some(&plate.id);
        let response = response.on_hover_cursor(if grabbing {
            egui::CursorIcon::Grabbing
        } else {
            egui::CursorIcon::Grab
        });

        if response.drag_started() {
            action = StageAction::StartPan(plate.id.clone());
        } else if response.dragged() && grabbing {
            let delta = response.drag_delta();
            if delta != egui::Vec2::ZERO {
                let (dx, dy) = screen_to_stage_delta(delta.x as f64, delta.y as f64, fit.scale);
                action = StageAction::Pan { dx, dy };
            }
        } else if response.drag_stopped() {
            action = StageAction::EndPan;
        }
    }

    action
}

/// Paint one plate: its clipped background and an outline.
fn paint_plate(
    painter: &egui::Painter,
    plate_rect: egui::Rect,
    placement: &PlatePlacement,
    texture: Option<&egui::TextureHandle>,
    scale: f32,
    opacity: f32,
) {
    let tint = egui::Color32::WHITE.gamma_multiply(opacity);
    let clipped = painter.with_clip_rect(plate_rect.intersect(painter.clip_rect()));

    let texture_id = match texture {
        Some(handle) => handle.id(),
        None => {
            clipped.rect_filled(
                plate_rect,
                0.0,
                egui::Color32::from_gray(210).gamma_multiply(opacity),
            );
            return;
        }
    };

    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
    let tile_size = egui::vec2(
        placement.background_width as f32,
        placement.background_height as f32,
    ) * scale;
    let origin = plate_rect.min
        + egui::vec2(
            placement.background_x as f32,
            placement.background_y as f32,
        ) * scale;

    if placement.repeat_x && tile_size.x > 0.0 {
        let mut x = origin.x - plate_rect.min.x;
        x = x.rem_euclid(tile_size.x) - tile_size.x;
        while x < plate_rect.width() {
            let tile = egui::Rect::from_min_size(
                egui::pos2(plate_rect.min.x + x, origin.y),
                tile_size,
            );
            clipped.image(texture_id, tile, uv, tint);
            x += tile_size.x;
        }
    } else {
        clipped.image(texture_id, egui::Rect::from_min_size(origin, tile_size), uv, tint);
    }

    clipped.rect_stroke(
        plate_rect,
        0.0,
        egui::Stroke::new(1.0, egui::Color32::from_black_alpha((60.0 * opacity) as u8)),
    );
}
