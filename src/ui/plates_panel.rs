// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Plate list panel.
//!
//! One card per plate with its width and height fields, move and remove
//! buttons, and an "Add plate" button at the end.

use super::dimension_field::DimensionField;
use crate::models::plate::{
    PlateId, PlateLifecycle, PlateRegistry, HEIGHT_RANGE_CM, MAX_PLATES, WIDTH_RANGE_CM,
};
use crate::util::units::DisplayUnit;
use std::collections::HashMap;

/// Result of plates panel interaction.
pub enum PlatesAction {
    None,
    SetWidth(PlateId, f64),
    SetHeight(PlateId, f64),
    Remove(PlateId),
    Move { from: usize, to: usize },
    Add,
}

/// Editing state of one plate card.
pub struct PlateFields {
    pub width: DimensionField,
    pub height: DimensionField,
}

impl PlateFields {
    pub fn new(width_cm: f64, height_cm: f64, unit: DisplayUnit) -> Self {
        Self {
            width: DimensionField::new(width_cm, unit, WIDTH_RANGE_CM),
            height: DimensionField::new(height_cm, unit, HEIGHT_RANGE_CM),
        }
    }
}

/// Bring the field map in line with the registry: create missing entries,
/// drop stale ones and refresh committed values.
pub fn sync_fields(
    fields: &mut HashMap<PlateId, PlateFields>,
    registry: &PlateRegistry,
    unit: DisplayUnit,
) {
    fields.retain(|id, _| registry.get(id).is_some());
    for plate in registry.plates() {
        let entry = fields
            .entry(plate.id.clone())
            .or_insert_with(|| PlateFields::new(plate.width_cm, plate.height_cm, unit));
        entry.width.sync(plate.width_cm, unit);
        entry.height.sync(plate.height_cm, unit);
    }
}

/// Display the plate cards. `horizontal` lays the cards out in a row,
/// used by the bottom panel on narrow viewports.
pub fn show(
    ui: &mut egui::Ui,
    registry: &PlateRegistry,
    fields: &mut HashMap<PlateId, PlateFields>,
    unit: DisplayUnit,
    horizontal: bool,
) -> PlatesAction {
    let mut action = PlatesAction::None;
    let count = registry.len();

    let mut cards = |ui: &mut egui::Ui| {
        for (index, plate) in registry.plates().iter().enumerate() {
            let Some(plate_fields) = fields.get_mut(&plate.id) else {
                continue;
            };
            let pending = registry.lifecycle(&plate.id) == PlateLifecycle::PendingRemoval;

            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.add_enabled_ui(!pending, |ui| {
                    ui.vertical(|ui| {
                        ui.horizontal(|ui| {
                            ui.strong(&plate.label);
                            if pending {
                                ui.label(egui::RichText::new("removing...").italics().weak());
                            }
                        });

                        if let Some(cm) = dimension_row(ui, "Width", &mut plate_fields.width, unit) {
                            action = PlatesAction::SetWidth(plate.id.clone(), cm);
                        }
                        if let Some(cm) = dimension_row(ui, "Height", &mut plate_fields.height, unit) {
                            action = PlatesAction::SetHeight(plate.id.clone(), cm);
                        }

                        ui.horizontal(|ui| {
                            if ui
                                .add_enabled(index > 0, egui::Button::new("◀"))
                                .on_hover_text("Move left")
                                .clicked()
                            {
                                action = PlatesAction::Move { from: index, to: index - 1 };
                            }
                            if ui
                                .add_enabled(index + 1 < count, egui::Button::new("▶"))
                                .on_hover_text("Move right")
                                .clicked()
                            {
                                action = PlatesAction::Move { from: index, to: index + 1 };
                            }
                            if ui
                                .add_enabled(registry.can_remove(&plate.id), egui::Button::new("🗑 Remove"))
                                .clicked()
                            {
                                action = PlatesAction::Remove(plate.id.clone());
                            }
                        });
                    });
                });
            });
        }

        if ui
            .add_enabled(registry.can_add(), egui::Button::new("➕ Add plate"))
            .on_disabled_hover_text(format!("At most {} plates", MAX_PLATES))
            .clicked()
        {
            action = PlatesAction::Add;
        }
    };

    if horizontal {
        egui::ScrollArea::horizontal().show(ui, |ui| ui.horizontal_top(|ui| cards(ui)));
    } else {
        ui.heading("Plates");
        ui.separator();
        egui::ScrollArea::vertical().show(ui, |ui| cards(ui));
    }

    action
}

/// One labelled numeric field with its inline error, mm preview and
/// allowed range.
/// Returns the committed centimetre value, if any.
fn dimension_row(
    ui: &mut egui::Ui,
    label: &str,
    field: &mut DimensionField,
    unit: DisplayUnit,
) -> Option<f64> {
    let mut committed = None;
    ui.horizontal(|ui| {
        ui.label(label);
        let mut text = field.text.clone();
        let response = ui.add(egui::TextEdit::singleline(&mut text).desired_width(64.0));
        if response.changed() {
            field.set_text(text);
        }
        if response.lost_focus() {
            committed = field.commit();
        }
        ui.label(unit.suffix());
    });
    ui.label(
        egui::RichText::new(format!("{} mm · {}", field.preview_mm(), field.range_hint()))
            .small()
            .weak(),
    );
    if let Some(error) = field.error() {
        ui.label(egui::RichText::new(error.to_string()).small().color(ui.visuals().error_fg_color));
    }
    committed
}
