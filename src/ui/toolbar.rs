// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar with display options and export buttons.

use crate::io::export::ExportFormat;
use crate::models::config::FitMode;
use crate::util::units::DisplayUnit;

/// Result of toolbar interaction.
pub enum ToolbarAction {
    None,
    UploadMotif,
    DefaultMotif,
    Export(ExportFormat),
}

/// Display the toolbar. Unit and fit mode are edited in place.
pub fn show(
    ui: &mut egui::Ui,
    unit: &mut DisplayUnit,
    fit_mode: &mut FitMode,
    loading: bool,
    summary: &str,
) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal_wrapped(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label("Unit:");
        egui::ComboBox::from_id_source("unit")
            .selected_text(unit.suffix())
            .width(56.0)
            .show_ui(ui, |ui| {
                ui.selectable_value(unit, DisplayUnit::Metric, "cm");
                ui.selectable_value(unit, DisplayUnit::Imperial, "in");
            });

        ui.separator();

        ui.label("Motif:");
        for mode in [FitMode::Cover, FitMode::Contain] {
            ui.selectable_value(fit_mode, mode, mode.label());
        }

        ui.separator();

        if ui.button("📂 Upload...").clicked() {
            action = ToolbarAction::UploadMotif;
        }
        if ui.button("Default").clicked() {
            action = ToolbarAction::DefaultMotif;
        }
        if loading {
            ui.spinner();
        }

        ui.separator();

        for format in [ExportFormat::Png, ExportFormat::Jpeg] {
            if ui.button(format!("⬇ {}", format.label())).clicked() {
                action = ToolbarAction::Export(format);
            }
        }

        ui.separator();
        ui.label(egui::RichText::new(summary).weak());
    });

    action
}
