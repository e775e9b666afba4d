// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! The app owns the plate registry and display options, derives the stage
//! geometry from them every frame, and coordinates the panels, the
//! background motif loader, persistence and export.

use crate::io::export::{self, BackgroundSource, ExportFormat, ExportOptions};
use crate::io::media::{self, LoadedMotif, MotifLoadResult, DEFAULT_MOTIF_REF};
use crate::io::persistence::{FileStore, PersistenceAdapter};
use crate::io::serialization;
use crate::layout::compositor::{self, clamp_pan, Composition, MotifSize, MIRROR_PERIOD};
use crate::layout::stage::{StageLayout, ViewportBucket};
use crate::layout::strip::{self, StripCache, StripKey, MAX_STRIP_DENSITY};
use crate::models::config::{Configuration, FitMode};
use crate::models::plate::{PlateId, PlateRegistry};
use crate::settings::Settings;
use crate::ui::plates_panel::{self, PlateFields, PlatesAction};
use crate::ui::stage::{self, StageAction, StageView};
use crate::ui::toolbar::{self, ToolbarAction};
use crate::util::units::{round2, to_display, DisplayUnit};
use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Instant;

/// Exclusive pan gesture on one plate.
struct PanCapture {
    id: PlateId,
    /// Effective pan when the drag started.
    start: (f64, f64),
    /// Pointer travel since the drag started, in stage units.
    travel: (f64, f64),
}

/// Main application state.
pub struct PlateStageApp {
    settings: Settings,

    registry: PlateRegistry,
    unit: DisplayUnit,
    motif_url: String,
    fit_mode: FitMode,

    /// Editing state of the numeric fields, per plate
    fields: HashMap<PlateId, PlateFields>,

    persistence: PersistenceAdapter,
    /// Bumped on every change to the persisted state
    revision: u64,

    /// Decoded motif, if one is loaded
    motif: Option<LoadedMotif>,
    /// Bumped whenever a new motif is decoded
    motif_generation: u64,
    motif_texture: Option<egui::TextureHandle>,

    /// Receiver for background motif loading
    motif_loader: Option<Receiver<MotifLoadResult>>,

    strip_cache: StripCache,
    strip_texture: Option<(StripKey, egui::TextureHandle)>,

    pan: Option<PanCapture>,

    /// Message shown in a modal alert window
    alert: Option<String>,
}

impl PlateStageApp {
    /// Create the app, restoring the last saved layout.
    pub fn new(settings: Settings) -> Self {
        let store = FileStore::new(settings.state_path.clone());
        let mut persistence = PersistenceAdapter::new(Box::new(store), settings.save_debounce());
        let config = persistence.load();
        log::info!(
            "Restored layout with {} plates, motif {}",
            config.plates.len(),
            media::MotifSource::classify(&config.motif_url)
                .map(|s| s.describe())
                .unwrap_or_default()
        );

        let mut app = Self {
            settings,
            registry: config.registry(),
            unit: config.unit,
            motif_url: String::new(),
            fit_mode: config.fit_mode,
            fields: HashMap::new(),
            persistence,
            revision: 0,
            motif: None,
            motif_generation: 0,
            motif_texture: None,
            motif_loader: None,
            strip_cache: StripCache::new(),
            strip_texture: None,
            pan: None,
            alert: None,
        };
        app.request_motif(config.motif_url);
        app
    }

    fn configuration(&self) -> Configuration {
        Configuration::snapshot(&self.registry, self.unit, &self.motif_url, self.fit_mode)
    }

    fn mark_changed(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Hand the persisted state to the adapter if anything changed since the
    /// last call.
    fn observe_state(&mut self, now: Instant) {
        self.persistence.observe(
            self.revision,
            || Configuration::snapshot(&self.registry, self.unit, &self.motif_url, self.fit_mode),
            now,
        );
    }

    /// Start loading a motif. A newer request supersedes a pending one.
    fn request_motif(&mut self, reference: String) {
        let reference = media::sanitize_reference(&reference);
        self.motif_url = reference.clone();
        self.mark_changed();
        self.motif_loader = Some(media::spawn_load(reference, self.settings.asset_root.clone()));
    }

    /// Check for a finished background load.
    fn poll_motif_loader(&mut self, ctx: &egui::Context) {
        let Some(receiver) = &self.motif_loader else {
            return;
        };
        let (reference, result) = match receiver.try_recv() {
            Ok(message) => message,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                log::error!("Motif loader stopped without a result");
                self.motif_loader = None;
                return;
            }
        };
        self.motif_loader = None;

        match result {
            Ok(motif) => {
                self.motif_texture = Some(stage::load_texture(ctx, "motif", &motif.image));
                self.motif = Some(motif);
                self.motif_generation += 1;
                self.strip_cache.clear();
                self.strip_texture = None;
            }
            Err(e) if reference != DEFAULT_MOTIF_REF => {
                log::warn!("Motif failed to load ({}), using default", e);
                self.request_motif(DEFAULT_MOTIF_REF.to_string());
            }
            Err(e) => {
                log::warn!("Default motif failed to load ({}), running without motif", e);
                self.motif = None;
                self.motif_texture = None;
                self.strip_cache.clear();
                self.strip_texture = None;
            }
        }
    }

    fn motif_size(&self) -> Option<MotifSize> {
        self.motif
            .as_ref()
            .map(|m| MotifSize::new(m.width(), m.height()))
    }

    /// Keep the mirror strip texture in step with the motif, fit mode, row
    /// height and screen density.
    fn refresh_strip(&mut self, ctx: &egui::Context, layout: &StageLayout) {
        let Some(motif) = &self.motif else {
            self.strip_texture = None;
            return;
        };
        let key = StripKey {
            motif_generation: self.motif_generation,
            mode: self.fit_mode,
            pane_height: layout.row_height.max(1.0),
            density: (ctx.pixels_per_point() as f64).min(MAX_STRIP_DENSITY),
        };
        if matches!(&self.strip_texture, Some((cached, _)) if *cached == key) {
            return;
        }
        let (bitmap, _) = self.strip_cache.get_or_render(key, &motif.image);
        self.strip_texture = Some((key, stage::load_texture(ctx, "mirror_strip", bitmap)));
    }

    fn handle_stage_action(&mut self, action: StageAction, composition: &Composition) {
        match action {
            StageAction::StartPan(id) => {
                if self.pan.is_some() || !composition.pan_enabled {
                    return;
                }
                if let Some(placement) = composition.placement(&id) {
                    self.pan = Some(PanCapture {
                        id,
                        start: (placement.pan_x, placement.pan_y),
                        travel: (0.0, 0.0),
                    });
                }
            }
            StageAction::Pan { dx, dy } => {
                let Some(capture) = &mut self.pan else {
                    return;
                };
                capture.travel.0 += dx;
                capture.travel.1 += dy;
                let (pan_x, pan_y) = clamp_pan(
                    capture.start.0 + capture.travel.0,
                    capture.start.1 + capture.travel.1,
                    &composition.fit,
                    composition.mirrored,
                );
                if self.registry.set_pan(&capture.id, pan_x, pan_y) {
                    self.mark_changed();
                }
            }
            StageAction::EndPan => self.end_pan(),
            StageAction::None => {}
        }
    }

    fn end_pan(&mut self) {
        if let Some(capture) = self.pan.take() {
            if let Some(plate) = self.registry.get(&capture.id) {
                log::debug!(
                    "Panned {} to ({:.1}, {:.1})",
                    plate.label,
                    plate.pan_x,
                    plate.pan_y
                );
            }
        }
    }

    fn handle_plates_action(&mut self, action: PlatesAction, now: Instant) {
        if !matches!(action, PlatesAction::None) {
            self.mark_changed();
        }
        match action {
            PlatesAction::SetWidth(id, cm) => {
                self.registry.set_width(&id, cm);
            }
            PlatesAction::SetHeight(id, cm) => {
                self.registry.set_height(&id, cm);
            }
            PlatesAction::Remove(id) => {
                if self.registry.request_remove(&id, now)
                    && self.pan.as_ref().is_some_and(|p| p.id == id)
                {
                    self.pan = None;
                }
            }
            PlatesAction::Move { from, to } => {
                self.registry.reorder(from, to);
            }
            PlatesAction::Add => {
                self.registry.add();
            }
            PlatesAction::None => {}
        }
    }

    /// Upload a local image as an inline motif.
    fn upload_motif(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["jpg", "jpeg", "png", "webp", "gif", "bmp"])
            .pick_file()
        else {
            return;
        };
        match std::fs::read(&path) {
            Ok(bytes) => {
                log::info!("Uploading motif {}", path.display());
                self.request_motif(media::encode_inline(&bytes, &path));
            }
            Err(e) => {
                log::error!("Failed to read {}: {}", path.display(), e);
                self.alert = Some(format!("Could not read {}: {}", path.display(), e));
            }
        }
    }

    fn open_layout(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Layouts", &["yaml", "yml", "json"])
            .pick_file()
        else {
            return;
        };
        match serialization::import_layout(&path) {
            Ok(config) => {
                log::info!("Opened layout {} ({} plates)", path.display(), config.plates.len());
                self.registry = config.registry();
                self.unit = config.unit;
                self.fit_mode = config.fit_mode;
                self.fields.clear();
                self.pan = None;
                self.mark_changed();
                if config.motif_url != self.motif_url {
                    self.request_motif(config.motif_url);
                }
            }
            Err(e) => {
                log::error!("Failed to open layout: {:#}", e);
                self.alert = Some(format!("Could not open layout: {:#}", e));
            }
        }
    }

    fn save_layout(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("YAML", &["yaml", "yml"])
            .add_filter("JSON", &["json"])
            .set_file_name("layout.yaml")
            .save_file()
        else {
            return;
        };
        match serialization::export_layout(&self.configuration(), &path) {
            Ok(()) => log::info!("Saved layout to {}", path.display()),
            Err(e) => {
                log::error!("Failed to save layout: {:#}", e);
                self.alert = Some(format!("Could not save layout: {:#}", e));
            }
        }
    }

    /// Ask for a destination and write the rendered stage.
    fn export(&mut self, format: ExportFormat, layout: &StageLayout, composition: &Composition) {
        let file_name = export::export_file_name(format, chrono::Utc::now());
        let Some(path) = rfd::FileDialog::new()
            .add_filter(format.label(), &[format.extension()])
            .set_file_name(file_name)
            .save_file()
        else {
            return;
        };
        if let Err(e) = self.export_to(format, layout, composition, path) {
            log::error!("Export failed: {:#}", e);
            self.alert = Some(format!("Export failed: {:#}", e));
        }
    }

    fn export_to(
        &self,
        format: ExportFormat,
        layout: &StageLayout,
        composition: &Composition,
        path: PathBuf,
    ) -> Result<()> {
        let options = ExportOptions {
            format,
            pixel_density: self.settings.export_pixel_density,
            jpeg_quality: self.settings.jpeg_quality,
        };
        let strip_bitmap;
        let source = match &self.motif {
            Some(motif) if composition.mirrored => {
                strip_bitmap = strip::render_mirror_strip(
                    &motif.image,
                    MIRROR_PERIOD,
                    layout.row_height.max(1.0),
                    self.fit_mode,
                    options.pixel_density,
                );
                BackgroundSource::Strip(&strip_bitmap)
            }
            Some(motif) => BackgroundSource::Motif(&motif.image),
            None => BackgroundSource::None,
        };
        export::export_stage(layout, composition, source, &options, &path)
    }

    fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = &self.alert else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Plate Stage")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.alert = None;
        }
    }
}

/// Overall row size in the display unit, e.g. `Row 400 x 120 cm`.
fn row_summary(registry: &PlateRegistry, unit: DisplayUnit, mirrored: bool) -> String {
    let summary = format!(
        "Row {} x {} {}",
        round2(to_display(registry.total_width_cm(), unit)),
        round2(to_display(registry.max_height_cm(), unit)),
        unit.suffix()
    );
    if mirrored {
        format!("{}, mirrored", summary)
    } else {
        summary
    }
}

impl eframe::App for PlateStageApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        self.poll_motif_loader(ctx);
        if self.motif_loader.is_some() {
            ctx.request_repaint();
        }

        // Removal lifecycle
        let transition = self.settings.removal_transition();
        for id in self.registry.finalize_due(now, transition) {
            self.fields.remove(&id);
            self.mark_changed();
        }
        if self.registry.has_pending() {
            ctx.request_repaint();
        }

        // Stage geometry, derived from current state
        let bucket = ViewportBucket::from_width(ctx.screen_rect().width());
        let padding = bucket.padding(self.settings.canvas_padding);
        let layout = StageLayout::compute(self.registry.plates(), padding);
        let composition = compositor::compose(self.registry.plates(), self.motif_size(), self.fit_mode);
        if composition.mirrored {
            self.refresh_strip(ctx, &layout);
        }

        let summary = row_summary(&self.registry, self.unit, composition.mirrored);

        // Top menu bar
        let mut toolbar_action = ToolbarAction::None;
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Upload Motif...").clicked() {
                        toolbar_action = ToolbarAction::UploadMotif;
                        ui.close_menu();
                    }
                    if ui.button("Use Default Motif").clicked() {
                        toolbar_action = ToolbarAction::DefaultMotif;
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Open Layout...").clicked() {
                        self.open_layout();
                        ui.close_menu();
                    }
                    if ui.button("Save Layout...").clicked() {
                        self.save_layout();
                        ui.close_menu();
                    }
                    ui.separator();
                    ui.menu_button("Export Image", |ui| {
                        for format in [ExportFormat::Png, ExportFormat::Jpeg] {
                            let button = egui::Button::new(format!("Export as {}...", format.label()));
                            if ui.add(button).clicked() {
                                toolbar_action = ToolbarAction::Export(format);
                                ui.close_menu();
                            }
                        }
                    });
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });

        // Toolbar
        let options_before = (self.unit, self.fit_mode);
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            let action = toolbar::show(
                ui,
                &mut self.unit,
                &mut self.fit_mode,
                self.motif_loader.is_some(),
                &summary,
            );
            if !matches!(action, ToolbarAction::None) {
                toolbar_action = action;
            }
        });
        if (self.unit, self.fit_mode) != options_before {
            self.mark_changed();
        }

        match toolbar_action {
            ToolbarAction::UploadMotif => self.upload_motif(),
            ToolbarAction::DefaultMotif => self.request_motif(DEFAULT_MOTIF_REF.to_string()),
            ToolbarAction::Export(format) => self.export(format, &layout, &composition),
            ToolbarAction::None => {}
        }

        // Plates panel: right side on desktop, below the stage on narrow screens
        plates_panel::sync_fields(&mut self.fields, &self.registry, self.unit);
        let plates_action = if bucket.is_narrow() {
            egui::TopBottomPanel::bottom("plates")
                .resizable(true)
                .default_height(220.0)
                .show(ctx, |ui| {
                    plates_panel::show(ui, &self.registry, &mut self.fields, self.unit, true)
                })
                .inner
        } else {
            egui::SidePanel::right("plates")
                .default_width(260.0)
                .show(ctx, |ui| {
                    plates_panel::show(ui, &self.registry, &mut self.fields, self.unit, false)
                })
                .inner
        };
        self.handle_plates_action(plates_action, now);

        // Stage (center)
        let texture = if composition.mirrored {
            self.strip_texture.as_ref().map(|(_, texture)| texture)
        } else {
            self.motif_texture.as_ref()
        };
        let registry = &self.registry;
        let opacity = |id: &PlateId| {
            registry
                .removal_progress(id, now, transition)
                .map_or(1.0, |progress| 1.0 - progress)
        };
        let view = StageView {
            plates: registry.plates(),
            layout: &layout,
            composition: &composition,
            texture,
            bucket,
            panning: self.pan.as_ref().map(|p| &p.id),
            opacity: &opacity,
        };
        let stage_action = egui::CentralPanel::default()
            .show(ctx, |ui| stage::show(ui, &view))
            .inner;
        self.handle_stage_action(stage_action, &composition);

        if self.pan.is_some() && ctx.input(|i| !i.pointer.any_down()) {
            self.end_pan();
        }

        self.show_alert(ctx);

        // Debounced persistence
        self.observe_state(now);
        if let Some(wait) = self.persistence.tick(now) {
            ctx.request_repaint_after(wait);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.observe_state(Instant::now());
        self.persistence.flush();
    }
}
