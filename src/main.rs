// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Plate Stage
//!
//! A desktop application for laying out a row of wall plates under one
//! shared background motif and exporting the result as an image.

mod app;
mod io;
mod layout;
mod models;
mod settings;
mod ui;
mod util;

use anyhow::Result;
use app::PlateStageApp;
use settings::Settings;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let settings = Settings::load();

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([320.0, 480.0])
            .with_title("Plate Stage"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "Plate Stage",
        options,
        Box::new(|_cc| Ok(Box::new(PlateStageApp::new(settings)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
