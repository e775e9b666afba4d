// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application settings.
//!
//! Settings are read once at startup from a YAML file. The path comes from
//! the `PLATE_STAGE_SETTINGS` environment variable, falling back to
//! `plate-stage.yaml` in the working directory. Every key is optional.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the settings file.
pub const SETTINGS_ENV: &str = "PLATE_STAGE_SETTINGS";

/// Settings file looked up when the environment variable is unset.
pub const DEFAULT_SETTINGS_FILE: &str = "plate-stage.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Stage padding on desktop viewports, in stage units.
    pub canvas_padding: f64,
    /// Directory that root-relative motif references resolve against.
    pub asset_root: PathBuf,
    /// File holding the auto-saved layout.
    pub state_path: PathBuf,
    pub save_debounce_ms: u64,
    pub removal_transition_ms: u64,
    pub export_pixel_density: f64,
    pub jpeg_quality: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            canvas_padding: 10.0,
            asset_root: PathBuf::from("assets"),
            state_path: PathBuf::from("plate-stage.json"),
            save_debounce_ms: 300,
            removal_transition_ms: 180,
            export_pixel_density: 2.0,
            jpeg_quality: 95,
        }
    }
}

impl Settings {
    /// Load settings from the configured location, falling back to defaults.
    pub fn load() -> Self {
        let path = std::env::var_os(SETTINGS_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

        if !path.exists() {
            log::debug!("No settings file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::from_file(&path) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring settings file: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings: Settings = serde_yaml::from_str(&yaml)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(settings.sanitized())
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn removal_transition(&self) -> Duration {
        Duration::from_millis(self.removal_transition_ms)
    }

    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.canvas_padding.is_finite() || self.canvas_padding < 0.0 {
            self.canvas_padding = defaults.canvas_padding;
        }
        if !self.export_pixel_density.is_finite() || self.export_pixel_density <= 0.0 {
            self.export_pixel_density = defaults.export_pixel_density;
        }
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self
    }
}
