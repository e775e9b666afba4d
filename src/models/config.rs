// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Persisted layout configuration.
//!
//! A [`Configuration`] is the unit of persistence: the plate row, the
//! display unit, the motif reference and the background fit mode.

use super::plate::{Plate, PlateRegistry};
use crate::util::units::DisplayUnit;
use serde::{Deserialize, Serialize};

/// How the motif is fitted onto the whole plate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Fill the row completely, cropping the overflowing axis.
    #[default]
    Cover,
    /// Show the whole motif, leaving empty bands on one axis.
    Contain,
}

impl FitMode {
    pub fn label(self) -> &'static str {
        match self {
            FitMode::Cover => "Cover (crop)",
            FitMode::Contain => "Contain (fit)",
        }
    }
}

/// Complete layout state for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub plates: Vec<Plate>,
    pub unit: DisplayUnit,
    pub motif_url: String,
    pub fit_mode: FitMode,
}

impl Configuration {
    /// Capture the current registry and options.
    pub fn snapshot(
        registry: &PlateRegistry,
        unit: DisplayUnit,
        motif_url: &str,
        fit_mode: FitMode,
    ) -> Self {
        Self {
            plates: registry.plates().to_vec(),
            unit,
            motif_url: motif_url.to_string(),
            fit_mode,
        }
    }

    /// Turn the stored plate list back into a registry.
    pub fn registry(&self) -> PlateRegistry {
        PlateRegistry::from_plates(self.plates.clone())
    }
}
