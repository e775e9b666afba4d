// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Layout document export and import.
//!
//! Layouts can be written to and read from YAML or JSON files chosen by the
//! user. Imported documents go through the same normalisation as the
//! auto-saved state, so hand-edited files cannot break the registry
//! invariants.

use super::persistence;
use crate::models::config::Configuration;
use anyhow::{bail, Result};
use std::path::Path;

/// Document format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path.extension().and_then(|s| s.to_str());
        match extension.map(str::to_ascii_lowercase).as_deref() {
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            Some("json") => Ok(DocumentFormat::Json),
            _ => bail!("Unsupported file extension: {:?}", extension),
        }
    }
}

/// Export a layout to YAML format.
pub fn export_yaml(config: &Configuration, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export a layout to JSON format.
pub fn export_json(config: &Configuration, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Import a layout from YAML format.
pub fn import_yaml(path: &Path) -> Result<Configuration> {
    let yaml = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_yaml::from_str(&yaml)?;
    Ok(persistence::normalize(&value))
}

/// Import a layout from JSON format.
pub fn import_json(path: &Path) -> Result<Configuration> {
    let json = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&json)?;
    Ok(persistence::normalize(&value))
}

/// Export using the format implied by the file extension.
pub fn export_layout(config: &Configuration, path: &Path) -> Result<()> {
    match DocumentFormat::from_path(path)? {
        DocumentFormat::Yaml => export_yaml(config, path),
        DocumentFormat::Json => export_json(config, path),
    }
}

/// Import using the format implied by the file extension.
pub fn import_layout(path: &Path) -> Result<Configuration> {
    match DocumentFormat::from_path(path)? {
        DocumentFormat::Yaml => import_yaml(path),
        DocumentFormat::Json => import_json(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::FitMode;
    use crate::models::plate::PlateRegistry;
    use crate::util::units::DisplayUnit;

    fn sample() -> Configuration {
        let mut registry = PlateRegistry::new();
        registry.add();
        let id = registry.plates()[1].id.clone();
        registry.set_width(&id, 75.5);
        registry.set_pan(&id, -12.0, 3.0);
        Configuration::snapshot(&registry, DisplayUnit::Imperial, "/motif.jpg", FitMode::Contain)
    }

    #[test]
    fn test_yaml_and_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let config = sample();
        for name in ["layout.yaml", "layout.yml", "layout.json", "LAYOUT.JSON"] {
            let path = dir.path().join(name);
            export_layout(&config, &path).unwrap();
            assert_eq!(import_layout(&path).unwrap(), config, "{}", name);
        }
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.txt");
        assert!(export_layout(&sample(), &path).is_err());
        assert!(import_layout(&path).is_err());
    }

    #[test]
    fn test_hand_edited_yaml_is_normalised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edited.yaml");
        std::fs::write(&path, "plates: []\nunit: in\nmotifUrl: somewhere.jpg\n").unwrap();

        let config = import_layout(&path).unwrap();
        assert_eq!(config.plates.len(), 1);
        assert_eq!(config.unit, DisplayUnit::Imperial);
        assert_eq!(config.motif_url, crate::io::media::DEFAULT_MOTIF_REF);
    }
}
