// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Auto-saved layout state.
//!
//! The stored document is plain JSON. Loading never fails: a missing,
//! malformed or partial document is normalised field by field, and an empty
//! plate list becomes a single default plate. Save errors are logged and
//! swallowed.

use super::media::{self, DEFAULT_MOTIF_REF};
use crate::models::config::{Configuration, FitMode};
use crate::models::plate::{Plate, PlateId, PlateRegistry, HEIGHT_RANGE_CM, MAX_PLATES, WIDTH_RANGE_CM};
use crate::util::debounce::Debouncer;
use crate::util::units::DisplayUnit;
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Key-value style backing store holding one serialized document.
pub trait StateStore {
    /// Raw stored document, or `None` when nothing is stored.
    fn read(&self) -> Result<Option<String>>;

    fn write(&mut self, raw: &str) -> Result<()>;
}

/// Store backed by a single file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateStore for FileStore {
    fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }

    fn write(&mut self, raw: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, raw).with_context(|| format!("writing {}", self.path.display()))
    }
}

/// Configuration used when nothing usable is stored.
pub fn default_configuration() -> Configuration {
    Configuration::snapshot(
        &PlateRegistry::new(),
        DisplayUnit::Metric,
        DEFAULT_MOTIF_REF,
        FitMode::Cover,
    )
}

/// Decode a stored document, repairing whatever is missing or invalid.
pub fn decode_configuration(raw: Option<&str>) -> Configuration {
    let Some(raw) = raw else {
        return default_configuration();
    };
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Stored layout is not valid JSON, using defaults: {}", e);
            return default_configuration();
        }
    };
    normalize(&value)
}

/// Normalise an already parsed document.
pub fn normalize(value: &Value) -> Configuration {
    let mut seen = HashSet::new();
    let plates: Vec<Plate> = value
        .get("plates")
        .and_then(Value::as_array)
        .map(|items| items.iter().take(MAX_PLATES).map(normalize_plate).collect::<Vec<Plate>>())
        .unwrap_or_default()
        .into_iter()
        .map(|mut plate| {
            // Duplicate ids would alias two plates.
            if !seen.insert(plate.id.clone()) {
                plate.id = PlateId::generate();
            }
            plate
        })
        .collect();
    let registry = PlateRegistry::from_plates(plates);

    let unit = match value.get("unit").and_then(Value::as_str) {
        Some("in") => DisplayUnit::Imperial,
        _ => DisplayUnit::Metric,
    };

    let legacy_contain = value.get("bgContain").and_then(Value::as_bool).unwrap_or(false);
    let fit_mode = match value.get("fitMode").and_then(Value::as_str) {
        Some("contain") => FitMode::Contain,
        Some("cover") => FitMode::Cover,
        _ if legacy_contain => FitMode::Contain,
        _ => FitMode::Cover,
    };

    let motif_url = value
        .get("motifUrl")
        .and_then(Value::as_str)
        .map(media::sanitize_reference)
        .unwrap_or_else(|| DEFAULT_MOTIF_REF.to_string());

    Configuration::snapshot(&registry, unit, &motif_url, fit_mode)
}

fn normalize_plate(value: &Value) -> Plate {
    let mut plate = Plate::new(1);
    if let Some(id) = value.get("id").and_then(Value::as_str).filter(|s| !s.is_empty()) {
        plate.id = PlateId::from(id);
    }
    if let Some(width) = finite(value.get("widthCm")) {
        plate.width_cm = width.clamp(*WIDTH_RANGE_CM.start(), *WIDTH_RANGE_CM.end());
    }
    if let Some(height) = finite(value.get("heightCm")) {
        plate.height_cm = height.clamp(*HEIGHT_RANGE_CM.start(), *HEIGHT_RANGE_CM.end());
    }
    plate.pan_x = finite(value.get("panX")).unwrap_or(0.0);
    plate.pan_y = finite(value.get("panY")).unwrap_or(0.0);
    plate
}

fn finite(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|n| n.is_finite())
}

/// Serialize a configuration for storage.
pub fn encode_configuration(config: &Configuration) -> Result<String> {
    Ok(serde_json::to_string(config)?)
}

/// Loads the stored layout once and writes changes back after a quiet period.
pub struct PersistenceAdapter {
    store: Box<dyn StateStore>,
    debouncer: Debouncer<Configuration>,
    last_observed: Option<Configuration>,
    last_revision: Option<u64>,
}

impl PersistenceAdapter {
    pub fn new(store: Box<dyn StateStore>, debounce: Duration) -> Self {
        Self {
            store,
            debouncer: Debouncer::new(debounce),
            last_observed: None,
            last_revision: None,
        }
    }

    /// Read the stored layout, falling back to defaults on any failure.
    pub fn load(&mut self) -> Configuration {
        let raw = match self.store.read() {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Layout storage unavailable: {:#}", e);
                None
            }
        };
        let config = decode_configuration(raw.as_deref());
        self.last_observed = Some(config.clone());
        config
    }

    /// Report the current state. The caller bumps `revision` on every
    /// mutation; `snapshot` only runs when it differs from the last one seen.
    /// Real changes restart the quiet period.
    pub fn observe<F>(&mut self, revision: u64, snapshot: F, now: Instant)
    where
        F: FnOnce() -> Configuration,
    {
        if self.last_revision == Some(revision) {
            return;
        }
        self.last_revision = Some(revision);
        let config = snapshot();
        if self.last_observed.as_ref() != Some(&config) {
            self.last_observed = Some(config.clone());
            self.debouncer.push(config, now);
        }
    }

    /// Write the pending configuration if it has been quiet long enough.
    /// Returns the time until the next write is due, if one is pending.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        if let Some(config) = self.debouncer.poll(now) {
            self.save(&config);
        }
        self.debouncer.remaining(now)
    }

    /// Write any pending configuration immediately.
    pub fn flush(&mut self) {
        if let Some(config) = self.debouncer.flush() {
            self.save(&config);
        }
    }

    fn save(&mut self, config: &Configuration) {
        let result = encode_configuration(config).and_then(|raw| self.store.write(&raw));
        match result {
            Ok(()) => log::debug!("Saved layout with {} plates", config.plates.len()),
            Err(e) => log::warn!("Failed to save layout: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Store whose contents stay inspectable after being boxed.
    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<Option<String>>>);

    impl StateStore for SharedStore {
        fn read(&self) -> Result<Option<String>> {
            Ok(self.0.borrow().clone())
        }

        fn write(&mut self, raw: &str) -> Result<()> {
            *self.0.borrow_mut() = Some(raw.to_string());
            Ok(())
        }
    }

    struct BrokenStore;

    impl StateStore for BrokenStore {
        fn read(&self) -> Result<Option<String>> {
            anyhow::bail!("storage disabled")
        }

        fn write(&mut self, _raw: &str) -> Result<()> {
            anyhow::bail!("storage disabled")
        }
    }

    #[test]
    fn test_missing_document_uses_defaults() {
        let config = decode_configuration(None);
        assert_eq!(config.plates.len(), 1);
        assert_eq!(config.motif_url, DEFAULT_MOTIF_REF);
        assert_eq!(config.fit_mode, FitMode::Cover);
        assert_eq!(config.unit, DisplayUnit::Metric);
    }

    #[test]
    fn test_empty_plate_list_falls_back_to_one_plate() {
        let config = decode_configuration(Some(r#"{"plates": [], "unit": "in"}"#));
        assert_eq!(config.plates.len(), 1);
        assert_eq!(config.plates[0].label, "Plate 1");
        assert_eq!(config.unit, DisplayUnit::Imperial);
    }

    #[test]
    fn test_malformed_json_uses_defaults() {
        let config = decode_configuration(Some("{plates: nope"));
        assert_eq!(config.plates.len(), 1);
        assert_eq!(config.motif_url, DEFAULT_MOTIF_REF);
        assert_eq!(config.fit_mode, FitMode::Cover);
    }

    #[test]
    fn test_partial_plates_are_repaired() {
        let raw = r#"{
            "plates": [
                {"id": "p-keep", "label": "Plate 9", "widthCm": 150, "heightCm": 90, "panX": 12.5},
                {"widthCm": "wide", "heightCm": 500, "panY": "x"},
                7
            ],
            "bgContain": true,
            "motifUrl": "ftp://example.com/m.jpg"
        }"#;
        let config = decode_configuration(Some(raw));

        assert_eq!(config.plates.len(), 3);
        let first = &config.plates[0];
        assert_eq!(first.id.as_str(), "p-keep");
        assert_eq!(first.label, "Plate 1");
        assert_eq!((first.width_cm, first.height_cm), (150.0, 90.0));
        assert_eq!((first.pan_x, first.pan_y), (12.5, 0.0));

        let second = &config.plates[1];
        assert_eq!(second.width_cm, 200.0);
        assert_eq!(second.height_cm, 128.0);
        assert_eq!(second.pan_y, 0.0);
        assert_eq!(config.plates[2].label, "Plate 3");

        assert_eq!(config.fit_mode, FitMode::Contain);
        assert_eq!(config.motif_url, DEFAULT_MOTIF_REF);
    }

    #[test]
    fn test_plate_count_is_capped() {
        let plates: Vec<String> = (0..15).map(|i| format!(r#"{{"id": "p{}"}}"#, i)).collect();
        let raw = format!(r#"{{"plates": [{}]}}"#, plates.join(","));
        assert_eq!(decode_configuration(Some(&raw)).plates.len(), MAX_PLATES);
    }

    #[test]
    fn test_duplicate_ids_are_replaced() {
        let raw = r#"{"plates": [{"id": "p-a"}, {"id": "p-a"}]}"#;
        let config = decode_configuration(Some(raw));
        assert_eq!(config.plates[0].id.as_str(), "p-a");
        assert_ne!(config.plates[1].id, config.plates[0].id);
    }

    #[test]
    fn test_round_trip() {
        let mut registry = PlateRegistry::new();
        registry.add();
        let config = Configuration::snapshot(&registry, DisplayUnit::Imperial, "https://example.com/m.png", FitMode::Contain);
        let raw = encode_configuration(&config).unwrap();
        assert_eq!(decode_configuration(Some(&raw)), config);
    }

    #[test]
    fn test_writes_are_debounced() {
        let shared = SharedStore::default();
        let mut adapter = PersistenceAdapter::new(Box::new(shared.clone()), Duration::from_millis(300));
        let start = Instant::now();

        let mut config = adapter.load();
        adapter.observe(0, || config.clone(), start);
        assert!(adapter.tick(start + Duration::from_secs(1)).is_none());
        assert!(shared.0.borrow().is_none(), "unchanged state is not written");

        config.fit_mode = FitMode::Contain;
        adapter.observe(1, || config.clone(), start);
        config.unit = DisplayUnit::Imperial;
        adapter.observe(2, || config.clone(), start + Duration::from_millis(200));

        assert_eq!(adapter.tick(start + Duration::from_millis(400)), Some(Duration::from_millis(100)));
        assert!(shared.0.borrow().is_none());

        assert_eq!(adapter.tick(start + Duration::from_millis(500)), None);
        let stored = shared.0.borrow().clone().unwrap();
        assert_eq!(decode_configuration(Some(&stored)), config);
    }

    #[test]
    fn test_flush_writes_pending_state() {
        let shared = SharedStore::default();
        let mut adapter = PersistenceAdapter::new(Box::new(shared.clone()), Duration::from_secs(60));
        let mut config = adapter.load();
        config.unit = DisplayUnit::Imperial;
        adapter.observe(1, || config.clone(), Instant::now());
        adapter.flush();
        assert!(shared.0.borrow().is_some());
    }

    #[test]
    fn test_broken_storage_is_tolerated() {
        let mut adapter = PersistenceAdapter::new(Box::new(BrokenStore), Duration::ZERO);
        let mut config = adapter.load();
        assert_eq!(config.plates.len(), 1);

        config.unit = DisplayUnit::Imperial;
        let now = Instant::now();
        adapter.observe(1, || config.clone(), now);
        assert!(adapter.tick(now).is_none());
    }

    #[test]
    fn test_unchanged_revision_skips_snapshot() {
        let shared = SharedStore::default();
        let mut adapter = PersistenceAdapter::new(Box::new(shared.clone()), Duration::ZERO);
        let mut config = adapter.load();
        config.unit = DisplayUnit::Imperial;
        let now = Instant::now();

        let mut snapshots = 0;
        for _ in 0..5 {
            adapter.observe(
                7,
                || {
                    snapshots += 1;
                    config.clone()
                },
                now,
            );
        }
        assert_eq!(snapshots, 1);
        adapter.tick(now);
        assert!(shared.0.borrow().is_some());

        // A bumped revision with identical contents is not rewritten.
        *shared.0.borrow_mut() = None;
        adapter.observe(8, || config.clone(), now);
        adapter.tick(now);
        assert!(shared.0.borrow().is_none());
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("nested").join("state.json"));
        assert!(store.read().unwrap().is_none());
        store.write("{}").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("{}"));
    }
}
