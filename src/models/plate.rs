// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Plate records and the ordered plate registry.
//!
//! The registry owns the structural invariants: between 1 and
//! [`MAX_PLATES`] plates, stable ids, and labels that always match the
//! 1-based position. Dimension ranges are enforced earlier, by the numeric
//! fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

/// Maximum number of plates in a row.
pub const MAX_PLATES: usize = 10;

/// Accepted plate widths in centimetres.
pub const WIDTH_RANGE_CM: RangeInclusive<f64> = 20.0..=300.0;

/// Accepted plate heights in centimetres.
pub const HEIGHT_RANGE_CM: RangeInclusive<f64> = 30.0..=128.0;

pub const DEFAULT_WIDTH_CM: f64 = 200.0;
pub const DEFAULT_HEIGHT_CM: f64 = 120.0;

/// Stable plate identifier, kept across reorders and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlateId(String);

impl PlateId {
    /// Generate a fresh random id.
    pub fn generate() -> Self {
        Self(format!("p-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlateId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for PlateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single physical panel segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plate {
    pub id: PlateId,
    pub label: String,
    pub width_cm: f64,
    pub height_cm: f64,
    #[serde(default)]
    pub pan_x: f64,
    #[serde(default)]
    pub pan_y: f64,
}

impl Plate {
    /// Create a plate with default dimensions at the given 1-based position.
    pub fn new(position: usize) -> Self {
        Self {
            id: PlateId::generate(),
            label: label_for(position),
            width_cm: DEFAULT_WIDTH_CM,
            height_cm: DEFAULT_HEIGHT_CM,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

/// Positional label for a 1-based position.
pub fn label_for(position: usize) -> String {
    format!("Plate {}", position)
}

/// Where a plate is in its removal lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlateLifecycle {
    Active,
    PendingRemoval,
    Removed,
}

/// Ordered collection of plates.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateRegistry {
    plates: Vec<Plate>,
    /// Plates marked for removal and when the mark was set.
    pending: Vec<(PlateId, Instant)>,
}

impl Default for PlateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PlateRegistry {
    /// A registry holding a single default plate.
    pub fn new() -> Self {
        Self {
            plates: vec![Plate::new(1)],
            pending: Vec::new(),
        }
    }

    /// Build a registry from loaded plates, enforcing structural invariants.
    ///
    /// An empty list yields one default plate; extra plates past the cap are
    /// dropped. Labels are recomputed.
    pub fn from_plates(mut plates: Vec<Plate>) -> Self {
        if plates.is_empty() {
            plates.push(Plate::new(1));
        }
        plates.truncate(MAX_PLATES);
        let mut registry = Self {
            plates,
            pending: Vec::new(),
        };
        registry.relabel();
        registry
    }

    pub fn plates(&self) -> &[Plate] {
        &self.plates
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn get(&self, id: &PlateId) -> Option<&Plate> {
        self.plates.iter().find(|p| &p.id == id)
    }

    pub fn index_of(&self, id: &PlateId) -> Option<usize> {
        self.plates.iter().position(|p| &p.id == id)
    }

    pub fn can_add(&self) -> bool {
        self.plates.len() < MAX_PLATES
    }

    /// Whether the plate may be removed without emptying the row.
    pub fn can_remove(&self, id: &PlateId) -> bool {
        self.get(id).is_some() && !self.is_pending(id) && self.active_count() > 1
    }

    /// Append a default plate. Returns `None` at the cap.
    pub fn add(&mut self) -> Option<PlateId> {
        if !self.can_add() {
            return None;
        }
        let plate = Plate::new(self.plates.len() + 1);
        let id = plate.id.clone();
        self.plates.push(plate);
        self.relabel();
        log::info!("Added plate {}, total: {}", id, self.plates.len());
        Some(id)
    }

    /// Remove a plate immediately. No-op for the last plate or an unknown id.
    pub fn remove(&mut self, id: &PlateId) -> bool {
        if self.plates.len() <= 1 {
            return false;
        }
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.plates.remove(index);
        self.pending.retain(|(pending, _)| pending != id);
        self.relabel();
        log::info!("Removed plate {}, total: {}", id, self.plates.len());
        true
    }

    /// Move the plate at `from` to `to`. Out of range indices are ignored.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.plates.len();
        if from >= len || to >= len || from == to {
            return false;
        }
        let plate = self.plates.remove(from);
        self.plates.insert(to, plate);
        self.relabel();
        true
    }

    pub fn set_width(&mut self, id: &PlateId, width_cm: f64) -> bool {
        self.update(id, |p| p.width_cm = width_cm)
    }

    pub fn set_height(&mut self, id: &PlateId, height_cm: f64) -> bool {
        self.update(id, |p| p.height_cm = height_cm)
    }

    pub fn set_pan(&mut self, id: &PlateId, pan_x: f64, pan_y: f64) -> bool {
        self.update(id, |p| {
            p.pan_x = pan_x;
            p.pan_y = pan_y;
        })
    }

    /// Mark a plate for removal; it stays in the row until finalized.
    pub fn request_remove(&mut self, id: &PlateId, now: Instant) -> bool {
        if !self.can_remove(id) {
            return false;
        }
        self.pending.push((id.clone(), now));
        true
    }

    /// Finalize every pending removal whose transition has elapsed.
    pub fn finalize_due(&mut self, now: Instant, transition: Duration) -> Vec<PlateId> {
        let due: Vec<PlateId> = self
            .pending
            .iter()
            .filter(|(_, since)| now.saturating_duration_since(*since) >= transition)
            .map(|(id, _)| id.clone())
            .collect();
        due.into_iter().filter(|id| self.finalize_remove(id)).collect()
    }

    /// Complete a pending removal right away.
    pub fn finalize_remove(&mut self, id: &PlateId) -> bool {
        if !self.is_pending(id) {
            return false;
        }
        self.remove(id)
    }

    pub fn is_pending(&self, id: &PlateId) -> bool {
        self.pending.iter().any(|(pending, _)| pending == id)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Fraction of the removal transition already elapsed, for fading.
    pub fn removal_progress(&self, id: &PlateId, now: Instant, transition: Duration) -> Option<f32> {
        self.pending.iter().find(|(pending, _)| pending == id).map(|(_, since)| {
            if transition.is_zero() {
                1.0
            } else {
                (now.saturating_duration_since(*since).as_secs_f32() / transition.as_secs_f32())
                    .min(1.0)
            }
        })
    }

    pub fn lifecycle(&self, id: &PlateId) -> PlateLifecycle {
        if self.is_pending(id) {
            PlateLifecycle::PendingRemoval
        } else if self.get(id).is_some() {
            PlateLifecycle::Active
        } else {
            PlateLifecycle::Removed
        }
    }

    pub fn total_width_cm(&self) -> f64 {
        self.plates.iter().map(|p| p.width_cm).sum()
    }

    pub fn max_height_cm(&self) -> f64 {
        self.plates.iter().map(|p| p.height_cm).fold(0.0, f64::max)
    }

    fn active_count(&self) -> usize {
        self.plates.len() - self.pending.len()
    }

    fn update(&mut self, id: &PlateId, f: impl FnOnce(&mut Plate)) -> bool {
        match self.plates.iter_mut().find(|p| &p.id == id) {
            Some(plate) => {
                f(plate);
                true
            }
            None => false,
        }
    }

    fn relabel(&mut self) {
        for (i, plate) in self.plates.iter_mut().enumerate() {
            plate.label = label_for(i + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_labels_positional(registry: &PlateRegistry) {
        for (i, plate) in registry.plates().iter().enumerate() {
            assert_eq!(plate.label, format!("Plate {}", i + 1));
        }
    }

    fn registry_with(n: usize) -> PlateRegistry {
        let mut registry = PlateRegistry::new();
        for _ in 1..n {
            registry.add();
        }
        registry
    }

    #[test]
    fn test_new_registry_has_default_plate() {
        let registry = PlateRegistry::new();
        assert_eq!(registry.len(), 1);
        let plate = &registry.plates()[0];
        assert_eq!(plate.label, "Plate 1");
        assert_eq!(plate.width_cm, 200.0);
        assert_eq!(plate.height_cm, 120.0);
        assert_eq!((plate.pan_x, plate.pan_y), (0.0, 0.0));
    }

    #[test]
    fn test_add_is_capped() {
        let mut registry = registry_with(MAX_PLATES);
        assert_eq!(registry.len(), MAX_PLATES);
        let before = registry.clone();
        assert!(registry.add().is_none());
        assert_eq!(registry, before);
        assert_labels_positional(&registry);
    }

    #[test]
    fn test_remove_last_plate_is_noop() {
        let mut registry = PlateRegistry::new();
        let id = registry.plates()[0].id.clone();
        assert!(!registry.remove(&id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_relabels() {
        let mut registry = registry_with(3);
        let middle = registry.plates()[1].id.clone();
        let last = registry.plates()[2].id.clone();

        assert!(registry.remove(&middle));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(&last).map(|p| p.label.as_str()), Some("Plate 2"));
        assert_eq!(registry.lifecycle(&middle), PlateLifecycle::Removed);
        assert_labels_positional(&registry);
    }

    #[test]
    fn test_remove_unknown_id() {
        let mut registry = registry_with(2);
        assert!(!registry.remove(&PlateId::from("missing")));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_reorder_moves_plate() {
        let mut registry = registry_with(4);
        let ids: Vec<PlateId> = registry.plates().iter().map(|p| p.id.clone()).collect();

        assert!(registry.reorder(0, 2));
        let after: Vec<PlateId> = registry.plates().iter().map(|p| p.id.clone()).collect();
        assert_eq!(after, vec![ids[1].clone(), ids[2].clone(), ids[0].clone(), ids[3].clone()]);
        assert_labels_positional(&registry);

        assert!(!registry.reorder(0, 9));
        assert!(!registry.reorder(1, 1));
    }

    #[test]
    fn test_setters_require_known_id() {
        let mut registry = PlateRegistry::new();
        let id = registry.plates()[0].id.clone();

        assert!(registry.set_width(&id, 150.0));
        assert!(registry.set_height(&id, 90.0));
        assert!(registry.set_pan(&id, -3.0, 4.5));
        let plate = registry.get(&id).unwrap();
        assert_eq!((plate.width_cm, plate.height_cm), (150.0, 90.0));
        assert_eq!((plate.pan_x, plate.pan_y), (-3.0, 4.5));

        assert!(!registry.set_width(&PlateId::from("nope"), 100.0));
    }

    #[test]
    fn test_two_phase_removal() {
        let start = Instant::now();
        let transition = Duration::from_millis(180);
        let mut registry = registry_with(3);
        let id = registry.plates()[0].id.clone();

        assert!(registry.request_remove(&id, start));
        assert_eq!(registry.lifecycle(&id), PlateLifecycle::PendingRemoval);
        assert_eq!(registry.len(), 3);
        assert!(!registry.request_remove(&id, start), "already pending");

        assert!(registry.finalize_due(start + Duration::from_millis(100), transition).is_empty());
        let progress = registry
            .removal_progress(&id, start + Duration::from_millis(90), transition)
            .unwrap();
        assert!((progress - 0.5).abs() < 1e-6);

        let removed = registry.finalize_due(start + transition, transition);
        assert_eq!(removed, vec![id.clone()]);
        assert_eq!(registry.lifecycle(&id), PlateLifecycle::Removed);
        assert_eq!(registry.len(), 2);
        assert!(!registry.has_pending());
        assert_labels_positional(&registry);
    }

    #[test]
    fn test_pending_removals_never_empty_the_row() {
        let start = Instant::now();
        let mut registry = registry_with(2);
        let first = registry.plates()[0].id.clone();
        let second = registry.plates()[1].id.clone();

        assert!(registry.request_remove(&first, start));
        assert!(!registry.request_remove(&second, start));

        registry.finalize_due(start + Duration::from_secs(1), Duration::from_millis(180));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.plates()[0].id, second);
    }

    #[test]
    fn test_finalize_requires_pending_mark() {
        let mut registry = registry_with(2);
        let id = registry.plates()[0].id.clone();
        assert!(!registry.finalize_remove(&id));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_from_plates_enforces_invariants() {
        let registry = PlateRegistry::from_plates(Vec::new());
        assert_eq!(registry.len(), 1);

        let many: Vec<Plate> = (1..=14).map(Plate::new).collect();
        let registry = PlateRegistry::from_plates(many);
        assert_eq!(registry.len(), MAX_PLATES);
        assert_labels_positional(&registry);
    }

    #[test]
    fn test_row_extent() {
        let mut registry = registry_with(2);
        let id = registry.plates()[1].id.clone();
        registry.set_width(&id, 50.0);
        registry.set_height(&id, 128.0);
        assert_eq!(registry.total_width_cm(), 250.0);
        assert_eq!(registry.max_height_cm(), 128.0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add,
        Remove(usize),
        Reorder(usize, usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Add),
            (0usize..12).prop_map(Op::Remove),
            (0usize..12, 0usize..12).prop_map(|(a, b)| Op::Reorder(a, b)),
        ]
    }

    proptest! {
        #[test]
        fn prop_structural_invariants_hold(ops in prop::collection::vec(op_strategy(), 0..40)) {
            let mut registry = PlateRegistry::new();
            for op in ops {
                match op {
                    Op::Add => { registry.add(); }
                    Op::Remove(i) => {
                        if let Some(id) = registry.plates().get(i).map(|p| p.id.clone()) {
                            registry.remove(&id);
                        }
                    }
                    Op::Reorder(a, b) => { registry.reorder(a, b); }
                }
                prop_assert!((1..=MAX_PLATES).contains(&registry.len()));
                for (i, plate) in registry.plates().iter().enumerate() {
                    prop_assert_eq!(&plate.label, &format!("Plate {}", i + 1));
                }
            }
        }

        #[test]
        fn prop_reorder_preserves_membership(n in 1usize..=MAX_PLATES, from in 0usize..10, to in 0usize..10) {
            let mut registry = registry_with(n);
            let mut before: Vec<String> = registry.plates().iter().map(|p| p.id.to_string()).collect();
            registry.reorder(from, to);
            let mut after: Vec<String> = registry.plates().iter().map(|p| p.id.to_string()).collect();
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
        }
    }
}
