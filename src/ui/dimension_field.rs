// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Numeric width/height field with inline validation.
//!
//! The field keeps the text being edited separate from the last committed
//! value. Edits are validated on every keystroke so the error can be shown
//! inline, but the plate only changes on commit (focus loss or Enter). A
//! failed commit restores the last committed text.

use crate::util::units::{from_display, parse_number, round2, to_display, DisplayUnit};
use std::ops::RangeInclusive;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DimensionError {
    #[error("Required. Range {min}-{max} cm.")]
    Empty { min: f64, max: f64 },

    #[error("Invalid number. Use a dot or a comma as decimal separator.")]
    Invalid,

    #[error("Out of range: {min}-{max} cm.")]
    OutOfRange { min: f64, max: f64 },
}

/// Format a centimetre value as field text in the given unit.
pub fn display_text(value_cm: f64, unit: DisplayUnit) -> String {
    round2(to_display(value_cm, unit)).to_string()
}

#[derive(Debug, Clone)]
pub struct DimensionField {
    pub text: String,
    last_valid: String,
    value_cm: f64,
    unit: DisplayUnit,
    range_cm: RangeInclusive<f64>,
    error: Option<DimensionError>,
}

impl DimensionField {
    pub fn new(value_cm: f64, unit: DisplayUnit, range_cm: RangeInclusive<f64>) -> Self {
        let text = display_text(value_cm, unit);
        Self {
            last_valid: text.clone(),
            text,
            value_cm,
            unit,
            range_cm,
            error: None,
        }
    }

    /// Refresh the text when the committed value or the unit changed
    /// elsewhere. Pending edits are discarded in that case.
    pub fn sync(&mut self, value_cm: f64, unit: DisplayUnit) {
        if self.value_cm == value_cm && self.unit == unit {
            return;
        }
        self.value_cm = value_cm;
        self.unit = unit;
        self.text = display_text(value_cm, unit);
        self.last_valid = self.text.clone();
        self.error = None;
    }

    /// Validate raw input, returning the value in centimetres.
    ///
    /// Values typed in inches are accepted when they round to the range
    /// bounds at two decimals, then clamped into the range.
    pub fn validate(&self, raw: &str) -> Result<f64, DimensionError> {
        let (min, max) = (*self.range_cm.start(), *self.range_cm.end());
        if raw.trim().is_empty() {
            return Err(DimensionError::Empty { min, max });
        }
        let number = parse_number(raw).ok_or(DimensionError::Invalid)?;
        let cm = from_display(number, self.unit);
        let slack = from_display(0.005, self.unit);
        if cm < min - slack || cm > max + slack {
            return Err(DimensionError::OutOfRange { min, max });
        }
        Ok(cm.clamp(min, max))
    }

    /// Replace the text being edited and revalidate it.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.error = self.validate(&self.text).err();
    }

    /// Commit the current text.
    ///
    /// Returns the new centimetre value when it was accepted and differs
    /// from the committed one. Rejected input reverts to the last committed
    /// text and leaves the error visible.
    pub fn commit(&mut self) -> Option<f64> {
        if self.text == self.last_valid {
            self.error = None;
            return None;
        }
        match self.validate(&self.text) {
            Ok(cm) => {
                self.error = None;
                self.value_cm = cm;
                self.last_valid = self.text.clone();
                Some(cm)
            }
            Err(e) => {
                log::debug!("Rejected dimension input {:?}: {}", self.text, e);
                self.text = self.last_valid.clone();
                self.error = Some(e);
                None
            }
        }
    }

    pub fn error(&self) -> Option<&DimensionError> {
        self.error.as_ref()
    }

    pub fn value_cm(&self) -> f64 {
        self.value_cm
    }

    /// Allowed range in the display unit, e.g. `20-300 cm`.
    pub fn range_hint(&self) -> String {
        format!(
            "{}-{} {}",
            display_text(*self.range_cm.start(), self.unit),
            display_text(*self.range_cm.end(), self.unit),
            self.unit.suffix()
        )
    }

    /// Millimetre preview of the text being edited, falling back to the
    /// committed value while the text does not parse.
    pub fn preview_mm(&self) -> i64 {
        let cm = parse_number(&self.text)
            .map(|n| from_display(n, self.unit))
            .unwrap_or(self.value_cm);
        (cm * 10.0).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plate::{HEIGHT_RANGE_CM, WIDTH_RANGE_CM};
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn width_field(value_cm: f64, unit: DisplayUnit) -> DimensionField {
        DimensionField::new(value_cm, unit, WIDTH_RANGE_CM)
    }

    #[test]
    fn test_text_follows_unit() {
        let mut field = width_field(200.0, DisplayUnit::Metric);
        assert_eq!(field.text, "200");
        field.sync(200.0, DisplayUnit::Imperial);
        assert_eq!(field.text, "78.74");
    }

    #[test]
    fn test_error_kinds() {
        let field = width_field(200.0, DisplayUnit::Metric);
        assert_eq!(
            field.validate("  "),
            Err(DimensionError::Empty { min: 20.0, max: 300.0 })
        );
        assert_eq!(field.validate("abc"), Err(DimensionError::Invalid));
        assert_eq!(
            field.validate("301"),
            Err(DimensionError::OutOfRange { min: 20.0, max: 300.0 })
        );
        assert_eq!(field.validate("150,5"), Ok(150.5));
    }

    #[test]
    fn test_error_shown_while_typing() {
        let mut field = width_field(200.0, DisplayUnit::Metric);
        field.set_text("19");
        assert!(matches!(field.error(), Some(DimensionError::OutOfRange { .. })));
        field.set_text("190");
        assert!(field.error().is_none());
    }

    #[test]
    fn test_commit_accepts_and_remembers() {
        let mut field = width_field(200.0, DisplayUnit::Metric);
        field.set_text("120,5");
        assert_eq!(field.commit(), Some(120.5));
        assert_eq!(field.value_cm(), 120.5);

        field.set_text("oops");
        assert_eq!(field.commit(), None);
        assert_eq!(field.text, "120,5");
        assert_eq!(field.error(), Some(&DimensionError::Invalid));
    }

    #[test]
    fn test_unchanged_text_does_not_commit() {
        let mut field = width_field(200.0, DisplayUnit::Imperial);
        assert_eq!(field.commit(), None);
        assert_eq!(field.value_cm(), 200.0);
    }

    #[test]
    fn test_inch_bounds_are_reachable() {
        let field = width_field(200.0, DisplayUnit::Imperial);
        // 20 cm shows as 7.87 in, which is 19.9898 cm.
        assert_eq!(field.validate("7.87"), Ok(20.0));
        assert_abs_diff_eq!(field.validate("118.11").unwrap(), 299.9994, epsilon = 1e-9);
        assert!(field.validate("7.8").is_err());
    }

    #[test]
    fn test_preview_mm() {
        let mut field = DimensionField::new(120.0, DisplayUnit::Metric, HEIGHT_RANGE_CM);
        assert_eq!(field.preview_mm(), 1200);
        field.set_text("45.67");
        assert_eq!(field.preview_mm(), 457);
        field.set_text("x");
        assert_eq!(field.preview_mm(), 1200);
    }

    #[test]
    fn test_range_hint_follows_unit() {
        let mut width = width_field(200.0, DisplayUnit::Metric);
        assert_eq!(width.range_hint(), "20-300 cm");
        width.sync(200.0, DisplayUnit::Imperial);
        assert_eq!(width.range_hint(), "7.87-118.11 in");

        let height = DimensionField::new(120.0, DisplayUnit::Metric, HEIGHT_RANGE_CM);
        assert_eq!(height.range_hint(), "30-128 cm");
    }

    proptest! {
        #[test]
        fn prop_valid_width_round_trips(w in 20.0f64..=300.0, imperial in any::<bool>()) {
            let unit = if imperial { DisplayUnit::Imperial } else { DisplayUnit::Metric };
            let mut field = width_field(100.0, unit);
            field.set_text(display_text(w, unit));
            let committed = field.commit().unwrap_or(field.value_cm());
            prop_assert!((committed - w).abs() <= 0.01 * crate::util::units::CM_PER_IN);
            prop_assert!(WIDTH_RANGE_CM.contains(&committed));
        }

        #[test]
        fn prop_rejected_input_reverts(raw in "[a-z%]{1,6}|[1-9][0-9]{3,5}|-[0-9]{1,3}") {
            let mut field = width_field(150.0, DisplayUnit::Metric);
            let before = field.text.clone();
            field.set_text(raw);
            prop_assert_eq!(field.commit(), None);
            prop_assert_eq!(&field.text, &before);
            prop_assert_eq!(field.value_cm(), 150.0);
        }
    }
}
