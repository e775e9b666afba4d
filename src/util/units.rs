// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Unit conversion and locale tolerant number parsing.
//!
//! Plates are always stored in centimetres. The display unit only affects
//! what the numeric fields show and accept.

use serde::{Deserialize, Serialize};

/// Centimetres per inch.
pub const CM_PER_IN: f64 = 2.54;

/// Unit used by the numeric input fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayUnit {
    #[default]
    #[serde(rename = "cm")]
    Metric,
    #[serde(rename = "in")]
    Imperial,
}

impl DisplayUnit {
    /// Short suffix shown next to a value.
    pub fn suffix(self) -> &'static str {
        match self {
            DisplayUnit::Metric => "cm",
            DisplayUnit::Imperial => "in",
        }
    }
}

/// Convert a centimetre value into the display unit.
pub fn to_display(value_cm: f64, unit: DisplayUnit) -> f64 {
    match unit {
        DisplayUnit::Metric => value_cm,
        DisplayUnit::Imperial => value_cm / CM_PER_IN,
    }
}

/// Convert a value entered in the display unit back to centimetres.
pub fn from_display(value: f64, unit: DisplayUnit) -> f64 {
    match unit {
        DisplayUnit::Metric => value,
        DisplayUnit::Imperial => value * CM_PER_IN,
    }
}

/// Round to two decimals, the precision used for field text.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Parse a number typed with either `.` or `,` as decimal separator.
///
/// Whitespace anywhere in the input is ignored. When both separators are
/// present the rightmost one is the decimal separator and the other one is
/// treated as thousands grouping. Returns `None` for empty, malformed or
/// non-finite input.
pub fn parse_number(input: &str) -> Option<f64> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let last_comma = compact.rfind(',');
    let last_dot = compact.rfind('.');
    let normalized = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (Some(_), None) => compact.replace(',', "."),
        _ => compact,
    };

    // Plain decimal notation only: no exponents, no inf/nan.
    let mut seen_digit = false;
    let mut seen_point = false;
    for (i, c) in normalized.chars().enumerate() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_point => seen_point = true,
            '+' | '-' if i == 0 => {}
            _ => return None,
        }
    }
    if !seen_digit {
        return None;
    }

    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}
