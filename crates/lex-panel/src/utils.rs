//! Shared utilities for the panel cleaning pipeline.
//!
//! Header normalization, missing-value markers, numeric parsing and the
//! half-up rounding used for interpolated values.

use once_cell::sync::Lazy;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

static NON_ALPHANUMERIC: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"[^a-z0-9]+").expect("Invalid regex: non-alphanumeric")
});

// =============================================================================
// Header Utilities
// =============================================================================

/// Normalize a column header for matching.
///
/// Lower-cases and strips everything that is not a letter or digit, so
/// `"Life expectancy "`, `"life_expectancy"` and `"Lifeexpectancy"` compare
/// equal.
///
/// # Example
///
/// ```rust,ignore
/// use lex_panel::utils::normalize_header;
///
/// assert_eq!(normalize_header(" Adult Mortality"), "adultmortality");
/// ```
pub fn normalize_header(header: &str) -> String {
    let lower = header.trim().to_lowercase();
    NON_ALPHANUMERIC.replace_all(&lower, "").into_owned()
}

// =============================================================================
// Missing Value Utilities
// =============================================================================

/// Text markers that mean "not recorded".
pub const MISSING_MARKERS: [&str; 6] = ["na", "n/a", "null", "none", "missing", "#n/a"];

/// Check if a cell is blank or a missing-value marker.
///
/// # Example
///
/// ```rust,ignore
/// use lex_panel::utils::is_missing_marker;
///
/// assert!(is_missing_marker("  "));
/// assert!(is_missing_marker("N/A"));
/// assert!(!is_missing_marker("0"));
/// ```
pub fn is_missing_marker(s: &str) -> bool {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_ascii_lowercase();
    MISSING_MARKERS.iter().any(|&marker| lower == marker)
}

// =============================================================================
// Numeric Parsing Utilities
// =============================================================================

/// Characters used as thousands separators that are stripped before parsing.
pub const NUMERIC_FORMAT_CHARS: [char; 2] = [',', ' '];

/// Try to parse a cell as a numeric value.
///
/// Returns `None` for blank cells, missing markers and non-numeric text.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    if is_missing_marker(s) {
        return None;
    }
    let mut cleaned = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        cleaned = cleaned.replace(c, "");
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a year cell.
///
/// Accepts integral floats such as `"2015.0"`, which is how a year column
/// with nulls comes back from a float-typed read.
pub fn parse_year(s: &str) -> Option<i32> {
    let trimmed = s.trim();
    if let Ok(year) = trimmed.parse::<i32>() {
        return Some(year);
    }
    let value = parse_numeric_string(trimmed)?;
    if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return None;
    }
    Some(value as i32)
}

// =============================================================================
// Rounding Utilities
// =============================================================================

/// Convert a float to a decimal through its shortest textual form.
///
/// `70.15_f64` becomes exactly `70.15`, not the nearest binary fraction.
fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_str(&value.to_string())
        .ok()
        .or_else(|| Decimal::from_f64(value))
}

/// Average two values and round half-up to `decimals` places.
///
/// The arithmetic is done in decimal so a midpoint like `70.05` rounds to
/// `70.1` as written. Values outside the decimal range fall back to float
/// rounding, which is exact there since such values carry no fraction.
///
/// # Example
///
/// ```rust,ignore
/// use lex_panel::utils::midpoint_half_up;
///
/// assert_eq!(midpoint_half_up(70.0, 72.0, 1), 71.0);
/// assert_eq!(midpoint_half_up(70.0, 70.1, 1), 70.1);
/// ```
pub fn midpoint_half_up(a: f64, b: f64, decimals: u32) -> f64 {
    decimal_midpoint(a, b, decimals).unwrap_or_else(|| float_midpoint(a, b, decimals))
}

fn decimal_midpoint(a: f64, b: f64, decimals: u32) -> Option<f64> {
    let sum = to_decimal(a)?.checked_add(to_decimal(b)?)?;
    let mean = sum.checked_div(Decimal::TWO)?;
    to_f64(mean.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero))
}

fn float_midpoint(a: f64, b: f64, decimals: u32) -> f64 {
    let mean = a / 2.0 + b / 2.0;
    if mean.fract() == 0.0 {
        return mean;
    }
    let factor = 10f64.powi(decimals as i32);
    let rounded = (mean * factor).round() / factor;
    if rounded.is_finite() { rounded } else { mean }
}

/// Back to `f64` through the decimal's text, so `70.1` maps to the float
/// literal `70.1`.
fn to_f64(value: Decimal) -> Option<f64> {
    value.to_string().parse::<f64>().ok()
}

// =============================================================================
// Tests
// =============================================================================
