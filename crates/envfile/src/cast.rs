//! Typed coercions for resolved dotenv values.
//!
//! Responsibilities:
//! - Cast a resolved string to bool, integer, float, or list.
//! - Report failures as `TypeCast` errors naming the key, raw value, and
//!   target type; a present-but-malformed value never falls back to a default.
//!
//! Does NOT handle:
//! - Interpolation; callers pass the already-resolved value.
//! - Defaulting for missing keys (see the facade in `env.rs`).

use crate::constants::{FALSY, TRUTHY};
use crate::error::EnvError;

fn type_cast(key: &str, value: &str, target: &'static str) -> EnvError {
    EnvError::TypeCast {
        key: key.to_string(),
        value: value.to_string(),
        target,
    }
}

/// Strict boolean: the truthy/falsy literal sets, case-insensitive, and
/// nothing else.
pub(crate) fn cast_bool(key: &str, value: &str) -> Result<bool, EnvError> {
    let lowered = value.to_ascii_lowercase();
    if TRUTHY.contains(&lowered.as_str()) {
        return Ok(true);
    }
    if FALSY.contains(&lowered.as_str()) {
        return Ok(false);
    }
    Err(type_cast(key, value, "bool"))
}

pub(crate) fn cast_int(key: &str, value: &str) -> Result<i64, EnvError> {
    value
        .trim()
        .parse()
        .map_err(|_| type_cast(key, value, "int"))
}

pub(crate) fn cast_float(key: &str, value: &str) -> Result<f64, EnvError> {
    value
        .trim()
        .parse()
        .map_err(|_| type_cast(key, value, "float"))
}

/// Splits on `separator`, trims each element, and drops empty trailing
/// segments. Empty input yields an empty list.
pub(crate) fn split_list(value: &str, separator: char) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    let mut items: Vec<String> = value
        .split(separator)
        .map(|item| item.trim().to_string())
        .collect();
    while items.last().is_some_and(String::is_empty) {
        items.pop();
    }
    items
}
