use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::{Validate, ValidationError};

use crate::shared_wheel_game::{Slice, WheelError};

pub static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());

pub fn validate_weight(weight: f64) -> Result<(), ValidationError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(ValidationError::new("invalid_weight"));
    }
    Ok(())
}

/// Checks a slice set before it is saved. Spin-time checks live in the selector.
pub fn validate_slices(slices: &[Slice]) -> Result<(), WheelError> {
    if slices.is_empty() {
        return Err(WheelError::EmptySlices);
    }

    let mut seen = HashSet::new();
    for (index, slice) in slices.iter().enumerate() {
        if validate_weight(slice.weight).is_err() {
            return Err(WheelError::InvalidWeight { index });
        }
        slice
            .validate()
            .map_err(|e| WheelError::InvalidSlice(format!("slice {} ({}): {}", index, slice.id, e)))?;
        if !seen.insert(slice.id.as_str()) {
            return Err(WheelError::InvalidSlice(format!("duplicate id {}", slice.id)));
        }
    }
    Ok(())
}
