use log::trace;
use rand::Rng;

use crate::shared_wheel_game::{Slice, WheelError};

/// Sum of all weights, failing on sets that cannot produce a winner.
pub fn total_weight(slices: &[Slice]) -> Result<f64, WheelError> {
    if slices.is_empty() {
        return Err(WheelError::EmptySlices);
    }

    let mut total = 0.0;
    for (index, slice) in slices.iter().enumerate() {
        if !slice.weight.is_finite() || slice.weight < 0.0 {
            return Err(WheelError::InvalidWeight { index });
        }
        total += slice.weight;
    }

    if total <= 0.0 {
        return Err(WheelError::NoPositiveWeight);
    }
    Ok(total)
}

/// Cumulative walk for a draw in `[0, total)`. The first slice whose running
/// sum reaches the draw wins, so an exact boundary goes to the earlier slice.
pub fn pick_index(slices: &[Slice], draw: f64) -> Result<usize, WheelError> {
    total_weight(slices)?;

    let mut accumulated = 0.0;
    for (index, slice) in slices.iter().enumerate() {
        accumulated += slice.weight;
        if draw <= accumulated {
            return Ok(index);
        }
    }

    // Rounding can leave the sum a hair below the draw.
    Ok(slices
        .iter()
        .rposition(|s| s.weight > 0.0)
        .unwrap_or(slices.len() - 1))
}

/// Draws one slice index with probability `weight / total`.
pub fn select<R: Rng + ?Sized>(slices: &[Slice], rng: &mut R) -> Result<usize, WheelError> {
    let total = total_weight(slices)?;
    let draw = rng.gen::<f64>() * total;
    let index = pick_index(slices, draw)?;
    trace!("weighted draw {:.4} of {:.4} picked slice {}", draw, total, index);
    Ok(index)
}
