//! Fractional position arithmetic for ordered rows.
//!
//! # Responsibility
//! - Compute the position key for a new slot from its two neighbours.
//! - Produce evenly spaced keys when a file has to be rebalanced.
//!
//! # Invariants
//! - Positions handed out are finite and strictly positive.
//! - A computed slot position lies strictly between its neighbours; when the
//!   gap is too small to represent a midpoint, no position is returned.

/// Position assigned to the first row of an empty file.
pub const FIRST_POSITION: f64 = 1.0;

/// Distance between an appended row and the current last row, and between
/// adjacent rows after a rebalance.
pub const POSITION_STEP: f64 = 1.0;

/// Computes the position for a slot between `prev` and `next`.
///
/// - no neighbours: [`FIRST_POSITION`]
/// - before the first row: `next / 2`
/// - after the last row: `prev + POSITION_STEP`
/// - between two rows: `(prev + next) / 2`
///
/// Returns `None` when floating-point precision no longer separates the
/// candidate from a neighbour. Callers must rebalance before retrying.
pub fn slot_position(prev: Option<f64>, next: Option<f64>) -> Option<f64> {
    let candidate = match (prev, next) {
        (None, None) => FIRST_POSITION,
        (None, Some(next)) => next / 2.0,
        (Some(prev), None) => prev + POSITION_STEP,
        // Halving each side first keeps the sum from overflowing.
        (Some(prev), Some(next)) => prev / 2.0 + next / 2.0,
    };

    let lower = prev.unwrap_or(0.0);
    let upper = next.unwrap_or(f64::INFINITY);
    if candidate.is_finite() && lower < candidate && candidate < upper {
        Some(candidate)
    } else {
        None
    }
}

/// Evenly spaced positions `1.0, 2.0, ..` for `count` rows in display order.
pub fn rebalanced_positions(count: usize) -> impl Iterator<Item = f64> {
    (0..count).map(|index| FIRST_POSITION + POSITION_STEP * index as f64)
}
