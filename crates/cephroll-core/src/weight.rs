//! Weight arithmetic for gradual reweighting.
//!
//! The cluster reports CRUSH weights with its own rounding, so all
//! comparisons happen on values rounded to three decimal places.

/// Round a weight to three decimal places.
pub fn round3(weight: f64) -> f64 {
    (weight * 1000.0).round() / 1000.0
}

/// Equality at three-decimal precision.
pub fn weights_equal(a: f64, b: f64) -> bool {
    to_milli(a) == to_milli(b)
}

fn to_milli(weight: f64) -> i64 {
    (weight * 1000.0).round() as i64
}

fn from_milli(milli: i64) -> f64 {
    milli as f64 / 1000.0
}

/// Compute the next weight on the path from `current` to `target`.
///
/// Moves by at most `step` (a magnitude; the sign comes from the direction
/// of travel), and by at least one thousandth while the two differ. The
/// final step lands exactly on `target`, so the path never goes past it.
pub fn next_weight(current: f64, target: f64, step: f64) -> f64 {
    let current = to_milli(current);
    let target = to_milli(target);
    let step = to_milli(step.abs()).max(1);
    let diff = target - current;
    if diff.abs() <= step {
        return from_milli(target);
    }
    from_milli(current + diff.signum() * step)
}
