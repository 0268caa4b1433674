//! Quantized direction math for gesture classification.
//!
//! Motion directions are measured in eighth-turns clockwise from straight up,
//! in the range `[0, 8)`: 0 = up, 2 = right, 4 = down, 6 = left (screen
//! coordinates, positive y pointing down). Gesture tests compare directions
//! with [`angles_acute`] and accept when the separation is below two steps,
//! i.e. a quarter turn.

use std::f64::consts::PI;

/// Number of direction steps in a full turn.
pub const STEPS: f64 = 8.0;

/// Coarse compass direction produced by [`generalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinal {
    Up,
    Down,
    Left,
    Right,
}

/// Direction of a motion delta in eighth-turns, or `None` for a zero delta.
pub fn direction(dx: f64, dy: f64) -> Option<f64> {
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    let mut a = dx.atan2(-dy) * (STEPS / (2.0 * PI));
    if a < 0.0 {
        a += STEPS;
    }
    Some(a)
}

/// Smallest angular separation between two directions, in `[0, 4]`.
pub fn angles_acute(a: f64, b: f64) -> f64 {
    let d = (a - b).abs() % STEPS;
    if d > STEPS / 2.0 {
        STEPS - d
    } else {
        d
    }
}

/// Rotate a direction clockwise by `steps` eighth-turns.
pub fn angles_add(a: f64, steps: f64) -> f64 {
    (a + steps).rem_euclid(STEPS)
}

/// Rotate a direction counterclockwise by `steps` eighth-turns.
pub fn angles_sub(a: f64, steps: f64) -> f64 {
    (a - steps).rem_euclid(STEPS)
}

/// Round a direction to the nearest compass direction.
///
/// Buckets are half-open, `[d - 1, d + 1)` around each cardinal, so exact
/// diagonals (common with integer deltas) always land in the clockwise-next
/// bucket: 1 is `Right`, 3 is `Down`, 5 is `Left`, 7 is `Up`.
pub fn generalize(dir: f64) -> Cardinal {
    let d = dir.rem_euclid(STEPS);
    if !(1.0..7.0).contains(&d) {
        Cardinal::Up
    } else if d < 3.0 {
        Cardinal::Right
    } else if d < 5.0 {
        Cardinal::Down
    } else {
        Cardinal::Left
    }
}
