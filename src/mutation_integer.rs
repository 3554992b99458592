//! Discrete-coordinate handling for mixed-integer problems.

use ndarray::Array1;
use rand::Rng;

use crate::bounds::Bounds;

/// Rounds discrete coordinates of `x` to the nearest in-bounds integer.
pub(crate) fn round_integers(x: &mut Array1<f64>, mask: &[bool], bounds: &Bounds) {
    for i in 0..x.len() {
        if i < mask.len() && mask[i] {
            x[i] = x[i].round();
            if x[i] < bounds.lower()[i] {
                x[i] = bounds.lower()[i].ceil();
            }
            if x[i] > bounds.upper()[i] {
                x[i] = bounds.upper()[i].floor();
            }
        }
    }
}

/// Extra mutation pass for discrete coordinates.
///
/// Draws a per-call rate in `[min_mutate, max_mutate)` and resamples each
/// discrete coordinate with probability `rate / n_ints`, truncating the
/// fresh draw toward zero. `resample` supplies the raw draw (uniform in
/// bounds for MODE, normal mixture for LDE).
pub(crate) fn integer_mutation<R, S>(
    x: &mut Array1<f64>,
    mask: &[bool],
    min_mutate: f64,
    max_mutate: f64,
    rng: &mut R,
    mut resample: S,
) where
    R: Rng + ?Sized,
    S: FnMut(usize, &mut R) -> f64,
{
    let n_ints = mask.iter().filter(|&&b| b).count();
    if n_ints == 0 {
        return;
    }
    let to_mutate = min_mutate + rng.random::<f64>() * (max_mutate - min_mutate);
    let limit = to_mutate / n_ints as f64;
    for i in 0..x.len() {
        if mask[i] && rng.random::<f64>() < limit {
            x[i] = resample(i, rng).trunc();
        }
    }
}
