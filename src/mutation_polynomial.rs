//! Polynomial mutation for the NSGA-style population update.

use ndarray::Array2;
use rand::Rng;

use crate::bounds::Bounds;

/// Mutates each coordinate of each column with probability `pro_m / dim`.
///
/// The displacement follows the two-branch polynomial formula over the
/// normalized coordinate position; `dis_m` arrives already perturbed. The
/// normalized position is clipped into `[0, 1]` so crossover overshoot
/// cannot feed a negative base into the fractional power. Displaced values
/// may still leave the box; callers project to feasibility afterwards.
pub(crate) fn polynomial_mutation<R: Rng + ?Sized>(
    offspring: &mut Array2<f64>,
    bounds: &Bounds,
    pro_m: f64,
    dis_m: f64,
    rng: &mut R,
) {
    let dim = offspring.nrows();
    let limit = pro_m / dim as f64;
    let exp = dis_m + 1.0;
    for p in 0..offspring.ncols() {
        for i in 0..dim {
            if rng.random::<f64>() < limit {
                let mu = rng.random::<f64>();
                let norm = bounds.norm_i(i, offspring[(i, p)]).clamp(0.0, 1.0);
                let delta = if mu <= 0.5 {
                    (2.0 * mu + (1.0 - 2.0 * mu) * (1.0 - norm).powf(exp)).powf(1.0 / exp) - 1.0
                } else {
                    1.0 - (2.0 * (1.0 - mu) + 2.0 * (mu - 0.5) * (1.0 - norm).powf(exp))
                        .powf(1.0 / exp)
                };
                offspring[(i, p)] += bounds.scale()[i] * delta;
            }
        }
    }
}
