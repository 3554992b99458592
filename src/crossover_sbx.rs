//! Simulated binary crossover for the NSGA-style population update.

use ndarray::{s, Array2, ArrayView2};
use rand::Rng;

use crate::sampling::uniform_vec;

/// Produces one offspring per parent column via SBX.
///
/// Parent columns are split into two halves and recombined pairwise. Per
/// coordinate the spread factor `beta` is 1 with probability 0.5 (or when
/// the per-coordinate `pro_c` mask triggers), otherwise drawn from the SBX
/// distribution with index `dis_c` and sign-flipped with probability 0.5.
/// Offspring are `mid +- 0.5 * beta * (parent1 - parent2)`; an odd parent
/// column is ignored. Callers pass an already-perturbed `dis_c` and project
/// the result to feasibility afterwards.
pub(crate) fn sbx_offspring<R: Rng + ?Sized>(
    parents: ArrayView2<f64>,
    pro_c: f64,
    dis_c: f64,
    rng: &mut R,
) -> Array2<f64> {
    let dim = parents.nrows();
    let n2 = parents.ncols() / 2;
    let n = 2 * n2;
    let parent1 = parents.slice(s![.., ..n2]);
    let parent2 = parents.slice(s![.., n2..n]);

    let to1 = if pro_c < 1.0 {
        Some(uniform_vec(dim, rng))
    } else {
        None
    };
    let mut beta = Array2::<f64>::zeros((dim, n2));
    for p in 0..n2 {
        for i in 0..dim {
            let from_mid =
                rng.random::<f64>() > 0.5 || to1.as_ref().is_some_and(|t| t[i] < pro_c);
            if from_mid {
                beta[(i, p)] = 1.0;
            } else {
                let r = rng.random::<f64>();
                let mut b = if r <= 0.5 {
                    (2.0 * r).powf(1.0 / (dis_c + 1.0))
                } else {
                    (2.0 * r).powf(-1.0 / (dis_c + 1.0))
                };
                if rng.random::<f64>() > 0.5 {
                    b = -b;
                }
                beta[(i, p)] = b;
            }
        }
    }

    let mut offspring = Array2::<f64>::zeros((dim, n));
    for p in 0..n2 {
        for i in 0..dim {
            let mid = 0.5 * (parent1[(i, p)] + parent2[(i, p)]);
            let delta = 0.5 * beta[(i, p)] * (parent1[(i, p)] - parent2[(i, p)]);
            offspring[(i, p)] = mid + delta;
            offspring[(i, n2 + p)] = mid - delta;
        }
    }
    offspring
}
