//! Box constraints for the decision space.
//!
//! All optimizer-visible geometry lives here: uniform sampling inside the
//! box, componentwise feasibility projection, and the normalization used by
//! polynomial mutation.

use ndarray::{Array1, Array2, Zip};
use rand::Rng;

use crate::error::{OptError, Result};
use crate::sampling::uniform_vec;

/// Componentwise box `[lower, upper]^d`.
#[derive(Debug, Clone)]
pub struct Bounds {
    lower: Array1<f64>,
    upper: Array1<f64>,
    scale: Array1<f64>,
}

impl Bounds {
    /// Creates bounds from lower and upper limit vectors.
    ///
    /// # Errors
    ///
    /// Returns `OptError::LimitCountMismatch` if the vectors differ in
    /// length and `OptError::InvertedInterval` if any lower limit exceeds
    /// its upper limit.
    pub fn new(lower: Array1<f64>, upper: Array1<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(OptError::LimitCountMismatch {
                nlower: lower.len(),
                nupper: upper.len(),
            });
        }
        for i in 0..lower.len() {
            if lower[i] > upper[i] {
                return Err(OptError::InvertedInterval {
                    coord: i,
                    lower: lower[i],
                    upper: upper[i],
                });
            }
        }
        let scale = &upper - &lower;
        Ok(Self {
            lower,
            upper,
            scale,
        })
    }

    /// Problem dimension.
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Lower limits.
    pub fn lower(&self) -> &Array1<f64> {
        &self.lower
    }

    /// Upper limits.
    pub fn upper(&self) -> &Array1<f64> {
        &self.upper
    }

    /// Per-coordinate extent `upper - lower`.
    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    /// Normalizes `v` into `[0, 1]` along coordinate `i`.
    pub fn norm_i(&self, i: usize, v: f64) -> f64 {
        (v - self.lower[i]) / self.scale[i]
    }

    /// Whether `v` is feasible along coordinate `i`.
    pub fn contains(&self, i: usize, v: f64) -> bool {
        v >= self.lower[i] && v <= self.upper[i]
    }

    /// Uniform draw in the box.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
        let u = uniform_vec(self.dim(), rng);
        &self.lower + &(&u * &self.scale)
    }

    /// Uniform draw in `[lower_i, upper_i]`.
    pub fn sample_i<R: Rng + ?Sized>(&self, i: usize, rng: &mut R) -> f64 {
        self.lower[i] + self.scale[i] * rng.random::<f64>()
    }

    /// Projects `x` onto the closest feasible point, in place.
    pub fn clamp(&self, x: &mut Array1<f64>) {
        Zip::from(x)
            .and(&self.lower)
            .and(&self.upper)
            .for_each(|v, lo, hi| *v = v.clamp(*lo, *hi));
    }

    /// Projects every column of `m` onto the box, in place.
    pub fn clamp_columns(&self, m: &mut Array2<f64>) {
        for mut col in m.columns_mut() {
            Zip::from(&mut col)
                .and(&self.lower)
                .and(&self.upper)
                .for_each(|v, lo, hi| *v = v.clamp(*lo, *hi));
        }
    }
}
