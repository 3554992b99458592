//! Fitness wrappers around the user objective callback.
//!
//! Both wrappers sanitize non-finite values to a large finite sentinel so
//! that ranking stays total, count evaluations, and carry a cooperative
//! termination latch. [`MultiFitness`] additionally owns the decision-space
//! geometry (bounds plus the optional integer mask) so candidate projection
//! and sampling go through one place.

use ndarray::{Array1, Array2};
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::bounds::Bounds;
use crate::error::{OptError, Result};
use crate::mutation_integer::round_integers;

/// Replacement for non-finite objective or constraint values.
pub const VALUE_SENTINEL: f64 = 1e99;

fn sanitize(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        VALUE_SENTINEL
    }
}

/// Multi-objective fitness: `nobj` objectives followed by `ncon` constraint
/// values per evaluation. A constraint is satisfied when its value is `<= 0`.
///
/// Safe to call concurrently; the user callback is treated as reentrant.
pub struct MultiFitness<'a, F> {
    func: &'a F,
    nobj: usize,
    ncon: usize,
    bounds: Bounds,
    ints: Option<Vec<bool>>,
    evaluations: AtomicUsize,
    terminate: AtomicBool,
}

impl<'a, F> MultiFitness<'a, F>
where
    F: Fn(&Array1<f64>) -> Array1<f64> + Sync,
{
    /// Wraps `func` returning `nobj + ncon` values over the given box.
    ///
    /// # Errors
    ///
    /// Returns `OptError::NoObjectives` for `nobj == 0` and
    /// `OptError::IntMaskDimensionMismatch` if the integer mask length does
    /// not match the bounds dimension.
    pub fn new(
        func: &'a F,
        nobj: usize,
        ncon: usize,
        bounds: Bounds,
        ints: Option<Vec<bool>>,
    ) -> Result<Self> {
        if nobj == 0 {
            return Err(OptError::NoObjectives { nobj });
        }
        if let Some(mask) = &ints {
            if mask.len() != bounds.dim() {
                return Err(OptError::IntMaskDimensionMismatch {
                    expected: bounds.dim(),
                    got: mask.len(),
                });
            }
        }
        // An all-continuous mask behaves as no mask.
        let ints = ints.filter(|m| m.iter().any(|&b| b));
        Ok(Self {
            func,
            nobj,
            ncon,
            bounds,
            ints,
            evaluations: AtomicUsize::new(0),
            terminate: AtomicBool::new(false),
        })
    }

    /// Problem dimension.
    pub fn dim(&self) -> usize {
        self.bounds.dim()
    }

    /// Number of objectives.
    pub fn nobj(&self) -> usize {
        self.nobj
    }

    /// Number of constraints.
    pub fn ncon(&self) -> usize {
        self.ncon
    }

    /// Rows per value vector, `nobj + ncon`.
    pub fn nrows(&self) -> usize {
        self.nobj + self.ncon
    }

    /// The decision-space box.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Discrete-coordinate mask, if any coordinate is discrete.
    pub fn ints(&self) -> Option<&[bool]> {
        self.ints.as_deref()
    }

    /// Evaluates `x`, sanitizing non-finite values and counting the call.
    ///
    /// # Panics
    ///
    /// Panics if the callback returns a vector whose length is not
    /// `nobj + ncon`.
    pub fn eval(&self, x: &Array1<f64>) -> Array1<f64> {
        let y = (self.func)(x);
        assert_eq!(
            y.len(),
            self.nrows(),
            "fitness callback must return nobj + ncon values"
        );
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        y.mapv(sanitize)
    }

    /// Number of evaluations performed since construction or the last reset.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Resets the evaluation counter.
    pub fn reset_evaluations(&self) {
        self.evaluations.store(0, Ordering::Relaxed);
    }

    /// Latches the cooperative termination flag.
    pub fn set_terminate(&self) {
        self.terminate.store(true, Ordering::Relaxed);
    }

    /// Whether termination has been requested.
    pub fn terminate(&self) -> bool {
        self.terminate.load(Ordering::Relaxed)
    }

    /// Uniform in-box draw, with discrete coordinates rounded.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
        let mut x = self.bounds.sample(rng);
        self.closest_feasible(&mut x);
        x
    }

    /// Uniform draw along coordinate `i`.
    pub fn sample_i<R: Rng + ?Sized>(&self, i: usize, rng: &mut R) -> f64 {
        self.bounds.sample_i(i, rng)
    }

    /// Per-coordinate extent of the box.
    pub fn scale(&self) -> &Array1<f64> {
        self.bounds.scale()
    }

    /// Normalizes `v` into `[0, 1]` along coordinate `i`.
    pub fn norm_i(&self, i: usize, v: f64) -> f64 {
        self.bounds.norm_i(i, v)
    }

    /// Projects `x` to the closest feasible point: clamp to the box, then
    /// round discrete coordinates to the nearest in-bounds integer.
    pub fn closest_feasible(&self, x: &mut Array1<f64>) {
        self.bounds.clamp(x);
        if let Some(mask) = &self.ints {
            round_integers(x, mask, &self.bounds);
        }
    }

    /// Projects every column of `m` to the closest feasible point.
    pub fn closest_feasible_columns(&self, m: &mut Array2<f64>) {
        self.bounds.clamp_columns(m);
        if let Some(mask) = &self.ints {
            for mut col in m.columns_mut() {
                let mut x = col.to_owned();
                round_integers(&mut x, mask, &self.bounds);
                col.assign(&x);
            }
        }
    }
}

/// Single-objective fitness wrapper for the LDE optimizer.
///
/// Bounds are optional; without them feasibility projection is the identity.
pub struct ScalarFitness<'a, F> {
    func: &'a F,
    dim: usize,
    bounds: Option<Bounds>,
    evaluations: AtomicUsize,
    terminate: AtomicBool,
}

impl<'a, F> ScalarFitness<'a, F>
where
    F: Fn(&Array1<f64>) -> f64,
{
    /// Wraps a scalar objective over an optional box.
    pub fn new(func: &'a F, dim: usize, bounds: Option<Bounds>) -> Self {
        Self {
            func,
            dim,
            bounds,
            evaluations: AtomicUsize::new(0),
            terminate: AtomicBool::new(false),
        }
    }

    /// Problem dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The decision-space box, if one was supplied.
    pub fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_ref()
    }

    /// Evaluates `x`, sanitizing non-finite values and counting the call.
    pub fn eval(&self, x: &Array1<f64>) -> f64 {
        let y = (self.func)(x);
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        sanitize(y)
    }

    /// Number of evaluations performed.
    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Resets the evaluation counter.
    pub fn reset_evaluations(&self) {
        self.evaluations.store(0, Ordering::Relaxed);
    }

    /// Latches the cooperative termination flag.
    pub fn set_terminate(&self) {
        self.terminate.store(true, Ordering::Relaxed);
    }

    /// Whether termination has been requested.
    pub fn terminate(&self) -> bool {
        self.terminate.load(Ordering::Relaxed)
    }

    /// Whether `v` is feasible along coordinate `i`.
    pub fn feasible(&self, i: usize, v: f64) -> bool {
        match &self.bounds {
            Some(b) => b.contains(i, v),
            None => true,
        }
    }

    /// Projects `x` onto the box, or leaves it unchanged without bounds.
    pub fn closest_feasible(&self, x: &mut Array1<f64>) {
        if let Some(b) = &self.bounds {
            b.clamp(x);
        }
    }
}
