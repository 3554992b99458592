//! Crowding distance over the first objective.
//!
//! Intra-level tie-breaking uses neighbor separation along the first
//! objective only. This is a deliberate approximation of full NSGA-II
//! crowding, traded for speed; do not swap in all-objective crowding
//! without noting the behavioral change.

use ndarray::{Array1, ArrayView2};

use crate::sort_index::sort_index;

/// Neighbor-separation measure per column of `y` along row 0. The two
/// extremes of the sorted order get `f64::MAX` so they always survive;
/// if every neighbor distance is zero there is no preference at all.
pub(crate) fn crowd_dist(y: ArrayView2<f64>) -> Array1<f64> {
    let n = y.ncols();
    if n < 2 {
        return Array1::from_elem(n, f64::MAX);
    }
    let y0 = y.row(0);
    let si = sort_index(y0);
    let y0s: Vec<f64> = si.iter().map(|&i| y0[i]).collect();
    let d: Vec<f64> = (0..n - 1).map(|i| y0s[i + 1] - y0s[i]).collect();
    if d.iter().all(|&v| v == 0.0) {
        return Array1::zeros(n);
    }
    let mut dsum = vec![0.0f64; n];
    for i in 0..n {
        if i > 0 {
            dsum[i] += d[i - 1];
        }
        if i < n - 1 {
            dsum[i] += d[i];
        }
    }
    dsum[0] = f64::MAX;
    dsum[n - 1] = f64::MAX;
    // Back to original column order.
    let mut ds = Array1::<f64>::zeros(n);
    for i in 0..n {
        ds[si[i]] = dsum[i];
    }
    ds
}
