//! Pareto dominance over value-matrix columns.

use ndarray::{Array1, ArrayView2};

/// `true` when column `i` is dominated by (or equal to) column `pivot`:
/// no row of `i` improves on `pivot`.
pub(crate) fn dominated_by(y: ArrayView2<f64>, i: usize, pivot: usize) -> bool {
    for j in 0..y.nrows() {
        if y[(j, i)] < y[(j, pivot)] {
            return false;
        }
    }
    true
}

/// `true` when `y` is dominated by (or equal to) `reference`.
pub(crate) fn dominated_vec(y: &Array1<f64>, reference: &Array1<f64>) -> bool {
    for j in 0..y.len() {
        if y[j] < reference[j] {
            return false;
        }
    }
    true
}

/// Pareto level per column: the number of elimination rounds each column
/// survives. Non-dominated columns end up with the highest counts, so larger
/// means more preferred.
///
/// Each round picks the next still-surviving column as pivot, eliminates
/// every column the pivot dominates, and credits all survivors with one
/// point. Already-eliminated pivots are skipped; the scan terminates once
/// none remain.
pub(crate) fn pareto_levels(y: ArrayView2<f64>) -> Array1<f64> {
    let n = y.ncols();
    let mut domination = Array1::<f64>::zeros(n);
    let mut mask = vec![true; n];
    let mut index = 0;
    while index < n {
        for i in 0..n {
            if i != index && mask[i] && dominated_by(y, i, index) {
                mask[i] = false;
            }
        }
        for i in 0..n {
            if mask[i] {
                domination[i] += 1.0;
            }
        }
        index += 1;
        while index < n && !mask[index] {
            index += 1;
        }
    }
    domination
}
