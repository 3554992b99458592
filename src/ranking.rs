//! Constrained domination scoring.
//!
//! Combines per-constraint rank aggregation, objective rank sums, and
//! feasible-front Pareto levels into a single scalar score per individual;
//! strictly larger means strictly more preferred. Whenever at least one
//! feasible individual exists, every feasible score exceeds every
//! infeasible one.

use ndarray::{s, Array1, Array2, ArrayView2, Axis};

use crate::domination::pareto_levels;
use crate::sort_index::sort_index;

/// Sum over objective rows of each column's ascending rank along that row.
pub(crate) fn objective_ranks(objs: ArrayView2<f64>) -> Array1<f64> {
    let n = objs.ncols();
    let mut sums = Array1::<f64>::zeros(n);
    for j in 0..objs.nrows() {
        let ci = sort_index(objs.row(j));
        for (i, &c) in ci.iter().enumerate() {
            sums[c] += i as f64;
        }
    }
    sums
}

/// Aggregated constraint-violation ranks.
///
/// Along each constraint row the ascending sort position is the rank, zeroed
/// for satisfied entries (`value <= 0`). Each column's ranks are attenuated
/// by `alpha / ncon` where `alpha` counts the rows that column violates, so
/// violating few of many constraints draws a small penalty while violating
/// many compounds multiplicatively.
pub(crate) fn constraint_ranks(cons: ArrayView2<f64>) -> Array1<f64> {
    let n = cons.ncols();
    let m = cons.nrows();
    let mut rank = Array2::<f64>::zeros((m, n));
    let mut alpha = vec![0.0f64; n];
    for j in 0..m {
        let ci = sort_index(cons.row(j));
        for (i, &c) in ci.iter().enumerate() {
            if cons[(j, c)] <= 0.0 {
                rank[(j, c)] = 0.0;
            } else {
                rank[(j, c)] = i as f64;
                alpha[c] += 1.0;
            }
        }
    }
    let mut csum = Array1::<f64>::zeros(n);
    for i in 0..n {
        for j in 0..m {
            csum[i] += rank[(j, i)] * alpha[i] / m as f64;
        }
    }
    csum
}

/// Domination score per column of `ys` (`nobj` objective rows followed by
/// `ncon` constraint rows).
///
/// Pure multi-objective problems reduce to Pareto levels. With constraints,
/// feasible individuals score their Pareto level among feasibles plus a
/// uniform bonus that puts them above every infeasible individual, while
/// infeasible ones are ordered by ascending aggregated constraint rank.
pub(crate) fn domination_scores(ys: ArrayView2<f64>, nobj: usize, ncon: usize) -> Array1<f64> {
    if ncon == 0 {
        return pareto_levels(ys);
    }
    let n = ys.ncols();
    let yobj = ys.slice(s![..nobj, ..]);
    let ycon = ys.slice(s![nobj.., ..]);

    let mut csum = constraint_ranks(ycon);
    let mut feasible = vec![false; n];
    let mut has_feasible = false;
    for i in 0..n {
        feasible[i] = ycon.column(i).iter().all(|&c| c <= 0.0);
        has_feasible |= feasible[i];
    }
    if has_feasible {
        csum += &objective_ranks(yobj);
    }

    let mut domination = Array1::<f64>::zeros(n);
    let cy: Vec<usize> = (0..n).filter(|&i| feasible[i]).collect();
    if has_feasible {
        // Pareto levels among feasible individuals only.
        let feasible_objs = yobj.select(Axis(1), &cy);
        let ypar = pareto_levels(feasible_objs.view());
        for (k, &i) in cy.iter().enumerate() {
            domination[i] += ypar[k];
        }
    }
    // Higher aggregated violation gets a lower score.
    let civ: Vec<usize> = sort_index(csum.view())
        .into_iter()
        .filter(|&i| !feasible[i])
        .collect();
    if !civ.is_empty() {
        let maxcdom = civ.len();
        for (i, &c) in civ.iter().enumerate() {
            domination[c] += (maxcdom - i) as f64;
        }
        for &c in &cy {
            domination[c] += (maxcdom + 1) as f64;
        }
    }
    domination
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_objective_ranks_single_row() {
        let objs = array![[3.0, 1.0, 2.0]];
        assert_eq!(objective_ranks(objs.view()), array![2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_constraint_ranks_satisfied_are_zero() {
        let cons = array![[-1.0, 1.0, 2.0]];
        assert_eq!(constraint_ranks(cons.view()), array![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_constraint_ranks_attenuated_by_violation_count() {
        // Each individual violates one of two constraints: ranks halve.
        let cons = array![[-1.0, 1.0], [2.0, -3.0]];
        assert_eq!(constraint_ranks(cons.view()), array![0.5, 0.5]);
    }

    #[test]
    fn test_feasible_beats_infeasible() {
        // nobj = 1, ncon = 1: column 0 feasible, column 1 infeasible.
        let ys = array![[0.5, 0.2], [-1.0, 1.0]];
        let d = domination_scores(ys.view(), 1, 1);
        assert!(d[0] > d[1]);
    }

    #[test]
    fn test_all_infeasible_ordered_by_violation() {
        let ys = array![[0.0, 0.0, 0.0], [3.0, 1.0, 2.0]];
        let d = domination_scores(ys.view(), 1, 1);
        assert!(d[1] > d[2]);
        assert!(d[2] > d[0]);
    }

    #[test]
    fn test_unconstrained_uses_pareto_levels() {
        let ys = array![[0.0, 1.0], [1.0, 0.0]];
        let d = domination_scores(ys.view(), 2, 0);
        assert_eq!(d, array![2.0, 2.0]);
    }
}
