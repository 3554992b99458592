//! End-to-end and invariant tests for the MODE optimizer.

use crate::bounds::Bounds;
use crate::fitness::MultiFitness;
use crate::{optimize_mode, CallbackAction, ModeConfigBuilder, ModeIntermediate, ModeOptimizer};
use ndarray::{array, Array1, Array2};

/// ZDT1: two objectives over `[0, 1]^d`, true front `y1 = 1 - sqrt(y0)`.
fn zdt1(x: &Array1<f64>) -> Array1<f64> {
    let d = x.len();
    let f1 = x[0];
    let g = 1.0 + 9.0 * x.iter().skip(1).sum::<f64>() / (d as f64 - 1.0);
    let f2 = g * (1.0 - (f1 / g).sqrt());
    array![f1, f2]
}

fn in_bounds(x: &Array2<f64>, lower: f64, upper: f64) -> bool {
    x.iter().all(|&v| v >= lower && v <= upper)
}

mod invariant_tests {
    use super::*;

    #[test]
    fn test_survivors_stay_within_bounds() {
        for nsga in [true, false] {
            let config = ModeConfigBuilder::new()
                .seed(11)
                .popsize(16)
                .max_evaluations(2_000)
                .nsga_update(nsga)
                .build()
                .expect("valid config");
            let report = optimize_mode(
                &zdt1,
                Array1::zeros(6),
                Array1::ones(6),
                2,
                0,
                None,
                config,
            )
            .expect("valid problem");
            assert_eq!(report.x.dim(), (6, 16));
            assert_eq!(report.y.dim(), (2, 16));
            assert!(in_bounds(&report.x, 0.0, 1.0));
            assert!(report.y.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_single_objective_truncation_is_fitness_order() {
        let f = |x: &Array1<f64>| array![x[0]];
        let bounds = Bounds::new(array![0.0], array![10.0]).unwrap();
        let fitfun = MultiFitness::new(&f, 1, 0, bounds, None).unwrap();
        let config = ModeConfigBuilder::new()
            .seed(3)
            .popsize(4)
            .nsga_update(false)
            .build()
            .expect("valid config");
        let mut opt = ModeOptimizer::new(&fitfun, config).expect("valid config");

        let _children = opt.ask_all();
        let ys = Array2::from_shape_vec((1, 4), vec![4.0, 3.0, 2.0, 1.0]).unwrap();
        opt.tell_all(&ys).expect("matching shape");
        // Survivors are the popsize best, written best-first.
        assert_eq!(opt.values().row(0).to_vec(), vec![1.0, 2.0, 3.0, 4.0]);

        // Telling only worse values must leave the survivor set unchanged.
        let _children = opt.ask_all();
        let worse = Array2::from_shape_vec((1, 4), vec![10.0, 11.0, 12.0, 13.0]).unwrap();
        opt.tell_all(&worse).expect("matching shape");
        assert_eq!(opt.values().row(0).to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_handle_lifecycle_without_ask_tell() {
        let f = |x: &Array1<f64>| array![x[0]];
        let bounds = Bounds::new(array![0.0], array![1.0]).unwrap();
        let fitfun = MultiFitness::new(&f, 1, 0, bounds, None).unwrap();
        let config = ModeConfigBuilder::new()
            .seed(1)
            .popsize(8)
            .build()
            .expect("valid config");
        let opt = ModeOptimizer::new(&fitfun, config).expect("valid config");
        assert_eq!(opt.popsize(), 8);
        assert_eq!(opt.population().dim(), (1, 8));
        assert_eq!(opt.iterations(), 0);
        drop(opt);
        assert_eq!(fitfun.evaluations(), 0);
    }

    #[test]
    fn test_dominance_guard_discards_silently() {
        let f = |x: &Array1<f64>| array![x[0]];
        let bounds = Bounds::new(array![0.0], array![10.0]).unwrap();
        let fitfun = MultiFitness::new(&f, 1, 0, bounds, None).unwrap();
        let config = ModeConfigBuilder::new()
            .seed(3)
            .popsize(4)
            .nsga_update(false)
            .build()
            .expect("valid config");
        let mut opt = ModeOptimizer::new(&fitfun, config).expect("valid config");

        for v in 0..4 {
            let (x, p) = opt.ask();
            opt.tell(&array![v as f64], &x, p);
        }
        assert_eq!(opt.accepted_tells(), 4);
        // Survivor of slot 0 now has value 0; a worse candidate is dropped.
        let (x, p) = opt.ask();
        assert_eq!(p, 0);
        opt.tell(&array![5.0], &x, p);
        assert_eq!(opt.accepted_tells(), 4);
        // A strictly better candidate is staged.
        let (x, p) = opt.ask();
        opt.tell(&array![-1.0], &x, p);
        assert_eq!(opt.accepted_tells(), 5);
    }

    #[test]
    fn test_log_callback_requests_termination() {
        let mut calls = 0;
        let log = Box::new(|info: &ModeIntermediate| {
            calls += 1;
            assert_eq!(info.x.ncols(), 16);
            CallbackAction::Stop
        });
        let config = ModeConfigBuilder::new()
            .seed(6)
            .popsize(16)
            .max_evaluations(100_000)
            .log_period(1)
            .log(log)
            .build()
            .expect("valid config");
        let report = optimize_mode(
            &zdt1,
            Array1::zeros(4),
            Array1::ones(4),
            2,
            0,
            None,
            config,
        )
        .expect("valid problem");
        assert!(report.stop);
        // Termination latches during the first generation.
        assert_eq!(report.nfev, 16);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_seeding_is_reproducible() {
        let run = || {
            let config = ModeConfigBuilder::new()
                .seed(99)
                .popsize(20)
                .max_evaluations(4_000)
                .build()
                .expect("valid config");
            optimize_mode(
                &zdt1,
                Array1::zeros(8),
                Array1::ones(8),
                2,
                0,
                None,
                config,
            )
            .expect("valid problem")
        };
        let a = run();
        let b = run();
        assert_eq!(a.x, b.x);
        assert_eq!(a.y, b.y);
        assert_eq!(a.nfev, b.nfev);
    }

    #[test]
    fn test_non_finite_values_do_not_propagate() {
        let f = |x: &Array1<f64>| {
            if x[0] > 0.5 {
                array![f64::NAN, f64::INFINITY]
            } else {
                zdt1(x)
            }
        };
        let config = ModeConfigBuilder::new()
            .seed(4)
            .popsize(12)
            .max_evaluations(2_000)
            .build()
            .expect("valid config");
        let report = optimize_mode(
            &f,
            Array1::zeros(4),
            Array1::ones(4),
            2,
            0,
            None,
            config,
        )
        .expect("valid problem");
        assert!(report
            .y
            .iter()
            .all(|&v| v.is_finite() && v <= crate::VALUE_SENTINEL));
    }
}

mod end_to_end_tests {
    use super::*;

    #[test]
    fn test_zdt1_front_coverage() {
        let config = ModeConfigBuilder::new()
            .seed(42)
            .popsize(100)
            .max_evaluations(25_000)
            .nsga_update(true)
            .build()
            .expect("valid config");
        let report = optimize_mode(
            &zdt1,
            Array1::zeros(30),
            Array1::ones(30),
            2,
            0,
            None,
            config,
        )
        .expect("valid problem");

        let n = report.y.ncols();
        // Mutually non-dominated, distinct survivor values.
        let mut distinct = 0;
        let mut nondominated = 0;
        for i in 0..n {
            let yi = report.y.column(i);
            let dominated = (0..n).any(|j| {
                j != i
                    && report.y[(0, j)] <= yi[0]
                    && report.y[(1, j)] <= yi[1]
                    && (report.y[(0, j)] < yi[0] || report.y[(1, j)] < yi[1])
            });
            if !dominated {
                nondominated += 1;
            }
            let duplicate =
                (0..i).any(|j| (report.y[(0, j)] - yi[0]).abs() < 1e-9);
            if !duplicate {
                distinct += 1;
            }
        }
        assert!(
            nondominated >= 80,
            "front should be mostly non-dominated: {}",
            nondominated
        );
        assert!(distinct >= 80, "front should spread out: {}", distinct);

        // Close to the analytic front y1 = 1 - sqrt(y0).
        let mean_gap: f64 = (0..n)
            .map(|i| {
                let y0 = report.y[(0, i)].clamp(0.0, 1.0);
                (report.y[(1, i)] - (1.0 - y0.sqrt())).abs()
            })
            .sum::<f64>()
            / n as f64;
        assert!(mean_gap < 0.2, "mean distance to front too large: {}", mean_gap);
    }

    #[test]
    fn test_constrained_single_objective() {
        // Minimize x^2 subject to x - 1 <= 0 and -x <= 0; optimum at 0.
        let f = |x: &Array1<f64>| array![x[0] * x[0], x[0] - 1.0, -x[0]];
        let config = ModeConfigBuilder::new()
            .seed(8)
            .popsize(32)
            .max_evaluations(30_000)
            .nsga_update(false)
            .build()
            .expect("valid config");
        let report = optimize_mode(&f, array![-2.0], array![2.0], 1, 2, None, config)
            .expect("valid problem");

        // Survivors are stored best-first.
        let best = report.x[(0, 0)];
        assert!(best.abs() < 1e-3, "best survivor too far off: {}", best);
        assert!(report.y[(1, 0)] <= 0.0);
        assert!(report.y[(2, 0)] <= 0.0);
    }

    #[test]
    fn test_mixed_integer_quadratic() {
        let f = |x: &Array1<f64>| {
            array![
                (x[0] - 3.0).powi(2)
                    + (x[1] - 1.5).powi(2)
                    + (x[2] - 2.0).powi(2)
                    + x[3] * x[3]
            ]
        };
        let config = ModeConfigBuilder::new()
            .seed(21)
            .popsize(48)
            .max_evaluations(40_000)
            .nsga_update(false)
            .build()
            .expect("valid config");
        let report = optimize_mode(
            &f,
            Array1::zeros(4),
            Array1::from_elem(4, 5.0),
            1,
            0,
            Some(vec![true, false, true, false]),
            config,
        )
        .expect("valid problem");

        for p in 0..report.x.ncols() {
            assert_eq!(report.x[(0, p)].fract(), 0.0);
            assert_eq!(report.x[(2, p)].fract(), 0.0);
        }
        let best = report.y[(0, 0)];
        assert!(best < 1e-3, "best value too large: {}", best);
        assert_eq!(report.x[(0, 0)], 3.0);
        assert_eq!(report.x[(2, 0)], 2.0);
    }

    #[test]
    fn test_sync_and_delayed_first_flush_match() {
        let popsize = 8;
        let run = |workers: usize| {
            let f = zdt1;
            let bounds = Bounds::new(Array1::zeros(3), Array1::ones(3)).unwrap();
            let fitfun = MultiFitness::new(&f, 2, 0, bounds, None).unwrap();
            let config = ModeConfigBuilder::new()
                .seed(77)
                .popsize(popsize)
                .max_evaluations(popsize)
                .build()
                .expect("valid config");
            let mut opt = ModeOptimizer::new(&fitfun, config).expect("valid config");
            if workers == 0 {
                opt.optimize();
            } else {
                opt.optimize_delayed_update(workers);
            }
            (opt.population(), opt.values())
        };
        // One generation: the staging queue fills in ask order, so the
        // delayed driver with a single worker replays the synchronous run.
        let (x_sync, y_sync) = run(0);
        let (x_async, y_async) = run(1);
        assert_eq!(x_sync, x_async);
        assert_eq!(y_sync, y_async);
    }

    #[test]
    fn test_parallel_workers_complete() {
        let config = ModeConfigBuilder::new()
            .seed(31)
            .popsize(16)
            .max_evaluations(3_000)
            .workers(4)
            .build()
            .expect("valid config");
        let report = optimize_mode(
            &zdt1,
            Array1::zeros(5),
            Array1::ones(5),
            2,
            0,
            None,
            config,
        )
        .expect("valid problem");
        assert_eq!(report.x.dim(), (5, 16));
        assert!(in_bounds(&report.x, 0.0, 1.0));
        assert!(report.nfev >= 3_000);
    }

    #[test]
    fn test_strategy_switch_keeps_invariants() {
        let f = zdt1;
        let bounds = Bounds::new(Array1::zeros(4), Array1::ones(4)).unwrap();
        let fitfun = MultiFitness::new(&f, 2, 0, bounds, None).unwrap();
        let config = ModeConfigBuilder::new()
            .seed(55)
            .popsize(12)
            .nsga_update(false)
            .build()
            .expect("valid config");
        let mut opt = ModeOptimizer::new(&fitfun, config).expect("valid config");

        let evaluate_all = |xs: &Array2<f64>| {
            let mut ys = Array2::zeros((2, xs.ncols()));
            for p in 0..xs.ncols() {
                ys.column_mut(p).assign(&f(&xs.column(p).to_owned()));
            }
            ys
        };
        for _ in 0..10 {
            let xs = opt.ask_all();
            let ys = evaluate_all(&xs);
            opt.tell_all(&ys).expect("matching shape");
        }
        // Switch DE -> NSGA mid-run; the children cache is rebuilt by the
        // update triggered here.
        let xs = opt.ask_all();
        let ys = evaluate_all(&xs);
        opt.tell_all_switch(&ys, true, 0.0).expect("matching shape");
        for _ in 0..5 {
            let xs = opt.ask_all();
            assert_eq!(xs.dim(), (4, 12));
            assert!(in_bounds(&xs, 0.0, 1.0));
            let ys = evaluate_all(&xs);
            opt.tell_all(&ys).expect("matching shape");
        }
        assert_eq!(opt.population().dim(), (4, 12));
        assert!(in_bounds(&opt.population(), 0.0, 1.0));
    }
}
