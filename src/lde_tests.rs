//! End-to-end and invariant tests for the LDE optimizer.

use crate::fitness::ScalarFitness;
use crate::{optimize_lde, LdeConfigBuilder, LdeOptimizer};
use ndarray::{array, Array1};

fn sphere(x: &Array1<f64>) -> f64 {
    x.iter().map(|&xi| xi * xi).sum()
}

mod convergence_tests {
    use super::*;

    #[test]
    fn test_sphere_refinement() {
        let config = LdeConfigBuilder::new(array![1.0, 1.0, 1.0, 1.0, 1.0])
            .bounds(Array1::from_elem(5, -5.0), Array1::from_elem(5, 5.0))
            .input_sigma(array![0.3])
            .seed(42)
            .max_evaluations(20_000)
            .build()
            .expect("valid config");
        let report = optimize_lde(&sphere, config).expect("valid dimensions");
        assert!(
            report.fun < 1e-8,
            "should refine the sphere optimum: f={}",
            report.fun
        );
        assert!(report.nfev <= 20_000 + 2 * 75 + 1);
    }

    #[test]
    fn test_unbounded_refinement() {
        let config = LdeConfigBuilder::new(array![1.0, 1.0, 1.0])
            .seed(9)
            .max_evaluations(20_000)
            .build()
            .expect("valid config");
        let report = optimize_lde(&sphere, config).expect("valid dimensions");
        assert!(report.fun < 1e-4, "unbounded run should converge: f={}", report.fun);
        assert!(report.fun.is_finite());
    }

    #[test]
    fn test_more_budget_never_hurts() {
        let run = |evals: usize| {
            let config = LdeConfigBuilder::new(array![2.0, -2.0, 1.0])
                .bounds(Array1::from_elem(3, -5.0), Array1::from_elem(3, 5.0))
                .seed(1234)
                .max_evaluations(evals)
                .build()
                .expect("valid config");
            optimize_lde(&sphere, config).expect("valid dimensions").fun
        };
        // Same seed: the longer run replays the shorter one, then improves.
        assert!(run(20_000) <= run(4_000));
    }

    #[test]
    fn test_mixed_integer_refinement() {
        let f = |x: &Array1<f64>| (x[0] - 2.0).powi(2) + x[1] * x[1];
        let config = LdeConfigBuilder::new(array![4.0, 1.0])
            .bounds(array![0.0, -5.0], array![5.0, 5.0])
            .ints(vec![true, false])
            .seed(77)
            .max_evaluations(20_000)
            .build()
            .expect("valid config");
        let report = optimize_lde(&f, config).expect("valid dimensions");
        assert!(report.fun < 0.1, "f={}", report.fun);
    }
}

mod behavior_tests {
    use super::*;

    #[test]
    fn test_seeding_is_reproducible() {
        let run = || {
            let config = LdeConfigBuilder::new(array![1.5, -0.5])
                .bounds(array![-4.0, -4.0], array![4.0, 4.0])
                .seed(2024)
                .max_evaluations(5_000)
                .build()
                .expect("valid config");
            optimize_lde(&sphere, config).expect("valid dimensions")
        };
        let a = run();
        let b = run();
        assert_eq!(a.x, b.x);
        assert_eq!(a.fun, b.fun);
        assert_eq!(a.nfev, b.nfev);
    }

    #[test]
    fn test_stop_fitness_short_circuits() {
        let config = LdeConfigBuilder::new(array![1.0, 1.0])
            .bounds(array![-5.0, -5.0], array![5.0, 5.0])
            .seed(5)
            .max_evaluations(50_000)
            .stop_fitness(1e-3)
            .build()
            .expect("valid config");
        let report = optimize_lde(&sphere, config).expect("valid dimensions");
        assert!(report.stop);
        assert!(report.fun < 1e-3);
        assert!(report.nfev < 50_000);
    }

    #[test]
    fn test_termination_flag_observed() {
        let f = |x: &Array1<f64>| sphere(x);
        let fitfun = ScalarFitness::new(&f, 2, None);
        fitfun.set_terminate();
        let config = LdeConfigBuilder::new(array![1.0, 1.0])
            .seed(3)
            .build()
            .expect("valid config");
        let mut opt = LdeOptimizer::new(&fitfun, &config).expect("valid config");
        opt.optimize();
        assert_eq!(opt.iterations(), 0);
        assert_eq!(fitfun.evaluations(), 0);
    }

    #[test]
    fn test_non_finite_objective_is_contained() {
        // The objective poisons half the space with NaN.
        let f = |x: &Array1<f64>| {
            if x[0] < 0.0 {
                f64::NAN
            } else {
                sphere(x)
            }
        };
        let config = LdeConfigBuilder::new(array![1.0, 1.0])
            .bounds(array![-5.0, -5.0], array![5.0, 5.0])
            .seed(13)
            .max_evaluations(10_000)
            .build()
            .expect("valid config");
        let report = optimize_lde(&f, config).expect("valid dimensions");
        assert!(report.fun.is_finite());
        assert!(report.fun <= crate::VALUE_SENTINEL);
    }

    #[test]
    fn test_builder_rejects_bad_inputs() {
        assert!(LdeConfigBuilder::new(array![0.0, 0.0])
            .bounds(array![0.0], array![1.0])
            .build()
            .is_err());
        assert!(LdeConfigBuilder::new(array![0.0, 0.0])
            .input_sigma(array![0.1, 0.2, 0.3])
            .build()
            .is_err());
        assert!(LdeConfigBuilder::new(array![0.0, 0.0])
            .popsize(3)
            .build()
            .is_err());
    }
}
