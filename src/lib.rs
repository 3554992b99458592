//! Population-based optimizers for bounded, optionally mixed-integer
//! decision spaces.
//!
//! Two engines share one substrate (bounds, fitness wrapper, RNG, integer
//! mutation, worker pool):
//!
//! - [`ModeOptimizer`]: constrained multi-objective differential evolution
//!   with switchable DE-style / NSGA-II-style population updates, unified
//!   Pareto-plus-constraint ranking, crowding-distance truncation, and an
//!   ask/tell interface with delayed updates for parallel evaluation.
//! - [`LdeOptimizer`]: single-objective constrained DE/best/1 refining a
//!   known starting point, with temporal-locality probing, age-based
//!   reinitialization, and a contracting normal sampler.
//!
//! # Example
//!
//! ```rust
//! use ndarray::{array, Array1};
//! use pareto_de::{optimize_lde, LdeConfigBuilder};
//!
//! let sphere = |x: &Array1<f64>| x.iter().map(|&xi| xi * xi).sum::<f64>();
//! let config = LdeConfigBuilder::new(array![1.0, 1.0])
//!     .bounds(array![-5.0, -5.0], array![5.0, 5.0])
//!     .seed(42)
//!     .max_evaluations(10_000)
//!     .build()
//!     .expect("valid config");
//! let report = optimize_lde(&sphere, config).expect("valid dimensions");
//! assert!(report.fun < 1e-6);
//! ```
#![warn(missing_docs)]

pub mod error;
pub use error::{OptError, Result};

use std::fmt;

use ndarray::{Array1, Array2};

/// Box constraints for the decision space.
pub mod bounds;
/// Fitness wrappers: sanitization, counters, termination latch.
pub mod fitness;

/// Simulated binary crossover for the NSGA-style update.
pub mod crossover_sbx;
/// Pareto dominance tests and level assignment.
pub mod domination;
/// Discrete-coordinate rounding and mutation.
pub mod mutation_integer;
/// Polynomial mutation for the NSGA-style update.
pub mod mutation_polynomial;
/// Constrained domination scoring.
pub mod ranking;

/// First-objective crowding distance.
pub mod crowding;
/// Parallel batch evaluation of candidates.
pub mod parallel_eval;
/// Bounded worker pool for asynchronous evaluation.
pub mod worker_pool;

/// The LDE single-objective optimizer.
pub mod lde;
/// The MODE multi-objective optimizer.
pub mod mode;

mod sampling;
mod sort_index;

#[cfg(test)]
mod lde_tests;
#[cfg(test)]
mod mode_tests;

pub use bounds::Bounds;
pub use fitness::{MultiFitness, ScalarFitness, VALUE_SENTINEL};
pub use lde::{optimize_lde, LdeOptimizer};
pub use mode::{optimize_mode, ModeOptimizer};
pub use parallel_eval::ParallelConfig;

/// Survivor snapshot handed to the MODE log callback.
pub struct ModeIntermediate {
    /// Iteration (generation) count at the time of the call.
    pub iter: usize,
    /// Current survivors, one column per individual (dim x popsize).
    pub x: Array2<f64>,
    /// Survivor values ((nobj + ncon) x popsize).
    pub y: Array2<f64>,
}

/// Action returned by callbacks to control optimization flow.
pub enum CallbackAction {
    /// Continue optimization.
    Continue,
    /// Stop optimization early.
    Stop,
}

/// Periodic log callback type for MODE.
pub type LogFn<'a> = Box<dyn FnMut(&ModeIntermediate) -> CallbackAction + 'a>;

/// Configuration for the MODE optimizer.
///
/// Zero (or non-positive, for floats) means "use the default" for every
/// parameter that requires a positive value.
pub struct ModeConfig<'a> {
    /// Identifier correlating log output with a specific run.
    pub runid: u64,
    /// Population size (0 = 128). Rounded up to an even value because the
    /// NSGA-style update recombines parent pairs.
    pub popsize: usize,
    /// Maximum number of fitness evaluations (0 = 500_000).
    pub max_evaluations: usize,
    /// Number of parallel evaluation workers for [`optimize_mode`]
    /// (0 or 1 = synchronous run).
    pub workers: usize,
    /// Random seed; `None` draws one from the thread RNG.
    pub seed: Option<u64>,
    /// DE differential weight F (<= 0 = 0.5). Oscillates with `0.5 * F`.
    pub f: f64,
    /// DE crossover probability CR (<= 0 = 0.9). Oscillates with `0.5 * CR`.
    pub cr: f64,
    /// SBX crossover probability (<= 0 = 1.0).
    pub pro_c: f64,
    /// SBX distribution index (<= 0 = 20.0).
    pub dis_c: f64,
    /// Polynomial mutation probability (<= 0 = 1.0).
    pub pro_m: f64,
    /// Polynomial mutation distribution index (<= 0 = 20.0).
    pub dis_m: f64,
    /// `true` = NSGA-style population update, `false` = DE-style.
    pub nsga_update: bool,
    /// DE-style elite bias for base-vector selection; 0 samples uniformly.
    pub pareto_update: f64,
    /// Minimum discrete-coordinate mutation rate (<= 0 = 0.1).
    pub min_mutate: f64,
    /// Maximum discrete-coordinate mutation rate (<= 0 = 0.5).
    pub max_mutate: f64,
    /// The log callback fires every `log_period` iterations (0 = 1000).
    pub log_period: usize,
    /// Optional progress callback; returning `Stop` requests termination.
    pub log: Option<LogFn<'a>>,
    /// Print progress on stderr each generation.
    pub disp: bool,
    /// Parallel batch-evaluation settings for the synchronous driver.
    pub parallel: ParallelConfig,
}

impl Default for ModeConfig<'_> {
    fn default() -> Self {
        Self {
            runid: 0,
            popsize: 128,
            max_evaluations: 500_000,
            workers: 1,
            seed: None,
            f: 0.5,
            cr: 0.9,
            pro_c: 1.0,
            dis_c: 20.0,
            pro_m: 1.0,
            dis_m: 20.0,
            nsga_update: true,
            pareto_update: 0.0,
            min_mutate: 0.1,
            max_mutate: 0.5,
            log_period: 1000,
            log: None,
            disp: false,
            parallel: ParallelConfig::default(),
        }
    }
}

/// Fluent builder for [`ModeConfig`].
///
/// # Example
///
/// ```rust
/// use pareto_de::ModeConfigBuilder;
///
/// let config = ModeConfigBuilder::new()
///     .popsize(100)
///     .max_evaluations(25_000)
///     .nsga_update(true)
///     .seed(42)
///     .build()
///     .expect("valid config");
/// ```
pub struct ModeConfigBuilder<'a> {
    cfg: ModeConfig<'a>,
}

impl Default for ModeConfigBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ModeConfigBuilder<'a> {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self {
            cfg: ModeConfig::default(),
        }
    }
    /// Sets the run identifier.
    pub fn runid(mut self, v: u64) -> Self {
        self.cfg.runid = v;
        self
    }
    /// Sets the population size.
    pub fn popsize(mut self, v: usize) -> Self {
        self.cfg.popsize = v;
        self
    }
    /// Sets the evaluation budget.
    pub fn max_evaluations(mut self, v: usize) -> Self {
        self.cfg.max_evaluations = v;
        self
    }
    /// Sets the number of evaluation workers.
    pub fn workers(mut self, v: usize) -> Self {
        self.cfg.workers = v;
        self
    }
    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.cfg.seed = Some(v);
        self
    }
    /// Sets the DE differential weight F.
    pub fn f(mut self, v: f64) -> Self {
        self.cfg.f = v;
        self
    }
    /// Sets the DE crossover probability CR.
    pub fn cr(mut self, v: f64) -> Self {
        self.cfg.cr = v;
        self
    }
    /// Sets the SBX crossover probability.
    pub fn pro_c(mut self, v: f64) -> Self {
        self.cfg.pro_c = v;
        self
    }
    /// Sets the SBX distribution index.
    pub fn dis_c(mut self, v: f64) -> Self {
        self.cfg.dis_c = v;
        self
    }
    /// Sets the polynomial mutation probability.
    pub fn pro_m(mut self, v: f64) -> Self {
        self.cfg.pro_m = v;
        self
    }
    /// Sets the polynomial mutation distribution index.
    pub fn dis_m(mut self, v: f64) -> Self {
        self.cfg.dis_m = v;
        self
    }
    /// Chooses between NSGA-style (`true`) and DE-style (`false`) updates.
    pub fn nsga_update(mut self, v: bool) -> Self {
        self.cfg.nsga_update = v;
        self
    }
    /// Sets the DE-style elite bias.
    pub fn pareto_update(mut self, v: f64) -> Self {
        self.cfg.pareto_update = v;
        self
    }
    /// Sets the discrete mutation rate range.
    pub fn mutate_range(mut self, min: f64, max: f64) -> Self {
        self.cfg.min_mutate = min;
        self.cfg.max_mutate = max;
        self
    }
    /// Sets the log callback period.
    pub fn log_period(mut self, v: usize) -> Self {
        self.cfg.log_period = v;
        self
    }
    /// Sets the periodic log callback.
    pub fn log(mut self, cb: LogFn<'a>) -> Self {
        self.cfg.log = Some(cb);
        self
    }
    /// Enables/disables progress display.
    pub fn disp(mut self, v: bool) -> Self {
        self.cfg.disp = v;
        self
    }
    /// Sets the parallel batch-evaluation configuration.
    pub fn parallel(mut self, v: ParallelConfig) -> Self {
        self.cfg.parallel = v;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `OptError::PopulationTooSmall` for `0 < popsize < 4`.
    pub fn build(self) -> Result<ModeConfig<'a>> {
        if self.cfg.popsize != 0 && self.cfg.popsize < 4 {
            return Err(OptError::PopulationTooSmall {
                popsize: self.cfg.popsize,
            });
        }
        Ok(self.cfg)
    }
}

/// Result of a MODE optimization run.
#[derive(Clone)]
pub struct ModeReport {
    /// Final survivors, one column per individual (dim x popsize).
    pub x: Array2<f64>,
    /// Survivor values ((nobj + ncon) x popsize).
    pub y: Array2<f64>,
    /// Number of iterations (generations) performed.
    pub nit: usize,
    /// Number of fitness evaluations performed.
    pub nfev: usize,
    /// Whether termination was requested before the budget ran out.
    pub stop: bool,
    /// Human-readable status message.
    pub message: String,
}

impl fmt::Debug for ModeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeReport")
            .field("x", &format!("{}x{}", self.x.nrows(), self.x.ncols()))
            .field("y", &format!("{}x{}", self.y.nrows(), self.y.ncols()))
            .field("nit", &self.nit)
            .field("nfev", &self.nfev)
            .field("stop", &self.stop)
            .field("message", &self.message)
            .finish()
    }
}

/// Configuration for the LDE optimizer.
///
/// Zero (or non-positive, for floats) means "use the default" for every
/// parameter that requires a positive value.
pub struct LdeConfig {
    /// Identifier correlating log output with a specific run.
    pub runid: u64,
    /// Starting point; every slot is initialized to it.
    pub guess: Array1<f64>,
    /// Initial coordinate-wise search spread, normalized over the bounds.
    /// A single element broadcasts to every coordinate.
    pub input_sigma: Array1<f64>,
    /// Optional box constraints; without them feasibility projection is the
    /// identity and reinitialization samples the normal mixture only.
    pub bounds: Option<Bounds>,
    /// Random seed; `None` draws one from the thread RNG.
    pub seed: Option<u64>,
    /// Population size (0 = 15 * dim).
    pub popsize: usize,
    /// Maximum number of fitness evaluations (0 = 50_000).
    pub max_evaluations: usize,
    /// Age scale for reinitializing stagnant individuals (<= 0 = 30).
    pub keep: f64,
    /// Stop as soon as the best value drops below this limit.
    pub stop_fitness: f64,
    /// DE differential weight F (<= 0 = 0.5). Oscillates with `0.5 * F`.
    pub f: f64,
    /// DE crossover probability CR (<= 0 = 0.9). Oscillates with `0.5 * CR`.
    pub cr: f64,
    /// Minimum discrete-coordinate mutation rate (<= 0 = 0.1).
    pub min_mutate: f64,
    /// Maximum discrete-coordinate mutation rate (<= 0 = 0.5).
    pub max_mutate: f64,
    /// Discrete-coordinate mask; `None` = all continuous.
    pub ints: Option<Vec<bool>>,
    /// Print progress on stderr each generation.
    pub disp: bool,
}

/// Fluent builder for [`LdeConfig`].
pub struct LdeConfigBuilder {
    cfg: LdeConfig,
    lower: Option<Array1<f64>>,
    upper: Option<Array1<f64>>,
}

impl LdeConfigBuilder {
    /// Creates a builder around the mandatory starting point.
    pub fn new(guess: Array1<f64>) -> Self {
        Self {
            cfg: LdeConfig {
                runid: 0,
                guess,
                input_sigma: Array1::from_elem(1, 0.3),
                bounds: None,
                seed: None,
                popsize: 0,
                max_evaluations: 50_000,
                keep: 30.0,
                stop_fitness: f64::NEG_INFINITY,
                f: 0.5,
                cr: 0.9,
                min_mutate: 0.1,
                max_mutate: 0.5,
                ints: None,
                disp: false,
            },
            lower: None,
            upper: None,
        }
    }
    /// Sets the run identifier.
    pub fn runid(mut self, v: u64) -> Self {
        self.cfg.runid = v;
        self
    }
    /// Sets the initial search spread (single element broadcasts).
    pub fn input_sigma(mut self, v: Array1<f64>) -> Self {
        self.cfg.input_sigma = v;
        self
    }
    /// Sets box constraints.
    pub fn bounds(mut self, lower: Array1<f64>, upper: Array1<f64>) -> Self {
        self.lower = Some(lower);
        self.upper = Some(upper);
        self
    }
    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.cfg.seed = Some(v);
        self
    }
    /// Sets the population size.
    pub fn popsize(mut self, v: usize) -> Self {
        self.cfg.popsize = v;
        self
    }
    /// Sets the evaluation budget.
    pub fn max_evaluations(mut self, v: usize) -> Self {
        self.cfg.max_evaluations = v;
        self
    }
    /// Sets the reinitialization age scale.
    pub fn keep(mut self, v: f64) -> Self {
        self.cfg.keep = v;
        self
    }
    /// Stops once the best value drops below `v`.
    pub fn stop_fitness(mut self, v: f64) -> Self {
        self.cfg.stop_fitness = v;
        self
    }
    /// Sets the DE differential weight F.
    pub fn f(mut self, v: f64) -> Self {
        self.cfg.f = v;
        self
    }
    /// Sets the DE crossover probability CR.
    pub fn cr(mut self, v: f64) -> Self {
        self.cfg.cr = v;
        self
    }
    /// Sets the discrete mutation rate range.
    pub fn mutate_range(mut self, min: f64, max: f64) -> Self {
        self.cfg.min_mutate = min;
        self.cfg.max_mutate = max;
        self
    }
    /// Sets the discrete-coordinate mask.
    pub fn ints(mut self, v: Vec<bool>) -> Self {
        self.cfg.ints = Some(v);
        self
    }
    /// Enables/disables progress display.
    pub fn disp(mut self, v: bool) -> Self {
        self.cfg.disp = v;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns a bounds error for invalid limits, a dimension error when
    /// sigma, bounds, or the integer mask do not match the guess, and
    /// `OptError::PopulationTooSmall` for `0 < popsize < 4`.
    pub fn build(mut self) -> Result<LdeConfig> {
        let dim = self.cfg.guess.len();
        if let (Some(lower), Some(upper)) = (self.lower.take(), self.upper.take()) {
            let bounds = Bounds::new(lower, upper)?;
            if bounds.dim() != dim {
                return Err(OptError::GuessDimensionMismatch {
                    name: "bounds",
                    expected: dim,
                    got: bounds.dim(),
                });
            }
            self.cfg.bounds = Some(bounds);
        }
        let ns = self.cfg.input_sigma.len();
        if ns != 1 && ns != dim {
            return Err(OptError::GuessDimensionMismatch {
                name: "input_sigma",
                expected: dim,
                got: ns,
            });
        }
        if let Some(mask) = &self.cfg.ints {
            if mask.len() != dim {
                return Err(OptError::IntMaskDimensionMismatch {
                    expected: dim,
                    got: mask.len(),
                });
            }
        }
        if self.cfg.popsize != 0 && self.cfg.popsize < 4 {
            return Err(OptError::PopulationTooSmall {
                popsize: self.cfg.popsize,
            });
        }
        Ok(self.cfg)
    }
}

/// Result of an LDE optimization run.
#[derive(Clone)]
pub struct LdeReport {
    /// Best decision vector found.
    pub x: Array1<f64>,
    /// Best objective value found.
    pub fun: f64,
    /// Number of fitness evaluations performed.
    pub nfev: usize,
    /// Number of iterations (generations) performed.
    pub nit: usize,
    /// Whether the stop-fitness limit was reached.
    pub stop: bool,
    /// Human-readable status message.
    pub message: String,
}

impl fmt::Debug for LdeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdeReport")
            .field("x", &format!("len={}", self.x.len()))
            .field("fun", &self.fun)
            .field("nfev", &self.nfev)
            .field("nit", &self.nit)
            .field("stop", &self.stop)
            .field("message", &self.message)
            .finish()
    }
}
