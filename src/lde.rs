//! LDE: single-objective DE/best/1 refinement of a known starting point.
//!
//! Every slot starts at the supplied guess with `+inf` fitness, so the
//! first evaluation always improves. Donors blend the best individual with
//! a scaled difference of two random slots; components that leave the box
//! are resampled from a normal mixture around the running mean, whose
//! spread contracts toward `0.5 * |xmean - x|` on every global improvement.
//! Two deviations from textbook DE: a successful move triggers an extra
//! probe along the best-to-parent direction (temporal locality), and slots
//! that keep failing are reinitialized with a probability growing with
//! their age.

use ndarray::{Array1, Array2, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{OptError, Result};
use crate::fitness::ScalarFitness;
use crate::mutation_integer::integer_mutation;
use crate::sampling::{normal_scalar, normal_vec};
use crate::{LdeConfig, LdeReport};

/// Per-coordinate normal sampler contracting around improving solutions.
///
/// Holds the running mean and two spreads: the initial `sigma0` and the
/// contracted `sigma`, capped at a quarter of the box extent. Draws mix
/// both spreads 50/50 so the search never collapses entirely.
struct SigmaSampler {
    xmean: Array1<f64>,
    sigma0: Array1<f64>,
    sigma: Array1<f64>,
    max_sigma: Array1<f64>,
}

impl SigmaSampler {
    fn new(guess: &Array1<f64>, input_sigma: &Array1<f64>, scale: &Array1<f64>) -> Self {
        let dim = guess.len();
        let spread = if input_sigma.len() == 1 {
            Array1::from_elem(dim, input_sigma[0])
        } else {
            input_sigma.clone()
        };
        let sigma0 = 0.5 * &(scale * &spread);
        Self {
            xmean: guess.clone(),
            sigma0: sigma0.clone(),
            sigma: sigma0,
            max_sigma: 0.25 * scale,
        }
    }

    /// Contracts the spread toward the new best solution.
    fn update(&mut self, x: &Array1<f64>) {
        let delta = (&self.xmean - x).mapv(f64::abs) * 0.5;
        self.sigma = Zip::from(&delta)
            .and(&self.max_sigma)
            .map_collect(|&d, &m| d.min(m));
        self.xmean = x.clone();
    }

    /// Feasible full draw from the mixture around the mean.
    fn norm_x<R, F>(&self, fitfun: &ScalarFitness<'_, F>, rng: &mut R) -> Array1<f64>
    where
        R: Rng + ?Sized,
        F: Fn(&Array1<f64>) -> f64,
    {
        let sdev = if rng.random::<f64>() < 0.5 {
            &self.sigma0
        } else {
            &self.sigma
        };
        let mut x = normal_vec(&self.xmean, sdev, rng);
        fitfun.closest_feasible(&mut x);
        x
    }

    /// Feasible single-coordinate draw, rejection-sampled against bounds.
    fn norm_xi<R, F>(&self, i: usize, fitfun: &ScalarFitness<'_, F>, rng: &mut R) -> f64
    where
        R: Rng + ?Sized,
        F: Fn(&Array1<f64>) -> f64,
    {
        let sdev = if rng.random::<f64>() < 0.5 {
            self.sigma0[i]
        } else {
            self.sigma[i]
        };
        loop {
            let nx = normal_scalar(self.xmean[i], sdev, rng);
            if fitfun.feasible(i, nx) {
                return nx;
            }
        }
    }
}

/// DE/best/1 optimizer with temporal locality and age-based
/// reinitialization.
pub struct LdeOptimizer<'a, F>
where
    F: Fn(&Array1<f64>) -> f64,
{
    fitfun: &'a ScalarFitness<'a, F>,
    runid: u64,
    dim: usize,
    popsize: usize,
    max_evaluations: usize,
    keep: f64,
    stop_fitness: f64,
    f0: f64,
    cr0: f64,
    min_mutate: f64,
    max_mutate: f64,
    ints: Option<Vec<bool>>,
    disp: bool,
    rng: StdRng,
    sampler: SigmaSampler,
    pop_x: Array2<f64>,
    pop_y: Array1<f64>,
    // Iteration of each slot's last accepted improvement.
    pop_iter: Vec<usize>,
    best_i: usize,
    best_x: Array1<f64>,
    best_y: f64,
    iterations: usize,
    stop: bool,
}

impl<'a, F> LdeOptimizer<'a, F>
where
    F: Fn(&Array1<f64>) -> f64,
{
    /// Creates an optimizer over a borrowed fitness object.
    ///
    /// Non-positive config values fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns dimension errors when the guess, sigma, or integer mask do
    /// not match the fitness dimension and `OptError::PopulationTooSmall`
    /// for `popsize < 4`.
    pub fn new(fitfun: &'a ScalarFitness<'a, F>, config: &LdeConfig) -> Result<Self> {
        let dim = fitfun.dim();
        if config.guess.len() != dim {
            return Err(OptError::GuessDimensionMismatch {
                name: "guess",
                expected: dim,
                got: config.guess.len(),
            });
        }
        let ns = config.input_sigma.len();
        if ns != 1 && ns != dim {
            return Err(OptError::GuessDimensionMismatch {
                name: "input_sigma",
                expected: dim,
                got: ns,
            });
        }
        if let Some(mask) = &config.ints {
            if mask.len() != dim {
                return Err(OptError::IntMaskDimensionMismatch {
                    expected: dim,
                    got: mask.len(),
                });
            }
        }
        if let Some(b) = fitfun.bounds() {
            if b.dim() != dim {
                return Err(OptError::GuessDimensionMismatch {
                    name: "bounds",
                    expected: dim,
                    got: b.dim(),
                });
            }
        }
        let popsize = if config.popsize == 0 {
            15 * dim
        } else {
            config.popsize
        };
        if popsize < 4 {
            return Err(OptError::PopulationTooSmall { popsize });
        }
        let max_evaluations = if config.max_evaluations == 0 {
            50_000
        } else {
            config.max_evaluations
        };
        let keep = if config.keep > 0.0 { config.keep } else { 30.0 };
        let f0 = if config.f > 0.0 { config.f } else { 0.5 };
        let cr0 = if config.cr > 0.0 { config.cr } else { 0.9 };
        let min_mutate = if config.min_mutate > 0.0 {
            config.min_mutate
        } else {
            0.1
        };
        let max_mutate = if config.max_mutate > 0.0 {
            config.max_mutate
        } else {
            0.5
        };
        let rng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let scale = match fitfun.bounds() {
            Some(b) => b.scale().clone(),
            None => Array1::ones(dim),
        };
        let sampler = SigmaSampler::new(&config.guess, &config.input_sigma, &scale);

        let mut pop_x = Array2::<f64>::zeros((dim, popsize));
        for mut col in pop_x.columns_mut() {
            col.assign(&config.guess);
        }
        let ints = config.ints.clone().filter(|m| m.iter().any(|&b| b));

        Ok(Self {
            fitfun,
            runid: config.runid,
            dim,
            popsize,
            max_evaluations,
            keep,
            stop_fitness: config.stop_fitness,
            f0,
            cr0,
            min_mutate,
            max_mutate,
            ints,
            disp: config.disp,
            rng,
            sampler,
            pop_x,
            pop_y: Array1::from_elem(popsize, f64::MAX),
            pop_iter: vec![0; popsize],
            best_i: 0,
            best_x: config.guess.clone(),
            best_y: f64::MAX,
            iterations: 0,
            stop: false,
        })
    }

    /// Best decision vector found so far.
    pub fn best_x(&self) -> &Array1<f64> {
        &self.best_x
    }

    /// Best objective value found so far.
    pub fn best_value(&self) -> f64 {
        self.best_y
    }

    /// Iterations (generations) performed.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Whether the stop-fitness limit was reached.
    pub fn stopped(&self) -> bool {
        self.stop
    }

    /// Discrete-coordinate mutation pass, resampling from the normal
    /// mixture.
    fn modify(&mut self, x: &mut Array1<f64>) {
        let fitfun = self.fitfun;
        let sampler = &self.sampler;
        if let Some(mask) = self.ints.as_deref() {
            integer_mutation(
                x,
                mask,
                self.min_mutate,
                self.max_mutate,
                &mut self.rng,
                |i, rng| sampler.norm_xi(i, fitfun, rng),
            );
        }
    }

    /// Temporal-locality probe: a feasible step from the best individual
    /// along the direction of the accepted move.
    fn next_improve(
        &mut self,
        xb: &Array1<f64>,
        x: &Array1<f64>,
        xi: &Array1<f64>,
    ) -> Array1<f64> {
        let mut nx = xb + &((x - xi) * 0.5);
        self.fitfun.closest_feasible(&mut nx);
        self.modify(&mut nx);
        nx
    }

    /// Runs the generation loop until the evaluation budget, the
    /// stop-fitness limit, or a termination request ends it.
    pub fn optimize(&mut self) {
        while self.fitfun.evaluations() < self.max_evaluations && !self.fitfun.terminate() {
            self.iterations += 1;
            let cr = if self.iterations % 2 == 0 {
                0.5 * self.cr0
            } else {
                self.cr0
            };
            let f = if self.iterations % 2 == 0 {
                0.5 * self.f0
            } else {
                self.f0
            };

            for p in 0..self.popsize {
                let xp = self.pop_x.column(p).to_owned();
                let xb = self.pop_x.column(self.best_i).to_owned();
                let r1 = loop {
                    let r = self.rng.random_range(0..self.popsize);
                    if r != p && r != self.best_i {
                        break r;
                    }
                };
                let r2 = loop {
                    let r = self.rng.random_range(0..self.popsize);
                    if r != p && r != self.best_i && r != r1 {
                        break r;
                    }
                };
                let r = self.rng.random_range(0..self.dim);
                let mut x = xp.clone();
                for j in 0..self.dim {
                    if j == r || self.rng.random::<f64>() < cr {
                        x[j] = xb[j] + f * (self.pop_x[(j, r1)] - self.pop_x[(j, r2)]);
                        if !self.fitfun.feasible(j, x[j]) {
                            x[j] = self.sampler.norm_xi(j, self.fitfun, &mut self.rng);
                        }
                    }
                }
                self.modify(&mut x);
                let y = self.fitfun.eval(&x);
                if y < self.pop_y[p] {
                    // Temporal locality: probe beyond the best individual.
                    let x2 = self.next_improve(&xb, &x, &xp);
                    let y2 = self.fitfun.eval(&x2);
                    let (x, y) = if y2 < y { (x2, y2) } else { (x, y) };
                    self.pop_x.column_mut(p).assign(&x);
                    self.pop_y[p] = y;
                    self.pop_iter[p] = self.iterations;
                    if y < self.pop_y[self.best_i] {
                        self.best_i = p;
                        if y < self.best_y {
                            self.sampler.update(&x);
                            self.best_y = y;
                            self.best_x = x;
                            if self.stop_fitness.is_finite() && self.best_y < self.stop_fitness {
                                self.stop = true;
                                return;
                            }
                        }
                    }
                } else {
                    // Reinitialize stagnant individuals, more likely the
                    // longer they have gone without an improvement.
                    let age = (self.iterations - self.pop_iter[p]) as f64;
                    if self.keep * self.rng.random::<f64>() < age {
                        let fresh = self.sampler.norm_x(self.fitfun, &mut self.rng);
                        self.pop_x.column_mut(p).assign(&fresh);
                        self.pop_y[p] = f64::MAX;
                    }
                }
            }
            if self.disp {
                eprintln!(
                    "LDE run {} iter {:4} best {:.6e} evals {}",
                    self.runid,
                    self.iterations,
                    self.best_y,
                    self.fitfun.evaluations()
                );
            }
        }
    }
}

/// Runs LDE over a scalar objective, refining `config.guess`.
///
/// # Errors
///
/// Returns dimension or configuration errors from construction.
pub fn optimize_lde<F>(func: &F, config: LdeConfig) -> Result<LdeReport>
where
    F: Fn(&Array1<f64>) -> f64,
{
    let dim = config.guess.len();
    let fitfun = ScalarFitness::new(func, dim, config.bounds.clone());
    let mut opt = LdeOptimizer::new(&fitfun, &config)?;
    opt.optimize();
    let message = if opt.stopped() {
        format!("stop fitness {} reached", config.stop_fitness)
    } else if fitfun.terminate() {
        "termination requested".to_string()
    } else {
        "evaluation budget reached".to_string()
    };
    Ok(LdeReport {
        x: opt.best_x().clone(),
        fun: opt.best_value(),
        nfev: fitfun.evaluations(),
        nit: opt.iterations(),
        stop: opt.stopped(),
        message,
    })
}
