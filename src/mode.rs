//! MODE: constrained multi-objective differential evolution.
//!
//! The population buffer holds `2 * popsize` columns: the first half are the
//! current survivors, the second half stages the children of the running
//! generation. Each update ranks the whole buffer with the constrained
//! domination score and truncates to `popsize` survivors, breaking ties
//! inside the overflowing level by first-objective crowding distance.
//! Survivors are written back in descending score order, so column 0 always
//! holds the most preferred individual.
//!
//! Two variation operators produce the children: an NSGA-II-style update
//! (simulated binary crossover plus polynomial mutation, generated in bulk
//! and served column by column) and a DE/rand/1-style update with
//! oscillating F/CR and optional elite bias for the base vector. The choice
//! can be switched between generations.

use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;

use crate::bounds::Bounds;
use crate::crossover_sbx::sbx_offspring;
use crate::crowding::crowd_dist;
use crate::domination::dominated_vec;
use crate::error::{OptError, Result};
use crate::fitness::MultiFitness;
use crate::mutation_integer::integer_mutation;
use crate::mutation_polynomial::polynomial_mutation;
use crate::parallel_eval::evaluate_trials;
use crate::ranking::domination_scores;
use crate::sort_index::sort_index_desc;
use crate::worker_pool::WorkerPool;
use crate::{CallbackAction, LogFn, ModeConfig, ModeIntermediate, ModeReport, ParallelConfig};

/// Constrained multi-objective DE optimizer.
///
/// Owns its population and RNG; the fitness object is borrowed from the
/// caller and shared with evaluation workers in the delayed-update mode.
pub struct ModeOptimizer<'a, F>
where
    F: Fn(&Array1<f64>) -> Array1<f64> + Sync,
{
    fitfun: &'a MultiFitness<'a, F>,
    runid: u64,
    dim: usize,
    nobj: usize,
    ncon: usize,
    popsize: usize,
    max_evaluations: usize,
    f0: f64,
    cr0: f64,
    f: f64,
    cr: f64,
    pro_c: f64,
    dis_c: f64,
    pro_m: f64,
    dis_m: f64,
    nsga_update: bool,
    pareto_update: f64,
    min_mutate: f64,
    max_mutate: f64,
    log_period: usize,
    log: Option<LogFn<'a>>,
    disp: bool,
    parallel: ParallelConfig,
    rng: StdRng,
    // Survivors in columns [0, popsize), children staged in the rest.
    pop_x: Array2<f64>,
    pop_y: Array2<f64>,
    // Staging queue for asynchronous tells.
    stage_x: Array2<f64>,
    stage_y: Array2<f64>,
    stage_done: Vec<bool>,
    // Cached NSGA children, served by next_x.
    v_x: Array2<f64>,
    vp: usize,
    pos: usize,
    iterations: usize,
    n_accepted: usize,
}

impl<'a, F> ModeOptimizer<'a, F>
where
    F: Fn(&Array1<f64>) -> Array1<f64> + Sync,
{
    /// Creates an optimizer over a borrowed fitness object.
    ///
    /// Non-positive config values fall back to their defaults; `popsize` is
    /// rounded up to an even value for SBX pairing.
    ///
    /// # Errors
    ///
    /// Returns `OptError::PopulationTooSmall` for `popsize < 4`.
    pub fn new(fitfun: &'a MultiFitness<'a, F>, config: ModeConfig<'a>) -> Result<Self> {
        let dim = fitfun.dim();
        let nobj = fitfun.nobj();
        let ncon = fitfun.ncon();
        let mut popsize = if config.popsize == 0 {
            128
        } else {
            config.popsize
        };
        if popsize < 4 {
            return Err(OptError::PopulationTooSmall { popsize });
        }
        popsize += popsize % 2;
        let max_evaluations = if config.max_evaluations == 0 {
            500_000
        } else {
            config.max_evaluations
        };
        let f0 = if config.f > 0.0 { config.f } else { 0.5 };
        let cr0 = if config.cr > 0.0 { config.cr } else { 0.9 };
        let pro_c = if config.pro_c > 0.0 { config.pro_c } else { 1.0 };
        let dis_c = if config.dis_c > 0.0 { config.dis_c } else { 20.0 };
        let pro_m = if config.pro_m > 0.0 { config.pro_m } else { 1.0 };
        let dis_m = if config.dis_m > 0.0 { config.dis_m } else { 20.0 };
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
        let log_period = if config.log_period == 0 {
            1000
        } else {
            config.log_period
        };
        let mut rng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let nrows = nobj + ncon;
        let mut pop_x = Array2::<f64>::zeros((dim, 2 * popsize));
        let pop_y = Array2::<f64>::from_elem((nrows, 2 * popsize), f64::MAX);
        for p in 0..popsize {
            pop_x.column_mut(p).assign(&fitfun.sample(&mut rng));
        }
        let v_x = pop_x.clone();

        Ok(Self {
            fitfun,
            runid: config.runid,
            dim,
            nobj,
            ncon,
            popsize,
            max_evaluations,
            f0,
            cr0,
            f: f0,
            cr: cr0,
            pro_c,
            dis_c,
            pro_m,
            dis_m,
            nsga_update: config.nsga_update,
            pareto_update: config.pareto_update,
            min_mutate,
            max_mutate,
            log_period,
            log: config.log,
            disp: config.disp,
            parallel: config.parallel,
            rng,
            pop_x,
            pop_y,
            stage_x: Array2::zeros((dim, 2 * popsize)),
            stage_y: Array2::zeros((nrows, 2 * popsize)),
            stage_done: vec![false; 2 * popsize],
            v_x,
            vp: 0,
            pos: 0,
            iterations: 0,
            n_accepted: 0,
        })
    }

    /// Effective (even) population size.
    pub fn popsize(&self) -> usize {
        self.popsize
    }

    /// Iterations (generations) started so far.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Evaluations accepted through `tell` (the dominance guard discards
    /// the rest silently).
    pub fn accepted_tells(&self) -> usize {
        self.n_accepted
    }

    /// Current survivors (dim x popsize).
    pub fn population(&self) -> Array2<f64> {
        self.pop_x.slice(s![.., ..self.popsize]).to_owned()
    }

    /// Current survivor values ((nobj + ncon) x popsize).
    pub fn values(&self) -> Array2<f64> {
        self.pop_y.slice(s![.., ..self.popsize]).to_owned()
    }

    /// NSGA-style variation: SBX plus polynomial mutation over the parent
    /// columns, projected to feasibility. The distribution indices are
    /// perturbed once per call.
    fn variation(&mut self, parents: ArrayView2<f64>) -> Array2<f64> {
        let dis_c = (0.5 * self.rng.random::<f64>() + 0.5) * self.dis_c;
        let dis_m = (0.5 * self.rng.random::<f64>() + 0.5) * self.dis_m;
        let mut offspring = sbx_offspring(parents, self.pro_c, dis_c, &mut self.rng);
        polynomial_mutation(
            &mut offspring,
            self.fitfun.bounds(),
            self.pro_m,
            dis_m,
            &mut self.rng,
        );
        self.fitfun.closest_feasible_columns(&mut offspring);
        offspring
    }

    /// Produces the candidate for population slot `p`.
    ///
    /// Wrapping to slot 0 starts a new generation: the iteration counter
    /// advances, the log callback may fire, and the DE mode re-oscillates
    /// F and CR.
    fn next_x(&mut self, p: usize) -> Array1<f64> {
        if p == 0 {
            self.iterations += 1;
            if self.iterations % self.log_period == 0 {
                if let Some(log) = self.log.as_mut() {
                    let info = ModeIntermediate {
                        iter: self.iterations,
                        x: self.pop_x.slice(s![.., ..self.popsize]).to_owned(),
                        y: self.pop_y.slice(s![.., ..self.popsize]).to_owned(),
                    };
                    if matches!(log(&info), CallbackAction::Stop) {
                        self.fitfun.set_terminate();
                    }
                }
            }
        }
        if self.nsga_update {
            let x = self.v_x.column(self.vp).to_owned();
            self.vp = (self.vp + 1) % self.popsize;
            return x;
        }
        // DE update strategy.
        if p == 0 {
            self.cr = if self.iterations % 2 == 0 {
                0.5 * self.cr0
            } else {
                self.cr0
            };
            self.f = if self.iterations % 2 == 0 {
                0.5 * self.f0
            } else {
                self.f0
            };
        }
        let (r1, r2, r3) = loop {
            let r1 = self.rng.random_range(0..self.popsize);
            let r2 = self.rng.random_range(0..self.popsize);
            let r3 = if self.pareto_update > 0.0 {
                // Sample elite solutions: survivors are stored best-first.
                (self.rng.random::<f64>().powf(1.0 + self.pareto_update) * self.popsize as f64)
                    as usize
            } else {
                self.rng.random_range(0..self.popsize)
            };
            if r3 != p && r3 != r1 && r3 != r2 && r2 != p && r2 != r1 && r1 != p {
                break (r1, r2, r3);
            }
        };
        let mut x = Array1::<f64>::zeros(self.dim);
        for j in 0..self.dim {
            x[j] = self.pop_x[(j, r3)] + self.f * (self.pop_x[(j, r1)] - self.pop_x[(j, r2)]);
        }
        let r = self.rng.random_range(0..self.dim);
        for j in 0..self.dim {
            if j != r && self.rng.random::<f64>() > self.cr {
                x[j] = self.pop_x[(j, p)];
            }
        }
        self.fitfun.closest_feasible(&mut x);
        self.modify(&mut x);
        x
    }

    /// Discrete-coordinate mutation pass, resampling uniformly in bounds.
    fn modify(&mut self, x: &mut Array1<f64>) {
        let fitfun = self.fitfun;
        if let Some(mask) = fitfun.ints() {
            integer_mutation(
                x,
                mask,
                self.min_mutate,
                self.max_mutate,
                &mut self.rng,
                |i, rng| fitfun.sample_i(i, rng),
            );
        }
    }

    /// Ranks the whole population buffer and truncates to `popsize`
    /// survivors, written back in descending score order. In NSGA mode the
    /// children cache is regenerated from the new survivors.
    fn pop_update(&mut self) {
        let (x0, y0) = if self.nobj == 1 {
            // Pre-sort by the single objective so truncation order
            // coincides with fitness order.
            let yi = sort_index_desc(self.pop_y.row(0));
            (
                self.pop_x.select(Axis(1), &yi),
                self.pop_y.select(Axis(1), &yi),
            )
        } else {
            (self.pop_x.clone(), self.pop_y.clone())
        };
        let domination = domination_scores(y0.view(), self.nobj, self.ncon);
        let maxdom = domination.iter().fold(0.0f64, |a, &b| a.max(b)) as i64;

        let mut xs: Vec<Array1<f64>> = Vec::with_capacity(self.popsize);
        let mut ys: Vec<Array1<f64>> = Vec::with_capacity(self.popsize);
        for dom in (0..=maxdom).rev() {
            let level: Vec<usize> = (0..domination.len())
                .filter(|&i| domination[i] == dom as f64)
                .collect();
            if level.is_empty() {
                continue;
            }
            let domx = x0.select(Axis(1), &level);
            let domy = y0.select(Axis(1), &level);
            if xs.len() + level.len() <= self.popsize {
                // Whole level fits.
                for i in 0..level.len() {
                    xs.push(domx.column(i).to_owned());
                    ys.push(domy.column(i).to_owned());
                }
                if xs.len() == self.popsize {
                    break;
                }
            } else {
                // Fill the remainder by descending crowding distance.
                let cd = crowd_dist(domy.view());
                for &i in &sort_index_desc(cd.view()) {
                    if xs.len() >= self.popsize {
                        break;
                    }
                    xs.push(domx.column(i).to_owned());
                    ys.push(domy.column(i).to_owned());
                }
                break;
            }
        }
        for (i, (x, y)) in xs.iter().zip(ys.iter()).enumerate() {
            self.pop_x.column_mut(i).assign(x);
            self.pop_y.column_mut(i).assign(y);
        }
        if self.nsga_update {
            let parents = self.pop_x.slice(s![.., ..self.popsize]).to_owned();
            self.v_x = self.variation(parents.view());
        }
    }

    /// Returns the next candidate and its population slot id.
    ///
    /// `tell` must be called exactly once per successful `ask`; at most
    /// `popsize` asks may be outstanding.
    pub fn ask(&mut self) -> (Array1<f64>, usize) {
        let p = self.pos;
        let x = self.next_x(p);
        self.pos = (self.pos + 1) % self.popsize;
        (x, p)
    }

    /// Reports an evaluated candidate for slot `p`.
    ///
    /// Candidates dominated by the current survivor of their slot are
    /// discarded silently. Accepted results accumulate in the staging
    /// queue; once `popsize` are done they flush into the children half and
    /// the population update runs. Returns `true` when termination has been
    /// requested.
    pub fn tell(&mut self, y: &Array1<f64>, x: &Array1<f64>, p: usize) -> bool {
        let survivor = self.pop_y.column(p).to_owned();
        if dominated_vec(y, &survivor) {
            return self.fitfun.terminate();
        }
        if let Some(dp) = self.stage_done.iter().position(|&d| !d) {
            self.stage_x.column_mut(dp).assign(x);
            self.stage_y.column_mut(dp).assign(y);
            self.stage_done[dp] = true;
        }
        let ndone = self.stage_done.iter().filter(|&&d| d).count();
        if ndone >= self.popsize {
            let mut out = self.popsize;
            for dp in 0..self.stage_done.len() {
                if self.stage_done[dp] {
                    if out >= 2 * self.popsize {
                        break;
                    }
                    self.pop_x.column_mut(out).assign(&self.stage_x.column(dp));
                    self.pop_y.column_mut(out).assign(&self.stage_y.column(dp));
                    self.stage_done[dp] = false;
                    out += 1;
                }
            }
            self.pop_update();
        }
        self.n_accepted += 1;
        self.fitfun.terminate()
    }

    /// Synchronous optimization loop.
    ///
    /// Generates `popsize` children per generation, evaluates them (in
    /// parallel when configured), stores them in the children half, and
    /// runs the population update. Terminates on the evaluation budget or
    /// the cooperative termination flag.
    pub fn optimize(&mut self) {
        self.iterations = 0;
        self.fitfun.reset_evaluations();
        while self.fitfun.evaluations() < self.max_evaluations && !self.fitfun.terminate() {
            let trials: Vec<Array1<f64>> = (0..self.popsize).map(|p| self.next_x(p)).collect();
            let values = evaluate_trials(&trials, self.fitfun, &self.parallel);
            for p in 0..self.popsize {
                self.pop_x.column_mut(self.popsize + p).assign(&trials[p]);
                self.pop_y.column_mut(self.popsize + p).assign(&values[p]);
            }
            self.pop_update();
            if self.disp {
                eprintln!(
                    "MODE run {} iter {:4} evals {}",
                    self.runid,
                    self.iterations,
                    self.fitfun.evaluations()
                );
            }
        }
    }

    /// Asynchronous optimization with delayed population updates.
    ///
    /// Keeps up to `min(workers, popsize)` evaluations in flight on a
    /// worker pool; completions arrive in any order and are fed back
    /// through `tell`. In-flight evaluations finish after termination is
    /// requested; the loop exits on the next completion.
    pub fn optimize_delayed_update(&mut self, workers: usize) {
        self.iterations = 0;
        self.fitfun.reset_evaluations();
        let workers = workers.clamp(1, self.popsize);
        let fitfun = self.fitfun;
        let mut pending: Vec<Array1<f64>> = vec![Array1::zeros(self.dim); self.popsize];
        thread::scope(|scope| {
            let pool = WorkerPool::new(scope, fitfun, workers);
            for _ in 0..workers {
                let (x, p) = self.ask();
                pool.evaluate(x.clone(), p);
                pending[p] = x;
            }
            while fitfun.evaluations() < self.max_evaluations && !fitfun.terminate() {
                let Some((y, p)) = pool.result() else { break };
                let x = pending[p].clone();
                self.tell(&y, &x, p);
                if fitfun.evaluations() >= self.max_evaluations {
                    break;
                }
                let (x, p) = self.ask();
                pool.evaluate(x.clone(), p);
                pending[p] = x;
            }
        });
    }

    /// Stages a full generation of candidates and returns them
    /// (dim x popsize), for external evaluation.
    pub fn ask_all(&mut self) -> Array2<f64> {
        for p in 0..self.popsize {
            let x = self.next_x(p);
            self.pop_x.column_mut(self.popsize + p).assign(&x);
        }
        self.pop_x.slice(s![.., self.popsize..]).to_owned()
    }

    /// Ingests externally evaluated values ((nobj + ncon) x popsize) for
    /// the candidates of the last `ask_all` and runs the population update.
    /// Returns `true` when termination has been requested.
    ///
    /// # Errors
    ///
    /// Returns `OptError::ValueShapeMismatch` for a wrongly shaped matrix.
    pub fn tell_all(&mut self, ys: &Array2<f64>) -> Result<bool> {
        if ys.nrows() != self.nobj + self.ncon || ys.ncols() != self.popsize {
            return Err(OptError::ValueShapeMismatch {
                expected_rows: self.nobj + self.ncon,
                expected_cols: self.popsize,
                rows: ys.nrows(),
                cols: ys.ncols(),
            });
        }
        for p in 0..self.popsize {
            self.pop_y
                .column_mut(self.popsize + p)
                .assign(&ys.column(p));
        }
        self.pop_update();
        Ok(self.fitfun.terminate())
    }

    /// Like [`tell_all`](Self::tell_all), but first switches the update
    /// strategy. The NSGA children cache is rebuilt by the update that
    /// follows, so the switch takes effect from the next generation.
    pub fn tell_all_switch(
        &mut self,
        ys: &Array2<f64>,
        nsga_update: bool,
        pareto_update: f64,
    ) -> Result<bool> {
        self.nsga_update = nsga_update;
        self.pareto_update = pareto_update;
        self.tell_all(ys)
    }
}

/// Runs MODE over `func` returning `nobj` objectives followed by `ncon`
/// constraint values (`<= 0` feasible) inside `[lower, upper]`.
///
/// With `config.workers > 1` the delayed-update driver evaluates in
/// parallel; otherwise the synchronous loop runs.
///
/// # Errors
///
/// Returns bounds or configuration errors from construction.
pub fn optimize_mode<F>(
    func: &F,
    lower: Array1<f64>,
    upper: Array1<f64>,
    nobj: usize,
    ncon: usize,
    ints: Option<Vec<bool>>,
    config: ModeConfig<'_>,
) -> Result<ModeReport>
where
    F: Fn(&Array1<f64>) -> Array1<f64> + Sync,
{
    if let Some(n) = config.parallel.num_threads {
        // Ignore the error if the global pool was already configured.
        let _ = rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global();
    }
    let workers = config.workers.max(1);
    let max_evaluations = if config.max_evaluations == 0 {
        500_000
    } else {
        config.max_evaluations
    };
    let bounds = Bounds::new(lower, upper)?;
    let fitfun = MultiFitness::new(func, nobj, ncon, bounds, ints)?;
    let mut opt = ModeOptimizer::new(&fitfun, config)?;
    if workers <= 1 {
        opt.optimize();
    } else {
        opt.optimize_delayed_update(workers);
    }
    let stop = fitfun.terminate();
    let message = if stop {
        "termination requested".to_string()
    } else {
        format!("evaluation budget of {} reached", max_evaluations)
    };
    Ok(ModeReport {
        x: opt.population(),
        y: opt.values(),
        nit: opt.iterations(),
        nfev: fitfun.evaluations(),
        stop,
        message,
    })
}
