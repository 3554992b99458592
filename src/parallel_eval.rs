//! Parallel batch evaluation of candidate vectors.

use ndarray::Array1;
use rayon::prelude::*;

use crate::fitness::MultiFitness;

/// Parallel evaluation configuration for the synchronous driver.
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Enable parallel evaluation of each generation's children.
    pub enabled: bool,
    /// Number of threads to use (None = use rayon default).
    pub num_threads: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            num_threads: None,
        }
    }
}

/// Evaluates a batch of trial vectors, in submission order.
///
/// Sequential for small batches or when disabled; otherwise fans out over
/// the global rayon pool. The fitness callback must tolerate concurrent
/// invocation when parallel evaluation is enabled.
pub(crate) fn evaluate_trials<F>(
    trials: &[Array1<f64>],
    fitfun: &MultiFitness<'_, F>,
    config: &ParallelConfig,
) -> Vec<Array1<f64>>
where
    F: Fn(&Array1<f64>) -> Array1<f64> + Sync,
{
    if !config.enabled || trials.len() < 4 {
        return trials.iter().map(|t| fitfun.eval(t)).collect();
    }
    trials.par_iter().map(|t| fitfun.eval(t)).collect()
}
