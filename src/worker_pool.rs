//! Bounded worker pool for asynchronous fitness evaluation.
//!
//! Evaluation requests carry the population slot id they were generated
//! for; completions come back in completion order, not submission order.
//! The pool imposes no ordering of its own — the optimizer correlates each
//! result with the candidate it submitted through the slot id.

use ndarray::Array1;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::Scope;

use crate::fitness::MultiFitness;

/// Pool of evaluation workers sharing one request queue.
///
/// Workers are scoped threads borrowing the fitness object; dropping the
/// pool closes the request queue, letting in-flight evaluations finish and
/// the workers exit.
pub(crate) struct WorkerPool {
    req_tx: Sender<(Array1<f64>, usize)>,
    res_rx: Receiver<(Array1<f64>, usize)>,
}

impl WorkerPool {
    /// Spawns `workers` evaluation threads on `scope`.
    pub(crate) fn new<'s, 'env, F>(
        scope: &'s Scope<'s, 'env>,
        fitfun: &'env MultiFitness<'env, F>,
        workers: usize,
    ) -> Self
    where
        F: Fn(&Array1<f64>) -> Array1<f64> + Sync,
    {
        let (req_tx, req_rx) = channel::<(Array1<f64>, usize)>();
        let (res_tx, res_rx) = channel::<(Array1<f64>, usize)>();
        let req_rx = Arc::new(Mutex::new(req_rx));
        for _ in 0..workers {
            let req_rx = Arc::clone(&req_rx);
            let res_tx = res_tx.clone();
            scope.spawn(move || loop {
                let req = {
                    let Ok(guard) = req_rx.lock() else { break };
                    guard.recv()
                };
                match req {
                    Ok((x, id)) => {
                        let y = fitfun.eval(&x);
                        if res_tx.send((y, id)).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            });
        }
        Self { req_tx, res_rx }
    }

    /// Enqueues an evaluation request for population slot `id`.
    pub(crate) fn evaluate(&self, x: Array1<f64>, id: usize) {
        // A failed send means every worker died; result() surfaces that.
        let _ = self.req_tx.send((x, id));
    }

    /// Blocks until any evaluation completes. `None` when no workers remain.
    pub(crate) fn result(&self) -> Option<(Array1<f64>, usize)> {
        self.res_rx.recv().ok()
    }
}
